//! Lenient deserializers for fields the platform sends as either strings or numbers

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Accept `12`, `12.0`, `"12"` or `""` (as zero).
pub fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(0),
        Some(StringOrNumber::Int(v)) => Ok(v),
        Some(StringOrNumber::Float(v)) => Ok(v as i64),
        Some(StringOrNumber::Str(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{}'", s)))
        }
    }
}

/// Accept a string or a number and keep it as a string.
pub fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(String::new()),
        Some(StringOrNumber::Int(v)) => Ok(v.to_string()),
        Some(StringOrNumber::Float(v)) => Ok(v.to_string()),
        Some(StringOrNumber::Str(s)) => Ok(s),
    }
}
