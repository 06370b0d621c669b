//! Spec file selection and normalization
//!
//! OpenAPI documents are handled as `serde_json::Value` trees; the default
//! map keeps keys sorted, so the emitted bytes are canonical. RAML gets a
//! line edit and WSDL passes through untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use url::Url;

use super::policy::{AuthPolicy, CLIENT_ID_ENFORCEMENT, PolicyDetail};
use crate::client::models::ExchangeFile;
use crate::error::{Result, SpecError};

/// Description attached to the client-id security scheme
pub const API_KEY_DESCRIPTION: &str =
    "Provided as: client_id:<INSERT_VALID_CLIENTID_HERE> client_secret:<INSERT_VALID_SECRET_HERE>";

/// Appended when credentials travel in a basic-auth header
pub const BASIC_AUTH_DESCRIPTION: &str =
    "\n\nProvided as: Authorization:Basic <base64 of client_id:client_secret>";

/// Policy configuration key telling where client credentials are read from
pub const CREDENTIALS_ORIGIN_KEY: &str = "credentialsOriginHasHttpBasicAuthenticationHeader";
pub const BASIC_AUTH_ORIGIN: &str = "httpBasicAuthenticationHeader";

const ELIGIBLE_CLASSIFIERS: [&str; 3] = ["oas", "fat-oas", "wsdl"];
const RAML_CLASSIFIERS: [&str; 2] = ["raml", "fat-raml"];

/// Specification flavour of a published service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Oas2,
    Oas3,
    Raml,
    Wsdl,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Oas2 => "oas2",
            ResourceType::Oas3 => "oas3",
            ResourceType::Raml => "raml",
            ResourceType::Wsdl => "wsdl",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preference order of exchange classifiers, lowest first
pub fn classifier_rank(classifier: &str) -> u8 {
    match classifier {
        "oas" => 0,
        "fat-oas" => 1,
        "wsdl" => 2,
        "raml" => 3,
        "fat-raml" => 4,
        _ => 5,
    }
}

/// Pick the preferred spec file, if it is one we can publish.
pub fn select_spec_file(files: &[ExchangeFile], allow_raml: bool) -> Option<&ExchangeFile> {
    let best = files
        .iter()
        .min_by_key(|f| classifier_rank(&f.classifier))?;
    let classifier = best.classifier.as_str();

    if ELIGIBLE_CLASSIFIERS.contains(&classifier)
        || (allow_raml && RAML_CLASSIFIERS.contains(&classifier))
    {
        Some(best)
    } else {
        None
    }
}

/// A decoded specification
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    OpenApi(ResourceType, Map<String, Value>),
    Raml(String),
    Wsdl(Vec<u8>),
}

/// Decode spec bytes. OpenAPI may arrive as JSON or YAML.
pub fn parse_document(classifier: &str, bytes: &[u8]) -> Result<Document> {
    if classifier == "wsdl" {
        return Ok(Document::Wsdl(bytes.to_vec()));
    }
    if RAML_CLASSIFIERS.contains(&classifier) {
        return Ok(Document::Raml(String::from_utf8_lossy(bytes).into_owned()));
    }

    let value = serde_json::from_slice::<Value>(bytes)
        .ok()
        .or_else(|| serde_yaml::from_slice::<Value>(bytes).ok())
        .ok_or(SpecError::UnknownFormat)?;

    let Value::Object(doc) = value else {
        return Err(SpecError::UnknownFormat.into());
    };
    let resource_type = if doc.contains_key("swagger") {
        ResourceType::Oas2
    } else if doc.contains_key("openapi") {
        ResourceType::Oas3
    } else {
        return Err(SpecError::UnknownFormat.into());
    };
    Ok(Document::OpenApi(resource_type, doc))
}

/// Normalized spec ready for the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpec {
    pub resource_type: ResourceType,
    pub bytes: Vec<u8>,
}

/// Rewrite endpoint and security schemes of a downloaded spec.
pub fn normalize(
    classifier: &str,
    bytes: &[u8],
    endpoint_uri: &str,
    policy: &PolicyDetail,
) -> Result<NormalizedSpec> {
    match parse_document(classifier, bytes)? {
        Document::Wsdl(bytes) => Ok(NormalizedSpec {
            resource_type: ResourceType::Wsdl,
            bytes,
        }),
        Document::Raml(text) => Ok(NormalizedSpec {
            resource_type: ResourceType::Raml,
            bytes: rewrite_raml_base_uri(&text, endpoint_uri).into_bytes(),
        }),
        Document::OpenApi(resource_type, mut doc) => {
            if resource_type == ResourceType::Oas2 {
                set_oas2_endpoint(&mut doc, endpoint_uri)?;
                set_oas2_security(&mut doc, policy);
            } else {
                set_oas3_endpoint(&mut doc, endpoint_uri);
                set_oas3_security(&mut doc, policy);
            }
            Ok(NormalizedSpec {
                resource_type,
                bytes: serde_json::to_vec(&Value::Object(doc))?,
            })
        }
    }
}

fn set_oas2_endpoint(doc: &mut Map<String, Value>, endpoint_uri: &str) -> Result<()> {
    let url = Url::parse(endpoint_uri)
        .map_err(|e| SpecError::Rewrite(format!("invalid endpoint '{}': {}", endpoint_uri, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| SpecError::Rewrite(format!("endpoint '{}' has no host", endpoint_uri)))?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    doc.insert("schemes".into(), json!([url.scheme()]));
    doc.insert("host".into(), json!(host));
    doc.insert("basePath".into(), json!(url.path()));
    Ok(())
}

fn set_oas3_endpoint(doc: &mut Map<String, Value>, endpoint_uri: &str) {
    doc.insert("servers".into(), json!([{ "url": endpoint_uri }]));
}

fn api_key_scheme(policy: &PolicyDetail) -> Value {
    let mut description = API_KEY_DESCRIPTION.to_string();
    if policy.config_str(CREDENTIALS_ORIGIN_KEY).as_deref() == Some(BASIC_AUTH_ORIGIN) {
        description.push_str(BASIC_AUTH_DESCRIPTION);
    }
    json!({
        "type": "apiKey",
        "in": "header",
        "name": "authorization",
        "description": description,
    })
}

/// Scopes from the policy's whitespace or comma separated `scopes` value
fn oauth_scopes(policy: &PolicyDetail) -> Map<String, Value> {
    policy
        .config_str("scopes")
        .unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| (s.to_string(), Value::String(String::new())))
        .collect()
}

fn set_oas2_security(doc: &mut Map<String, Value>, policy: &PolicyDetail) {
    doc.remove("securityDefinitions");
    doc.remove("security");

    let definitions = match policy.policy {
        AuthPolicy::ApiKey => json!({ CLIENT_ID_ENFORCEMENT: api_key_scheme(policy) }),
        AuthPolicy::OAuth => {
            let token_url = policy.config_str("tokenUrl").unwrap_or_default();
            json!({
                "oauth2": {
                    "type": "oauth2",
                    "flow": "accessCode",
                    "authorizationUrl": token_url,
                    "tokenUrl": token_url,
                    "scopes": oauth_scopes(policy),
                }
            })
        }
        AuthPolicy::PassThrough => return,
    };
    doc.insert("securityDefinitions".into(), definitions);
}

fn set_oas3_security(doc: &mut Map<String, Value>, policy: &PolicyDetail) {
    if let Some(components) = doc.get_mut("components").and_then(Value::as_object_mut) {
        components.remove("securitySchemes");
    }
    doc.remove("security");

    let schemes = match policy.policy {
        AuthPolicy::ApiKey => json!({ CLIENT_ID_ENFORCEMENT: api_key_scheme(policy) }),
        AuthPolicy::OAuth => {
            let token_url = policy.config_str("tokenUrl").unwrap_or_default();
            json!({
                "oauth2": {
                    "type": "oauth2",
                    "flows": {
                        "authorizationCode": {
                            "authorizationUrl": token_url,
                            "tokenUrl": token_url,
                            "scopes": oauth_scopes(policy),
                        }
                    }
                }
            })
        }
        AuthPolicy::PassThrough => return,
    };

    let components = doc
        .entry("components")
        .or_insert_with(|| Value::Object(Map::new()));
    if !components.is_object() {
        *components = Value::Object(Map::new());
    }
    if let Some(components) = components.as_object_mut() {
        components.insert("securitySchemes".into(), schemes);
    }
}

/// Point a RAML document at `endpoint_uri`.
pub fn rewrite_raml_base_uri(text: &str, endpoint_uri: &str) -> String {
    let base_uri = format!("baseUri: {}", endpoint_uri);
    let mut replaced = false;
    let mut lines: Vec<String> = text
        .lines()
        .map(|line| {
            if !replaced && line.starts_with("baseUri:") {
                replaced = true;
                base_uri.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        let at = usize::from(lines.first().is_some_and(|l| l.starts_with("#%RAML")));
        lines.insert(at, base_uri);
    }

    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}
