//! Extraction of the main file from zipped Exchange artifacts

use std::io::{Cursor, Read};

use crate::error::{Result, SpecError};

/// Return the bytes of `main_file` inside a zip archive.
///
/// Entry names are compared after stripping leading slashes; an entry in a
/// nested directory matches when its final path segments equal `main_file`.
pub fn extract_main_file(data: &[u8], main_file: &str) -> Result<Vec<u8>> {
    let wanted = main_file.trim_start_matches('/');
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(SpecError::from)?;

    let mut fallback = None;
    for i in 0..archive.len() {
        let file = archive.by_index(i).map_err(SpecError::from)?;
        if !file.is_file() {
            continue;
        }
        let name = file.name().trim_start_matches('/');
        if name == wanted {
            return read_entry(file);
        }
        if fallback.is_none() && name.ends_with(&format!("/{}", wanted)) {
            fallback = Some(i);
        }
    }

    match fallback {
        Some(i) => read_entry(archive.by_index(i).map_err(SpecError::from)?),
        None => Err(SpecError::Archive(format!("'{}' not found in archive", main_file)).into()),
    }
}

fn read_entry<R: Read>(mut file: R) -> Result<Vec<u8>> {
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}
