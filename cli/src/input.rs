//! Loading recorded detections, queries and form fields from disk.

use std::io::{self, Read};
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Error type for input loading.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read file: {0}")]
    ReadFile(#[from] io::Error),
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("failed to parse file (tried YAML and JSON)")]
    ParseFailed,
}

/// Loads a YAML or JSON file. `-` reads stdin.
pub fn load_input<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, InputError> {
    let path = path.as_ref();
    if path == Path::new("-") {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        return parse_input(&data, path);
    }
    let data = std::fs::read(path)?;
    parse_input(&data, path)
}

/// Parses input data based on file extension, falling back to content
/// sniffing (JSON, then YAML).
pub fn parse_input<T: DeserializeOwned>(
    data: &[u8],
    path: impl AsRef<Path>,
) -> Result<T, InputError> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_slice(data)?),
        Some("json") => Ok(serde_json::from_slice(data)?),
        _ => {
            if let Ok(v) = serde_json::from_slice(data) {
                return Ok(v);
            }
            if let Ok(v) = serde_yaml::from_slice(data) {
                return Ok(v);
            }
            Err(InputError::ParseFailed)
        }
    }
}
