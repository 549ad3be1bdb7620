//! Configuration document loading
//!
//! Tools keep their settings in small JSON documents (one per concern and
//! environment, e.g. `env/dev_config.json`). Individual values can be
//! overridden from the process environment.

use crate::error::{CommonError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;

/// Read and deserialize a JSON configuration document
pub fn load_json_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).map_err(|e| CommonError::config_file(path, e))?;
    serde_json::from_str(&content).map_err(|e| CommonError::config_file(path, e))
}

/// Read an environment variable, treating empty values as unset
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable
///
/// Returns `Ok(None)` when the variable is unset and an error when it is set
/// to something that does not parse.
pub fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CommonError::config(format!("Invalid value for {}: '{}'", key, raw))),
        None => Ok(None),
    }
}
