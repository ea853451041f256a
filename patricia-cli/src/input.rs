//! JSON change files and hex keys.
//!
//! ```json
//! { "set": { "646f6700": "puppy" }, "unset": ["686f7273"] }
//! ```

use patricia_error::{Error, Result};
use patricia_tree::ChangeSet;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed change file; keys are still hex strings
#[derive(Debug, Default, Deserialize)]
pub struct ChangeFile {
    #[serde(default)]
    pub set: BTreeMap<String, String>,

    #[serde(default)]
    pub unset: Vec<String>,
}

impl ChangeFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("input::from_file")
                .with_context("path", path.display().to_string())
        })?;
        Self::parse(&content).map_err(|e| e.with_context("path", path.display().to_string()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            Error::parse_failed("invalid change file")
                .with_operation("input::parse")
                .set_source(e)
        })
    }

    /// Decode keys into a change set. Set entries are additions.
    pub fn to_change_set(&self, key_size: usize) -> Result<ChangeSet<Vec<u8>, String>> {
        let mut changes = ChangeSet::new();
        for (key, value) in &self.set {
            changes = changes.add(parse_key(key, key_size)?, value.clone());
        }
        for key in &self.unset {
            changes = changes.remove(parse_key(key, key_size)?);
        }
        Ok(changes)
    }
}

/// Decode a hex key of exactly `key_size` bytes, with or without `0x`
pub fn parse_key(key: &str, key_size: usize) -> Result<Vec<u8>> {
    let stripped = key.strip_prefix("0x").unwrap_or(key);
    let bytes = hex::decode(stripped).map_err(|e| {
        Error::parse_failed("key is not valid hex")
            .with_operation("input::parse_key")
            .with_context("key", key)
            .set_source(e)
    })?;

    if bytes.len() != key_size {
        return Err(Error::invalid_argument(format!(
            "key is {} bytes, expected {}",
            bytes.len(),
            key_size
        ))
        .with_operation("input::parse_key")
        .with_context("key", key));
    }
    Ok(bytes)
}
