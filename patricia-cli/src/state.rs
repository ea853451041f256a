//! Persisted tree state: the committed root and the stored node count.

use patricia_error::{Error, Result};
use patricia_tree::Hash256;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeState {
    pub root: Hash256,
    pub node_count: u64,
}

impl TreeState {
    /// Load the state file; a missing file is an empty tree
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(Error::from(e)
                    .with_operation("state::load")
                    .with_context("path", path.display().to_string()))
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::parse_failed("invalid state file")
                .with_operation("state::load")
                .with_context("path", path.display().to_string())
                .set_source(e)
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            Error::serialization_failed("failed to encode state")
                .with_operation("state::save")
                .set_source(e)
        })?;

        std::fs::write(path, content).map_err(|e| {
            Error::from(e)
                .with_operation("state::save")
                .with_context("path", path.display().to_string())
        })
    }
}
