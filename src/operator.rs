//! Operator-supplied configuration.
//!
//! Owned externally; the reconciler only reads it. The "previous value" of
//! the port is answered from the flag store fact recorded when a port was
//! last opened, so port migration works without host-dispatcher cooperation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub port: u16,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl OperatorConfig {
    /// Load the operator config file. An absent file yields the defaults; a
    /// malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read operator config at {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse operator config at {}", path.display()))
    }
}
