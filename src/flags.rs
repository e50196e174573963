//! Durable flag and fact store.
//!
//! A single JSON document holds the named boolean flags gating reconciliation
//! (install-once, readiness, dirty marking) plus scalar facts (the proxy auth
//! token, the last observed config-file hash, the currently open port). Every
//! mutation is written through to disk immediately; the store is re-read on
//! open, so state survives restarts of the reconciler itself.
//!
//! Storage unavailability is fatal — reconciliation cannot proceed without
//! durable state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Flag names used by the reconciler.
pub mod flag {
    /// One-shot: set when the install sequence completed; never cleared.
    pub const INSTALLED: &str = "installed";
    /// Readiness: the authenticator collaborator is currently present.
    pub const AUTHENTICATOR_AVAILABLE: &str = "authenticator-available";
    /// Readiness: the spawner collaborator is currently present.
    pub const SPAWNER_AVAILABLE: &str = "spawner-available";
    /// Edge-triggered: operator config changed and has not been synthesized yet.
    pub const CONFIG_DIRTY: &str = "config-dirty";
}

/// Fact names used by the reconciler.
pub mod fact {
    /// Shared proxy auth token generated at install time.
    pub const PROXY_AUTH_TOKEN: &str = "proxy-auth-token";
    /// Hex sha256 of the config file content at the last restart.
    pub const CONFIG_FILE_SHA256: &str = "config-file-sha256";
    /// The port currently open on the host, recorded at migration time.
    pub const ACTIVE_PORT: &str = "active-port";
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    flags: BTreeMap<String, bool>,
    #[serde(default)]
    facts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

pub struct FlagStore {
    path: PathBuf,
    data: StoreData,
}

impl FlagStore {
    /// Open the store at `path`, loading existing state if present.
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read state store at {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse state store at {}", path.display()))?
        } else {
            StoreData::default()
        };
        Ok(Self { path, data })
    }

    pub fn flag(&self, name: &str) -> bool {
        self.data.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: &str) -> Result<()> {
        self.data.flags.insert(name.to_string(), true);
        self.persist()
    }

    pub fn clear_flag(&mut self, name: &str) -> Result<()> {
        self.data.flags.remove(name);
        self.persist()
    }

    pub fn fact(&self, name: &str) -> Option<&str> {
        self.data.facts.get(name).map(|s| s.as_str())
    }

    pub fn set_fact(&mut self, name: &str, value: &str) -> Result<()> {
        self.data.facts.insert(name.to_string(), value.to_string());
        self.persist()
    }

    pub fn clear_fact(&mut self, name: &str) -> Result<()> {
        self.data.facts.remove(name);
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        self.data.updated_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(&self.data).context("Failed to serialize state")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write state store at {}", self.path.display()))
    }
}
