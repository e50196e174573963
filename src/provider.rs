//! Collaborator capability contracts.
//!
//! The authenticator and spawner collaborators each expose a single
//! `config()` accessor returning a class identifier plus an opaque
//! configuration mapping. The mapping is passed through to the renderer
//! without interpretation; malformed values surface downstream in the managed
//! service, not here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Opaque provider configuration. A `BTreeMap` keeps iteration order
/// deterministic, which the renderer's byte-identical-output guarantee
/// depends on.
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

/// A capability announcement: class identifier plus opaque configuration.
/// Immutable per announcement; a new announcement fully replaces the prior one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderContract {
    pub class: String,
    #[serde(default)]
    pub config: ConfigMap,
}

/// The narrow interface every collaborator variant implements.
pub trait CapabilitySource {
    fn config(&self) -> Result<ProviderContract>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    Authenticator,
    Spawner,
}

impl ProviderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderRole::Authenticator => "authenticator",
            ProviderRole::Spawner => "spawner",
        }
    }
}

impl std::fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collaborator announcement recorded as a JSON file
/// (`{"class": "...", "config": {...}}`) under the state directory.
pub struct AnnouncementFile {
    path: PathBuf,
}

impl AnnouncementFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl CapabilitySource for AnnouncementFile {
    fn config(&self) -> Result<ProviderContract> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read announcement at {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse announcement at {}", self.path.display()))
    }
}
