//! Typed error hierarchy for the hubkeeper reconciler.
//!
//! Two top-level enums cover the two subsystems:
//! - `InstallError` — failures in the one-shot install sequence
//! - `ReconcileError` — failures in a reconciliation pass
//!
//! Every variant is fatal for the current pass: no flag recording success is
//! set, so the next qualifying event retries from scratch.

use thiserror::Error;

/// Errors from the one-shot install sequence.
///
/// A failed step leaves the `installed` flag unset; the whole sequence is
/// re-attempted on the next event.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to install the reverse-proxy helper: {0}")]
    ProxyInstallFailed(#[source] anyhow::Error),

    #[error("Failed to write service unit at {path}: {source}")]
    UnitWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create runtime directory at {path}: {source}")]
    RuntimeDirFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create secret file at {path}: {source}")]
    SecretCreateFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret generation command failed: {0}")]
    SecretGenerationFailed(#[source] anyhow::Error),

    #[error("Proxy auth token generation failed: {0}")]
    TokenGenerationFailed(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from a single reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("Failed to read provider announcement for {role}: {source}")]
    AnnouncementUnreadable {
        role: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    ConfigWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to restart the managed service: {0}")]
    RestartFailed(#[source] anyhow::Error),

    #[error("Failed to close port {port}: {source}")]
    PortCloseFailed {
        port: u16,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to open port {port}: {source}")]
    PortOpenFailed {
        port: u16,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
