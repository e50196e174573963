//! Resolved filesystem layout and external command lines.
//!
//! Defaults match the standard deployment (`/srv/jupyterhub`,
//! `/etc/jupyterhub`, systemd). Every path and command can be overridden,
//! either via CLI flags or via an optional JSON settings file, so tests and
//! packaging can relocate the whole tree.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::provider::ProviderRole;

/// An external command as `program` plus fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Return a copy with one extra trailing argument (used to append a port
    /// number to the open/close commands).
    pub fn with_arg(&self, arg: impl Into<String>) -> Self {
        let mut cmd = self.clone();
        cmd.args.push(arg.into());
        cmd
    }

    /// One-line rendering for logs and test assertions.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// The full set of external commands the reconciler invokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Commands {
    /// Installs the reverse-proxy helper binary.
    pub install_proxy: CommandSpec,
    /// Writes a high-entropy secret to stdout; streamed into the secret file.
    pub generate_secret: CommandSpec,
    /// Writes the shared proxy auth token to stdout.
    pub generate_token: CommandSpec,
    /// Restarts the managed service process.
    pub restart_service: CommandSpec,
    /// Opens a port on the host firewall; the port number is appended.
    pub open_port: CommandSpec,
    /// Closes a port on the host firewall; the port number is appended.
    pub close_port: CommandSpec,
    /// Prints the host's public address on stdout.
    pub public_address: CommandSpec,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            install_proxy: CommandSpec::new("npm", &["install", "-g", "configurable-http-proxy"]),
            generate_secret: CommandSpec::new("openssl", &["rand", "-base64", "2048"]),
            generate_token: CommandSpec::new("openssl", &["rand", "-hex", "32"]),
            restart_service: CommandSpec::new("systemctl", &["restart", "jupyterhub"]),
            open_port: CommandSpec::new("ufw", &["allow"]),
            close_port: CommandSpec::new("ufw", &["delete", "allow"]),
            public_address: CommandSpec::new("hostname", &["-I"]),
        }
    }
}

/// Optional overrides loaded from a JSON settings file.
#[derive(Debug, Default, Deserialize)]
struct SettingsOverlay {
    commands: Option<Commands>,
    unit_file: Option<PathBuf>,
}

/// Resolved runtime settings for one reconciler instance.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Durable reconciler state: flag store, announcements, status document.
    pub state_dir: PathBuf,
    /// The managed service's runtime directory (holds the cookie secret).
    pub runtime_dir: PathBuf,
    /// Directory holding the rendered configuration file.
    pub config_dir: PathBuf,
    /// Path of the process-supervisor unit definition written at install.
    pub unit_file: PathBuf,
    /// Operator-owned configuration file (at least `{"port": ...}`).
    pub operator_config: PathBuf,
    pub commands: Commands,
}

impl Settings {
    pub fn new(
        state_dir: Option<PathBuf>,
        runtime_dir: Option<PathBuf>,
        config_dir: Option<PathBuf>,
        operator_config: Option<PathBuf>,
        settings_file: Option<&Path>,
    ) -> Result<Self> {
        let overlay = match settings_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings file {}", path.display()))?;
                serde_json::from_str::<SettingsOverlay>(&content)
                    .with_context(|| format!("Failed to parse settings file {}", path.display()))?
            }
            None => SettingsOverlay::default(),
        };

        let state_dir = state_dir.unwrap_or_else(|| PathBuf::from("/var/lib/hubkeeper"));
        let operator_config = operator_config.unwrap_or_else(|| state_dir.join("operator.json"));

        Ok(Self {
            state_dir,
            runtime_dir: runtime_dir.unwrap_or_else(|| PathBuf::from("/srv/jupyterhub")),
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from("/etc/jupyterhub")),
            unit_file: overlay
                .unit_file
                .unwrap_or_else(|| PathBuf::from("/etc/systemd/system/jupyterhub.service")),
            operator_config,
            commands: overlay.commands.unwrap_or_default(),
        })
    }

    /// The rendered configuration document's fixed path.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("jupyterhub_config.py")
    }

    /// The cookie secret's fixed path inside the runtime directory.
    pub fn secret_file(&self) -> PathBuf {
        self.runtime_dir.join("cookie_secret")
    }

    pub fn flags_file(&self) -> PathBuf {
        self.state_dir.join("state.json")
    }

    pub fn status_file(&self) -> PathBuf {
        self.state_dir.join("status.json")
    }

    /// Where a collaborator's latest announcement is recorded.
    pub fn announcement_file(&self, role: ProviderRole) -> PathBuf {
        self.state_dir.join(format!("{}.json", role.as_str()))
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).context("Failed to create state directory")?;
        std::fs::create_dir_all(&self.config_dir).context("Failed to create config directory")?;
        Ok(())
    }
}
