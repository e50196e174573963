//! One-shot install sequence.
//!
//! Provisions the runtime prerequisites and the cookie secret, in order:
//! proxy helper, service unit, runtime directory, secret file
//! (exclusive-create, owner-only), secret generation, proxy auth token.
//! Each step must succeed before the next runs. The `installed` flag is set
//! only after the whole sequence completes, so a partial failure retries from
//! the top on the next event.
//!
//! Retry policy for the secret: if the file already exists from an earlier
//! partial run, the existing secret is kept and generation is skipped.
//! Regenerating a live secret would invalidate running sessions.

use std::fs::OpenOptions;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use crate::errors::InstallError;
use crate::flags::{FlagStore, fact, flag};
use crate::settings::Settings;
use crate::system::System;

/// Process-supervisor unit for the managed service. Static content; written
/// once at install time.
pub const SERVICE_UNIT: &str = "\
[Unit]
Description=JupyterHub
After=network-online.target

[Service]
Type=simple
ExecStart=/usr/local/bin/jupyterhub -f /etc/jupyterhub/jupyterhub_config.py
WorkingDirectory=/srv/jupyterhub
Restart=on-failure

[Install]
WantedBy=multi-user.target
";

pub struct Installer<'a> {
    settings: &'a Settings,
    system: &'a dyn System,
}

impl<'a> Installer<'a> {
    pub fn new(settings: &'a Settings, system: &'a dyn System) -> Self {
        Self { settings, system }
    }

    /// Run the install sequence. A no-op if the `installed` flag is already
    /// set.
    pub fn run(&self, store: &mut FlagStore) -> Result<(), InstallError> {
        if store.flag(flag::INSTALLED) {
            return Ok(());
        }

        self.system
            .run(&self.settings.commands.install_proxy)
            .map_err(InstallError::ProxyInstallFailed)?;

        std::fs::write(&self.settings.unit_file, SERVICE_UNIT).map_err(|source| {
            InstallError::UnitWriteFailed {
                path: self.settings.unit_file.clone(),
                source,
            }
        })?;

        self.ensure_runtime_dir()?;
        self.ensure_secret()?;

        let token = self
            .system
            .run_capture(&self.settings.commands.generate_token)
            .map_err(InstallError::TokenGenerationFailed)?;
        store.set_fact(fact::PROXY_AUTH_TOKEN, token.trim())?;

        store.set_flag(flag::INSTALLED)?;
        tracing::info!("install sequence completed");
        Ok(())
    }

    fn ensure_runtime_dir(&self) -> Result<(), InstallError> {
        let dir = &self.settings.runtime_dir;
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|source| InstallError::RuntimeDirFailed {
                path: dir.clone(),
                source,
            })?;
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755)).map_err(
                |source| InstallError::RuntimeDirFailed {
                    path: dir.clone(),
                    source,
                },
            )?;
        }
        Ok(())
    }

    /// Exclusive-create the secret file with owner-only permissions and
    /// stream the generator's output into it. An already-existing file is
    /// kept as-is.
    fn ensure_secret(&self) -> Result<(), InstallError> {
        let path = self.settings.secret_file();
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)
        {
            Ok(file) => self
                .system
                .run_to_file(&self.settings.commands.generate_secret, file)
                .map_err(InstallError::SecretGenerationFailed),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::warn!(path = %path.display(), "cookie secret already present, keeping it");
                Ok(())
            }
            Err(source) => Err(InstallError::SecretCreateFailed { path, source }),
        }
    }
}
