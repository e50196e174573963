//! Trigger evaluator and convergence controller.
//!
//! One external event triggers one reconciliation pass. A pass walks a fixed,
//! ordered rule list over the flag store:
//!
//! 1. install (one-shot, guarded by the `installed` flag)
//! 2. dirty marking (the event's own postcondition, applied up front)
//! 3. port migration (independent of the other rules)
//! 4. readiness gates (waiting statuses, most specific wins)
//! 5. synthesize-and-write (gated on readiness and the dirty flag)
//! 6. restart-on-file-change (keyed on content hash, not on who wrote)
//!
//! Any fatal error aborts the pass with no success flag committed; the next
//! event re-evaluates from scratch.

use sha2::{Digest, Sha256};

use crate::errors::ReconcileError;
use crate::flags::{FlagStore, fact, flag};
use crate::install::Installer;
use crate::operator::OperatorConfig;
use crate::provider::{AnnouncementFile, CapabilitySource, ProviderContract, ProviderRole};
use crate::render::{RenderContext, render_config};
use crate::settings::Settings;
use crate::status::Status;
use crate::system::System;

/// External events delivered by the host dispatcher, one pass each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Operator configuration changed.
    ConfigChanged,
    /// The authenticator collaborator announced its capability.
    AuthenticatorJoined,
    /// The authenticator collaborator went away.
    AuthenticatorDeparted,
    /// The spawner collaborator announced its capability.
    SpawnerJoined,
    /// The spawner collaborator went away.
    SpawnerDeparted,
    /// Plain re-evaluation (covers file-change polling).
    Update,
}

pub struct Reconciler<'a> {
    settings: &'a Settings,
    system: &'a dyn System,
}

impl<'a> Reconciler<'a> {
    pub fn new(settings: &'a Settings, system: &'a dyn System) -> Self {
        Self { settings, system }
    }

    /// Run one reconciliation pass. Returns the newly published status, if
    /// any rule produced one; otherwise the previously published status
    /// stands.
    pub fn run_pass(
        &self,
        store: &mut FlagStore,
        event: Event,
    ) -> Result<Option<Status>, ReconcileError> {
        tracing::debug!(?event, "reconciliation pass");
        self.apply_event(store, event)?;

        if !store.flag(flag::INSTALLED) {
            Installer::new(self.settings, self.system).run(store)?;
        }

        let operator = OperatorConfig::load(&self.settings.operator_config)
            .map_err(ReconcileError::Other)?;

        self.migrate_port(store, operator.port)?;

        let waiting = self.readiness_gap(store);

        if waiting.is_none() && store.flag(flag::CONFIG_DIRTY) {
            self.synthesize(store, &operator)?;
        }

        let active = self.converge_on_file_change(store, &operator)?;

        let status = active.or(waiting);
        if let Some(ref status) = status {
            self.system
                .publish_status(status)
                .map_err(ReconcileError::Other)?;
        }
        Ok(status)
    }

    /// The event's own postcondition: dirty marking and readiness flags.
    /// The triggering signal is ephemeral, so the fact must be recorded
    /// before the gates are evaluated.
    fn apply_event(&self, store: &mut FlagStore, event: Event) -> Result<(), ReconcileError> {
        match event {
            Event::ConfigChanged => store.set_flag(flag::CONFIG_DIRTY)?,
            Event::AuthenticatorJoined => store.set_flag(flag::AUTHENTICATOR_AVAILABLE)?,
            Event::AuthenticatorDeparted => store.clear_flag(flag::AUTHENTICATOR_AVAILABLE)?,
            Event::SpawnerJoined => store.set_flag(flag::SPAWNER_AVAILABLE)?,
            Event::SpawnerDeparted => store.clear_flag(flag::SPAWNER_AVAILABLE)?,
            Event::Update => {}
        }
        Ok(())
    }

    /// Close the previously open port (if any) and open the new one whenever
    /// the operator's port differs from the last one applied.
    fn migrate_port(&self, store: &mut FlagStore, port: u16) -> Result<(), ReconcileError> {
        let previous = store
            .fact(fact::ACTIVE_PORT)
            .and_then(|s| s.parse::<u16>().ok());
        if previous == Some(port) {
            return Ok(());
        }

        if let Some(previous) = previous {
            tracing::info!(from = previous, to = port, "migrating port");
            self.system
                .run(&self.settings.commands.close_port.with_arg(previous.to_string()))
                .map_err(|source| ReconcileError::PortCloseFailed {
                    port: previous,
                    source,
                })?;
        }
        self.system
            .run(&self.settings.commands.open_port.with_arg(port.to_string()))
            .map_err(|source| ReconcileError::PortOpenFailed { port, source })?;
        store.set_fact(fact::ACTIVE_PORT, &port.to_string())?;
        Ok(())
    }

    /// Rules 2–3: the most specific unmet readiness gate, as a waiting
    /// status. The two waiting messages never show simultaneously.
    fn readiness_gap(&self, store: &FlagStore) -> Option<Status> {
        if !store.flag(flag::AUTHENTICATOR_AVAILABLE) {
            Some(Status::waiting("Waiting for a JupyterHub authenticator"))
        } else if !store.flag(flag::SPAWNER_AVAILABLE) {
            Some(Status::waiting("Waiting for a JupyterHub spawner"))
        } else {
            None
        }
    }

    /// Rule 5: assemble the context from the collaborators' `config()`
    /// accessors, render, and write. Clearing the dirty flag is the
    /// postcondition; the write itself is what rule 6 observes.
    fn synthesize(
        &self,
        store: &mut FlagStore,
        operator: &OperatorConfig,
    ) -> Result<(), ReconcileError> {
        let authenticator = self.contract(ProviderRole::Authenticator)?;
        let spawner = self.contract(ProviderRole::Spawner)?;
        let token = store
            .fact(fact::PROXY_AUTH_TOKEN)
            .ok_or_else(|| anyhow::anyhow!("proxy auth token missing from state store"))?
            .to_string();

        let rendered = render_config(&RenderContext {
            port: operator.port,
            proxy_auth_token: &token,
            authenticator: Some(&authenticator),
            spawner: &spawner,
        });

        let path = self.settings.config_file();
        std::fs::write(&path, rendered)
            .map_err(|source| ReconcileError::ConfigWriteFailed { path, source })?;
        store.clear_flag(flag::CONFIG_DIRTY)?;
        tracing::info!("configuration synthesized");
        Ok(())
    }

    fn contract(&self, role: ProviderRole) -> Result<ProviderContract, ReconcileError> {
        AnnouncementFile::new(self.settings.announcement_file(role))
            .config()
            .map_err(|source| ReconcileError::AnnouncementUnreadable {
                role: role.as_str().to_string(),
                source,
            })
    }

    /// Rule 6: restart the managed service when the on-disk config content
    /// differs from the last observed hash. Keyed on content, so a manual
    /// edit bypassing rule 5 also triggers; an identical rewrite does not.
    fn converge_on_file_change(
        &self,
        store: &mut FlagStore,
        operator: &OperatorConfig,
    ) -> Result<Option<Status>, ReconcileError> {
        let path = self.settings.config_file();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read(&path)
            .map_err(|source| ReconcileError::ConfigWriteFailed { path, source })?;
        let digest = hex::encode(Sha256::digest(&content));
        if store.fact(fact::CONFIG_FILE_SHA256) == Some(digest.as_str()) {
            return Ok(None);
        }

        tracing::info!("config file changed, restarting the managed service");
        self.system
            .run(&self.settings.commands.restart_service)
            .map_err(ReconcileError::RestartFailed)?;
        store.set_fact(fact::CONFIG_FILE_SHA256, &digest)?;

        let address = self.public_address()?;
        Ok(Some(Status::active(format!(
            "Ready: http://{}:{}",
            address, operator.port
        ))))
    }

    fn public_address(&self) -> Result<String, ReconcileError> {
        let output = self
            .system
            .run_capture(&self.settings.commands.public_address)
            .map_err(ReconcileError::Other)?;
        Ok(output
            .split_whitespace()
            .next()
            .unwrap_or("localhost")
            .to_string())
    }
}
