//! Command implementations behind the CLI surface.

use anyhow::{Context, Result, bail};
use console::style;
use std::path::Path;

use hubkeeper::engine::{Event, Reconciler};
use hubkeeper::flags::FlagStore;
use hubkeeper::provider::ProviderRole;
use hubkeeper::settings::Settings;
use hubkeeper::status::{Status, StatusLevel};
use hubkeeper::system::LocalSystem;

/// Record a collaborator announcement (for joined events), clear it (for
/// departed events), then run one reconciliation pass.
pub fn cmd_dispatch(settings: &Settings, event: Event, data: Option<&Path>) -> Result<()> {
    match event {
        Event::AuthenticatorJoined => record_announcement(settings, ProviderRole::Authenticator, data)?,
        Event::SpawnerJoined => record_announcement(settings, ProviderRole::Spawner, data)?,
        Event::AuthenticatorDeparted => clear_announcement(settings, ProviderRole::Authenticator)?,
        Event::SpawnerDeparted => clear_announcement(settings, ProviderRole::Spawner)?,
        Event::ConfigChanged | Event::Update => {}
    }

    let system = LocalSystem::new(settings.status_file());
    let mut store = FlagStore::open(settings.flags_file())?;
    let reconciler = Reconciler::new(settings, &system);

    match reconciler.run_pass(&mut store, event)? {
        Some(status) => print_status(&status),
        None => println!("{}", style("Converged, nothing to do").dim()),
    }
    Ok(())
}

/// Print the last published status.
pub fn cmd_status(settings: &Settings) -> Result<()> {
    let path = settings.status_file();
    if !path.exists() {
        println!("{}", style("No status recorded yet").dim());
        return Ok(());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read status file at {}", path.display()))?;
    let status: Status = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse status file at {}", path.display()))?;
    print_status(&status);
    Ok(())
}

fn record_announcement(
    settings: &Settings,
    role: ProviderRole,
    data: Option<&Path>,
) -> Result<()> {
    let Some(data) = data else {
        bail!("{}-joined requires --data <announcement file>", role);
    };
    let content = std::fs::read_to_string(data)
        .with_context(|| format!("Failed to read announcement at {}", data.display()))?;
    // Validate the shape before recording; a new announcement fully replaces
    // the prior one
    serde_json::from_str::<hubkeeper::provider::ProviderContract>(&content)
        .with_context(|| format!("Malformed announcement at {}", data.display()))?;
    std::fs::write(settings.announcement_file(role), content)
        .with_context(|| format!("Failed to record {} announcement", role))?;
    Ok(())
}

fn clear_announcement(settings: &Settings, role: ProviderRole) -> Result<()> {
    let path = settings.announcement_file(role);
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to clear {} announcement", role))?;
    }
    Ok(())
}

fn print_status(status: &Status) {
    let level = match status.level {
        StatusLevel::Waiting => style("waiting").yellow(),
        StatusLevel::Active => style("active").green(),
        StatusLevel::Error => style("error").red(),
    };
    println!("{}: {}", level, status.message);
}
