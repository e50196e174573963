//! Host side-effect seam.
//!
//! Every external effect — subprocess invocation and status publication —
//! goes through the `System` trait so the install and reconcile logic can be
//! exercised against a recording double. The real implementation shells out
//! synchronously: a pass blocks until each command completes or fails.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::process::Stdio;

use crate::settings::CommandSpec;
use crate::status::Status;

pub trait System {
    /// Run a command to completion; non-zero exit is an error.
    fn run(&self, cmd: &CommandSpec) -> Result<()>;

    /// Run a command and return its stdout; non-zero exit is an error.
    fn run_capture(&self, cmd: &CommandSpec) -> Result<String>;

    /// Run a command with stdout streamed directly into `out`.
    fn run_to_file(&self, cmd: &CommandSpec, out: std::fs::File) -> Result<()>;

    /// Surface a status to the operator-facing channel.
    fn publish_status(&self, status: &Status) -> Result<()>;
}

/// Real host: synchronous subprocesses, status persisted as a JSON document.
pub struct LocalSystem {
    status_file: PathBuf,
}

impl LocalSystem {
    pub fn new(status_file: PathBuf) -> Self {
        Self { status_file }
    }

    fn spawn_checked(&self, cmd: &CommandSpec, stdout: Stdio) -> Result<std::process::Output> {
        tracing::debug!(command = %cmd.display(), "running external command");
        let output = std::process::Command::new(&cmd.program)
            .args(&cmd.args)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to spawn {}", cmd.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            if stderr.trim().is_empty() {
                bail!("{} failed with exit code {}", cmd.display(), code);
            }
            bail!(
                "{} failed with exit code {}: {}",
                cmd.display(),
                code,
                stderr.trim()
            );
        }
        Ok(output)
    }
}

impl System for LocalSystem {
    fn run(&self, cmd: &CommandSpec) -> Result<()> {
        self.spawn_checked(cmd, Stdio::null())?;
        Ok(())
    }

    fn run_capture(&self, cmd: &CommandSpec) -> Result<String> {
        let output = self.spawn_checked(cmd, Stdio::piped())?;
        String::from_utf8(output.stdout)
            .with_context(|| format!("{} produced non-UTF-8 output", cmd.display()))
    }

    fn run_to_file(&self, cmd: &CommandSpec, out: std::fs::File) -> Result<()> {
        self.spawn_checked(cmd, Stdio::from(out))?;
        Ok(())
    }

    fn publish_status(&self, status: &Status) -> Result<()> {
        tracing::info!(level = status.level.as_str(), message = %status.message, "status");
        let json = serde_json::to_string_pretty(status).context("Failed to serialize status")?;
        std::fs::write(&self.status_file, json).with_context(|| {
            format!(
                "Failed to write status file at {}",
                self.status_file.display()
            )
        })
    }
}
