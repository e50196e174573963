//! Integration tests for hubkeeper
//!
//! These drive the binary end-to-end with every path relocated into a temp
//! directory and all external commands replaced by stub scripts that log
//! their invocations.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a hubkeeper Command pointed at a temp deployment.
fn hubkeeper(root: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("hubkeeper");
    cmd.arg("--state-dir")
        .arg(root.join("state"))
        .arg("--runtime-dir")
        .arg(root.join("srv"))
        .arg("--config-dir")
        .arg(root.join("etc"))
        .arg("--settings-file")
        .arg(root.join("settings.json"));
    cmd
}

/// Create a stub script that appends its name and arguments to calls.log,
/// optionally printing fixed stdout.
fn write_stub(root: &Path, name: &str, stdout: Option<&str>) {
    let bin_dir = root.join("bin");
    fs::create_dir_all(&bin_dir).unwrap();
    let log = root.join("calls.log");
    let mut script = format!("#!/bin/sh\necho \"{} $@\" >> {}\n", name, log.display());
    if let Some(stdout) = stdout {
        script.push_str(&format!("echo '{}'\n", stdout));
    }
    let path = bin_dir.join(name);
    fs::write(&path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// Set up a temp deployment: stub commands, relocated unit file, state dirs.
fn create_deployment() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write_stub(root, "install-proxy", None);
    write_stub(root, "gen-secret", Some("generated-cookie-secret"));
    write_stub(root, "gen-token", Some("deadbeefcafebabe"));
    write_stub(root, "restart", None);
    write_stub(root, "open-port", None);
    write_stub(root, "close-port", None);
    write_stub(root, "public-address", Some("10.0.0.5"));

    let bin = root.join("bin");
    let settings = serde_json::json!({
        "unit_file": root.join("jupyterhub.service"),
        "commands": {
            "install_proxy": {"program": bin.join("install-proxy")},
            "generate_secret": {"program": bin.join("gen-secret")},
            "generate_token": {"program": bin.join("gen-token")},
            "restart_service": {"program": bin.join("restart")},
            "open_port": {"program": bin.join("open-port")},
            "close_port": {"program": bin.join("close-port")},
            "public_address": {"program": bin.join("public-address")}
        }
    });
    fs::write(
        root.join("settings.json"),
        serde_json::to_string_pretty(&settings).unwrap(),
    )
    .unwrap();

    dir
}

fn calls(root: &Path) -> Vec<String> {
    fs::read_to_string(root.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(|l| l.trim().to_string())
        .collect()
}

fn set_port(root: &Path, port: u16) {
    fs::create_dir_all(root.join("state")).unwrap();
    fs::write(
        root.join("state/operator.json"),
        format!(r#"{{"port": {}}}"#, port),
    )
    .unwrap();
}

fn write_announcement(root: &Path, name: &str, class: &str) -> std::path::PathBuf {
    let path = root.join(name);
    fs::write(
        &path,
        format!(r#"{{"class": "{}", "config": {{"image": "jupyter/base"}}}}"#, class),
    )
    .unwrap();
    path
}

/// Drive a deployment to full convergence on port 8000.
fn converge(root: &Path) {
    set_port(root, 8000);
    let auth = write_announcement(root, "auth.json", "ldapauthenticator.LDAPAuthenticator");
    let spawn = write_announcement(root, "spawn.json", "dockerspawner.DockerSpawner");

    hubkeeper(root)
        .args(["dispatch", "config-changed"])
        .assert()
        .success();
    hubkeeper(root)
        .args(["dispatch", "authenticator-joined", "--data"])
        .arg(&auth)
        .assert()
        .success();
    hubkeeper(root)
        .args(["dispatch", "spawner-joined", "--data"])
        .arg(&spawn)
        .assert()
        .success();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        cargo_bin_cmd!("hubkeeper").arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        cargo_bin_cmd!("hubkeeper")
            .arg("--version")
            .assert()
            .success();
    }

    #[test]
    fn test_status_before_any_pass() {
        let dir = create_deployment();
        hubkeeper(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No status recorded yet"));
    }

    #[test]
    fn test_joined_without_data_fails() {
        let dir = create_deployment();
        hubkeeper(dir.path())
            .args(["dispatch", "spawner-joined"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--data"));
    }
}

// =============================================================================
// Convergence Scenarios
// =============================================================================

mod scenarios {
    use super::*;

    #[test]
    fn test_initial_boot_installs_once_and_waits() {
        let dir = create_deployment();
        let root = dir.path();

        hubkeeper(root)
            .args(["dispatch", "update"])
            .assert()
            .success()
            .stdout(predicate::str::contains("authenticator"));

        // Install side effects happened
        assert!(root.join("jupyterhub.service").exists());
        let secret = root.join("srv/cookie_secret");
        assert!(secret.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&secret).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        // A duplicate event does not re-run the install
        hubkeeper(root)
            .args(["dispatch", "update"])
            .assert()
            .success();
        let installs = calls(root)
            .iter()
            .filter(|c| c.starts_with("install-proxy"))
            .count();
        assert_eq!(installs, 1);

        // The existing secret is never overwritten
        let content = fs::read_to_string(&secret).unwrap();
        assert_eq!(content.trim(), "generated-cookie-secret");
    }

    #[test]
    fn test_authenticator_joins_waiting_flips_to_spawner() {
        let dir = create_deployment();
        let root = dir.path();
        let auth = write_announcement(root, "auth.json", "ldapauthenticator.LDAPAuthenticator");

        hubkeeper(root)
            .args(["dispatch", "authenticator-joined", "--data"])
            .arg(&auth)
            .assert()
            .success()
            .stdout(predicate::str::contains("spawner"));

        // No config is written while the spawner gate is open
        assert!(!root.join("etc/jupyterhub_config.py").exists());
    }

    #[test]
    fn test_full_convergence_on_port_8000() {
        let dir = create_deployment();
        let root = dir.path();

        converge(root);

        let rendered = fs::read_to_string(root.join("etc/jupyterhub_config.py")).unwrap();
        assert!(rendered.contains("c.JupyterHub.port = 8000"));
        assert!(rendered.contains("ldapauthenticator.LDAPAuthenticator"));
        assert!(rendered.contains("dockerspawner.DockerSpawner"));
        assert!(rendered.contains("c.ConfigurableHTTPProxy.auth_token = 'deadbeefcafebabe'"));

        let restarts = calls(root)
            .iter()
            .filter(|c| c.starts_with("restart"))
            .count();
        assert_eq!(restarts, 1);

        hubkeeper(root)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("active"))
            .stdout(predicate::str::contains("http://10.0.0.5:8000"));
    }

    #[test]
    fn test_port_migration_8000_to_9000() {
        let dir = create_deployment();
        let root = dir.path();

        converge(root);

        set_port(root, 9000);
        hubkeeper(root)
            .args(["dispatch", "config-changed"])
            .assert()
            .success()
            .stdout(predicate::str::contains("9000"));

        let log = calls(root);
        let close_idx = log.iter().position(|c| c == "close-port 8000").unwrap();
        let open_idx = log.iter().position(|c| c == "open-port 9000").unwrap();
        assert!(close_idx < open_idx);

        let rendered = fs::read_to_string(root.join("etc/jupyterhub_config.py")).unwrap();
        assert!(rendered.contains("c.JupyterHub.port = 9000"));

        let restarts = log.iter().filter(|c| c.starts_with("restart")).count();
        assert_eq!(restarts, 2);
    }

    #[test]
    fn test_converged_deployment_is_quiescent() {
        let dir = create_deployment();
        let root = dir.path();

        converge(root);
        let before = calls(root).len();

        hubkeeper(root)
            .args(["dispatch", "update"])
            .assert()
            .success()
            .stdout(predicate::str::contains("nothing to do"));

        // No new restarts or port calls; only passes with changes act
        let after = calls(root);
        assert_eq!(after.len(), before);
    }

    #[test]
    fn test_spawner_departed_reopens_gate() {
        let dir = create_deployment();
        let root = dir.path();

        converge(root);

        hubkeeper(root)
            .args(["dispatch", "spawner-departed"])
            .assert()
            .success()
            .stdout(predicate::str::contains("spawner"));

        // The recorded announcement was cleared
        assert!(!root.join("state/spawner.json").exists());
    }
}
