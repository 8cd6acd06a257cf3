//! CLI 端到端测试

use assert_cmd::Command;
use predicates::prelude::*;

fn soarm() -> Command {
    let mut cmd = Command::cargo_bin("soarm-cli").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    soarm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("teleop"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("ports"));
}

#[test]
fn test_teleop_help_lists_options() {
    soarm()
        .args(["teleop", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--grace-ms"));
}

#[test]
fn test_config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    soarm()
        .args(["--config", path, "config", "set", "--port", "/dev/ttyACM0", "--step", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("port = /dev/ttyACM0"));

    soarm()
        .args(["--config", path, "config", "get", "port"])
        .assert()
        .success()
        .stdout("/dev/ttyACM0\n");

    soarm()
        .args(["--config", path, "config", "get", "step"])
        .assert()
        .success()
        .stdout("4\n");

    soarm()
        .args(["--config", path, "config", "get"])
        .assert()
        .success()
        .stdout(predicate::str::contains("grace_ms"))
        .stdout(predicate::str::contains("1000"));
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    soarm()
        .args(["--config", path.to_str().unwrap(), "config", "get", "colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_config_set_rejects_invalid_step() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    soarm()
        .args(["--config", path.to_str().unwrap(), "config", "set", "--step", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("step must be a positive number"));
    assert!(!path.exists());
}

#[test]
fn test_config_check_reports_missing_port() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"/nonexistent/ttyACM7\"\n").unwrap();

    soarm()
        .args(["--config", path.to_str().unwrap(), "config", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("serial port does not exist"));
}

#[test]
fn test_teleop_without_port_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    soarm()
        .args(["--config", path.to_str().unwrap(), "teleop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No serial port configured"));
}
