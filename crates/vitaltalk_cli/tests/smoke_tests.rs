//! CLI smoke tests — verify basic binary behavior.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vitaltalk"));
    cmd.env("LLM_PROVIDER", "mock")
        .env("VITALTALK_STORE", "memory")
        .env_remove("VITALTALK_CONFIG")
        .arg("--config")
        .arg("/tmp/nonexistent_vitaltalk_config_12345.toml");
    cmd
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("chat"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("vitaltalk"), "Expected binary name in --version output");
}

#[test]
fn test_missing_subcommand_fails() {
    let output = cli_bin().output().expect("failed to run");
    assert!(!output.status.success());
}

#[test]
fn test_chat_session_with_mock_provider() {
    let mut child = cli_bin()
        .arg("chat")
        .arg("--scenario")
        .arg("2")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"I'm very sorry for what happened.\n/quit\n")
        .expect("write stdin");

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sudden Cardiac Arrest"));
    assert!(stdout.contains("Doctor... thank you for taking the time"));
}
