//! Setup-error behaviour of the `cloudsaver` binary.
//!
//! None of these reach the network: each run stops at a setup check before
//! the Drive client makes its first request.

use assert_cmd::Command;
use tempfile::TempDir;

/// A command isolated from the caller's environment and config file.
fn cloudsaver(scratch: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cloudsaver").unwrap();
    cmd.env("CLOUDSAVER_CONFIG", scratch.path().join("absent.json"))
        .env_remove("CLOUDSAVER_LOCAL_FOLDER")
        .env_remove("CLOUDSAVER_FOLDER_ID")
        .env_remove("CLOUDSAVER_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn stderr_json(output: &std::process::Output) -> serde_json::Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON error in stderr: {stderr}"));
    serde_json::from_str(line).unwrap()
}

#[test]
fn test_version_json() {
    let scratch = TempDir::new().unwrap();
    let output = cloudsaver(&scratch).args(["version", "--json"]).output().unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(parsed["mtime_tolerance_ms"], 1);
}

#[test]
fn test_missing_local_folder_exits_not_found() {
    let scratch = TempDir::new().unwrap();
    let missing = scratch.path().join("nope");

    let output = cloudsaver(&scratch)
        .args(["pull", "--folder-id", "abc", "--token", "t"])
        .arg("--local-folder")
        .arg(&missing)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stderr_json(&output)["error"]["code"], "LOCAL_ROOT_NOT_FOUND");
}

#[test]
fn test_missing_token_exits_config() {
    let scratch = TempDir::new().unwrap();

    let output = cloudsaver(&scratch)
        .args(["push", "--folder-id", "abc"])
        .arg("--local-folder")
        .arg(scratch.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(7));
    let error = &stderr_json(&output)["error"];
    assert_eq!(error["code"], "MISSING_CREDENTIALS");
    assert!(error["hint"].as_str().unwrap().contains("CLOUDSAVER_TOKEN"));
}

#[test]
fn test_missing_folder_id_exits_validation() {
    let scratch = TempDir::new().unwrap();

    let output = cloudsaver(&scratch)
        .args(["check", "--token", "t"])
        .arg("--local-folder")
        .arg(scratch.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert_eq!(stderr_json(&output)["error"]["code"], "INVALID_ARGUMENT");
}

#[test]
fn test_local_folder_checked_before_credentials() {
    let scratch = TempDir::new().unwrap();

    let output = cloudsaver(&scratch)
        .args(["sync", "--folder-id", "abc", "--local-folder", "/definitely/not/here"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_config_file_supplies_settings() {
    let scratch = TempDir::new().unwrap();
    let config = scratch.path().join("config.json");
    std::fs::write(
        &config,
        serde_json::json!({
            "localFolder": scratch.path().join("missing"),
            "folderId": "abc",
            "accessToken": "t",
        })
        .to_string(),
    )
    .unwrap();

    let output = cloudsaver(&scratch)
        .env("CLOUDSAVER_CONFIG", &config)
        .arg("pull")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
}
