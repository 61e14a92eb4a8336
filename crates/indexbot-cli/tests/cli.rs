use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::{contains, starts_with};
use tempfile::TempDir;

/// Command bound to a throwaway data dir and a config path that does not exist.
fn indexbot(data_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("indexbot"));
    cmd.env("INDEXBOT_DIR", data_dir.path())
        .env("INDEXBOT_CONFIG", data_dir.path().join("config.toml"))
        .env_remove("INDEXBOT_BOT_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    indexbot(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("IndexBot"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    indexbot(&dir).arg("--version").assert().success();
}

#[test]
fn test_cli_completions() {
    let dir = TempDir::new().unwrap();
    indexbot(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(starts_with("_indexbot"));
}

#[test]
fn test_banned_words_round_trip() {
    let dir = TempDir::new().unwrap();

    indexbot(&dir)
        .args(["banned", "list"])
        .assert()
        .success()
        .stdout(contains("No banned words."));

    indexbot(&dir)
        .args(["banned", "add", "spam", "casino"])
        .assert()
        .success()
        .stdout(contains("Added 2 banned word(s)"));

    indexbot(&dir)
        .args(["banned", "remove", "casino"])
        .assert()
        .success()
        .stdout(contains("Removed 1 banned word(s)"));

    indexbot(&dir)
        .args(["banned", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(contains("\"spam\""))
        .stdout(contains("casino").not());
}

#[test]
fn test_entry_search_on_empty_index() {
    let dir = TempDir::new().unwrap();
    indexbot(&dir)
        .args(["entry", "search", "rust", "--page", "1"])
        .assert()
        .success()
        .stdout(contains("No matching entries."));
}

#[test]
fn test_entry_reindex() {
    let dir = TempDir::new().unwrap();
    indexbot(&dir)
        .args(["entry", "reindex"])
        .assert()
        .success()
        .stdout(contains("Reindexed 0 entries"));
}

#[test]
fn test_run_without_token_fails() {
    let dir = TempDir::new().unwrap();
    indexbot(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(contains("No bot token configured"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[wizard]\ninteraction_ttl_secs = 0\n").unwrap();

    indexbot(&dir)
        .args(["banned", "list"])
        .assert()
        .failure()
        .stderr(contains("interaction_ttl_secs"));
}
