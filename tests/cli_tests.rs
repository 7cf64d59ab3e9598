use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn frontpage_cmd() -> Command {
    let mut cmd = Command::cargo_bin("frontpage").unwrap();
    cmd.env_remove("FRONTPAGE_CONFIG")
        .env_remove("FRONTPAGE_CACHE_PATH")
        .env_remove("FRONTPAGE_LOG");
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("frontpage.toml");
    fs::write(&path, content).unwrap();
    path
}

const SOURCES: &str = r#"
limit = 5

[sources.news]
type = "rss"
feed_url = "https://example.com/feed.xml"
title = "Project news"

[sources.releases]
type = "git"
repositories = "/nonexistent/frontpage-test.git"
max_age = 86400
"#;

#[test]
fn test_help_lists_subcommands() {
    frontpage_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("poll"))
        .stdout(predicate::str::contains("sources"))
        .stdout(predicate::str::contains("clear-cache"));
}

#[test]
fn test_poll_help_shows_flags() {
    frontpage_cmd()
        .args(["poll", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--merged"));
}

#[test]
fn test_sources_lists_configuration() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, SOURCES);

    frontpage_cmd()
        .arg("--config")
        .arg(&config)
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("news [feed]"))
        .stdout(predicate::str::contains("Title: Project news"))
        .stdout(predicate::str::contains("Feed: https://example.com/feed.xml"))
        .stdout(predicate::str::contains(
            "Repository: /nonexistent/frontpage-test.git (frontpage-test)",
        ))
        .stdout(predicate::str::contains("releases [git]"))
        .stdout(predicate::str::contains("Cache key: git:/nonexistent/frontpage-test.git"))
        .stdout(predicate::str::contains("Max age: 86400s"));
}

#[test]
fn test_config_from_environment() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, SOURCES);

    frontpage_cmd()
        .env("FRONTPAGE_CONFIG", &config)
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("releases [git]"));
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();

    frontpage_cmd()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("sources")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_unknown_source_type_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[sources.odd]\ntype = \"mailing-list\"\n");

    frontpage_cmd()
        .arg("--config")
        .arg(&config)
        .arg("sources")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source type"));
}

#[test]
fn test_unreachable_repository_polls_empty() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "[sources.releases]\ntype = \"git\"\nrepositories = \"/nonexistent/frontpage-test.git\"\n",
    );

    frontpage_cmd()
        .arg("--config")
        .arg(&config)
        .arg("poll")
        .assert()
        .success()
        .stdout(predicate::str::contains("No updates."));
}

#[test]
fn test_poll_json_report() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "[sources.releases]\ntype = \"git\"\nrepositories = \"/nonexistent/frontpage-test.git\"\n",
    );

    frontpage_cmd()
        .arg("--config")
        .arg(&config)
        .args(["poll", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"releases\""))
        .stdout(predicate::str::contains("\"updates\": []"));
}

#[test]
fn test_poll_unknown_source_name_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, SOURCES);

    frontpage_cmd()
        .arg("--config")
        .arg(&config)
        .args(["poll", "--source", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no source named missing"));
}

#[test]
fn test_clear_cache_with_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, SOURCES);
    let cache_path = dir.path().join("cache.db");

    frontpage_cmd()
        .arg("--config")
        .arg(&config)
        .env("FRONTPAGE_CACHE_PATH", &cache_path)
        .arg("clear-cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared."));

    assert!(cache_path.exists());
}
