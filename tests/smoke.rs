//! Smoke tests -- verify the binary runs and key subcommands work.

use assert_cmd::Command;
use predicates::prelude::*;

fn netverdict() -> Command {
    let mut cmd = Command::cargo_bin("netverdict").unwrap();
    cmd.env_remove("NETVERDICT_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// Config pointing the database into `dir`.
fn config_in(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let db = dir.path().join("detections.db");
    let path = dir.path().join("netverdict.toml");
    std::fs::write(
        &path,
        format!("[storage]\ndb_path = {:?}\n\n[logging]\nlevel = \"warn\"\n", db.to_str().unwrap()),
    )
    .unwrap();
    path
}

#[test]
fn test_cli_help() {
    netverdict()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("normal or anomalous"));
}

#[test]
fn test_cli_version() {
    netverdict()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netverdict"));
}

#[test]
fn test_serve_subcommand_exists() {
    netverdict().args(["serve", "--help"]).assert().success();
}

#[test]
fn test_predict_json() {
    netverdict()
        .args([
            "predict",
            "--no-save",
            "--json",
            "-f",
            "protocol_type=tcp",
            "-f",
            "service=http",
            "-f",
            "flag=SF",
            "-f",
            "src_bytes=491",
            "-f",
            "logged_in=1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"prediction\": \"normal\""))
        .stdout(predicate::str::contains("\"persisted\": false"));
}

#[test]
fn test_predict_rejects_unknown_protocol() {
    netverdict()
        .args([
            "predict",
            "--no-save",
            "-f",
            "protocol_type=xyz",
            "-f",
            "service=http",
            "-f",
            "flag=SF",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid protocol_type: xyz"));
}

#[test]
fn test_predict_malformed_field_argument() {
    netverdict()
        .args(["predict", "-f", "protocol_type"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected name=value"));
}

#[test]
fn test_schema_lists_features() {
    netverdict()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("dst_host_serror_rate"))
        .stdout(predicate::str::contains("icmp, tcp, udp"));
}

#[test]
fn test_predict_then_history() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = config_in(&dir);

    netverdict()
        .arg("--config")
        .arg(&config)
        .args([
            "predict",
            "--user",
            "analyst",
            "-f",
            "protocol_type=udp",
            "-f",
            "service=domain_u",
            "-f",
            "flag=SF",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved as:"));

    netverdict()
        .arg("--config")
        .arg(&config)
        .args(["history", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user_id\": \"analyst\""));
}

#[test]
fn test_missing_config_file_fails() {
    netverdict()
        .args(["--config", "/nonexistent/netverdict.toml", "schema"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn test_unusable_env_config_fails() {
    netverdict()
        .env("NETVERDICT_CONFIG", "/nonexistent/x.toml")
        .args(["schema", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NETVERDICT_CONFIG is set but unusable"));
}

#[test]
fn test_malformed_local_config_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("netverdict.toml"), "[storage]\ndb_path = 5\n").unwrap();

    netverdict()
        .current_dir(dir.path())
        .arg("history")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
    assert!(!dir.path().join("data").exists());
}

#[test]
fn test_stats_counts_by_user() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = config_in(&dir);

    for user in ["alice", "alice", "bob"] {
        netverdict()
            .arg("--config")
            .arg(&config)
            .args([
                "predict",
                "--user",
                user,
                "-f",
                "protocol_type=tcp",
                "-f",
                "service=http",
                "-f",
                "flag=SF",
            ])
            .assert()
            .success();
    }

    netverdict()
        .arg("--config")
        .arg(&config)
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 3"))
        .stdout(predicate::str::contains("\"user_id\": \"alice\""));

    netverdict()
        .arg("--config")
        .arg(&config)
        .args(["stats", "--user", "bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1"));
}
