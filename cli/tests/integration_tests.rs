use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn vaultctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vaultctl"))
        .args(args)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run vaultctl")
}

fn artifact_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("failed to read dest dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn interpolate_writes_numbered_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("sql");
    let out = vaultctl(&[
        "interpolate",
        "--dest",
        dest.to_str().unwrap(),
        "--version-override",
        "v9.9.9",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.is_empty());

    assert_eq!(
        artifact_names(&dest),
        vec!["001_bootstrap.auto.sql", "002_housekeeping.auto.sql"]
    );

    let bootstrap = fs::read_to_string(dest.join("001_bootstrap.auto.sql")).unwrap();
    assert!(bootstrap.starts_with("-- Code generated by `vaultctl` `v9.9.9`. DO NOT EDIT.\n"));
    assert!(!bootstrap.contains("SET search_path"));
    assert!(bootstrap.contains("CREATE EXTENSION IF NOT EXISTS pgcrypto;"));

    let housekeeping = fs::read_to_string(dest.join("002_housekeeping.auto.sql")).unwrap();
    assert!(housekeeping.contains("-- Source: lib/housekeeping.sql (builtin)"));
    assert!(housekeeping.contains("SET search_path TO dcp_lib, public;"));
    assert!(housekeeping.contains("CREATE TABLE IF NOT EXISTS dcp_lib.link_exception_span ("));
}

#[test]
fn interpolate_dry_run_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("sql");
    let out = vaultctl(&["interpolate", "--dest", dest.to_str().unwrap(), "--dry-run"]);
    assert!(out.status.success());
    assert!(!dest.exists());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("mkdir -p"));
    assert!(stderr.contains("001_bootstrap.auto.sql"));
    assert!(stderr.contains("002_housekeeping.auto.sql"));
    assert!(out.stdout.is_empty());
}

/// Directory and artifact paths named in the log lines on stderr.
fn logged_paths(stderr: &[u8]) -> Vec<String> {
    let stderr = String::from_utf8_lossy(stderr);
    let mut paths = Vec::new();
    for line in stderr.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        for (i, token) in tokens.iter().enumerate() {
            if *token == "-p" && i > 0 && tokens[i - 1] == "mkdir" {
                if let Some(dir) = tokens.get(i + 1) {
                    paths.push(dir.to_string());
                }
            }
            if token.ends_with(".auto.sql") {
                paths.push(token.to_string());
            }
        }
    }
    paths
}

#[test]
fn interpolate_dry_run_logs_same_paths_as_real_run() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("sql");
    let dest = dest.to_str().unwrap();

    let dry = vaultctl(&["interpolate", "--dest", dest, "--dry-run", "--tx-id", "t"]);
    assert!(dry.status.success());
    let real = vaultctl(&["interpolate", "--dest", dest, "--verbose", "--tx-id", "t"]);
    assert!(real.status.success());

    let dry_paths = logged_paths(&dry.stderr);
    assert_eq!(dry_paths.len(), 3, "stderr: {}", String::from_utf8_lossy(&dry.stderr));
    assert_eq!(dry_paths, logged_paths(&real.stderr));
    assert_eq!(dry_paths[0], dest);
}

#[test]
fn interpolate_existing_dest_is_not_recreated() {
    let dir = tempfile::tempdir().unwrap();
    let out = vaultctl(&["interpolate", "--dest", dir.path().to_str().unwrap(), "--verbose"]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(!stderr.contains("mkdir -p"));
    assert!(stderr.contains("002_housekeeping.auto.sql"));
}

#[test]
fn interpolate_without_dest_streams_to_stdout() {
    let out = vaultctl(&["interpolate", "--tx-id", "fixed"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.matches("DO NOT EDIT.").count(), 2);
    let bootstrap = stdout.find("-- Source: lib/bootstrap.sql").unwrap();
    let housekeeping = stdout.find("-- Source: lib/housekeeping.sql").unwrap();
    assert!(bootstrap < housekeeping);
}

#[test]
fn interpolate_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("from-config");
    let config = dir.path().join("vaultgen.yml");
    fs::write(
        &config,
        format!("dest_dir: {}\ntool_name: dcpctl\n", dest.display()),
    )
    .unwrap();

    let out = vaultctl(&["interpolate", "--config", config.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let text = fs::read_to_string(dest.join("002_housekeeping.auto.sql")).unwrap();
    assert!(text.starts_with("-- Code generated by `dcpctl`"));
}

#[test]
fn interpolate_rejects_file_as_dest() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    fs::write(&file, "").unwrap();

    let out = vaultctl(&["interpolate", "--dest", file.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error: invalid configuration"));
}

#[test]
fn interpolate_reports_missing_config() {
    let out = vaultctl(&["interpolate", "--config", "/nonexistent/vaultgen.yml"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to load config"));
}

#[test]
fn version_prints_override() {
    let out = vaultctl(&["version", "--version-override", "v1.2.3"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "vaultctl v1.2.3");
}

#[test]
fn modules_lists_emission_order() {
    let out = vaultctl(&["modules"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).lines().collect::<Vec<_>>(),
        vec!["001 lib/bootstrap.sql", "002 lib/housekeeping.sql"]
    );

    let out = vaultctl(&["modules", "--json"]);
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json[1]["output_name"], "002_housekeeping.auto.sql");
    assert_eq!(json[0]["source"], "builtin");
}
