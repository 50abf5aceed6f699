#![allow(dead_code)]

use anyhow::{bail, Result};
use assert_cmd::cargo;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn setup_test_listing_cache(cache_root: &Path) {
    let listing_dir = cache_root.join("krxdash").join("listing");
    std::fs::create_dir_all(&listing_dir).expect("failed to create listing cache dir");
    for file in ["listing.csv", "listing.meta.json"] {
        std::fs::copy(
            Path::new("tests/fixtures/listing_cache").join(file),
            listing_dir.join(file),
        )
        .unwrap_or_else(|e| panic!("failed to copy {} fixture: {}", file, e));
    }
}

pub fn cache_root_for_home(home: &TempDir) -> PathBuf {
    home.path().join(".cache")
}

pub fn config_root_for_home(home: &TempDir) -> PathBuf {
    home.path().join(".config")
}

/// Offline command against the fixture listing in an isolated home
pub fn base_cmd(home: &TempDir) -> Command {
    let mut cmd = bare_cmd(home);
    setup_test_listing_cache(&cache_root_for_home(home));
    cmd
}

/// Offline command with an empty cache
pub fn bare_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("krxdash"));
    cmd.env("HOME", home.path());
    cmd.env("XDG_CACHE_HOME", cache_root_for_home(home));
    cmd.env("XDG_CONFIG_HOME", config_root_for_home(home));
    cmd.env("KRXDASH_OFFLINE", "1");
    cmd.env_remove("KRXDASH_LABELS");
    cmd.env_remove("KRXDASH_EXPORT_DIR");
    cmd.arg("--no-color");
    cmd
}

pub fn write_config(home: &TempDir, content: &str) {
    let dir = config_root_for_home(home).join("krxdash");
    std::fs::create_dir_all(&dir).expect("failed to create config dir");
    std::fs::write(dir.join("config.toml"), content).expect("failed to write config");
}

pub fn run_cmd(home: &TempDir, args: &[&str]) -> Result<Output> {
    let mut cmd = base_cmd(home);
    cmd.args(args);
    let output = cmd.output()?;
    if !output.status.success() {
        bail!(
            "command failed: {:?}\nstdout: {}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

pub fn run_cmd_json(home: &TempDir, args: &[&str]) -> Result<Value> {
    let mut full_args = vec!["--json"];
    full_args.extend_from_slice(args);
    let output = run_cmd(home, &full_args)?;
    let stdout = String::from_utf8(output.stdout)?;
    Ok(serde_json::from_str(&stdout)?)
}
