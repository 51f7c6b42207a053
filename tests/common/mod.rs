#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const EDGE_OK: &str = r#"points="${1%.*}_horizon_points.txt"
printf '10 20\n30 40\n' > "$points"
echo "loading image $1"
echo "{\"success\": true, \"edge_points_count\": 10, \"edge_points_file\": \"$points\", \"width\": 4032, \"height\": 3024}""#;

pub const DISTANCE_OK: &str = "echo 'Distance from Earth: 4.2e+03 m'";

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub bin: PathBuf,
    pub image: PathBuf,
    pub staging: PathBuf,
    cargo_home: PathBuf,
    rustup_home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let bin = tmp.path().join("bin");
        let staging = tmp.path().join("staging");
        fs::create_dir_all(&home).expect("create isolated home");
        fs::create_dir_all(&bin).expect("create bin dir");

        let image = tmp.path().join("horizon.png");
        image::RgbImage::new(64, 48)
            .save(&image)
            .expect("write fixture image");

        let orig_home = std::env::var("HOME").unwrap_or_default();
        let cargo_home = PathBuf::from(&orig_home).join(".cargo");
        let rustup_home = PathBuf::from(&orig_home).join(".rustup");

        let env = Self {
            _tmp: tmp,
            home,
            bin,
            image,
            staging,
            cargo_home,
            rustup_home,
        };
        env.edge(EDGE_OK);
        env.distance(DISTANCE_OK);
        env.write_config("");
        env
    }

    pub fn edge(&self, body: &str) {
        write_script(&self.bin.join("edge.sh"), body);
    }

    pub fn distance(&self, body: &str) {
        write_script(&self.bin.join("found.sh"), body);
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.bin.join(name);
        write_script(&path, body);
        path
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(".config/horizon/config.toml")
    }

    /// Writes the default config pointing at the fixture scripts. `extra` is
    /// appended inside the trailing `[pipeline]` table.
    pub fn write_config(&self, extra: &str) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().expect("config dir")).expect("create config dir");
        let body = format!(
            r#"[edge]
command = "{bin}/edge.sh"
args = []
timeout_ms = 5000

[distance]
binary = "{bin}/found.sh"
timeout_ms = 5000

[pipeline]
staging_dir = "{staging}"
{extra}
"#,
            staging = self.staging.display(),
            bin = self.bin.display(),
        );
        fs::write(path, body).expect("write config");
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("horizon");
        cmd.env("HOME", &self.home)
            .env("CARGO_HOME", &self.cargo_home)
            .env("RUSTUP_HOME", &self.rustup_home)
            .env_remove("HORIZON_LOG");
        cmd
    }

    pub fn image_arg(&self) -> &str {
        self.image.to_str().expect("image path utf8")
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn run_json_failure(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json error envelope")
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}
