use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

fn run_help(home: &TempDir, args: &[&str]) {
    let mut cmd = cargo_bin_cmd!("horizon");
    cmd.env("HOME", home.path())
        .args(args)
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn every_cli_command_has_help_path() {
    let home = TempDir::new().expect("temp home");

    // top-level
    run_help(&home, &[]);

    // pipeline commands
    run_help(&home, &["measure"]);
    run_help(&home, &["resolve"]);

    // catalog and maintenance
    run_help(&home, &["devices"]);
    run_help(&home, &["devices", "list"]);
    run_help(&home, &["devices", "lookup"]);
    run_help(&home, &["focal"]);
    run_help(&home, &["doctor"]);
}

#[test]
fn measure_requires_an_image() {
    let home = TempDir::new().expect("temp home");
    cargo_bin_cmd!("horizon")
        .env("HOME", home.path())
        .arg("measure")
        .assert()
        .failure();
}
