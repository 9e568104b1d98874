use assert_cmd::Command;

#[test]
fn prints_help() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("--help").assert().success().stdout(predicates::str::contains("Product catalog"));
}

#[test]
fn search_help() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.args(["search", "--help"]).assert().success().stdout(predicates::str::contains("Search for products"));
}

#[test]
fn reindex_help() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.args(["reindex", "--help"]).assert().success().stdout(predicates::str::contains("--fresh"));
}

#[test]
fn invalid_command_fails() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("foo").assert().failure();
}

#[test]
fn init_config_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.config.toml");

    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("init-config").arg(&path).assert().success();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("results_limit = 20"));

    // Never overwrites
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("init-config").arg(&path).assert().failure();
}
