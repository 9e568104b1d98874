use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};

fn write_config(dir: &Path, index_enabled: bool) -> PathBuf {
    let config = format!(
        "[storage]\npath = {:?}\n\n[index]\nenabled = {}\n",
        dir.join("data").display().to_string(),
        index_enabled
    );
    let path = dir.join("catalog.config.toml");
    fs::write(&path, config).unwrap();
    path
}

fn catalog(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn cli_e2e_create_search_reindex() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true);

    let payload = dir.path().join("redmi.json");
    fs::write(
        &payload,
        r#"{"title":"Redmi 13C","description":"Budget smartphone","price":8999,"mrp":11999,
            "stock":5,"rating":4.1,"Metadata":{"color":"Black"}}"#,
    )
    .unwrap();
    catalog(&config)
        .args(["create", payload.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("\"productId\":1"));

    catalog(&config)
        .args(["create", "-"])
        .write_stdin(r#"{"title":"Galaxy S24","description":"Flagship phone","price":79999,"mrp":89999,"stock":2}"#)
        .assert()
        .success()
        .stdout(contains("\"productId\":2"));

    catalog(&config)
        .args(["update-metadata", "-"])
        .write_stdin(r#"{"productId":2,"Metadata":{"ram":"8GB"}}"#)
        .assert()
        .success()
        .stdout(contains("8GB"));

    catalog(&config)
        .args(["update-metadata", "-"])
        .write_stdin(r#"{"productId":99,"Metadata":{"ram":"8GB"}}"#)
        .assert()
        .failure()
        .stderr(contains("not found"));

    catalog(&config)
        .args(["reindex", "--fresh"])
        .assert()
        .success()
        .stdout(contains("Reindexed 2 products."));

    let output = catalog(&config)
        .args(["search", "costliest mobile", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["productId"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);

    catalog(&config)
        .args(["search", "   ", "--json"])
        .assert()
        .success()
        .stdout(contains("{\"data\":[]}"));
}

#[test]
fn cli_e2e_fallback_without_index() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), false);

    catalog(&config)
        .args(["create", "-"])
        .write_stdin(r#"{"title":"Nokia phone","description":"Keypad","price":1999,"mrp":1999}"#)
        .assert()
        .success();

    catalog(&config)
        .args(["search", "nokia PHONE wala"])
        .assert()
        .success()
        .stdout(contains("Nokia phone"));

    catalog(&config)
        .args(["search", "sasta phone"])
        .assert()
        .success()
        .stdout(contains("No results."));

    catalog(&config)
        .args(["create", "-"])
        .write_stdin(r#"{"title":"","description":"x","price":1,"mrp":1}"#)
        .assert()
        .failure()
        .stderr(contains("title"));

    catalog(&config).arg("reindex").assert().failure();
}
