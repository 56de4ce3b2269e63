use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SHOP: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../threatscry-core/tests/fixtures/shop.yaml"
);

/// Runs in an empty directory with an empty home, so no config file leaks in.
fn threatscry(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("threatscry").unwrap();
    cmd.current_dir(dir.path()).env("HOME", dir.path()).env_remove("RUST_LOG");
    cmd
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn analyze_writes_all_reports() {
    let dir = tempfile::tempdir().unwrap();
    threatscry(&dir)
        .args(["analyze", "--model", SHOP, "--output", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("written to out"));

    let risks: serde_json::Value = serde_json::from_str(&read(&dir.path().join("out/risks.json"))).unwrap();
    let db1 = risks
        .as_array()
        .unwrap()
        .iter()
        .find(|risk| risk["synthetic_id"] == "unencrypted-asset@db1")
        .unwrap();
    assert_eq!(db1["risk_status"], "in-progress");

    let assets: serde_json::Value =
        serde_json::from_str(&read(&dir.path().join("out/technical-assets.json"))).unwrap();
    assert_eq!(assets.as_array().unwrap().len(), 4);
    assert!(assets[0]["raa"].as_f64().unwrap() > 0.0);

    let stats: serde_json::Value = serde_json::from_str(&read(&dir.path().join("out/stats.json"))).unwrap();
    assert!(stats["risks"]["critical"].is_object());
    assert!(!dir.path().join("out/.risks.json.tmp").exists());
}

#[test]
fn orphaned_tracking_fails_unless_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.yaml");
    std::fs::write(
        &model,
        read(Path::new(SHOP)).replace(
            "risk_tracking:",
            "risk_tracking:\n  some-rule@nonexistent-id:\n    status: accepted",
        ),
    )
    .unwrap();

    threatscry(&dir)
        .args(["analyze", "--model", "model.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("some-rule@nonexistent-id"));

    threatscry(&dir)
        .args(["analyze", "--model", "model.yaml", "--ignore-orphaned-risk-tracking"])
        .assert()
        .success();
    assert!(dir.path().join("threatscry-output/risks.json").exists());
}

#[test]
fn skip_and_orphan_warnings_are_printed_once() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.yaml");
    std::fs::write(
        &model,
        read(Path::new(SHOP)).replace(
            "risk_tracking:",
            "risk_tracking:\n  some-rule@nonexistent-id:\n    status: accepted",
        ),
    )
    .unwrap();

    let output = threatscry(&dir)
        .args([
            "analyze",
            "--model",
            "model.yaml",
            "--skip-risk-rules",
            "no-such-rule",
            "--ignore-orphaned-risk-tracking",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("no-such-rule").count(), 1, "{stderr}");
    assert_eq!(stderr.matches("some-rule@nonexistent-id").count(), 1, "{stderr}");
}

#[test]
fn missing_model_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    threatscry(&dir)
        .args(["analyze", "--model", "nowhere.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("loading model nowhere.yaml"));
}

#[test]
fn config_file_in_working_directory_is_used() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("threatscry.toml"),
        "output = \"from-config\"\nskip_risk_rules = [\"unencrypted-asset\"]\nignore_orphaned_risk_tracking = true\n",
    )
    .unwrap();

    threatscry(&dir).args(["analyze", "--model", SHOP]).assert().success();
    let risks = read(&dir.path().join("from-config/risks.json"));
    assert!(!risks.contains("unencrypted-asset@db1"));
}

#[test]
fn init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    threatscry(&dir)
        .args(["init", "--output", "reports"])
        .assert()
        .success();
    assert!(read(&dir.path().join("threatscry.toml")).contains("output = \"reports\""));

    threatscry(&dir)
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    threatscry(&dir).args(["init", "--force"]).assert().success();
}

#[test]
fn rule_catalogue_commands() {
    let dir = tempfile::tempdir().unwrap();
    threatscry(&dir)
        .arg("list-risk-rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("unencrypted-asset --> Unencrypted Technical Assets"));

    threatscry(&dir)
        .args(["explain-risk-rule", "unencrypted-asset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CWE: 311"));

    threatscry(&dir)
        .args(["explain-risk-rule", "no-such-rule"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown risk rule: no-such-rule"));
}

#[test]
fn types_and_schema_are_printed() {
    let dir = tempfile::tempdir().unwrap();
    threatscry(&dir)
        .arg("list-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("strictly-confidential"));

    threatscry(&dir)
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("technical_assets"));
}
