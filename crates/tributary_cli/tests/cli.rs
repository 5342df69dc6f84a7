//! Runs the `tributary` binary against the shipped pipeline file.

use std::path::PathBuf;
use std::process::Command;

fn shipped_pipeline() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../pipelines/dummyjson.json")
}

fn tributary() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tributary"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn test_plan_prints_graph() {
    let output = tributary()
        .args(["plan"])
        .arg(shipped_pipeline())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("users_etl -> user_summary"));
    assert!(stdout.contains("carts_etl -> user_summary"));
    assert!(stdout.contains("products_etl -> category_summary"));
    assert!(stdout.contains("carts_etl -> category_summary"));
    assert!(!stdout.contains("users_etl -> category_summary"));
    assert!(stdout.contains("Order: users_etl, products_etl, carts_etl, user_summary, category_summary"));
}

#[test]
fn test_plan_json() {
    let output = tributary()
        .args(["plan", "--json"])
        .arg(shipped_pipeline())
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(doc["edges"].as_array().unwrap().len(), 4);
}

#[test]
fn test_check_counts_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("carts.json");
    std::fs::write(
        &records,
        serde_json::json!([
            {"id": 1, "userId": 5, "products": [{"id": 3, "quantity": 2, "price": 9.99}]},
            {"id": 2, "userId": 6, "products": [{"id": 4, "quantity": 0, "price": 9.99}]},
            {"id": 3, "userId": 7, "products": []}
        ])
        .to_string(),
    )
    .unwrap();

    let output = tributary()
        .args(["check", "--resource", "carts"])
        .arg(shipped_pipeline())
        .arg(&records)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Accepted: 2"));
    assert!(stdout.contains("Rejected: 1"));
}

#[test]
fn test_run_without_bucket_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = tributary()
        .args(["run"])
        .arg(shipped_pipeline())
        .arg("--data-dir")
        .arg(dir.path())
        .env_remove("TRIBUTARY_BUCKET")
        .env("TRIBUTARY_PROJECT", "analytics")
        .env("TRIBUTARY_DATASET", "shop")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bucket"));
}
