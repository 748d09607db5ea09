use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn write_intent(dir: &std::path::Path, stream: &str) -> std::path::PathBuf {
    let intent = serde_json::json!({
        "trading_date": "2024-05-10",
        "stream": stream,
        "canonical_instrument": "ES",
        "session_tag": "RTH",
        "slot_time": "09:31",
        "direction": "Long",
        "entry_price": "5000.00",
        "stop_price": "4990.00",
        "target_price": "5020.00",
        "be_trigger_price": "5010.00",
        "entry_timestamp": null,
        "trigger_reason": null,
        "qty": 2
    });
    let path = dir.join("intents.jsonl");
    std::fs::write(&path, format!("{}\n", intent)).unwrap();
    path
}

#[test]
fn dry_run_submits_one_intent_and_reports_summary() {
    let dir = tempfile::tempdir().unwrap();
    let intents = write_intent(dir.path(), "ES1");

    let mut cmd = Command::cargo_bin("qtsw").unwrap();
    cmd.args([
        "run",
        "--project-root",
        dir.path().to_str().unwrap(),
        "--run-id",
        "run-1",
        "--mode",
        "dryrun",
        "--canonical-instrument",
        "ES",
        "--execution-instrument",
        "MES",
        "--contract-multiplier",
        "5",
        "--intents",
        intents.to_str().unwrap(),
    ]);

    cmd.assert().success().stdout(predicate::str::contains("submitted=1")).stdout(predicate::str::contains("orders_submitted=1"));
}
