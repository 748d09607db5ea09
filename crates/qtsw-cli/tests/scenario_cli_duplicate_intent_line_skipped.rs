use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn repeated_intent_line_in_the_same_batch_is_skipped_as_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let intent = serde_json::json!({
        "trading_date": "2024-05-10",
        "stream": "ES1",
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
    let line = serde_json::to_string(&intent).unwrap();
    let intents_path = dir.path().join("intents.jsonl");
    std::fs::write(&intents_path, format!("{line}\n{line}\n")).unwrap();

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
        intents_path.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("submitted=2"))
        .stdout(predicate::str::contains("orders_submitted=1"))
        .stdout(predicate::str::contains("duplicates_skipped=1"));
}
