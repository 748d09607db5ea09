//! Clean long trade: entry fills at 5000, exits at target 5020, two
//! contracts at a 5x multiplier. Expect +20 points, +$200 gross, and a
//! `TARGET` completion reason with no slippage (fill == expected price).

use chrono::{DateTime, Utc};
use qtsw_journal::{ExecutionJournal, ExitFillOutcome};
use qtsw_schemas::{Direction, ExecutionEvent, Px};

fn now() -> DateTime<Utc> {
    "2024-05-10T14:31:00Z".parse().unwrap()
}

#[test]
fn entry_and_target_exit_produce_expected_pnl() {
    let dir = tempfile::tempdir().unwrap();
    let journal = ExecutionJournal::new(dir.path(), |_e| {});

    journal
        .record_submission(
            "abc123",
            "2024-05-10",
            "ES1",
            "MES",
            "Market",
            "bo-1",
            Some(Px::from_f64(5000.0).unwrap()),
            now(),
        )
        .unwrap();

    let fill = journal
        .record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 2, now(), 5, Direction::Long, "MES", "ES")
        .unwrap();
    assert_eq!(fill.cumulative_qty, 2);
    assert_eq!(fill.entry_avg_price.canonical(), "5000.00");

    let outcome = journal
        .record_exit_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5020.0).unwrap(), 2, "TARGET", now())
        .unwrap();

    match outcome {
        ExitFillOutcome::Completed { realized_pnl_points, realized_pnl_gross, completion_reason, .. } => {
            assert_eq!(realized_pnl_points.canonical(), "20.00");
            assert_eq!(realized_pnl_gross.canonical(), "200.00");
            assert_eq!(completion_reason, "TARGET");
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn fill_at_expected_price_emits_no_slippage_event() {
    let dir = tempfile::tempdir().unwrap();
    let events = std::sync::Mutex::new(Vec::new());
    let journal = ExecutionJournal::new(dir.path(), |e: ExecutionEvent| events.lock().unwrap().push(e));

    journal
        .record_submission("abc123", "2024-05-10", "ES1", "MES", "Market", "bo-1", Some(Px::from_f64(5000.0).unwrap()), now())
        .unwrap();
    journal
        .record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 2, now(), 5, Direction::Long, "MES", "ES")
        .unwrap();
    journal
        .record_exit_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5020.0).unwrap(), 2, "TARGET", now())
        .unwrap();

    let recorded = events.lock().unwrap();
    assert!(!recorded.iter().any(|e| e.name() == "EXECUTION_SLIPPAGE_DETECTED"));
    assert!(recorded.iter().any(|e| e.name() == "TRADE_COMPLETED"));
}
