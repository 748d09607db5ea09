//! `qtsw` entry point: wires the lock, kill switch, journal, coordinator,
//! adapter and executor together behind a minimal CLI surface (adapter
//! mode, project root, run id; LIVE gated by a second explicit enable
//! key). This file is intentionally thin, matching the teacher's
//! `mqk-daemon`/`mqk-cli` discipline of keeping `main.rs` to argument
//! parsing and wiring, with the actual logic living in the library crates.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use qtsw_adapter::{AdapterFactory, AdapterMode, OrderCallbackSink};
use qtsw_coordinator::InstrumentIntentCoordinator;
use qtsw_executor::{EventEmitter, IntentExecutor, Journal};
use qtsw_journal::ExecutionJournal;
use qtsw_killswitch::KillSwitch;
use qtsw_lock::{CanonicalMarketLock, LockError, LockProbe};
use qtsw_notify::{TracingEventSink, TracingNotificationSink};
use qtsw_schemas::{EventSink, ExecutionContext, ExecutionEvent, Intent, NotificationSink};

/// The explicit second key an operator must pass to select LIVE mode.
/// Passing it does not make LIVE work — [`AdapterFactory`] stubs LIVE
/// unconditionally — it only proves the operator meant
/// to ask for it rather than fat-fingering `--mode live`.
const LIVE_ENABLE_KEY: &str = "I-UNDERSTAND-LIVE-IS-STUBBED";

#[derive(Parser)]
#[command(name = "qtsw", about = "Execution & lifecycle core (intent -> broker order binding)")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Dryrun,
    Sim,
    Live,
}

impl From<ModeArg> for AdapterMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Dryrun => AdapterMode::DryRun,
            ModeArg::Sim => AdapterMode::Sim,
            ModeArg::Live => AdapterMode::Live,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a batch of intents (one JSON object per line) for a single
    /// canonical instrument, then run the watchdog tick loop for the
    /// requested duration.
    Run(RunArgs),

    /// Inspect or flip the kill switch file.
    KillSwitch {
        #[command(subcommand)]
        cmd: KillSwitchCmd,
    },

    /// Probe a canonical market lock file.
    Lock {
        #[command(subcommand)]
        cmd: LockCmd,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Project root; `runtime_locks/`, `data/execution_journals/`,
    /// `data/execution_incidents/`, and `configs/robot/` are resolved
    /// relative to it.
    #[arg(long)]
    project_root: PathBuf,

    /// Identifies this process to the canonical market lock so a
    /// successor cannot steal it and a crashed run can be reclaimed once
    /// stale.
    #[arg(long)]
    run_id: String,

    #[arg(long, value_enum)]
    mode: ModeArg,

    /// Required (and checked) only when `--mode live` is selected.
    #[arg(long)]
    enable_live_key: Option<String>,

    /// Brokerage account id. Only consulted for `--mode sim`, where it
    /// must satisfy `--sim-account-prefix` before any submission is
    /// permitted.
    #[arg(long, default_value = "")]
    account_id: String,

    #[arg(long, default_value = "SIM-")]
    sim_account_prefix: String,

    #[arg(long)]
    canonical_instrument: String,

    #[arg(long)]
    execution_instrument: String,

    #[arg(long)]
    contract_multiplier: i64,

    /// Path to a file of newline-delimited JSON `Intent` records (the
    /// strategy generator's output; generating them is out of scope for
    /// this core).
    #[arg(long)]
    intents: PathBuf,

    /// After submitting the batch, run the unprotected-position watchdog
    /// on a 1-second tick for this many seconds before exiting. Zero
    /// submits and returns immediately.
    #[arg(long, default_value_t = 0)]
    watch_seconds: u64,
}

#[derive(Subcommand)]
enum KillSwitchCmd {
    Show {
        #[arg(long)]
        project_root: PathBuf,
    },
    Enable {
        #[arg(long)]
        project_root: PathBuf,
        #[arg(long)]
        message: Option<String>,
    },
    Disable {
        #[arg(long)]
        project_root: PathBuf,
    },
}

#[derive(Subcommand)]
enum LockCmd {
    /// Inspect the lock file for `--instrument` without acquiring or
    /// modifying it, reporting whether it is available, held by a fresh
    /// run, or stale and reclaimable.
    Status {
        #[arg(long)]
        project_root: PathBuf,
        #[arg(long)]
        instrument: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run(args) => run(args),
        Commands::KillSwitch { cmd } => kill_switch_cmd(cmd),
        Commands::Lock { cmd } => lock_cmd(cmd),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn kill_switch_path(project_root: &Path) -> PathBuf {
    project_root.join("configs").join("robot").join("kill_switch.json")
}

fn lock_dir(project_root: &Path) -> PathBuf {
    project_root.join("runtime_locks")
}

fn journal_dir(project_root: &Path) -> PathBuf {
    project_root.join("data").join("execution_journals")
}

fn incident_dir(project_root: &Path) -> PathBuf {
    project_root.join("data").join("execution_incidents")
}

fn tracing_event_emitter() -> EventEmitter {
    Box::new(|e: ExecutionEvent| TracingEventSink.emit(e))
}

fn run(args: RunArgs) -> Result<()> {
    let mode: AdapterMode = args.mode.into();
    if mode == AdapterMode::Live {
        let provided = args.enable_live_key.as_deref().unwrap_or("");
        if provided != LIVE_ENABLE_KEY {
            bail!("--mode live requires --enable-live-key {LIVE_ENABLE_KEY:?}; refusing to proceed");
        }
    }

    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);

    if let LockProbe::Stale { holder_run_id, age_seconds } = qtsw_lock::probe(lock_dir(&args.project_root), &args.canonical_instrument) {
        events.emit(ExecutionEvent::CanonicalMarketLockStale {
            instrument: args.canonical_instrument.clone(),
            holder_run_id,
            age_seconds,
        });
    }

    let lock = match CanonicalMarketLock::acquire(lock_dir(&args.project_root), &args.canonical_instrument, &args.run_id) {
        Ok(lock) => {
            events.emit(ExecutionEvent::CanonicalMarketLockAcquired {
                instrument: args.canonical_instrument.clone(),
                run_id: args.run_id.clone(),
            });
            lock
        }
        Err(LockError::Held { instrument, holder_run_id }) => {
            events.emit(ExecutionEvent::CanonicalMarketLockFailed {
                instrument: instrument.clone(),
                reason: format!("held by run {holder_run_id}"),
            });
            bail!("canonical market {instrument} is locked by run {holder_run_id}; refusing to start (fail-closed)")
        }
        Err(LockError::WriteFailed { instrument, reason }) => {
            events.emit(ExecutionEvent::CanonicalMarketLockFailed { instrument: instrument.clone(), reason: reason.clone() });
            bail!("failed to acquire canonical market lock for {instrument}: {reason} (fail-closed)")
        }
    };

    let kill_switch = Arc::new(KillSwitch::new(kill_switch_path(&args.project_root), || Utc::now().timestamp_millis()));

    let journal: Arc<Journal> = Arc::new(ExecutionJournal::new(journal_dir(&args.project_root), tracing_event_emitter()));
    let coordinator = Arc::new(InstrumentIntentCoordinator::new());
    let notify: Arc<dyn NotificationSink> = Arc::new(TracingNotificationSink);

    let executor = IntentExecutor::new(
        journal.clone(),
        coordinator,
        kill_switch,
        notify,
        events,
        incident_dir(&args.project_root),
    );

    let callbacks = executor.clone() as Arc<dyn OrderCallbackSink>;
    let sim_prefix = args.sim_account_prefix.clone();
    let account_id = args.account_id.clone();
    let adapter = AdapterFactory::build(mode, &args.account_id, move |id: &str| id.starts_with(sim_prefix.as_str()), callbacks)
        .with_context(|| format!("failed to construct {mode} adapter"))?;
    if mode == AdapterMode::Sim {
        events.emit(ExecutionEvent::SimAccountVerified { account_id });
    }
    executor.set_adapter(adapter);

    let file = fs::File::open(&args.intents).with_context(|| format!("reading intents file {:?}", args.intents))?;
    let reader = BufReader::new(file);
    let mut submitted = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let intent: Intent = serde_json::from_str(&line)
            .with_context(|| format!("{:?}: malformed intent on line {}", args.intents, line_no + 1))?;

        // Construction-time identity-leak guard: the execution symbol must
        // never appear as a substring of the canonical stream, or a fill
        // callback routed by tag could be mistaken for the wrong stream.
        if let Err(e) = ExecutionContext::new(&args.canonical_instrument, &intent.stream, &args.execution_instrument, args.contract_multiplier) {
            tracing::error!(line = line_no + 1, error = %e, "refusing to submit intent: identity leak between canonical stream and execution instrument");
            continue;
        }

        let outcome = executor.submit(&intent, &args.execution_instrument, args.contract_multiplier, Utc::now());
        tracing::info!(?outcome, "submitted intent from {:?} line {}", args.intents, line_no + 1);
        submitted += 1;
    }
    println!("submitted={submitted}");

    for _ in 0..args.watch_seconds {
        std::thread::sleep(Duration::from_secs(1));
        executor.watchdog_tick_now();
    }

    let snapshot = journal.summary.snapshot();
    println!(
        "intents_seen={} intents_executed={} orders_submitted={} orders_rejected={} orders_filled={} orders_blocked={} duplicates_skipped={}",
        snapshot.intents_seen,
        snapshot.intents_executed,
        snapshot.orders_submitted,
        snapshot.orders_rejected,
        snapshot.orders_filled,
        snapshot.orders_blocked,
        snapshot.duplicates_skipped,
    );

    let (instrument, run_id) = (args.canonical_instrument.clone(), args.run_id.clone());
    lock.release();
    events.emit(ExecutionEvent::CanonicalMarketLockReleased { instrument, run_id });
    Ok(())
}

fn kill_switch_cmd(cmd: KillSwitchCmd) -> Result<()> {
    match cmd {
        KillSwitchCmd::Show { project_root } => {
            let path = kill_switch_path(&project_root);
            let ks = KillSwitch::new(&path, || Utc::now().timestamp_millis());
            let status = ks.check();
            println!("enabled={} message={:?}", status.enabled, status.message);
        }
        KillSwitchCmd::Enable { project_root, message } => {
            write_kill_switch(&project_root, true, message)?;
            println!("kill switch ENABLED");
        }
        KillSwitchCmd::Disable { project_root } => {
            write_kill_switch(&project_root, false, None)?;
            println!("kill switch disabled");
        }
    }
    Ok(())
}

fn write_kill_switch(project_root: &Path, enabled: bool, message: Option<String>) -> Result<()> {
    let path = kill_switch_path(project_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::json!({ "enabled": enabled, "message": message });
    fs::write(&path, serde_json::to_string_pretty(&body)?)?;
    Ok(())
}

fn lock_cmd(cmd: LockCmd) -> Result<()> {
    let LockCmd::Status { project_root, instrument } = cmd;
    match qtsw_lock::probe(lock_dir(&project_root), &instrument) {
        LockProbe::Available => println!("available: no lock file for {instrument}"),
        LockProbe::Held { holder_run_id } => println!("held: instrument={instrument} holder_run_id={holder_run_id}"),
        LockProbe::Stale { holder_run_id, age_seconds } => {
            println!("stale (reclaimable): instrument={instrument} holder_run_id={holder_run_id} age_seconds={age_seconds}")
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_enable_key_is_checked_before_lock_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        let intents = dir.path().join("intents.jsonl");
        fs::write(&intents, "").unwrap();
        let args = RunArgs {
            project_root: dir.path().to_path_buf(),
            run_id: "run-1".to_string(),
            mode: ModeArg::Live,
            enable_live_key: None,
            account_id: String::new(),
            sim_account_prefix: "SIM-".to_string(),
            canonical_instrument: "ES".to_string(),
            execution_instrument: "MES".to_string(),
            contract_multiplier: 5,
            intents,
            watch_seconds: 0,
        };
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("enable-live-key"));
        // The lock must not have been left behind by a bail! before acquisition.
        assert!(!dir.path().join("runtime_locks").join("canonical_ES.lock").exists());
    }

    #[test]
    fn dry_run_submits_intents_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let intent = Intent {
            trading_date: "2024-05-10".to_string(),
            stream: "ES1".to_string(),
            canonical_instrument: "ES".to_string(),
            session_tag: "RTH".to_string(),
            slot_time: "09:31".to_string(),
            direction: Some(qtsw_schemas::Direction::Long),
            entry_price: Some(qtsw_schemas::Px::from_f64(5000.0).unwrap()),
            stop_price: Some(qtsw_schemas::Px::from_f64(4990.0).unwrap()),
            target_price: Some(qtsw_schemas::Px::from_f64(5020.0).unwrap()),
            be_trigger_price: Some(qtsw_schemas::Px::from_f64(5010.0).unwrap()),
            entry_timestamp: None,
            trigger_reason: None,
            qty: 2,
        };
        let intents_path = dir.path().join("intents.jsonl");
        fs::write(&intents_path, format!("{}\n", serde_json::to_string(&intent).unwrap())).unwrap();
        write_kill_switch(dir.path(), false, None).unwrap();

        let args = RunArgs {
            project_root: dir.path().to_path_buf(),
            run_id: "run-1".to_string(),
            mode: ModeArg::Dryrun,
            enable_live_key: None,
            account_id: String::new(),
            sim_account_prefix: "SIM-".to_string(),
            canonical_instrument: "ES".to_string(),
            execution_instrument: "MES".to_string(),
            contract_multiplier: 5,
            intents: intents_path,
            watch_seconds: 0,
        };
        run(args).unwrap();
        assert!(!dir.path().join("runtime_locks").join("canonical_ES.lock").exists());
    }

    #[test]
    fn identity_leak_intent_is_skipped_not_submitted() {
        let dir = tempfile::tempdir().unwrap();
        let intent = Intent {
            trading_date: "2024-05-10".to_string(),
            stream: "MES1".to_string(),
            canonical_instrument: "ES".to_string(),
            session_tag: "RTH".to_string(),
            slot_time: "09:31".to_string(),
            direction: Some(qtsw_schemas::Direction::Long),
            entry_price: Some(qtsw_schemas::Px::from_f64(5000.0).unwrap()),
            stop_price: Some(qtsw_schemas::Px::from_f64(4990.0).unwrap()),
            target_price: Some(qtsw_schemas::Px::from_f64(5020.0).unwrap()),
            be_trigger_price: Some(qtsw_schemas::Px::from_f64(5010.0).unwrap()),
            entry_timestamp: None,
            trigger_reason: None,
            qty: 2,
        };
        let intents_path = dir.path().join("intents.jsonl");
        fs::write(&intents_path, format!("{}\n", serde_json::to_string(&intent).unwrap())).unwrap();
        write_kill_switch(dir.path(), false, None).unwrap();

        let args = RunArgs {
            project_root: dir.path().to_path_buf(),
            run_id: "run-1".to_string(),
            mode: ModeArg::Dryrun,
            enable_live_key: None,
            account_id: String::new(),
            sim_account_prefix: "SIM-".to_string(),
            canonical_instrument: "ES".to_string(),
            // "MES" is a substring of the stream "MES1" above: this must be
            // rejected by the ExecutionContext identity-leak guard and
            // skipped rather than submitted.
            execution_instrument: "MES".to_string(),
            contract_multiplier: 5,
            intents: intents_path,
            watch_seconds: 0,
        };
        run(args).unwrap();
    }

    #[test]
    fn sim_mode_verifies_account_and_submits() {
        let dir = tempfile::tempdir().unwrap();
        let intent = Intent {
            trading_date: "2024-05-10".to_string(),
            stream: "ES1".to_string(),
            canonical_instrument: "ES".to_string(),
            session_tag: "RTH".to_string(),
            slot_time: "09:31".to_string(),
            direction: Some(qtsw_schemas::Direction::Long),
            entry_price: Some(qtsw_schemas::Px::from_f64(5000.0).unwrap()),
            stop_price: Some(qtsw_schemas::Px::from_f64(4990.0).unwrap()),
            target_price: Some(qtsw_schemas::Px::from_f64(5020.0).unwrap()),
            be_trigger_price: Some(qtsw_schemas::Px::from_f64(5010.0).unwrap()),
            entry_timestamp: None,
            trigger_reason: None,
            qty: 2,
        };
        let intents_path = dir.path().join("intents.jsonl");
        fs::write(&intents_path, format!("{}\n", serde_json::to_string(&intent).unwrap())).unwrap();
        write_kill_switch(dir.path(), false, None).unwrap();

        let args = RunArgs {
            project_root: dir.path().to_path_buf(),
            run_id: "run-1".to_string(),
            mode: ModeArg::Sim,
            enable_live_key: None,
            account_id: "SIM-001".to_string(),
            sim_account_prefix: "SIM-".to_string(),
            canonical_instrument: "ES".to_string(),
            execution_instrument: "MES".to_string(),
            contract_multiplier: 5,
            intents: intents_path,
            watch_seconds: 0,
        };
        // Exercises AdapterFactory's SIM account verification gate and the
        // SIM_ACCOUNT_VERIFIED event emission on success; a non-matching
        // account_id would instead fail `run` with a construction error.
        run(args).unwrap();
    }

    #[test]
    fn sim_mode_rejects_non_sim_account() {
        let dir = tempfile::tempdir().unwrap();
        let intents_path = dir.path().join("intents.jsonl");
        fs::write(&intents_path, "").unwrap();
        write_kill_switch(dir.path(), false, None).unwrap();

        let args = RunArgs {
            project_root: dir.path().to_path_buf(),
            run_id: "run-1".to_string(),
            mode: ModeArg::Sim,
            enable_live_key: None,
            account_id: "LIVE-001".to_string(),
            sim_account_prefix: "SIM-".to_string(),
            canonical_instrument: "ES".to_string(),
            execution_instrument: "MES".to_string(),
            contract_multiplier: 5,
            intents: intents_path,
            watch_seconds: 0,
        };
        assert!(run(args).is_err());
    }

    #[test]
    fn kill_switch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_kill_switch(dir.path(), true, Some("halted for maintenance".to_string())).unwrap();
        let ks = KillSwitch::new(kill_switch_path(dir.path()), || Utc::now().timestamp_millis());
        assert!(ks.is_enabled());
    }
}
