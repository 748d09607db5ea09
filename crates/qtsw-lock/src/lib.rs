//! Filesystem-based mutual exclusion, one lock per canonical market,
//! valid across processes on the same host.
//!
//! Only one `IntentExecutor` run may hold the market for a given canonical
//! instrument at a time. The lock is a plain file whose mtime doubles as
//! its age oracle: a fresh file blocks a second acquirer, a stale one
//! (older than [`STALE_THRESHOLD`]) is reclaimed on the assumption that
//! its owning process died without releasing it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lock file older than this is assumed abandoned and is reclaimed.
pub const STALE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
pub enum LockError {
    /// Another run holds a fresh lock on this instrument.
    Held { instrument: String, holder_run_id: String },
    /// The lock file could not be written (fail-closed: do not run).
    WriteFailed { instrument: String, reason: String },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Held { instrument, holder_run_id } => write!(
                f,
                "canonical market {instrument} is locked by run {holder_run_id}"
            ),
            LockError::WriteFailed { instrument, reason } => {
                write!(f, "failed to write lock file for {instrument}: {reason}")
            }
        }
    }
}

impl std::error::Error for LockError {}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LockRecord {
    run_id: String,
    acquired_at_utc: DateTime<Utc>,
    canonical_instrument: String,
}

/// A held lock on one canonical instrument. Release happens explicitly via
/// [`CanonicalMarketLock::release`], or best-effort via `Drop`.
pub struct CanonicalMarketLock {
    path: PathBuf,
    run_id: String,
    canonical_instrument: String,
    released: bool,
}

impl CanonicalMarketLock {
    /// Attempt to acquire the lock for `canonical_instrument` under
    /// `lock_dir`. Fails closed (returns `Err`) if the lock is currently
    /// held by a run whose file is not yet stale, or if the lock file
    /// cannot be written.
    pub fn acquire(
        lock_dir: impl AsRef<Path>,
        canonical_instrument: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Result<Self, LockError> {
        let canonical_instrument = canonical_instrument.into();
        let run_id = run_id.into();
        let lock_dir = lock_dir.as_ref();
        let path = lock_file_path(lock_dir, &canonical_instrument);

        if let Some(holder) = existing_holder_if_fresh(&path) {
            return Err(LockError::Held {
                instrument: canonical_instrument,
                holder_run_id: holder,
            });
        }

        fs::create_dir_all(lock_dir).map_err(|e| LockError::WriteFailed {
            instrument: canonical_instrument.clone(),
            reason: e.to_string(),
        })?;

        let record = LockRecord {
            run_id: run_id.clone(),
            acquired_at_utc: Utc::now(),
            canonical_instrument: canonical_instrument.clone(),
        };
        let body = serde_json::to_string_pretty(&record).map_err(|e| LockError::WriteFailed {
            instrument: canonical_instrument.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, body).map_err(|e| LockError::WriteFailed {
            instrument: canonical_instrument.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path,
            run_id,
            canonical_instrument,
            released: false,
        })
    }

    pub fn canonical_instrument(&self) -> &str {
        &self.canonical_instrument
    }

    /// Release the lock, deleting the file only if it still records this
    /// run's id (never steal a successor's lock). Best-effort: any I/O
    /// error here is swallowed, since a stale reclaim will clean up later.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Ok(body) = fs::read_to_string(&self.path) {
            if let Ok(record) = serde_json::from_str::<LockRecord>(&body) {
                if record.run_id == self.run_id {
                    let _ = fs::remove_file(&self.path);
                }
            }
        }
    }
}

impl Drop for CanonicalMarketLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}

fn lock_file_path(lock_dir: &Path, canonical_instrument: &str) -> PathBuf {
    lock_dir.join(format!("canonical_{canonical_instrument}.lock"))
}

/// Returns `Some(holder_run_id)` if the lock file exists, is readable and
/// parseable, and its mtime age is below [`STALE_THRESHOLD`]. Any other
/// condition (missing file, unreadable, unparseable, stale) means the
/// caller may reclaim it.
fn existing_holder_if_fresh(path: &Path) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let age = SystemTime::now().duration_since(modified).ok()?;
    if age >= STALE_THRESHOLD {
        return None;
    }
    let body = fs::read_to_string(path).ok()?;
    let record: LockRecord = serde_json::from_str(&body).ok()?;
    Some(record.run_id)
}

/// What a caller would find if it probed the lock file right now, without
/// acquiring it. Lets `acquire`'s caller emit
/// `CANONICAL_MARKET_LOCK_STALE` before reclaiming, since the reclaim
/// itself happens silently inside `acquire`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockProbe {
    /// No lock file, or one that is stale/unparseable: a call to `acquire`
    /// would succeed (reclaiming, if a stale file is present).
    Available,
    /// A lock file exists, is parseable, and is not yet stale.
    Held { holder_run_id: String },
    /// A lock file exists, is parseable, but has aged past the stale
    /// threshold: `acquire` would reclaim it.
    Stale { holder_run_id: String, age_seconds: i64 },
}

/// Inspect the lock file for `canonical_instrument` under `lock_dir`
/// without acquiring or modifying it.
pub fn probe(lock_dir: impl AsRef<Path>, canonical_instrument: &str) -> LockProbe {
    let path = lock_file_path(lock_dir.as_ref(), canonical_instrument);
    if let Some(holder_run_id) = existing_holder_if_fresh(&path) {
        return LockProbe::Held { holder_run_id };
    }
    let Ok(metadata) = fs::metadata(&path) else {
        return LockProbe::Available;
    };
    let Ok(modified) = metadata.modified() else {
        return LockProbe::Available;
    };
    let age_seconds = SystemTime::now().duration_since(modified).map(|d| d.as_secs() as i64).unwrap_or(0);
    let Ok(body) = fs::read_to_string(&path) else {
        return LockProbe::Available;
    };
    let Ok(record) = serde_json::from_str::<LockRecord>(&body) else {
        return LockProbe::Available;
    };
    LockProbe::Stale { holder_run_id: record.run_id, age_seconds }
}
