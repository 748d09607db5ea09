//! Cached, fail-closed global block of all order submission.
//!
//! Reads `{enabled, message?}` from a JSON file at a fixed config path.
//! Results are cached for [`KillSwitch::ttl_ms`] to keep the hot path off
//! disk. Any ambiguity — missing file, unparseable content, or an I/O
//! error — resolves to `enabled = true`: the switch fails closed.
//!
//! The clock is an injectable `Fn() -> i64` returning epoch-milliseconds,
//! the same seam `mqk-reconcile`'s freshness guard uses, so tests don't
//! sleep real wall-clock seconds to exercise TTL expiry.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;

/// Default cache lifetime.
pub const DEFAULT_TTL_MS: i64 = 5_000;

#[derive(Clone, Debug, Deserialize)]
struct KillSwitchFile {
    enabled: bool,
    message: Option<String>,
}

/// Result of a kill switch check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KillSwitchStatus {
    pub enabled: bool,
    pub message: Option<String>,
    /// `true` when `enabled` is `true` because the file was unreadable or
    /// unparseable, as opposed to an operator deliberately setting
    /// `enabled: true`. Callers that distinguish "operator halted trading"
    /// from "kill switch itself is broken" (e.g. to pick the right event
    /// to emit) should check this rather than pattern-matching `message`.
    pub fail_closed: bool,
}

impl KillSwitchStatus {
    fn fail_closed(message: impl Into<String>) -> Self {
        Self {
            enabled: true,
            message: Some(message.into()),
            fail_closed: true,
        }
    }
}

struct Cached {
    checked_at_ms: i64,
    status: KillSwitchStatus,
}

pub struct KillSwitch<C>
where
    C: Fn() -> i64,
{
    path: PathBuf,
    ttl_ms: i64,
    clock: C,
    cache: Mutex<Option<Cached>>,
}

impl<C: Fn() -> i64> KillSwitch<C> {
    pub fn new(path: impl AsRef<Path>, clock: C) -> Self {
        Self::with_ttl(path, DEFAULT_TTL_MS, clock)
    }

    pub fn with_ttl(path: impl AsRef<Path>, ttl_ms: i64, clock: C) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ttl_ms,
            clock,
            cache: Mutex::new(None),
        }
    }

    /// `true` if order submission is currently blocked. The executor must
    /// call this before every submission; a `true` result short-circuits
    /// with a blocked-order result.
    pub fn is_enabled(&self) -> bool {
        self.check().enabled
    }

    /// Full status including the configured message, if any.
    pub fn check(&self) -> KillSwitchStatus {
        let now = (self.clock)();
        let mut cache = self.cache.lock().expect("kill switch cache mutex poisoned");

        if let Some(cached) = cache.as_ref() {
            if now - cached.checked_at_ms < self.ttl_ms {
                return cached.status.clone();
            }
        }

        let status = self.read_from_disk();
        *cache = Some(Cached {
            checked_at_ms: now,
            status: status.clone(),
        });
        status
    }

    fn read_from_disk(&self) -> KillSwitchStatus {
        let body = match std::fs::read_to_string(&self.path) {
            Ok(b) => b,
            Err(e) => return KillSwitchStatus::fail_closed(format!("kill switch file unreadable: {e}")),
        };
        match serde_json::from_str::<KillSwitchFile>(&body) {
            Ok(f) => KillSwitchStatus {
                enabled: f.enabled,
                message: f.message,
                fail_closed: false,
            },
            Err(e) => KillSwitchStatus::fail_closed(format!("kill switch file unparseable: {e}")),
        }
    }
}

/// Object-safe view of a kill switch, so callers holding `Arc<dyn
/// KillSwitchCheck>` aren't generic over the switch's clock-closure type.
pub trait KillSwitchCheck: Send + Sync {
    /// Full status, including whether a block is operator-set or a
    /// fail-closed response to a broken kill switch file.
    fn check(&self) -> KillSwitchStatus;

    fn is_enabled(&self) -> bool {
        self.check().enabled
    }
}

impl<C: Fn() -> i64 + Send + Sync> KillSwitchCheck for KillSwitch<C> {
    fn check(&self) -> KillSwitchStatus {
        KillSwitch::check(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn clock_at(t: Rc<Cell<i64>>) -> impl Fn() -> i64 {
        move || t.get()
    }

    #[test]
    fn missing_file_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let ks = KillSwitch::new(dir.path().join("kill_switch.json"), || 0);
        assert!(ks.is_enabled());
    }

    #[test]
    fn unparseable_file_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kill_switch.json");
        std::fs::write(&path, "not json").unwrap();
        let ks = KillSwitch::new(&path, || 0);
        assert!(ks.is_enabled());
        assert!(ks.check().fail_closed);
    }

    #[test]
    fn operator_enabled_is_not_marked_fail_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kill_switch.json");
        std::fs::write(&path, r#"{"enabled": true, "message": "halted for maintenance"}"#).unwrap();
        let ks = KillSwitch::new(&path, || 0);
        let status = ks.check();
        assert!(status.enabled);
        assert!(!status.fail_closed);
    }

    #[test]
    fn disabled_file_is_respected_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kill_switch.json");
        std::fs::write(&path, r#"{"enabled": false}"#).unwrap();
        let t = Rc::new(Cell::new(0));
        let ks = KillSwitch::with_ttl(&path, 5_000, clock_at(t.clone()));
        assert!(!ks.is_enabled());

        // Flip the file on disk; within TTL the cached (stale) value holds.
        std::fs::write(&path, r#"{"enabled": true}"#).unwrap();
        t.set(1_000);
        assert!(!ks.is_enabled());
    }

    #[test]
    fn cache_refreshes_after_ttl_expires() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kill_switch.json");
        std::fs::write(&path, r#"{"enabled": false}"#).unwrap();
        let t = Rc::new(Cell::new(0));
        let ks = KillSwitch::with_ttl(&path, 5_000, clock_at(t.clone()));
        assert!(!ks.is_enabled());

        std::fs::write(&path, r#"{"enabled": true, "message": "halted"}"#).unwrap();
        t.set(5_001);
        let status = ks.check();
        assert!(status.enabled);
        assert_eq!(status.message.as_deref(), Some("halted"));
    }
}
