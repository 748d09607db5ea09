//! Injectable time and delay seams.
//!
//! Grounded on `qtsw-killswitch`'s `Fn() -> i64` clock seam: tests drive the
//! executor's watchdog and retry loops without sleeping real wall-clock
//! seconds by supplying a fake `Clock`/`Sleeper` pair instead of
//! `SystemClock`/`RealSleeper`.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Destination for the executor's blocking retry delays (100ms between
/// protective attempts, 200ms between flatten attempts). A blanket impl
/// over closures mirrors `qtsw_schemas::EventSink`'s seam so tests can
/// record requested delays instead of actually waiting on them.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

impl<F: Fn(Duration) + Send + Sync> Sleeper for F {
    fn sleep(&self, duration: Duration) {
        self(duration)
    }
}

pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
