use chrono::{DateTime, Utc};

/// Source of wall clock time in milliseconds.
///
/// The mempool reads time only through this trait so that expiry can be driven
/// by a manual clock.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        millis_since_epoch(Utc::now())
    }
}

/// Times before the Unix epoch are clamped to zero.
fn millis_since_epoch(time: DateTime<Utc>) -> u64 {
    u64::try_from(time.timestamp_millis()).unwrap_or(0)
}
