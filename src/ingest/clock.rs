use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const NEVER: i64 = i64::MIN;

/// Time of the last completed ingestion pass.
///
/// Written only by the ingestion side, read by the web handlers. Clones share
/// the same underlying value.
#[derive(Clone, Debug)]
pub struct PassClock {
    last_millis: Arc<AtomicI64>,
}

impl Default for PassClock {
    fn default() -> Self {
        Self {
            last_millis: Arc::new(AtomicI64::new(NEVER)),
        }
    }
}

impl PassClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, at: DateTime<Utc>) {
        self.last_millis
            .store(at.timestamp_millis(), Ordering::Release);
    }

    /// `None` until the first pass has completed.
    pub fn last_pass(&self) -> Option<DateTime<Utc>> {
        match self.last_millis.load(Ordering::Acquire) {
            NEVER => None,
            millis => DateTime::from_timestamp_millis(millis),
        }
    }
}
