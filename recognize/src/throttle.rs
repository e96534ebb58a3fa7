use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Limits `last_seen` writes to one per contact per interval.
///
/// A zero interval allows every write.
pub struct LastSeenThrottle {
    min_interval: Duration,
    last: Mutex<HashMap<String, Instant>>,
}

impl LastSeenThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Records a write for `contact_id` at `now` if one is due.
    /// Returns false when the previous write is too recent.
    pub fn allow(&self, contact_id: &str, now: Instant) -> bool {
        if self.min_interval.is_zero() {
            return true;
        }
        let mut last = self.last.lock();
        match last.get(contact_id) {
            Some(prev) if now.saturating_duration_since(*prev) < self.min_interval => false,
            _ => {
                last.insert(contact_id.to_string(), now);
                true
            }
        }
    }

    pub fn reset(&self) {
        self.last.lock().clear();
    }
}
