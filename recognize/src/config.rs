use std::time::Duration;

use crate::FrameConstraints;

/// Controls [`crate::Recognizer`] timing.
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Pause between the end of one cycle and the start of the next
    /// (default: 100ms).
    pub interval: Duration,

    /// Pause before polling again when no frame is available
    /// (default: 100ms).
    pub backoff: Duration,

    /// Requested capture size (default: 640x480).
    pub constraints: FrameConstraints,

    /// Minimum time between two `last_seen` writes for the same contact
    /// (default: 30s). Zero writes on every matching cycle.
    pub last_seen_throttle: Duration,

    /// Capacity of the event channel (default: 64).
    /// Events are dropped when the consumer falls behind.
    pub event_buffer: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            backoff: Duration::from_millis(100),
            constraints: FrameConstraints::default(),
            last_seen_throttle: Duration::from_secs(30),
            event_buffer: 64,
        }
    }
}
