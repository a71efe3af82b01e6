use crate::domain::{DEFAULT_NOTIFICATION_QUEUE_CAPACITY, DEFAULT_SILENCE_WINDOW};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementWorkerConfig {
    /// Quiet period that closes an asset buffer (default: 2000 ms)
    pub silence_window_ms: u64,

    /// Live events buffered ahead of the notifier (default: 1024)
    pub notification_queue_capacity: usize,
}

impl Default for MovementWorkerConfig {
    fn default() -> Self {
        Self {
            silence_window_ms: DEFAULT_SILENCE_WINDOW.as_millis() as u64,
            notification_queue_capacity: DEFAULT_NOTIFICATION_QUEUE_CAPACITY,
        }
    }
}

impl MovementWorkerConfig {
    pub fn silence_window(&self) -> Duration {
        Duration::from_millis(self.silence_window_ms)
    }
}
