use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type LockTable = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Async mutual exclusion per key.
///
/// Holders of different keys never contend. Entries are dropped from the
/// table once their last guard or waiter goes away.
#[derive(Debug, Clone, Default)]
pub struct KeyedLock {
    table: LockTable,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyedLockGuard {
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(key.to_string()).or_default())
        };

        let guard = slot.lock_owned().await;
        KeyedLockGuard {
            key: key.to_string(),
            table: Arc::clone(&self.table),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited
    pub fn active_keys(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct KeyedLockGuard {
    key: String,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Release while holding the table lock so no new waiter can slip in
        // between the release and the prune check.
        drop(self.guard.take());

        if let Some(slot) = table.get(&self.key) {
            // Only the table still references the slot
            if Arc::strong_count(slot) == 1 {
                table.remove(&self.key);
            }
        }
    }
}
