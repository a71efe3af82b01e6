use common::domain::ReadContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// Reads collected for one asset while it is being observed
#[derive(Debug)]
pub struct AssetBuffer {
    buffer_id: u64,
    initial_context: ReadContext,
    reads: Vec<ReadContext>,
    deadline: Instant,
}

impl AssetBuffer {
    fn open(buffer_id: u64, first: ReadContext, deadline: Instant) -> Self {
        Self {
            buffer_id,
            initial_context: first.clone(),
            reads: vec![first],
            deadline,
        }
    }

    pub fn buffer_id(&self) -> u64 {
        self.buffer_id
    }

    /// The first read; supplies policy class, reader and gate for the decision
    pub fn initial_context(&self) -> &ReadContext {
        &self.initial_context
    }

    pub fn reads(&self) -> &[ReadContext] {
        &self.reads
    }

    pub fn into_reads(self) -> Vec<ReadContext> {
        self.reads
    }
}

/// Outcome of appending a read to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// No buffer existed; a new one was opened and needs a silence timer
    Opened { buffer_id: u64, deadline: Instant },
    /// The read joined a live buffer and pushed its deadline out
    Extended { buffer_id: u64 },
}

/// Outcome of a timer asking to close its buffer
#[derive(Debug)]
pub enum CloseAttempt {
    /// Silence window elapsed; the buffer is no longer in the index
    Closed(AssetBuffer),
    /// A read arrived meanwhile; sleep again until the new deadline
    Postponed(Instant),
    /// The buffer this timer belongs to no longer exists
    Gone,
}

/// Live buffers keyed by asset id.
///
/// Appends and closes both take the single index lock, so a read either
/// lands in a buffer that is still live or opens a fresh one. A closed
/// buffer is out of the map before its reads are handed to processing.
#[derive(Debug, Default)]
pub struct BufferIndex {
    buffers: Mutex<HashMap<String, AssetBuffer>>,
    next_buffer_id: AtomicU64,
}

impl BufferIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffers(&self) -> MutexGuard<'_, HashMap<String, AssetBuffer>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a read to its asset's buffer, opening one if needed, and move
    /// the buffer's deadline to `deadline`.
    pub fn append(&self, read: ReadContext, deadline: Instant) -> Appended {
        let mut buffers = self.buffers();

        if let Some(buffer) = buffers.get_mut(&read.asset_id) {
            buffer.reads.push(read);
            buffer.deadline = deadline;
            return Appended::Extended {
                buffer_id: buffer.buffer_id,
            };
        }

        let buffer_id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        buffers.insert(
            read.asset_id.clone(),
            AssetBuffer::open(buffer_id, read, deadline),
        );
        Appended::Opened {
            buffer_id,
            deadline,
        }
    }

    /// Remove the buffer if its deadline has passed.
    ///
    /// `buffer_id` guards against a stale timer closing a newer buffer for
    /// the same asset.
    pub fn close_if_expired(&self, asset_id: &str, buffer_id: u64, now: Instant) -> CloseAttempt {
        let mut buffers = self.buffers();

        match buffers.get(asset_id) {
            Some(buffer) if buffer.buffer_id != buffer_id => CloseAttempt::Gone,
            Some(buffer) if buffer.deadline > now => CloseAttempt::Postponed(buffer.deadline),
            Some(_) => match buffers.remove(asset_id) {
                Some(buffer) => CloseAttempt::Closed(buffer),
                None => CloseAttempt::Gone,
            },
            None => CloseAttempt::Gone,
        }
    }

    /// Number of assets currently being observed
    pub fn open_buffers(&self) -> usize {
        self.buffers().len()
    }

    /// Reads held so far by the asset's live buffer, if any
    pub fn pending_reads(&self, asset_id: &str) -> usize {
        self.buffers()
            .get(asset_id)
            .map(|buffer| buffer.reads.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::domain::AssetPolicyClass;
    use std::time::Duration;

    fn read(asset_id: &str, epc: &str) -> ReadContext {
        ReadContext {
            asset_id: asset_id.to_string(),
            policy_class: AssetPolicyClass::Container,
            epc: epc.to_string(),
            antenna_id: 1,
            timestamp: Utc::now(),
            reader_id: "fx-1".to_string(),
            gate_id: "gate-1".to_string(),
        }
    }

    #[test]
    fn test_first_read_opens_and_later_reads_extend() {
        let index = BufferIndex::new();
        let now = Instant::now();

        let first = index.append(read("a1", "E1"), now + Duration::from_secs(2));
        let Appended::Opened { buffer_id, .. } = first else {
            panic!("expected a new buffer, got {:?}", first);
        };

        let second = index.append(read("a1", "E2"), now + Duration::from_secs(3));
        assert_eq!(second, Appended::Extended { buffer_id });
        assert_eq!(index.open_buffers(), 1);
        assert_eq!(index.pending_reads("a1"), 2);
    }

    #[test]
    fn test_buffers_are_per_asset() {
        let index = BufferIndex::new();
        let deadline = Instant::now() + Duration::from_secs(2);

        index.append(read("a1", "E1"), deadline);
        index.append(read("a2", "E9"), deadline);

        assert_eq!(index.open_buffers(), 2);
        assert_eq!(index.pending_reads("a1"), 1);
        assert_eq!(index.pending_reads("a2"), 1);
        assert_eq!(index.pending_reads("a3"), 0);
    }

    #[test]
    fn test_close_before_deadline_is_postponed() {
        let index = BufferIndex::new();
        let now = Instant::now();
        let later = now + Duration::from_secs(2);

        let Appended::Opened { buffer_id, .. } = index.append(read("a1", "E1"), later) else {
            panic!("expected a new buffer");
        };

        match index.close_if_expired("a1", buffer_id, now) {
            CloseAttempt::Postponed(deadline) => assert_eq!(deadline, later),
            other => panic!("expected postponement, got {:?}", other),
        }
        assert_eq!(index.open_buffers(), 1);
    }

    #[test]
    fn test_close_after_deadline_removes_buffer_with_initial_context() {
        let index = BufferIndex::new();
        let now = Instant::now();

        let Appended::Opened { buffer_id, .. } = index.append(read("a1", "E1"), now) else {
            panic!("expected a new buffer");
        };
        index.append(read("a1", "E2"), now);

        let CloseAttempt::Closed(buffer) = index.close_if_expired("a1", buffer_id, now) else {
            panic!("expected the buffer to close");
        };
        assert_eq!(buffer.buffer_id(), buffer_id);
        assert_eq!(buffer.initial_context().epc, "E1");
        assert_eq!(buffer.reads().len(), 2);
        assert_eq!(index.open_buffers(), 0);

        // A read after closing starts a brand-new buffer
        let reopened = index.append(read("a1", "E3"), now);
        assert!(matches!(
            reopened,
            Appended::Opened { buffer_id: new_id, .. } if new_id != buffer_id
        ));
    }

    #[test]
    fn test_stale_timer_cannot_close_newer_buffer() {
        let index = BufferIndex::new();
        let now = Instant::now();

        let Appended::Opened { buffer_id: old_id, .. } = index.append(read("a1", "E1"), now)
        else {
            panic!("expected a new buffer");
        };
        assert!(matches!(
            index.close_if_expired("a1", old_id, now),
            CloseAttempt::Closed(_)
        ));

        index.append(read("a1", "E2"), now);
        assert!(matches!(
            index.close_if_expired("a1", old_id, now),
            CloseAttempt::Gone
        ));
        assert_eq!(index.open_buffers(), 1);
    }
}
