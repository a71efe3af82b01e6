use async_trait::async_trait;
use common::domain::{DomainResult, Gate, Reader, ReaderDirectory};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of ReaderDirectory.
///
/// Readers reference gates by ID, so reconfiguring a gate is visible to every
/// reader assigned to it.
pub struct InMemoryReaderDirectory {
    gates: Arc<RwLock<HashMap<String, Gate>>>,
    readers: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl InMemoryReaderDirectory {
    pub fn new() -> Self {
        Self {
            gates: Arc::new(RwLock::new(HashMap::new())),
            readers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn upsert_gate(&self, gate: Gate) {
        let mut gates = self.gates.write().await;
        gates.insert(gate.gate_id.clone(), gate);
    }

    /// Register a reader, optionally assigned to a gate
    pub async fn register_reader(&self, reader_id: impl Into<String>, gate_id: Option<String>) {
        let mut readers = self.readers.write().await;
        readers.insert(reader_id.into(), gate_id);
    }

    pub async fn remove_reader(&self, reader_id: &str) -> bool {
        let mut readers = self.readers.write().await;
        readers.remove(reader_id).is_some()
    }
}

impl Default for InMemoryReaderDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReaderDirectory for InMemoryReaderDirectory {
    async fn resolve_reader(&self, sensor_id: &str) -> DomainResult<Option<Reader>> {
        let readers = self.readers.read().await;
        let Some(gate_id) = readers.get(sensor_id) else {
            return Ok(None);
        };

        let gate = match gate_id {
            Some(gate_id) => self.gates.read().await.get(gate_id).cloned(),
            None => None,
        };

        Ok(Some(Reader {
            reader_id: sensor_id.to_string(),
            gate,
        }))
    }

    async fn get_gate(&self, gate_id: &str) -> DomainResult<Option<Gate>> {
        let gates = self.gates.read().await;
        Ok(gates.get(gate_id).cloned())
    }
}
