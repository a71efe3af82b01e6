use async_trait::async_trait;
use common::domain::{DomainResult, MovementRecord, MovementStore};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only in-memory movement log
#[derive(Clone, Default)]
pub struct InMemoryMovementStore {
    records: Arc<RwLock<Vec<MovementRecord>>>,
}

impl InMemoryMovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record in insertion order
    pub async fn records(&self) -> Vec<MovementRecord> {
        self.records.read().await.clone()
    }

    pub async fn records_for_asset(&self, asset_id: &str) -> Vec<MovementRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|record| record.asset_id == asset_id)
            .cloned()
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl MovementStore for InMemoryMovementStore {
    async fn append(&self, record: MovementRecord) -> DomainResult<()> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }
}
