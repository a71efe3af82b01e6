use crate::domain::result::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A storage location a gate leads into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: String,
    pub name: String,
}

/// A physical transit point instrumented with one or more readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub gate_id: String,
    pub name: String,
    pub is_active: bool,
    pub location: Option<Location>,
}

/// A registered RFID reader, identified by the sensor id it reports under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reader {
    pub reader_id: String,
    pub gate: Option<Gate>,
}

/// Resolves readers and gates
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReaderDirectory: Send + Sync {
    /// Resolve a sensor id to its registered reader, including its gate
    async fn resolve_reader(&self, sensor_id: &str) -> DomainResult<Option<Reader>>;

    /// Get a gate by ID with its current configuration
    async fn get_gate(&self, gate_id: &str) -> DomainResult<Option<Gate>>;
}
