use crate::domain::AssetPolicyClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tag observation as delivered by the reader transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRead {
    pub epc: String,
    pub antenna_id: u16,
    pub timestamp: DateTime<Utc>,
}

/// A tag read enriched with the asset and gate it was resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadContext {
    pub asset_id: String,
    pub policy_class: AssetPolicyClass,
    pub epc: String,
    pub antenna_id: u16,
    pub timestamp: DateTime<Utc>,
    pub reader_id: String,
    pub gate_id: String,
}
