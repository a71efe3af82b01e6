use crate::domain::result::DomainResult;
use crate::domain::Direction;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name carried by unknown-tag events
pub const UNKNOWN_TAG_NAME: &str = "Unknown Tag";

/// Human-readable event pushed to live observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all_fields = "camelCase")]
pub enum LiveEvent {
    /// A tag was read that belongs to no known asset
    Unknown {
        tag_id: String,
        asset_name: String,
        gate: String,
        location: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// A known asset moved through a gate
    #[serde(rename = "Known")]
    Movement {
        tag_id: Option<String>,
        asset_number: String,
        asset_name: String,
        gate: String,
        location: Option<String>,
        timestamp: DateTime<Utc>,
        direction: Direction,
        message: String,
    },
}

impl LiveEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LiveEvent::Unknown { .. } => "unknown_tag",
            LiveEvent::Movement { .. } => "movement",
        }
    }
}

/// Pushes live events to observers, best effort
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LiveNotifier: Send + Sync {
    async fn notify(&self, event: LiveEvent) -> DomainResult<()>;
}
