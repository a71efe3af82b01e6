use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of travel through a gate, inferred from antenna sequencing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Direction {
    In,
    Out,
    Unknown,
    /// First and last antenna differ but are not the 1/2 pair
    Transition { from: u16, to: u16 },
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Transition { from, to } => write!(f, "{}->{}", from, to),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "UNKNOWN" => Ok(Self::Unknown),
            other => {
                let (from, to) = other
                    .split_once("->")
                    .ok_or_else(|| format!("unknown direction '{}'", s))?;
                let from = from
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| format!("invalid antenna in direction '{}'", s))?;
                let to = to
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| format!("invalid antenna in direction '{}'", s))?;
                Ok(Self::Transition { from, to })
            }
        }
    }
}

impl From<Direction> for String {
    fn from(direction: Direction) -> Self {
        direction.to_string()
    }
}

impl TryFrom<String> for Direction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Outcome of closing one asset buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementDecision {
    pub asset_id: String,
    pub reader_id: String,
    pub gate_id: String,
    pub direction: Direction,
    /// Whether enough distinct tags were seen for the asset's policy class
    pub is_complete: bool,
    pub validation_message: String,
    /// Distinct EPCs observed across the whole buffer
    pub tag_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Persisted record of an asset passing through a gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub asset_id: String,
    pub from_location_id: Option<String>,
    pub to_location_id: String,
    pub gate_id: String,
    pub reader_id: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
}

/// Append-only store of movement records
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MovementStore: Send + Sync {
    async fn append(&self, record: MovementRecord) -> DomainResult<()>;
}
