use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many distinct tags an asset must show for a read to count as complete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPolicyClass {
    Container,
    Vehicle,
    #[default]
    Normal,
}

impl AssetPolicyClass {
    /// Derive the policy class from an asset's free-text category.
    ///
    /// Matching is case-insensitive and by substring, so "Shipping Container"
    /// and "vehicle/forklift" both classify. Anything else is `Normal`.
    pub fn from_category(category: Option<&str>) -> Self {
        let Some(category) = category else {
            return Self::Normal;
        };
        let category = category.to_lowercase();
        if category.contains("container") {
            Self::Container
        } else if category.contains("vehicle") {
            Self::Vehicle
        } else {
            Self::Normal
        }
    }

    /// Minimum number of distinct EPCs required for a complete read
    pub fn required_tags(&self) -> usize {
        match self {
            Self::Container => 3,
            Self::Vehicle => 2,
            Self::Normal => 1,
        }
    }
}

impl fmt::Display for AssetPolicyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "Container"),
            Self::Vehicle => write!(f, "Vehicle"),
            Self::Normal => write!(f, "Normal"),
        }
    }
}

/// Tracked asset as known to the asset directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub asset_number: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Primary tag identifier
    #[serde(default)]
    pub tag_identifier: Option<String>,
    /// Additional tags mounted on the same asset
    #[serde(default)]
    pub additional_tags: Vec<String>,
    #[serde(default)]
    pub current_location_id: Option<String>,
    #[serde(default)]
    pub last_discovered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_discovered_by: Option<String>,
}

impl Asset {
    pub fn policy_class(&self) -> AssetPolicyClass {
        AssetPolicyClass::from_category(self.category.as_deref())
    }

    /// Whether the EPC is the primary tag or one of the additional tags
    pub fn carries_tag(&self, epc: &str) -> bool {
        self.tag_identifier
            .as_deref()
            .is_some_and(|tag| tag.eq_ignore_ascii_case(epc))
            || self
                .additional_tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(epc))
    }
}

/// Input for moving an asset to a new current location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationUpdate {
    pub asset_id: String,
    pub location_id: String,
    pub seen_at: DateTime<Utc>,
    pub seen_by: String,
}

/// Resolves tags to assets and tracks their current location
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    /// Find the asset carrying the given tag (primary or additional)
    async fn resolve_asset_by_tag(&self, epc: &str) -> DomainResult<Option<Asset>>;

    /// Get an asset by ID (excludes deleted assets)
    async fn get_asset(&self, asset_id: &str) -> DomainResult<Option<Asset>>;

    /// Overwrite the asset's current location and last-seen fields
    async fn set_current_location(&self, update: LocationUpdate) -> DomainResult<()>;
}
