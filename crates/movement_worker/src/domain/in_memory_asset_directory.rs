use async_trait::async_trait;
use common::domain::{Asset, AssetDirectory, DomainError, DomainResult, LocationUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of AssetDirectory using HashMap
pub struct InMemoryAssetDirectory {
    assets: Arc<RwLock<HashMap<String, Asset>>>,
}

impl InMemoryAssetDirectory {
    pub fn new() -> Self {
        Self {
            assets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn upsert_asset(&self, asset: Asset) {
        let mut assets = self.assets.write().await;
        assets.insert(asset.asset_id.clone(), asset);
    }

    pub async fn remove_asset(&self, asset_id: &str) -> Option<Asset> {
        let mut assets = self.assets.write().await;
        assets.remove(asset_id)
    }

    pub async fn count(&self) -> usize {
        self.assets.read().await.len()
    }
}

impl Default for InMemoryAssetDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetDirectory for InMemoryAssetDirectory {
    async fn resolve_asset_by_tag(&self, epc: &str) -> DomainResult<Option<Asset>> {
        let assets = self.assets.read().await;
        Ok(assets.values().find(|asset| asset.carries_tag(epc)).cloned())
    }

    async fn get_asset(&self, asset_id: &str) -> DomainResult<Option<Asset>> {
        let assets = self.assets.read().await;
        Ok(assets.get(asset_id).cloned())
    }

    async fn set_current_location(&self, update: LocationUpdate) -> DomainResult<()> {
        let mut assets = self.assets.write().await;
        let asset = assets
            .get_mut(&update.asset_id)
            .ok_or_else(|| DomainError::AssetNotFound(update.asset_id.clone()))?;

        asset.current_location_id = Some(update.location_id);
        asset.last_discovered_at = Some(update.seen_at);
        asset.last_discovered_by = Some(update.seen_by);
        Ok(())
    }
}
