use crate::domain::{DecisionSink, KeyedLock, NotificationQueue};
use async_trait::async_trait;
use common::domain::{
    AssetDirectory, DomainResult, LiveEvent, LocationUpdate, MovementDecision, MovementRecord,
    MovementStore, ReaderDirectory,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Turns closed-buffer decisions into persisted movements
///
/// Flow, under the asset's dispatch lock:
/// 1. Re-fetch the asset and gate (either may have changed since buffering)
/// 2. Persist the movement record
/// 3. Move the asset to the gate's location
/// 4. Publish a live movement event, best effort
pub struct MovementDispatcher {
    reader_directory: Arc<dyn ReaderDirectory>,
    asset_directory: Arc<dyn AssetDirectory>,
    movement_store: Arc<dyn MovementStore>,
    notifications: Option<NotificationQueue>,
    asset_locks: KeyedLock,
}

impl MovementDispatcher {
    pub fn new(
        reader_directory: Arc<dyn ReaderDirectory>,
        asset_directory: Arc<dyn AssetDirectory>,
        movement_store: Arc<dyn MovementStore>,
        notifications: Option<NotificationQueue>,
    ) -> Self {
        Self {
            reader_directory,
            asset_directory,
            movement_store,
            notifications,
            asset_locks: KeyedLock::new(),
        }
    }

    /// Dispatch one decision. Returns the persisted record, or `None` when the
    /// asset or gate disappeared (or the gate lost its location) in the meantime.
    #[instrument(
        skip(self, decision),
        fields(asset_id = %decision.asset_id, gate_id = %decision.gate_id, direction = %decision.direction)
    )]
    pub async fn dispatch_decision(
        &self,
        decision: MovementDecision,
    ) -> DomainResult<Option<MovementRecord>> {
        let _guard = self.asset_locks.lock(&decision.asset_id).await;

        // 1. Re-fetch asset and gate
        let Some(asset) = self.asset_directory.get_asset(&decision.asset_id).await? else {
            warn!("asset no longer exists, dropping movement");
            return Ok(None);
        };

        let Some(gate) = self.reader_directory.get_gate(&decision.gate_id).await? else {
            warn!("gate no longer exists, dropping movement");
            return Ok(None);
        };

        let Some(location) = gate.location.clone() else {
            warn!(gate_name = %gate.name, "gate has no location, dropping movement");
            return Ok(None);
        };

        let record = MovementRecord {
            asset_id: asset.asset_id.clone(),
            from_location_id: asset.current_location_id.clone(),
            to_location_id: location.location_id.clone(),
            gate_id: gate.gate_id.clone(),
            reader_id: decision.reader_id.clone(),
            timestamp: decision.timestamp,
            direction: decision.direction,
        };

        // 2. Persist
        self.movement_store.append(record.clone()).await?;

        // 3. Update current location. The record stays persisted if this fails,
        // so the asset keeps its previous location until its next movement.
        if let Err(e) = self
            .asset_directory
            .set_current_location(LocationUpdate {
                asset_id: asset.asset_id.clone(),
                location_id: location.location_id.clone(),
                seen_at: decision.timestamp,
                seen_by: format!("{} ({})", gate.name, decision.reader_id),
            })
            .await
        {
            error!(
                from_location_id = ?record.from_location_id,
                to_location_id = %record.to_location_id,
                reader_id = %record.reader_id,
                timestamp = %record.timestamp,
                error = %e,
                "movement persisted but location update failed"
            );
            return Err(e);
        }

        info!(
            asset_number = %asset.asset_number,
            asset_name = %asset.name,
            from_location_id = ?record.from_location_id,
            to_location_id = %record.to_location_id,
            message = %decision.validation_message,
            "asset moved"
        );

        // 4. Notify
        match &self.notifications {
            Some(queue) => queue.publish(LiveEvent::Movement {
                tag_id: asset.tag_identifier.clone(),
                asset_number: asset.asset_number.clone(),
                asset_name: asset.name.clone(),
                gate: gate.name.clone(),
                location: Some(location.name),
                timestamp: decision.timestamp,
                direction: decision.direction,
                message: decision.validation_message,
            }),
            None => debug!("no notification queue configured"),
        }

        Ok(Some(record))
    }
}

#[async_trait]
impl DecisionSink for MovementDispatcher {
    async fn dispatch(&self, decision: MovementDecision) -> DomainResult<()> {
        self.dispatch_decision(decision).await.map(|_| ())
    }
}
