use crate::domain::{NotificationQueue, ReadAggregator};
use common::domain::{
    AssetDirectory, DomainError, DomainResult, Gate, LiveEvent, ReadContext, ReaderDirectory,
    TagRead, UNKNOWN_TAG_NAME,
};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Per-batch outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Reads handed to the aggregator
    pub buffered: usize,
    /// Reads whose tag belongs to no asset
    pub unknown: usize,
    /// Reads that could not be resolved
    pub failed: usize,
}

/// Entry point for raw tag-read batches from one sensor.
///
/// Validates the sensor's reader and gate once per batch, then routes each
/// read: known assets go to the aggregator, unknown tags are reported
/// straight away.
pub struct ReadIngestor {
    reader_directory: Arc<dyn ReaderDirectory>,
    asset_directory: Arc<dyn AssetDirectory>,
    aggregator: Arc<dyn ReadAggregator>,
    notifications: Option<NotificationQueue>,
}

impl ReadIngestor {
    pub fn new(
        reader_directory: Arc<dyn ReaderDirectory>,
        asset_directory: Arc<dyn AssetDirectory>,
        aggregator: Arc<dyn ReadAggregator>,
        notifications: Option<NotificationQueue>,
    ) -> Self {
        Self {
            reader_directory,
            asset_directory,
            aggregator,
            notifications,
        }
    }

    /// Ingest a batch of reads from `sensor_id`.
    ///
    /// A sensor that is unregistered, has no gate, or whose gate is inactive
    /// or has no location rejects the whole batch with a configuration error.
    #[instrument(skip(self, reads), fields(sensor_id = %sensor_id, read_count = reads.len()))]
    pub async fn ingest(&self, sensor_id: &str, reads: Vec<TagRead>) -> DomainResult<IngestSummary> {
        let mut summary = IngestSummary::default();
        if reads.is_empty() {
            return Ok(summary);
        }

        let (reader_id, gate) = self.resolve_gate(sensor_id).await?;
        debug!(gate_id = %gate.gate_id, gate_name = %gate.name, "processing tag reads");

        for read in reads {
            let asset = match self.asset_directory.resolve_asset_by_tag(&read.epc).await {
                Ok(asset) => asset,
                Err(e) => {
                    error!(epc = %read.epc, error = %e, "failed to resolve tag");
                    summary.failed += 1;
                    continue;
                }
            };

            match asset {
                Some(asset) => {
                    debug!(epc = %read.epc, asset_id = %asset.asset_id, antenna_id = read.antenna_id, "buffering read");
                    self.aggregator.add_read(ReadContext {
                        policy_class: asset.policy_class(),
                        asset_id: asset.asset_id,
                        epc: read.epc,
                        antenna_id: read.antenna_id,
                        timestamp: read.timestamp,
                        reader_id: reader_id.clone(),
                        gate_id: gate.gate_id.clone(),
                    });
                    summary.buffered += 1;
                }
                None => {
                    self.report_unknown_tag(read, &gate);
                    summary.unknown += 1;
                }
            }
        }

        debug!(
            buffered = summary.buffered,
            unknown = summary.unknown,
            failed = summary.failed,
            "batch ingested"
        );
        Ok(summary)
    }

    async fn resolve_gate(&self, sensor_id: &str) -> DomainResult<(String, Gate)> {
        let reader = self
            .reader_directory
            .resolve_reader(sensor_id)
            .await?
            .ok_or_else(|| DomainError::ReaderNotRegistered(sensor_id.to_string()))?;

        let gate = reader
            .gate
            .ok_or_else(|| DomainError::ReaderWithoutGate(reader.reader_id.clone()))?;

        if !gate.is_active {
            return Err(DomainError::GateInactive(gate.gate_id));
        }
        if gate.location.is_none() {
            return Err(DomainError::GateWithoutLocation(gate.gate_id));
        }

        Ok((reader.reader_id, gate))
    }

    fn report_unknown_tag(&self, read: TagRead, gate: &Gate) {
        warn!(epc = %read.epc, gate_name = %gate.name, "unregistered tag");

        if let Some(queue) = &self.notifications {
            queue.publish(LiveEvent::Unknown {
                tag_id: read.epc,
                asset_name: UNKNOWN_TAG_NAME.to_string(),
                gate: gate.name.clone(),
                location: gate.location.as_ref().map(|l| l.name.clone()),
                timestamp: read.timestamp,
            });
        }
    }
}
