use async_trait::async_trait;
use common::domain::{DomainResult, LiveEvent, LiveNotifier};
use tracing::info;

/// Writes each live event as a structured log record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLiveNotifier;

impl TracingLiveNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LiveNotifier for TracingLiveNotifier {
    async fn notify(&self, event: LiveEvent) -> DomainResult<()> {
        let payload = serde_json::to_string(&event).map_err(anyhow::Error::from)?;
        info!(kind = event.kind(), payload = %payload, "live event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::domain::Direction;

    #[tokio::test]
    async fn test_notify_accepts_both_event_shapes() {
        let notifier = TracingLiveNotifier::new();

        let unknown = LiveEvent::Unknown {
            tag_id: "EFFF".to_string(),
            asset_name: "Unknown Tag".to_string(),
            gate: "Dock 1".to_string(),
            location: None,
            timestamp: Utc::now(),
        };
        let movement = LiveEvent::Movement {
            tag_id: None,
            asset_number: "A-1".to_string(),
            asset_name: "Forklift".to_string(),
            gate: "Dock 1".to_string(),
            location: Some("Warehouse".to_string()),
            timestamp: Utc::now(),
            direction: Direction::Transition { from: 3, to: 4 },
            message: "OK".to_string(),
        };

        assert!(notifier.notify(unknown).await.is_ok());
        assert!(notifier.notify(movement).await.is_ok());
    }
}
