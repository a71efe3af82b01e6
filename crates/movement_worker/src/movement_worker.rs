use crate::domain::{
    MovementDispatcher, MovementWorkerConfig, NotificationQueue, NotificationWorker,
    ReadAggregator, ReadIngestor, TagAggregator,
};
use crate::mqtt::{run_mqtt_subscriber, MqttSubscriberConfig};
use common::domain::{AssetDirectory, LiveNotifier, MovementStore, ReaderDirectory};
use gatewatch_runner::AppProcess;
use std::sync::Arc;
use tracing::debug;

/// Wires ingestion, aggregation, dispatch and live notifications together
pub struct MovementWorker {
    ingestor: Arc<ReadIngestor>,
    aggregator: TagAggregator,
    notification_worker: NotificationWorker,
    mqtt_config: MqttSubscriberConfig,
}

impl MovementWorker {
    pub fn new(
        reader_directory: Arc<dyn ReaderDirectory>,
        asset_directory: Arc<dyn AssetDirectory>,
        movement_store: Arc<dyn MovementStore>,
        notifier: Arc<dyn LiveNotifier>,
        config: MovementWorkerConfig,
        mqtt_config: MqttSubscriberConfig,
    ) -> Self {
        debug!(
            silence_window_ms = config.silence_window_ms,
            notification_queue_capacity = config.notification_queue_capacity,
            "initializing movement worker"
        );

        let (notifications, notification_worker) =
            NotificationQueue::new(config.notification_queue_capacity, notifier);

        let dispatcher = Arc::new(MovementDispatcher::new(
            Arc::clone(&reader_directory),
            Arc::clone(&asset_directory),
            movement_store,
            Some(notifications.clone()),
        ));

        let aggregator = TagAggregator::new(config.silence_window(), dispatcher);

        let ingestor = Arc::new(ReadIngestor::new(
            reader_directory,
            asset_directory,
            Arc::new(aggregator.clone()) as Arc<dyn ReadAggregator>,
            Some(notifications),
        ));

        Self {
            ingestor,
            aggregator,
            notification_worker,
            mqtt_config,
        }
    }

    /// Direct entry point for batches that do not arrive over MQTT. Ingesting
    /// spawns buffer timers, so it must run inside a tokio runtime.
    pub fn ingestor(&self) -> Arc<ReadIngestor> {
        Arc::clone(&self.ingestor)
    }

    pub fn aggregator(&self) -> &TagAggregator {
        &self.aggregator
    }

    /// Processes to hand to the runner: the MQTT subscriber and the
    /// notification worker
    pub fn into_runner_processes(self) -> Vec<(String, AppProcess)> {
        let mqtt_subscriber: AppProcess = Box::new({
            let ingestor = self.ingestor;
            let config = self.mqtt_config;
            move |ctx| Box::pin(async move { run_mqtt_subscriber(config, ingestor, ctx).await })
        });

        let notification_worker: AppProcess = Box::new({
            let worker = self.notification_worker;
            move |ctx| Box::pin(async move { worker.run(ctx).await })
        });

        vec![
            ("mqtt_subscriber".to_string(), mqtt_subscriber),
            ("notification_worker".to_string(), notification_worker),
        ]
    }
}
