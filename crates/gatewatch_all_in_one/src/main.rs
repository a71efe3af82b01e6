mod config;

use common::domain::{AssetDirectory, ReaderDirectory};
use common::telemetry::{init_telemetry, TelemetryConfig};
use config::ServiceConfig;
use gatewatch_runner::Runner;
use movement_worker::{
    DirectorySeed, InMemoryAssetDirectory, InMemoryMovementStore, InMemoryReaderDirectory,
    MovementWorker, TracingLiveNotifier,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: "gatewatch".to_string(),
        log_level: config.log_level.clone(),
        json: config.log_json,
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(
        mqtt_broker_url = %config.mqtt_broker_url,
        mqtt_topic = %config.mqtt_topic,
        silence_window_ms = config.silence_window_ms,
        "Starting gatewatch service"
    );
    debug!("Configuration: {:?}", config);

    let (reader_directory, asset_directory) = match load_directories(&config).await {
        Ok(directories) => directories,
        Err(e) => {
            error!("Failed to load directories: {:#}", e);
            std::process::exit(1);
        }
    };

    let movement_store = InMemoryMovementStore::new();

    let movement_worker = MovementWorker::new(
        reader_directory,
        asset_directory,
        Arc::new(movement_store.clone()),
        Arc::new(TracingLiveNotifier::new()),
        config.movement_worker_config(),
        config.mqtt_subscriber_config(),
    );

    let mut runner = Runner::new();
    for (name, process) in movement_worker.into_runner_processes() {
        runner = runner.with_named_process(name, process);
    }

    runner = with_movement_store_closer(runner, movement_store)
        .with_closer_timeout(config.closer_timeout());

    if let Err(e) = runner.run().await {
        error!("Service stopped with error: {:#}", e);
        std::process::exit(1);
    }
}

/// Log how many movements were recorded once every process has stopped
fn with_movement_store_closer(runner: Runner, movement_store: InMemoryMovementStore) -> Runner {
    runner.with_closer(move || async move {
        let movements_recorded = movement_store.count().await;
        info!(movements_recorded, "movement store closed");
        Ok(())
    })
}

async fn load_directories(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn ReaderDirectory>, Arc<dyn AssetDirectory>)> {
    let Some(path) = &config.directory_seed_path else {
        warn!("no directory seed configured, every reader will be rejected");
        return Ok((
            Arc::new(InMemoryReaderDirectory::new()),
            Arc::new(InMemoryAssetDirectory::new()),
        ));
    };

    info!(path = %path, "loading directory seed");
    let (readers, assets) = DirectorySeed::load_from_path(path)?.into_directories().await?;
    Ok((Arc::new(readers), Arc::new(assets)))
}
