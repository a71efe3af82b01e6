use crate::domain::ReadIngestor;
use crate::mqtt::{decode_tag_reads, parse_topic};
use common::domain::{DomainError, DomainResult};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument, Span};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttSubscriberConfig {
    /// Broker address: `mqtt://host:port`, `tcp://host:port` or `host:port`
    pub broker_url: String,

    pub client_id: String,

    /// Subscription filter (default: `zebra/+/data`)
    pub topic: String,

    /// Delay before reconnecting after a connection error (default: 5 seconds)
    pub retry_delay_secs: u64,

    /// Consecutive connection failures tolerated before giving up (default: 10)
    pub max_retry_attempts: u32,
}

impl Default for MqttSubscriberConfig {
    fn default() -> Self {
        Self {
            broker_url: "mqtt://localhost:1883".to_string(),
            client_id: "gatewatch".to_string(),
            topic: "zebra/+/data".to_string(),
            retry_delay_secs: 5,
            max_retry_attempts: 10,
        }
    }
}

impl MqttSubscriberConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Run the MQTT subscriber until cancelled.
///
/// Subscribes to the configured reader topic and feeds every tag-data
/// message into the ingestor. Connection errors are retried; the process
/// fails once `max_retry_attempts` consecutive attempts have failed.
#[instrument(
    name = "mqtt_subscriber",
    skip_all,
    fields(broker_url = %config.broker_url, topic = %config.topic)
)]
pub async fn run_mqtt_subscriber(
    config: MqttSubscriberConfig,
    ingestor: Arc<ReadIngestor>,
    token: CancellationToken,
) -> anyhow::Result<()> {
    info!("starting MQTT subscriber");

    let mut retry_count = 0;

    loop {
        if token.is_cancelled() {
            debug!("MQTT subscriber cancelled before connection");
            break;
        }

        match run_mqtt_connection(&config, &ingestor, &token, &mut retry_count).await {
            Ok(()) => {
                debug!("MQTT subscriber stopped cleanly");
                break;
            }
            Err(e) => {
                error!(error = %e, "MQTT connection error");

                retry_count += 1;
                if retry_count >= config.max_retry_attempts {
                    error!(
                        max_retries = config.max_retry_attempts,
                        "max retry attempts reached, stopping MQTT subscriber"
                    );
                    return Err(anyhow::anyhow!(
                        "MQTT subscriber gave up after {} attempts: {}",
                        retry_count,
                        e
                    ));
                }

                warn!(
                    attempt = retry_count,
                    max_attempts = config.max_retry_attempts,
                    "retrying MQTT connection"
                );

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(config.retry_delay()) => {}
                }
            }
        }
    }

    info!("MQTT subscriber stopped");
    Ok(())
}

/// Run a single MQTT connection session
async fn run_mqtt_connection(
    config: &MqttSubscriberConfig,
    ingestor: &ReadIngestor,
    token: &CancellationToken,
    retry_count: &mut u32,
) -> DomainResult<()> {
    let (host, port) = parse_broker_url(&config.broker_url)?;

    let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    client
        .subscribe(&config.topic, QoS::AtLeastOnce)
        .await
        .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!("Failed to subscribe: {}", e)))?;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("shutdown signal received");
                let _ = client.disconnect().await;
                return Ok(());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        handle_mqtt_message(ingestor, &publish.topic, &publish.payload).await;
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        info!(topic = %config.topic, "subscribed to MQTT topic");
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                        *retry_count = 0;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return Err(DomainError::RepositoryError(
                            anyhow::anyhow!("MQTT event loop error: {}", e),
                        ));
                    }
                }
            }
        }
    }
}

/// Handle an incoming MQTT message
///
/// Each message gets its own root span. Messages on channels other than
/// `data` are ignored; undecodable payloads are logged and dropped.
pub(crate) async fn handle_mqtt_message(ingestor: &ReadIngestor, topic: &str, payload: &[u8]) {
    let span = info_span!(
        parent: Span::none(),
        "mqtt_message",
        topic = %topic,
        payload_size = payload.len(),
        sensor_id = tracing::field::Empty,
    );

    async {
        let parsed = match parse_topic(topic) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to parse MQTT topic, skipping message");
                return;
            }
        };

        Span::current().record("sensor_id", parsed.sensor_id.as_str());

        if !parsed.is_data() {
            debug!(channel = %parsed.channel, "ignoring non-data channel");
            return;
        }

        let reads = match decode_tag_reads(payload, chrono::Utc::now()) {
            Ok(reads) => reads,
            Err(e) => {
                warn!(error = %e, "failed to decode tag data, skipping message");
                return;
            }
        };

        match ingestor.ingest(&parsed.sensor_id, reads).await {
            Ok(summary) => debug!(
                buffered = summary.buffered,
                unknown = summary.unknown,
                failed = summary.failed,
                "tag data ingested"
            ),
            Err(e) if e.is_configuration_error() => {
                warn!(error = %e, "batch rejected by reader configuration");
            }
            Err(e) => error!(error = %e, "failed to ingest tag data"),
        }
    }
    .instrument(span)
    .await
}

/// Parse broker URL in format mqtt://host:port or tcp://host:port or host:port
fn parse_broker_url(url: &str) -> DomainResult<(&str, u16)> {
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    match url.split_once(':') {
        None if !url.is_empty() => Ok((url, 1883)),
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse::<u16>().map_err(|_| {
                DomainError::InvalidBrokerUrl(format!("invalid port in broker URL: {}", port))
            })?;
            Ok((host, port))
        }
        _ => Err(DomainError::InvalidBrokerUrl(format!(
            "invalid broker URL format: {}",
            url
        ))),
    }
}
