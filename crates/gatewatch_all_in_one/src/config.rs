use config::{Config, ConfigError, Environment};
use movement_worker::mqtt::MqttSubscriberConfig;
use movement_worker::MovementWorkerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON; plain text otherwise
    #[serde(default = "default_log_json")]
    pub log_json: bool,

    // Aggregation configuration
    /// Quiet period that closes an asset buffer, in milliseconds
    #[serde(default = "default_silence_window_ms")]
    pub silence_window_ms: u64,

    /// Live events buffered ahead of the notifier
    #[serde(default = "default_notification_queue_capacity")]
    pub notification_queue_capacity: usize,

    // MQTT configuration
    /// MQTT broker URL
    #[serde(default = "default_mqtt_broker_url")]
    pub mqtt_broker_url: String,

    /// MQTT client ID
    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,

    /// Reader topic filter
    #[serde(default = "default_mqtt_topic")]
    pub mqtt_topic: String,

    /// Delay between MQTT reconnection attempts in seconds
    #[serde(default = "default_mqtt_retry_delay_secs")]
    pub mqtt_retry_delay_secs: u64,

    /// Consecutive MQTT connection failures before giving up
    #[serde(default = "default_mqtt_max_retry_attempts")]
    pub mqtt_max_retry_attempts: u32,

    /// JSON file with locations, gates, readers and assets
    #[serde(default)]
    pub directory_seed_path: Option<String>,

    /// Time allowed for cleanup after shutdown in seconds
    #[serde(default = "default_closer_timeout_secs")]
    pub closer_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    true
}

fn default_silence_window_ms() -> u64 {
    2000
}

fn default_notification_queue_capacity() -> usize {
    1024
}

// MQTT defaults
fn default_mqtt_broker_url() -> String {
    "mqtt://localhost:1883".to_string()
}

fn default_mqtt_client_id() -> String {
    "gatewatch".to_string()
}

fn default_mqtt_topic() -> String {
    "zebra/+/data".to_string()
}

fn default_mqtt_retry_delay_secs() -> u64 {
    5
}

fn default_mqtt_max_retry_attempts() -> u32 {
    10
}

fn default_closer_timeout_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("GATEWATCH"))
            .build()?
            .try_deserialize()
    }

    pub fn movement_worker_config(&self) -> MovementWorkerConfig {
        MovementWorkerConfig {
            silence_window_ms: self.silence_window_ms,
            notification_queue_capacity: self.notification_queue_capacity,
        }
    }

    pub fn mqtt_subscriber_config(&self) -> MqttSubscriberConfig {
        MqttSubscriberConfig {
            broker_url: self.mqtt_broker_url.clone(),
            client_id: self.mqtt_client_id.clone(),
            topic: self.mqtt_topic.clone(),
            retry_delay_secs: self.mqtt_retry_delay_secs,
            max_retry_attempts: self.mqtt_max_retry_attempts,
        }
    }

    pub fn closer_timeout(&self) -> Duration {
        Duration::from_secs(self.closer_timeout_secs)
    }
}
