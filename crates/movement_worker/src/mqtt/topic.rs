use common::domain::{DomainError, DomainResult};

/// Channel carrying tag-data events
pub const DATA_CHANNEL: &str = "data";

/// Parsed reader topic `{prefix}/{sensor_id}/{channel...}`
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTopic {
    pub prefix: String,
    pub sensor_id: String,
    /// Remaining segments, e.g. `data`, `events` or `ctrl/res`
    pub channel: String,
}

impl ParsedTopic {
    pub fn is_data(&self) -> bool {
        self.channel == DATA_CHANNEL
    }
}

/// Parse a reader topic such as `zebra/FX000000/data`
///
/// # Examples
/// ```
/// use movement_worker::mqtt::parse_topic;
///
/// let parsed = parse_topic("zebra/FX000000/data").unwrap();
/// assert_eq!(parsed.sensor_id, "FX000000");
/// assert!(parsed.is_data());
/// ```
pub fn parse_topic(topic: &str) -> DomainResult<ParsedTopic> {
    let mut parts = topic.splitn(3, '/');
    let (Some(prefix), Some(sensor_id), Some(channel)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(DomainError::InvalidTopic(format!(
            "'{}': expected '{{prefix}}/{{sensor_id}}/{{channel}}'",
            topic
        )));
    };

    let sensor_id = sensor_id.trim();
    if sensor_id.is_empty() {
        return Err(DomainError::InvalidTopic(format!(
            "'{}': sensor id cannot be empty",
            topic
        )));
    }

    let channel = channel.trim();
    if channel.is_empty() {
        return Err(DomainError::InvalidTopic(format!(
            "'{}': channel cannot be empty",
            topic
        )));
    }

    Ok(ParsedTopic {
        prefix: prefix.trim().to_string(),
        sensor_id: sensor_id.to_string(),
        channel: channel.to_string(),
    })
}
