use chrono::{DateTime, NaiveDateTime, Utc};
use common::domain::{DomainError, DomainResult, TagRead};
use serde::Deserialize;

/// One tag-data event as published by the reader on its data channel
#[derive(Debug, Deserialize)]
struct TagDataEvent {
    #[serde(default)]
    timestamp: Option<String>,
    data: TagData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagData {
    id_hex: String,
    #[serde(default)]
    antenna: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagDataPayload {
    Batch(Vec<TagDataEvent>),
    Single(TagDataEvent),
}

/// Decode a data-channel payload (one event or an array of events).
///
/// Events without a timestamp are stamped with `received_at`. A missing
/// antenna decodes as antenna 0, which never maps to a direction.
pub fn decode_tag_reads(payload: &[u8], received_at: DateTime<Utc>) -> DomainResult<Vec<TagRead>> {
    let decoded: TagDataPayload = serde_json::from_slice(payload)
        .map_err(|e| DomainError::InvalidTagPayload(e.to_string()))?;

    let events = match decoded {
        TagDataPayload::Batch(events) => events,
        TagDataPayload::Single(event) => vec![event],
    };

    events
        .into_iter()
        .map(|event| {
            let timestamp = match event.timestamp.as_deref() {
                Some(raw) => parse_timestamp(raw)?,
                None => received_at,
            };
            let epc = event.data.id_hex.trim().to_string();
            if epc.is_empty() {
                return Err(DomainError::InvalidTagPayload(
                    "idHex cannot be empty".to_string(),
                ));
            }
            Ok(TagRead {
                epc,
                antenna_id: event.data.antenna.unwrap_or_default(),
                timestamp,
            })
        })
        .collect()
}

/// Readers emit RFC 3339, sometimes with a `+0000` style offset
fn parse_timestamp(raw: &str) -> DomainResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| DomainError::InvalidTagPayload(format!("invalid timestamp '{}'", raw)))
}
