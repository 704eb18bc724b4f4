//! Data models for Clipboard Hub.
//!
//! Wire shapes for clipboard entries, connected devices, denylist listings
//! and HTTP request/response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of the protected clipboard that always exists.
pub const DEFAULT_CLIPBOARD_ID: &str = "default";

/// Content of the protected clipboard at startup.
pub const DEFAULT_CLIPBOARD_CONTENT: &str = "Welcome to the shared clipboard!";

/// Display label of the protected clipboard at startup.
pub const DEFAULT_CLIPBOARD_NAME: &str = "Default";

/// Metadata keys owned by the session record itself.
///
/// Values submitted under these keys are discarded so the flattened
/// serialization never carries duplicate fields.
pub const RESERVED_METADATA_KEYS: &[&str] = &["id", "ip", "connectedAt"];

/// A named clipboard entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContentEntry {
    /// The protected entry every store starts with.
    #[must_use]
    pub fn default_entry() -> Self {
        Self {
            id: DEFAULT_CLIPBOARD_ID.to_string(),
            content: DEFAULT_CLIPBOARD_CONTENT.to_string(),
            name: Some(DEFAULT_CLIPBOARD_NAME.to_string()),
        }
    }
}

/// A single device-supplied metadata value.
///
/// Devices may only attach primitive values; anything else is dropped
/// when the metadata is converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl MetadataValue {
    /// Convert a JSON value, rejecting nulls, arrays and objects.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(b)),
            serde_json::Value::Number(n) => Some(Self::Number(n)),
            serde_json::Value::String(s) => Some(Self::String(s)),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

/// Device metadata keyed by attribute name.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Build device metadata from a raw JSON object.
///
/// Non-primitive values and reserved keys are skipped.
#[must_use]
pub fn metadata_from_json(object: serde_json::Map<String, serde_json::Value>) -> Metadata {
    object
        .into_iter()
        .filter(|(key, _)| !RESERVED_METADATA_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| MetadataValue::from_json(value).map(|v| (key, v)))
        .collect()
}

/// A registered device connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSession {
    /// Session identifier, equal to the channel identifier.
    #[serde(rename = "id")]
    pub session_id: String,
    pub ip: String,
    #[serde(flatten)]
    pub metadata: Metadata,
    #[serde(rename = "connectedAt", serialize_with = "iso_millis::serialize")]
    pub connected_at: DateTime<Utc>,
}

/// One row of the denylist listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenialView {
    pub ip: String,
    #[serde(rename = "kickTime", serialize_with = "iso_millis::serialize")]
    pub effective_from: DateTime<Utc>,
    #[serde(rename = "remainingHours")]
    pub remaining_hours: f64,
}

/// Request body for `POST /api/clipboards`.
#[derive(Debug, Deserialize)]
pub struct UpsertContentRequest {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body for `POST /admin/blacklist`.
///
/// Both fields are optional at the serde level so a missing field maps to
/// a validation error instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct BanRequest {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hours: Option<f64>,
}

/// Generic success body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self { success: true }
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    #[must_use]
    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_content_entry_omits_absent_name() {
        let entry = ContentEntry {
            id: "notes".to_string(),
            content: "hello".to_string(),
            name: None,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, json!({"id": "notes", "content": "hello"}));
    }

    #[test]
    fn test_metadata_drops_non_primitive_and_reserved_keys() {
        let raw = json!({
            "deviceName": "laptop",
            "screenWidth": 1920,
            "mobile": false,
            "nested": {"a": 1},
            "list": [1, 2],
            "nothing": null,
            "id": "spoofed",
            "ip": "6.6.6.6",
        });
        let object = raw.as_object().cloned().unwrap();

        let metadata = metadata_from_json(object);

        assert_eq!(metadata.len(), 3);
        assert_eq!(
            metadata.get("deviceName"),
            Some(&MetadataValue::String("laptop".to_string()))
        );
        assert_eq!(
            metadata.get("screenWidth"),
            Some(&MetadataValue::Number(serde_json::Number::from(1920_u64)))
        );
        assert_eq!(metadata.get("mobile"), Some(&MetadataValue::Bool(false)));
        assert!(!metadata.contains_key("id"));
    }

    #[test]
    fn test_session_serializes_flattened() {
        let mut metadata = Metadata::new();
        metadata.insert(
            "deviceName".to_string(),
            MetadataValue::String("phone".to_string()),
        );
        let session = EndpointSession {
            session_id: "abc".to_string(),
            ip: "10.0.0.1".to_string(),
            metadata,
            connected_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "abc",
                "ip": "10.0.0.1",
                "deviceName": "phone",
                "connectedAt": "2024-01-02T03:04:05.000Z",
            })
        );
    }

    #[test]
    fn test_ban_request_missing_fields() {
        let req: BanRequest = serde_json::from_str("{}").unwrap();
        assert!(req.ip.is_none());
        assert!(req.hours.is_none());

        let req: BanRequest = serde_json::from_str(r#"{"ip":"1.2.3.4","hours":5}"#).unwrap();
        assert_eq!(req.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(req.hours, Some(5.0));
    }
}
