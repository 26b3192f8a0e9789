//! Response envelope and normalization.
//!
//! Two wire shapes reach the relay:
//! ```text
//! { "success": true,  "data": ... }                     → Ok(data)
//! { "success": false, "error": { "code", "message" } }  → Err(AppError)
//! <anything else>                                       → Ok(value)   (legacy)
//! ```
//!
//! Transports that know which shape they speak build `RawResponse` directly.
//! `RawResponse::from_value` sniffs the shape from an untyped value: a JSON
//! object with a boolean `success` key is an envelope, whatever the rest of
//! the object looks like. Missing or mistyped envelope fields fall back to
//! defaults instead of demoting the value to legacy. A legacy payload that
//! legitimately carries a boolean `success` field is misread as an envelope;
//! that is a known limitation of the wire contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::error::AppError;

const DEFAULT_CODE: &str = "UNKNOWN_ERROR";
const DEFAULT_MESSAGE: &str = "Operation failed";

fn default_code() -> String {
    DEFAULT_CODE.to_string()
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

/// Error block of a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    #[serde(default = "default_code")]
    pub code: String,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// `{ success, data?, error? }` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: None,
            timestamp: None,
        }
    }

    /// Read an envelope out of a JSON object whose `success` is `success`.
    ///
    /// Never fails: an odd `error` block is coerced by [`WireError::from_value`],
    /// and metadata of the wrong type is dropped.
    fn from_object(success: bool, mut obj: Map<String, Value>) -> Self {
        let request_id = match obj.remove("request_id") {
            Some(Value::String(id)) => Some(id),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        let timestamp = obj
            .remove("timestamp")
            .and_then(|ts| ts.as_i64().or_else(|| ts.as_f64().map(|f| f as i64)));

        Self {
            success,
            data: obj.remove("data"),
            error: obj.remove("error").and_then(WireError::from_value),
            request_id,
            timestamp,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(WireError {
                code: code.into(),
                message: message.into(),
                details: None,
            }),
            request_id: None,
            timestamp: None,
        }
    }
}

impl WireError {
    /// Coerce whatever a backend put under `error`.
    ///
    /// Empty or missing `code`/`message` take the defaults; a bare string is
    /// the message; `null` means no error block at all.
    fn from_value(value: Value) -> Option<Self> {
        let non_empty = |v: Option<&Value>| {
            v.and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match value {
            Value::Null => None,
            Value::Object(obj) => Some(Self {
                code: non_empty(obj.get("code")).unwrap_or_else(default_code),
                message: non_empty(obj.get("message")).unwrap_or_else(default_message),
                details: match obj.get("details") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(details)) => Some(details.clone()),
                    Some(other) => Some(other.to_string()),
                },
            }),
            Value::String(message) => Some(Self {
                code: default_code(),
                message: Some(message).filter(|m| !m.is_empty()).unwrap_or_else(default_message),
                details: None,
            }),
            other => Some(Self {
                code: default_code(),
                message: default_message(),
                details: Some(other.to_string()),
            }),
        }
    }
}

/// Raw result of one transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Enveloped(Envelope),
    Legacy(Value),
}

impl RawResponse {
    /// Classify an untyped JSON value by the `success` key.
    pub fn from_value(value: Value) -> Self {
        let success = value
            .as_object()
            .and_then(|obj| obj.get("success"))
            .and_then(Value::as_bool);

        match (success, value) {
            (Some(success), Value::Object(obj)) => RawResponse::Enveloped(Envelope::from_object(success, obj)),
            (_, value) => RawResponse::Legacy(value),
        }
    }

    /// Collapse into `Ok(value)` or the backend's `AppError`.
    ///
    /// Absent `data` on a successful envelope becomes `Value::Null`.
    pub fn normalize(self) -> Result<Value, AppError> {
        match self {
            RawResponse::Legacy(value) => Ok(value),
            RawResponse::Enveloped(envelope) if envelope.success => {
                Ok(envelope.data.unwrap_or(Value::Null))
            }
            RawResponse::Enveloped(envelope) => Err(match envelope.error {
                Some(error) => AppError::from_envelope(
                    error.code,
                    error.message,
                    error.details,
                    envelope.request_id,
                ),
                None => AppError::from_envelope(
                    DEFAULT_CODE,
                    DEFAULT_MESSAGE,
                    None,
                    envelope.request_id,
                ),
            }),
        }
    }
}

impl From<Envelope> for RawResponse {
    fn from(envelope: Envelope) -> Self {
        RawResponse::Enveloped(envelope)
    }
}
