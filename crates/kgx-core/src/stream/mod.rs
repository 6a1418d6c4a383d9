//! Reading the search backend's `data: <json>` event stream.
//!
//! - [`line_buffer`]: byte chunks to complete lines
//! - [`ingest`]: frame decoding, the handler callbacks, and the
//!   cancellable HTTP reader

pub mod ingest;
pub mod line_buffer;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use ingest::{IngestEvent, PumpOutcome, StreamClient, StreamHandle, StreamHandler, pump};
pub use line_buffer::LineBuffer;

/// Status value that ends a stream.
pub const STATUS_COMPLETE: &str = "complete";

/// One decoded frame. Only `status` has meaning here; everything else is
/// passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamMessage(Map<String, Value>);

impl StreamMessage {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.status() == Some(STATUS_COMPLETE)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for StreamMessage {
    type Error = Value;

    /// Only JSON objects are messages.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Categories of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestErrorKind {
    /// Non-2xx response
    HttpStatus,
    /// Connection refused or dropped before a response
    Connect,
    /// Connect or request timeout
    Timeout,
    /// Failure while reading the response body
    Read,
}

impl fmt::Display for IngestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestErrorKind::HttpStatus => write!(f, "http_status"),
            IngestErrorKind::Connect => write!(f, "connect"),
            IngestErrorKind::Timeout => write!(f, "timeout"),
            IngestErrorKind::Read => write!(f, "read"),
        }
    }
}

/// Structured transport error delivered to [`StreamHandler::on_error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestError {
    pub kind: IngestErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional raw detail such as the error body
    pub details: Option<String>,
}

impl IngestError {
    pub fn new(kind: IngestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Builds an error from a non-2xx response, preferring the backend's
    /// `detail` or `error.message` text when the body is JSON.
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());
        let detail = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            json.get("detail")
                .and_then(Value::as_str)
                .or_else(|| json.pointer("/error/message").and_then(Value::as_str))
                .map(str::to_string)
        });
        let message = match detail {
            Some(detail) => format!("HTTP {status}: {detail}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind: IngestErrorKind::HttpStatus,
            message,
            details,
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::new(IngestErrorKind::Read, message)
    }

    pub(crate) fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(IngestErrorKind::Timeout, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::new(IngestErrorKind::Connect, format!("Connection failed: {e}"))
        } else if e.is_body() || e.is_decode() {
            Self::read(format!("Stream read failed: {e}"))
        } else {
            Self::new(IngestErrorKind::Connect, format!("Network error: {e}"))
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IngestError {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_and_completion() {
        let msg = StreamMessage::try_from(json!({"status": "complete", "x": 1})).unwrap();
        assert!(msg.is_complete());
        assert_eq!(msg.get("x"), Some(&json!(1)));

        let msg = StreamMessage::try_from(json!({"text": "A"})).unwrap();
        assert_eq!(msg.status(), None);
        assert!(!msg.is_complete());
    }

    #[test]
    fn test_non_objects_are_not_messages() {
        assert!(StreamMessage::try_from(json!([1, 2])).is_err());
        assert!(StreamMessage::try_from(json!("complete")).is_err());
    }

    #[test]
    fn test_http_status_extracts_detail() {
        let err = IngestError::http_status(422, r#"{"detail": "Query cannot be empty"}"#);
        assert_eq!(err.kind, IngestErrorKind::HttpStatus);
        assert_eq!(err.to_string(), "HTTP 422: Query cannot be empty");
        assert!(err.details.is_some());

        let err = IngestError::http_status(500, "");
        assert_eq!(err.to_string(), "HTTP 500");
        assert_eq!(err.details, None);
    }
}
