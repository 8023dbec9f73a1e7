//! Embedded JSON payload detection
//!
//! Provisioning tool output mixes plain text with JSON records, sometimes
//! prefixed by a timestamp or other text. The first `{...}` span of a line is
//! decoded and the well-known fields are lifted out of it.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::ops::Range;

use tfscope_types::{ExchangeRole, LogLevel};

use crate::patterns::{PatternError, PatternSet};
use crate::timestamp::parse_instant;

static PAYLOAD_SPAN: PatternSet = PatternSet::new(&[("object", r"\{.*\}")]);

const TIMESTAMP_FIELD: &str = "@timestamp";
const LEVEL_FIELD: &str = "@level";
const MESSAGE_FIELD: &str = "@message";
const MODULE_FIELD: &str = "@module";
const RESOURCE_TYPE_FIELD: &str = "tf_resource_type";
const CORRELATION_FIELD: &str = "tf_req_id";
const RPC_FIELD: &str = "tf_rpc";
const PROTO_VERSION_FIELD: &str = "tf_proto_version";
const PROVIDER_FIELD: &str = "tf_provider_addr";

/// Event timestamp offset whose wall-clock time is read as UTC, like the
/// offset-less text timestamps around it
const KNOWN_OFFSET_SUFFIX: &str = "+03:00";

/// A decoded payload and the fields lifted from it
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredRecord {
    /// Byte range of the payload text within the line
    pub span: Range<usize>,
    pub payload: Value,
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Option<LogLevel>,
    pub message: Option<String>,
    pub module: Option<String>,
    pub resource_type: Option<String>,
    pub correlation_id: Option<String>,
    pub exchange_role: Option<ExchangeRole>,
    pub provider_addr: Option<String>,
}

/// Look for a JSON payload in `line`.
///
/// Text that looks like JSON but fails to decode is not an error; the line is
/// simply treated as unstructured.
pub fn extract_structured(line: &str) -> Result<Option<StructuredRecord>, PatternError> {
    let Some(found) = PAYLOAD_SPAN.get(0)?.find(line) else {
        return Ok(None);
    };

    let payload: Value = match serde_json::from_str(found.as_str()) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!(error = %e, "embedded payload did not decode");
            return Ok(None);
        }
    };

    let empty = Map::new();
    let fields = payload.as_object().unwrap_or(&empty);

    let exchange_role = if fields.contains_key(RPC_FIELD) {
        Some(ExchangeRole::Request)
    } else if fields.contains_key(PROTO_VERSION_FIELD) {
        Some(ExchangeRole::Response)
    } else {
        None
    };

    Ok(Some(StructuredRecord {
        span: found.range(),
        timestamp: fields.get(TIMESTAMP_FIELD).and_then(event_timestamp),
        level: field_text(fields, LEVEL_FIELD).map(|label| LogLevel::from_label(&label)),
        message: field_text(fields, MESSAGE_FIELD),
        module: field_text(fields, MODULE_FIELD),
        resource_type: field_text(fields, RESOURCE_TYPE_FIELD),
        correlation_id: field_text(fields, CORRELATION_FIELD),
        provider_addr: field_text(fields, PROVIDER_FIELD),
        exchange_role,
        payload,
    }))
}

/// Scalar field rendered as text
fn field_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn event_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(text) = value.as_str() {
        return match text.trim().strip_suffix(KNOWN_OFFSET_SUFFIX) {
            Some(wall_clock) => parse_instant(&format!("{wall_clock}Z")),
            None => parse_instant(text),
        };
    }
    // unix seconds
    value
        .as_i64()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}
