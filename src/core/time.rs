//! Shared timestamp/event helpers for the store and its CLI envelopes.

use chrono::{SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Returns the current instant as an ISO-8601 UTC string with microsecond
/// precision (e.g. `2026-08-31T01:02:03.123456Z`).
///
/// Every timestamp persisted into the document uses this format, so string
/// comparison orders timestamps chronologically.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Unix-epoch whole seconds, used in checkpoint file names.
pub fn now_epoch_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_iso(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
