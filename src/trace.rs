//! Captured request/response pairs, keyed by assistant turn id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::history::Slot;

/// The exact outbound request as it went on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    /// Absent for bodiless requests (GET).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// The exact inbound response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// One captured exchange. Created only for assistant turns produced by a
/// live successful call, never for errors or user turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTrace {
    pub request: RequestRecord,
    pub response: ResponseRecord,
}

impl RequestTrace {
    /// Formatted JSON for the copy affordance.
    pub fn pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// The traces blob, keyed by turn id.
pub type TraceMap = BTreeMap<String, RequestTrace>;

/// Drop every trace belonging to `slot`, matching on the turn-id prefix.
/// Returns how many were removed.
pub fn remove_slot_traces(traces: &mut TraceMap, slot: Slot) -> usize {
    let prefix = format!("{slot}-");
    let before = traces.len();
    traces.retain(|id, _| !id.starts_with(&prefix));
    before - traces.len()
}
