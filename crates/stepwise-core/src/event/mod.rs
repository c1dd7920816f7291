//! Event delivery for workflow runs.
//!
//! The engine reports every state transition through an [`EventSink`].
//! Sinks are invoked synchronously and must not block: [`ChannelSink`] hands
//! events to a bounded queue, [`EventBus`] fans them out to broadcast
//! subscribers.

pub mod bus;
pub mod sink;

use serde_json::{Map, Value};

pub use bus::EventBus;
pub use sink::{ChannelSink, EventSink, NoopSink, emit_guarded};

/// Turn a `json!({...})` literal into an event payload map.
///
/// Non-object values produce an empty payload.
pub fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
