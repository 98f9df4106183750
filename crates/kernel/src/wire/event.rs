//! Event protocol: the closed event vocabulary and its payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::facade::WireServer;

/// Every event the host may route to plugins.
///
/// `*_PRE_*` events are cancellable; `*_POST_*` and status events are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    ServerPreStart,
    ServerPostStart,
    ServerPreStop,
    ServerPostStop,
    ServerPreRestart,
    ServerPostRestart,
    ServerPreInstall,
    ServerPostInstall,
    ServerPreUpdate,
    ServerPostUpdate,
    ServerPreReinstall,
    ServerPostReinstall,
    ServerPreDelete,
    ServerPostDelete,
    TaskPreCreate,
    TaskPostCreate,
    TaskStatusChanged,
}

impl EventType {
    /// Whether a plugin may veto the host action behind this event.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            EventType::ServerPreStart
                | EventType::ServerPreStop
                | EventType::ServerPreRestart
                | EventType::ServerPreInstall
                | EventType::ServerPreUpdate
                | EventType::ServerPreReinstall
                | EventType::ServerPreDelete
                | EventType::TaskPreCreate
        )
    }
}

/// Request-scoped context carried alongside every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginContext {
    /// Fresh correlation ID per dispatch.
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEventPayload {
    pub server: Option<WireServer>,
    #[serde(default)]
    pub extra_data: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEventPayload {
    pub task_id: u64,
    pub node_id: u64,
    pub server_id: Option<u64>,
    pub task_type: String,
    pub status: String,
    #[serde(default)]
    pub extra_data: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    ServerEvent(ServerEventPayload),
    TaskEvent(TaskEventPayload),
}

/// A typed message routed to subscribed plugins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Unix seconds at dispatch time.
    pub timestamp: i64,
    pub context: PluginContext,
    pub payload: EventPayload,
}

/// What a guest reports back from `handle_event`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventResult {
    #[serde(default)]
    pub handled: bool,
    #[serde(default)]
    pub modified_data: HashMap<String, String>,
    /// Honored only for cancellable events.
    #[serde(default)]
    pub should_cancel: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetSubscribedEventsRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetSubscribedEventsResponse {
    #[serde(default)]
    pub events: Vec<EventType>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pre_events_are_cancellable() {
        assert!(EventType::ServerPreStart.is_cancellable());
        assert!(EventType::ServerPreDelete.is_cancellable());
        assert!(EventType::TaskPreCreate.is_cancellable());
        assert!(!EventType::ServerPostStart.is_cancellable());
        assert!(!EventType::TaskStatusChanged.is_cancellable());
    }

    #[test]
    fn event_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&EventType::ServerPreStart).unwrap(),
            r#""SERVER_PRE_START""#
        );
        let parsed: EventType = serde_json::from_str(r#""TASK_STATUS_CHANGED""#).unwrap();
        assert_eq!(parsed, EventType::TaskStatusChanged);
    }

    #[test]
    fn event_result_defaults() {
        let result: EventResult = serde_json::from_str(r#"{"handled":true}"#).unwrap();
        assert!(result.handled);
        assert!(!result.should_cancel);
        assert!(result.modified_data.is_empty());
        assert!(result.message.is_none());
    }
}
