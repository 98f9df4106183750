//! Event dispatcher: routes typed events to subscribed plugins.
//!
//! Subscriptions are refreshed out-of-band under a write lock; dispatch
//! holds a read lock, so concurrent dispatches see a consistent snapshot of
//! the subscriber lists.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::{PluginPermission, Server};
use crate::hostlib::convert::server_to_wire;
use crate::wire::{
    Event, EventPayload, EventType, PluginContext, ServerEventPayload, TaskEventPayload,
};

use super::error::PluginError;
use super::manager::{LoadedPlugin, ManagesPlugins};

/// Aggregate outcome of one dispatch.
#[derive(Debug, Default)]
pub struct EventDispatchResult {
    /// Set when a plugin vetoed a cancellable event.
    pub cancelled: bool,
    pub cancelled_by: Option<String>,
    pub cancel_message: Option<String>,
    /// Plugins that reported `handled = true`, in dispatch order.
    pub handled_by: Vec<String>,
    /// Merged guest modifications, last writer wins.
    pub modified_data: HashMap<String, String>,
    /// Guest failures; they never cancel and never stop iteration.
    pub errors: Vec<PluginError>,
}

/// Routes events to subscribers in priority order.
pub struct Dispatcher {
    manager: Arc<dyn ManagesPlugins>,
    subscriptions: RwLock<HashMap<EventType, Vec<Arc<LoadedPlugin>>>>,
    subscriptions_ok: AtomicBool,
}

impl Dispatcher {
    pub fn new(manager: Arc<dyn ManagesPlugins>) -> Self {
        Self {
            manager,
            subscriptions: RwLock::new(HashMap::new()),
            subscriptions_ok: AtomicBool::new(false),
        }
    }

    /// Whether the last refresh completed.
    pub fn subscriptions_ok(&self) -> bool {
        self.subscriptions_ok.load(Ordering::SeqCst)
    }

    /// Rebuild the subscription map by asking every enabled plugin with the
    /// `listen_events` grant for its subscribed event types.
    ///
    /// A plugin failing to answer is logged and skipped; one broken plugin
    /// never keeps the others from receiving events.
    pub async fn refresh_subscriptions(&self) {
        let mut subscriptions = self.subscriptions.write().await;

        subscriptions.clear();
        self.subscriptions_ok.store(false, Ordering::SeqCst);

        for plugin in self.manager.get_plugins().await {
            if !plugin.is_enabled()
                || plugin.is_wedged()
                || !plugin.has_permission(PluginPermission::ListenEvents)
            {
                continue;
            }

            let events = match plugin.get_subscribed_events().await {
                Ok(events) => events,
                Err(err) => {
                    error!(
                        plugin = %plugin.info.id,
                        error = %err,
                        "failed to get subscribed events"
                    );
                    continue;
                }
            };

            for event_type in events {
                subscriptions
                    .entry(event_type)
                    .or_default()
                    .push(Arc::clone(&plugin));
            }
        }

        // Dispatch order: priority descending, name ascending.
        for subscribers in subscriptions.values_mut() {
            subscribers.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.info.name.cmp(&b.info.name))
            });
        }

        self.subscriptions_ok.store(true, Ordering::SeqCst);

        debug!(
            event_types = subscriptions.len(),
            "subscriptions refreshed"
        );
    }

    /// Dispatch an event to its subscribers, in order.
    ///
    /// For cancellable events, the first `should_cancel` stops iteration;
    /// `POST_*` dispatches ignore `should_cancel` entirely.
    pub async fn dispatch(&self, event: &Event) -> EventDispatchResult {
        let subscriptions = self.subscriptions.read().await;

        let mut result = EventDispatchResult::default();

        let Some(subscribers) = subscriptions.get(&event.event_type) else {
            return result;
        };

        let cancellable = event.event_type.is_cancellable();

        for plugin in subscribers {
            if !plugin.is_enabled() || plugin.is_wedged() {
                continue;
            }

            let event_result = match plugin.handle_event(event).await {
                Ok(event_result) => event_result,
                Err(err) => {
                    error!(
                        plugin = %plugin.info.id,
                        event_type = ?event.event_type,
                        error = %err,
                        "plugin failed to handle event"
                    );
                    result.errors.push(err);
                    continue;
                }
            };

            if event_result.handled {
                result.handled_by.push(plugin.info.id.clone());
            }

            if cancellable && event_result.should_cancel {
                result.cancelled = true;
                result.cancelled_by = Some(plugin.info.id.clone());
                result.cancel_message = event_result.message;

                return result;
            }

            result.modified_data.extend(event_result.modified_data);
        }

        result
    }

    /// Dispatch a server lifecycle event.
    pub async fn dispatch_server_event(
        &self,
        event_type: EventType,
        server: &Server,
        extra_data: HashMap<String, String>,
    ) -> EventDispatchResult {
        let event = Event {
            event_type,
            timestamp: Utc::now().timestamp(),
            context: PluginContext {
                request_id: Uuid::new_v4().to_string(),
            },
            payload: EventPayload::ServerEvent(ServerEventPayload {
                server: Some(server_to_wire(server)),
                extra_data,
            }),
        };

        self.dispatch(&event).await
    }

    /// Dispatch a daemon task event.
    #[allow(clippy::too_many_arguments)]
    pub async fn dispatch_task_event(
        &self,
        event_type: EventType,
        task_id: u64,
        node_id: u64,
        server_id: Option<u64>,
        task_type: &str,
        status: &str,
        extra_data: HashMap<String, String>,
    ) -> EventDispatchResult {
        let event = Event {
            event_type,
            timestamp: Utc::now().timestamp(),
            context: PluginContext {
                request_id: Uuid::new_v4().to_string(),
            },
            payload: EventPayload::TaskEvent(TaskEventPayload {
                task_id,
                node_id,
                server_id,
                task_type: task_type.to_string(),
                status: status.to_string(),
                extra_data,
            }),
        };

        self.dispatch(&event).await
    }

    /// Cheap check host callers use to skip building events nobody wants.
    pub async fn has_subscribers(&self, event_type: EventType) -> bool {
        let subscriptions = self.subscriptions.read().await;

        subscriptions
            .get(&event_type)
            .is_some_and(|subscribers| {
                subscribers
                    .iter()
                    .any(|p| p.is_enabled() && !p.is_wedged())
            })
    }
}
