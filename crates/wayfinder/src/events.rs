// File: wayfinder/src/events.rs
// Purpose: Lifecycle event fan-out for the transition engine

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::state::{NavOptions, NavState};

/// Lifecycle events broadcast by the router
#[derive(Debug, Clone)]
pub enum RouterEvent {
    Started,
    Stopped,
    TransitionSuccess {
        from_state: Option<NavState>,
        to_state: NavState,
        to_activate: Vec<String>,
        to_deactivate: Vec<String>,
        options: NavOptions,
    },
    TransitionCancelled {
        from_state: Option<NavState>,
        to_state: NavState,
    },
    TransitionUnknownError {
        from_state: Option<NavState>,
        to_state: NavState,
        message: String,
    },
    TransitionRedirected {
        from_state: Option<NavState>,
        to_state: NavState,
    },
    NodeReload {
        name: String,
    },
}

/// Broadcast hub for router lifecycle and per-node reload events
///
/// Subscribers that lag behind simply drop events; the engine never
/// blocks on delivery.
pub struct EventBus {
    tx: broadcast::Sender<RouterEvent>,
    reload_channels: Mutex<HashMap<String, broadcast::Sender<()>>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        EventBus {
            tx,
            reload_channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to all lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to one node's reload event
    pub fn subscribe_reload(&self, name: &str) -> broadcast::Receiver<()> {
        let mut channels = self.reload_channels.lock().unwrap();
        channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .subscribe()
    }

    /// Fire-and-forget emission; send errors mean "no subscribers"
    pub fn emit(&self, event: RouterEvent) {
        let _ = self.tx.send(event);
    }

    /// Emits a node reload on both the lifecycle and the per-node channel
    pub fn emit_reload(&self, name: &str) {
        self.emit(RouterEvent::NodeReload {
            name: name.to_string(),
        });
        let channels = self.reload_channels.lock().unwrap();
        if let Some(tx) = channels.get(name) {
            let _ = tx.send(());
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(RouterEvent::Started);
        assert!(matches!(rx.try_recv(), Ok(RouterEvent::Started)));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.emit(RouterEvent::Stopped);
    }

    #[test]
    fn test_node_reload_fan_out() {
        let bus = EventBus::new();
        let mut all = bus.subscribe();
        let mut node = bus.subscribe_reload("users");
        let mut other = bus.subscribe_reload("admin");

        bus.emit_reload("users");

        assert!(matches!(
            all.try_recv(),
            Ok(RouterEvent::NodeReload { name }) if name == "users"
        ));
        assert!(node.try_recv().is_ok());
        assert!(other.try_recv().is_err());
    }
}
