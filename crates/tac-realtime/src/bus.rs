//! Typed synchronous publish/subscribe for channel events.
//!
//! Registration is idempotent per (kind, listener) pair, where listener
//! identity is the `Arc` allocation. Dispatch works on a snapshot of the
//! listener list, so a listener may register or remove listeners (itself
//! included) while running. A panicking listener is logged and skipped;
//! the rest still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::error;

use crate::event::{ChannelEvent, ChannelEventKind};

/// A registered event handler.
pub type Listener = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

/// Wraps a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&ChannelEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<ChannelEventKind, Vec<Listener>>>,
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `kind`. Returns false if it was already registered.
    pub fn on(&self, kind: ChannelEventKind, listener: Listener) -> bool {
        let mut listeners = self.listeners.lock().expect("lock poisoned");
        let entry = listeners.entry(kind).or_default();
        if entry.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        entry.push(listener);
        true
    }

    /// Removes `listener` from `kind`. Returns false if it was not registered.
    pub fn off(&self, kind: ChannelEventKind, listener: &Listener) -> bool {
        let mut listeners = self.listeners.lock().expect("lock poisoned");
        let Some(entry) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|l| !same_listener(l, listener));
        entry.len() != before
    }

    pub fn listener_count(&self, kind: ChannelEventKind) -> usize {
        self.listeners
            .lock()
            .expect("lock poisoned")
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Calls every listener registered for the event's kind, in
    /// registration order.
    pub fn emit(&self, event: &ChannelEvent) {
        let kind = event.kind();
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .expect("lock poisoned")
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for listener in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(event))) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(event = ?kind, panic = %message, "Channel event listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock().expect("lock poisoned");
        let counts: HashMap<_, _> = listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
