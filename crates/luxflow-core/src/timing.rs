//! Shared timing value table
//!
//! A small fixed table of named timing values that animations read to
//! scale their fade/hold durations. Two reserved slots hold the global
//! default fade and hold times so that animations with no explicit
//! timing still resolve to values a user can retime in one place.
//!
//! Accessors are deliberately branch-light and infallible: this table is
//! read from tight per-tick animation loops, so out-of-range slot ids
//! return defaults instead of errors. Mutations notify subscribed
//! listeners synchronously on the caller's thread.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Number of timing slots. Immutable after construction.
pub const TIMING_SLOTS: usize = 32;

/// Reserved slot holding the global default fade time.
pub const DEFAULT_FADE_SLOT: usize = 0;

/// Reserved slot holding the global default hold time.
pub const DEFAULT_HOLD_SLOT: usize = 1;

/// Change notification emitted after a mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingEvent {
    /// A slot was renamed.
    NameChanged {
        /// Slot id
        slot: usize,
        /// New name
        name: String,
    },
    /// A slot's timing value changed.
    ValueChanged {
        /// Slot id
        slot: usize,
        /// New value
        value: u32,
    },
    /// A slot was tapped (tempo tap, value unchanged).
    Tapped {
        /// Slot id
        slot: usize,
    },
}

/// Handle returned by [`TimingRegistry::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&TimingEvent) + Send + Sync>;

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    value: u32,
}

/// Fixed-size table of named, shared timing values.
///
/// All methods take `&self`; share the registry between the control
/// thread and animations via `Arc`.
pub struct TimingRegistry {
    slots: RwLock<Vec<Slot>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl TimingRegistry {
    /// Create a registry with the reserved default slots pre-named.
    pub fn new() -> Self {
        let mut slots = vec![
            Slot {
                name: String::new(),
                value: 0,
            };
            TIMING_SLOTS
        ];
        slots[DEFAULT_FADE_SLOT].name = "Default Fade".to_string();
        slots[DEFAULT_HOLD_SLOT].name = "Default Hold".to_string();
        Self {
            slots: RwLock::new(slots),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        TIMING_SLOTS
    }

    /// Name of a slot; empty string for out-of-range ids.
    pub fn name(&self, slot: usize) -> String {
        self.slots
            .read()
            .get(slot)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    /// Rename a slot. Out-of-range ids are ignored.
    pub fn set_name(&self, slot: usize, name: impl Into<String>) {
        let name = name.into();
        {
            let mut slots = self.slots.write();
            let Some(entry) = slots.get_mut(slot) else {
                return;
            };
            entry.name = name.clone();
        }
        self.emit(&TimingEvent::NameChanged { slot, name });
    }

    /// Current value of a slot; 0 for out-of-range ids.
    pub fn value(&self, slot: usize) -> u32 {
        self.slots.read().get(slot).map(|s| s.value).unwrap_or(0)
    }

    /// Set a slot's value. Out-of-range ids are ignored.
    pub fn set_value(&self, slot: usize, value: u32) {
        {
            let mut slots = self.slots.write();
            let Some(entry) = slots.get_mut(slot) else {
                return;
            };
            entry.value = value;
        }
        debug!(slot, value, "timing slot updated");
        self.emit(&TimingEvent::ValueChanged { slot, value });
    }

    /// Tap a slot (tempo tap). Out-of-range ids are ignored.
    pub fn tap(&self, slot: usize) {
        if slot >= TIMING_SLOTS {
            return;
        }
        self.emit(&TimingEvent::Tapped { slot });
    }

    /// Register a change listener, invoked synchronously after mutations.
    pub fn subscribe(&self, listener: impl Fn(&TimingEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a previously registered listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    // Called with the slot lock released so listeners may read back.
    // The list is cloned before invocation so a listener may subscribe
    // or unsubscribe without deadlocking on the non-reentrant mutex;
    // listeners added during emission see only later events.
    fn emit(&self, event: &TimingEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &listeners {
            listener(event);
        }
    }
}

impl Default for TimingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingRegistry")
            .field("slots", &self.slots.read().len())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
