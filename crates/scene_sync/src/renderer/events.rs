//! Enter/leave notifications
//!
//! Listeners are registered once and called in registration order. Within
//! a recheck every leave is dispatched before any enter.

use crate::entities::EntityId;

/// Observer containment transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainmentEvent {
    /// The observer entered the entity
    Enter(EntityId),
    /// The observer left the entity
    Leave(EntityId),
}

impl ContainmentEvent {
    /// Entity the transition is about
    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::Enter(id) | Self::Leave(id) => *id,
        }
    }
}

/// Receiver of containment transitions
pub trait ContainmentListener: Send {
    /// Handle one transition
    fn on_containment_event(&mut self, event: &ContainmentEvent);
}

impl<F> ContainmentListener for F
where
    F: FnMut(&ContainmentEvent) + Send,
{
    fn on_containment_event(&mut self, event: &ContainmentEvent) {
        self(event);
    }
}

/// Registered listeners
#[derive(Default)]
pub struct ContainmentEvents {
    listeners: Vec<Box<dyn ContainmentListener>>,
}

impl ContainmentEvents {
    /// No listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn register(&mut self, listener: Box<dyn ContainmentListener>) {
        self.listeners.push(listener);
    }

    /// Deliver transitions in order to every listener
    pub fn dispatch(&mut self, events: &[ContainmentEvent]) {
        for event in events {
            for listener in &mut self.listeners {
                listener.on_containment_event(event);
            }
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for ContainmentEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainmentEvents")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
