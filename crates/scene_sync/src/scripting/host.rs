//! Script host seam

use super::ScriptError;
use crate::entities::{EntityId, EntityItem};
use crate::foundation::math::Vec3;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

/// Contact between two entities, from A's point of view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// First entity
    pub id_a: EntityId,
    /// Second entity
    pub id_b: EntityId,
    /// World-space contact point
    pub contact_point: Vec3,
    /// Penetration of A into B
    pub penetration: Vec3,
    /// Velocity change applied to A
    pub velocity_change: Vec3,
}

impl Collision {
    /// The same contact seen from B
    pub fn inverted(&self) -> Self {
        Self {
            id_a: self.id_b,
            id_b: self.id_a,
            contact_point: self.contact_point,
            penetration: -self.penetration,
            velocity_change: -self.velocity_change,
        }
    }
}

/// Argument passed to a script method
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    /// Another entity
    Entity(EntityId),
    /// Collision details
    Collision(Collision),
}

/// Script runtime plugged into the [`ScriptEngine`](super::ScriptEngine)
///
/// Every method runs on the worker thread.
pub trait ScriptHost: Send {
    /// Load and preload `url` for `entity`; `Ok` means preload finished
    fn load(&mut self, entity: &EntityItem, url: &str, reload: bool) -> Result<(), ScriptError>;

    /// Unload the script of `id`
    fn unload(&mut self, id: EntityId);

    /// Invoke `method` on the loaded script of `id`
    fn call_method(&mut self, id: EntityId, method: &str, args: &[ScriptArg]);
}

/// Call observed by a [`RecordingScriptHost`]
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCall {
    /// Script loaded
    Load {
        /// Entity
        id: EntityId,
        /// Script URL
        url: String,
        /// Reload requested
        reload: bool,
    },
    /// Script unloaded
    Unload(EntityId),
    /// Method invoked
    Method {
        /// Entity
        id: EntityId,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<ScriptArg>,
    },
}

/// Host that records every call and logs it
///
/// Clones share the same log, so a caller can keep one and hand the other
/// to the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingScriptHost {
    calls: Arc<Mutex<Vec<ScriptCall>>>,
}

impl RecordingScriptHost {
    /// Create a host with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the calls so far
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls.lock().clone()
    }

    /// `(id, method)` pairs of every method call so far
    pub fn method_calls(&self) -> Vec<(EntityId, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ScriptCall::Method { id, method, .. } => Some((*id, method.clone())),
                ScriptCall::Load { .. } | ScriptCall::Unload(_) => None,
            })
            .collect()
    }

    /// Forget recorded calls
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl ScriptHost for RecordingScriptHost {
    fn load(&mut self, entity: &EntityItem, url: &str, reload: bool) -> Result<(), ScriptError> {
        debug!("Loading {} for {} (reload: {})", url, entity.id(), reload);
        self.calls.lock().push(ScriptCall::Load {
            id: entity.id(),
            url: url.to_string(),
            reload,
        });
        Ok(())
    }

    fn unload(&mut self, id: EntityId) {
        debug!("Unloading script of {}", id);
        self.calls.lock().push(ScriptCall::Unload(id));
    }

    fn call_method(&mut self, id: EntityId, method: &str, args: &[ScriptArg]) {
        debug!("{}.{}()", id, method);
        self.calls.lock().push(ScriptCall::Method {
            id,
            method: method.to_string(),
            args: args.to_vec(),
        });
    }
}
