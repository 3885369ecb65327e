//! Script execution actor
//!
//! Entity scripts run on a worker thread owned by [`ScriptEngine`]. The
//! tick thread sends fire-and-forget commands keyed by entity id; the
//! worker treats an id it cannot resolve as a silent no-op since the entity
//! may have been deleted while the command was in flight.

mod engine;
mod host;

pub use engine::{ScriptEngine, ScriptNotice};
pub use host::{Collision, RecordingScriptHost, ScriptArg, ScriptCall, ScriptHost};

use thiserror::Error;

/// Script layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The worker thread has exited
    #[error("Script engine is not running")]
    Disconnected,

    /// A script failed to load
    #[error("Failed to load script {url}: {reason}")]
    LoadFailed {
        /// Script URL
        url: String,
        /// Host-provided reason
        reason: String,
    },
}

/// Method names called on entity scripts
pub mod methods {
    /// Observer entered the entity
    pub const ENTER_ENTITY: &str = "enterEntity";
    /// Observer left the entity
    pub const LEAVE_ENTITY: &str = "leaveEntity";
    /// Entity collided with another entity
    pub const COLLISION_WITH_ENTITY: &str = "collisionWithEntity";
}
