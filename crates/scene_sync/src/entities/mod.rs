//! Entity tree consumed by the synchronization subsystem
//!
//! The tree owns every entity (`Arc<EntityItem>`); everything downstream
//! keeps `Weak` references and checks expiry before use. Mutations are
//! announced on a channel so consumers observe them on their own tick, the
//! way a queued signal connection would.

mod item;
mod tree;

pub use item::{
    EntityId, EntityItem, EntityKind, EntityOwner, EntityPriority, EntityProperties, EntityState,
    ZoneCullingMode, ZoneProperties,
};
pub use tree::{EntityTree, PickFilter, TreeContents, TreeEvent};
