//! Entity-to-render synchronization
//!
//! [`EntityTreeRenderer`] is the per-session context object. The other
//! modules are the pieces it drives each tick:
//!
//! - [`RenderableRegistry`] stages new entities and owns live renderables
//! - [`UpdateScheduler`] spends the per-tick time budget on dirty renderables
//! - [`SpatialContainmentTracker`] finds the entities containing the observer
//! - [`ZoneCullingStack`] turns entered zones into a render skip list
//! - [`LayeredZoneSelector`] ranks the zones that contain the observer

mod containment;
mod culling;
mod events;
mod layered_zones;
mod priority;
mod registry;
mod renderable;
mod scheduler;
mod tree_renderer;
mod view_state;

pub use containment::{ContainmentSet, Recheck, SpatialContainmentTracker, TrackerState};
pub use culling::{update_zone_contents, SkipList, ZoneCullingStack};
pub use events::{ContainmentEvent, ContainmentEvents, ContainmentListener};
pub use layered_zones::{LayeredZone, LayeredZoneSelector};
pub use priority::{ConicalView, PrioritySorter};
pub use registry::RenderableRegistry;
pub use renderable::Renderable;
pub use scheduler::{PassContext, PassStats, UpdateScheduler};
pub use tree_renderer::{ChangeNotifier, EntityTreeRenderer, RANKED_ZONES_SELECTION};
pub use view_state::{StaticViewState, ViewState};

#[cfg(test)]
mod tests;
