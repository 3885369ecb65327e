//! # Scene Sync
//!
//! Keeps a renderer's view of a shared entity tree current under a
//! per-frame time budget, and tracks which zones contain the observer.
//!
//! ## Features
//!
//! - **Budgeted updates**: dirty renderables are updated within a time
//!   budget, with the most important ones first when the budget is short
//! - **Containment tracking**: enter/leave events for zones and scripted
//!   entities around the observer
//! - **Zone culling**: a skip list derived from the entered zones' culling
//!   modes
//! - **Layered zones**: entered zones ranked smallest first
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_sync::prelude::*;
//! use std::sync::Arc;
//!
//! let config = SyncConfig::default();
//! let tree = Arc::new(EntityTree::new(&config.octree));
//! let (scene, render_queue) = RenderScene::new();
//! let view = Arc::new(StaticViewState::new(Vec3::zeros()));
//!
//! let mut renderer = EntityTreeRenderer::new(config, tree, scene, view, Arc::new(MonotonicClock::new()));
//! renderer.init();
//! loop {
//!     renderer.update(true);
//!     for op in render_queue.drain() {
//!         // hand `op` to the render pipeline
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod entities;
pub mod foundation;
pub mod render;
pub mod renderer;
pub mod scripting;
pub mod spatial;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, SyncConfig},
        entities::{
            EntityId, EntityKind, EntityOwner, EntityPriority, EntityProperties, EntityTree,
            ZoneCullingMode, ZoneProperties,
        },
        foundation::{
            math::{Sphere, Vec3, AABB},
            time::{Clock, ManualClock, MonotonicClock},
        },
        render::{RenderItemId, RenderOp, RenderScene, Transaction},
        renderer::{
            ContainmentEvent, ConicalView, EntityTreeRenderer, StaticViewState, ViewState,
        },
        scripting::{Collision, ScriptHost},
    };
}
