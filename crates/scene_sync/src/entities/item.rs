//! Entity representation
//!
//! Entities form a closed set of kinds. Zones carry their culling settings
//! and content list inline, so deciding "is this a zone" is an exhaustive
//! match rather than a runtime type probe.

use crate::foundation::math::{Vec3, AABB};
use crate::spatial::SpaceIndex;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stable entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw identifier
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw identifier
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// How an entity participates in the per-tick update pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityPriority {
    /// Assumed immutable frame-to-frame; refreshed only when culling changes
    Static,
    /// Updated every tick ahead of the budgeted pass
    Prioritized,
    /// Updated within the time budget, ranked when over budget
    #[default]
    Automatic,
}

/// Who an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityOwner {
    /// Replicated from the domain
    #[default]
    Domain,
    /// Attached to some avatar
    Avatar,
    /// Attached to the local user's avatar
    MyAvatar,
    /// Exists only on this client
    Local,
}

impl EntityOwner {
    /// Avatar entities move with their avatar
    pub fn is_avatar_entity(self) -> bool {
        matches!(self, Self::Avatar | Self::MyAvatar)
    }

    /// Survives a domain switch
    pub fn is_local_or_my_avatar(self) -> bool {
        matches!(self, Self::Local | Self::MyAvatar)
    }
}

/// Culling behaviour of a zone while the observer is inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ZoneCullingMode {
    /// Leave the accumulated skip list untouched
    #[default]
    Inherit,
    /// Contribute this zone's content list to the skip list
    Outside,
    /// Wipe the skip list, rendering everything
    Disabled,
}

/// Zone-specific data
#[derive(Debug, Default)]
pub struct ZoneProperties {
    culling_mode: ZoneCullingMode,
    ghosting_allowed: bool,
    flying_allowed: bool,
    content_list: RwLock<Vec<EntityId>>,
}

impl ZoneProperties {
    /// Create zone properties; ghosting and flying default to allowed
    pub fn new(culling_mode: ZoneCullingMode) -> Self {
        Self {
            culling_mode,
            ghosting_allowed: true,
            flying_allowed: true,
            content_list: RwLock::new(Vec::new()),
        }
    }

    /// Set whether ghosting is allowed inside the zone
    pub fn with_ghosting_allowed(mut self, allowed: bool) -> Self {
        self.ghosting_allowed = allowed;
        self
    }

    /// Set whether flying is allowed inside the zone
    pub fn with_flying_allowed(mut self, allowed: bool) -> Self {
        self.flying_allowed = allowed;
        self
    }

    /// Culling mode
    pub fn culling_mode(&self) -> ZoneCullingMode {
        self.culling_mode
    }

    /// Ghosting allowed flag
    pub fn ghosting_allowed(&self) -> bool {
        self.ghosting_allowed
    }

    /// Flying allowed flag
    pub fn flying_allowed(&self) -> bool {
        self.flying_allowed
    }

    /// Snapshot of the ids last found inside the zone
    pub fn content_list(&self) -> Vec<EntityId> {
        self.content_list.read().clone()
    }

    /// Replace the content list
    pub fn set_content_list(&self, contents: Vec<EntityId>) {
        *self.content_list.write() = contents;
    }
}

/// Closed set of entity kinds
#[derive(Debug)]
pub enum EntityKind {
    /// Volumetric zone
    Zone(ZoneProperties),
    /// Primitive shape (box, sphere, ...)
    Shape,
    /// Mesh model
    Model,
    /// Embedded web surface
    Web,
    /// Light source
    Light,
    /// Anything else
    Other,
}

impl EntityKind {
    /// Zone data if this is a zone
    pub fn as_zone(&self) -> Option<&ZoneProperties> {
        match self {
            Self::Zone(zone) => Some(zone),
            Self::Shape | Self::Model | Self::Web | Self::Light | Self::Other => None,
        }
    }

    /// Whether this is a zone
    pub fn is_zone(&self) -> bool {
        self.as_zone().is_some()
    }
}

/// Mutable per-entity state, edited through the tree
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    /// World position of the entity's center
    pub position: Vec3,
    /// Full scaled dimensions of the entity's box
    pub dimensions: Vec3,
    /// Update classification
    pub priority: EntityPriority,
    /// Script URL; empty means no script
    pub script: String,
    /// Visibility flag
    pub visible: bool,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            dimensions: Vec3::new(1.0, 1.0, 1.0),
            priority: EntityPriority::Automatic,
            script: String::new(),
            visible: true,
        }
    }
}

/// Creation-time properties
#[derive(Debug, Clone, Default)]
pub struct EntityProperties {
    /// Initial mutable state
    pub state: EntityState,
    /// Owner classification
    pub owner: EntityOwner,
    /// Parent this entity is attached to
    pub parent: Option<EntityId>,
}

impl EntityProperties {
    /// Properties for an entity at a position
    pub fn at(position: Vec3) -> Self {
        Self {
            state: EntityState {
                position,
                ..EntityState::default()
            },
            ..Self::default()
        }
    }

    /// Set the box dimensions
    pub fn with_dimensions(mut self, dimensions: Vec3) -> Self {
        self.state.dimensions = dimensions;
        self
    }

    /// Set the priority classification
    pub fn with_priority(mut self, priority: EntityPriority) -> Self {
        self.state.priority = priority;
        self
    }

    /// Attach a script
    pub fn with_script(mut self, url: impl Into<String>) -> Self {
        self.state.script = url.into();
        self
    }

    /// Set visibility
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.state.visible = visible;
        self
    }

    /// Set the owner
    pub fn with_owner(mut self, owner: EntityOwner) -> Self {
        self.owner = owner;
        self
    }

    /// Attach to a parent
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// An entity owned by the [`EntityTree`](super::EntityTree)
#[derive(Debug)]
pub struct EntityItem {
    id: EntityId,
    kind: EntityKind,
    owner: EntityOwner,
    parent: Option<EntityId>,
    state: RwLock<EntityState>,
    dead: AtomicBool,
    script_preload_finished: AtomicBool,
    needs_render_update: AtomicBool,
    space_index: Mutex<Option<SpaceIndex>>,
}

impl EntityItem {
    pub(crate) fn new(id: EntityId, kind: EntityKind, properties: EntityProperties) -> Self {
        Self {
            id,
            kind,
            owner: properties.owner,
            parent: properties.parent,
            state: RwLock::new(properties.state),
            dead: AtomicBool::new(false),
            script_preload_finished: AtomicBool::new(false),
            needs_render_update: AtomicBool::new(false),
            space_index: Mutex::new(None),
        }
    }

    /// Identifier
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Kind and kind-specific data
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Zone data if this entity is a zone
    pub fn as_zone(&self) -> Option<&ZoneProperties> {
        self.kind.as_zone()
    }

    /// Whether this entity is a zone
    pub fn is_zone(&self) -> bool {
        self.kind.is_zone()
    }

    /// Owner classification
    pub fn owner(&self) -> EntityOwner {
        self.owner
    }

    /// Parent id, if attached
    pub fn parent_id(&self) -> Option<EntityId> {
        self.parent
    }

    /// Snapshot of the mutable state
    pub fn state(&self) -> EntityState {
        self.state.read().clone()
    }

    pub(crate) fn edit_state(&self, edit: impl FnOnce(&mut EntityState)) {
        edit(&mut self.state.write());
    }

    /// World position
    pub fn world_position(&self) -> Vec3 {
        self.state.read().position
    }

    /// World-space box
    pub fn bounds(&self) -> AABB {
        let state = self.state.read();
        AABB::from_center_dimensions(state.position, state.dimensions)
    }

    /// Radius of the sphere enclosing the box
    pub fn bounding_radius(&self) -> f32 {
        self.state.read().dimensions.magnitude() * 0.5
    }

    /// Update classification as stored on the entity
    pub fn priority(&self) -> EntityPriority {
        self.state.read().priority
    }

    /// Script URL; empty means no script
    pub fn script(&self) -> String {
        self.state.read().script.clone()
    }

    /// Whether a script is attached
    pub fn has_script(&self) -> bool {
        !self.state.read().script.is_empty()
    }

    /// Visibility flag
    pub fn is_visible(&self) -> bool {
        self.state.read().visible
    }

    /// Point-in-volume test
    pub fn contains(&self, point: Vec3) -> bool {
        self.bounds().contains_point(point)
    }

    /// Avatar entities and primitive shapes move by nature and are never Static
    pub fn forbids_static(&self) -> bool {
        self.owner.is_avatar_entity() || matches!(self.kind, EntityKind::Shape)
    }

    /// Whether the entity was deleted from the tree
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dead(&self) {
        self.dead.store(true, Ordering::Release);
    }

    /// Whether the entity's script finished preloading
    pub fn is_script_preload_finished(&self) -> bool {
        self.script_preload_finished.load(Ordering::Acquire)
    }

    /// Record the script preload state
    pub fn set_script_preload_finished(&self, finished: bool) {
        self.script_preload_finished.store(finished, Ordering::Release);
    }

    /// Whether the renderer was asked to refresh this entity
    pub fn needs_render_update(&self) -> bool {
        self.needs_render_update.load(Ordering::Acquire)
    }

    /// Flag the entity for a render refresh
    pub fn set_needs_render_update(&self, needs_update: bool) {
        self.needs_render_update.store(needs_update, Ordering::Release);
    }

    /// Spatial index slot, once allocated
    pub fn space_index(&self) -> Option<SpaceIndex> {
        *self.space_index.lock()
    }

    /// Record the allocated spatial index slot
    pub fn set_space_index(&self, index: SpaceIndex) {
        *self.space_index.lock() = Some(index);
    }
}
