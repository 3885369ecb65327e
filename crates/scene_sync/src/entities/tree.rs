//! Entity tree
//!
//! Owns entities and the octree over their positions. Entities whose
//! position falls outside the world volume are kept in an outlier set and
//! scanned linearly by queries.

use super::item::{EntityId, EntityItem, EntityKind, EntityOwner, EntityProperties, EntityState};
use crate::config::OctreeSettings;
use crate::foundation::math::{Vec3, AABB};
use crate::spatial::{Octree, OctreeConfig, SpaceIndex};
use bitflags::bitflags;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

bitflags! {
    /// Owner classes accepted by a spatial query
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PickFilter: u32 {
        /// Domain-owned entities
        const DOMAIN_ENTITIES = 1 << 0;
        /// Entities attached to any avatar
        const AVATAR_ENTITIES = 1 << 1;
        /// Client-only entities
        const LOCAL_ENTITIES = 1 << 2;
    }
}

impl PickFilter {
    /// Whether an entity with this owner passes the filter
    pub fn accepts(self, owner: EntityOwner) -> bool {
        let flag = match owner {
            EntityOwner::Domain => Self::DOMAIN_ENTITIES,
            EntityOwner::Avatar | EntityOwner::MyAvatar => Self::AVATAR_ENTITIES,
            EntityOwner::Local => Self::LOCAL_ENTITIES,
        };
        self.contains(flag)
    }
}

/// Mutation notices published by the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEvent {
    /// An entity was added
    Adding(EntityId),
    /// An entity is being deleted
    Deleting(EntityId),
    /// An entity's script was replaced or reloaded
    ScriptChanging {
        /// Entity whose script changed
        id: EntityId,
        /// Force a reload even if the URL is unchanged
        reload: bool,
    },
    /// Some other property changed
    Changed(EntityId),
}

/// Tree contents, reachable only while the tree's read lock is held
#[derive(Debug)]
pub struct TreeContents {
    entities: HashMap<EntityId, Arc<EntityItem>>,
    octree: Octree,
    outliers: HashSet<EntityId>,
}

impl TreeContents {
    fn index(&mut self, entity: &EntityItem) {
        let id = entity.id();
        self.outliers.remove(&id);
        if !self.octree.update(id, entity.world_position(), entity.bounding_radius()) {
            self.outliers.insert(id);
        }
    }

    fn unindex(&mut self, id: EntityId) {
        self.octree.remove(id);
        self.outliers.remove(&id);
    }

    fn accepts(&self, id: EntityId, filter: PickFilter) -> Option<&Arc<EntityItem>> {
        self.entities
            .get(&id)
            .filter(|entity| !entity.is_dead() && filter.accepts(entity.owner()))
    }

    /// Look up an entity
    pub fn find_entity_by_id(&self, id: EntityId) -> Option<&Arc<EntityItem>> {
        self.entities.get(&id)
    }

    /// Ids of entities whose bounding sphere touches the query sphere
    pub fn eval_entities_in_sphere(&self, center: Vec3, radius: f32, filter: PickFilter) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .octree
            .query_radius(center, radius)
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        found.extend(self.outliers.iter().copied().filter(|id| {
            self.entities.get(id).map_or(false, |entity| {
                let reach = radius + entity.bounding_radius();
                (entity.world_position() - center).norm_squared() <= reach * reach
            })
        }));
        found.retain(|id| self.accepts(*id, filter).is_some());
        found
    }

    /// Ids of entities whose center lies inside the box
    pub fn eval_entities_in_box(&self, aabb: &AABB, filter: PickFilter) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self.octree.query_aabb(aabb).into_iter().map(|hit| hit.id).collect();
        found.extend(self.outliers.iter().copied().filter(|id| {
            self.entities
                .get(id)
                .map_or(false, |entity| aabb.contains_point(entity.world_position()))
        }));
        found.retain(|id| self.accepts(*id, filter).is_some());
        found
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the tree is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over every entity
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityItem>> {
        self.entities.values()
    }
}

/// Shared entity store
///
/// Readers take the tree-wide read lock via [`EntityTree::with_read_lock`];
/// mutations take the write lock briefly and then publish a [`TreeEvent`].
#[derive(Debug)]
pub struct EntityTree {
    contents: RwLock<TreeContents>,
    next_id: AtomicU64,
    max_parent_depth: usize,
    events_tx: Sender<TreeEvent>,
    events_rx: Receiver<TreeEvent>,
    stale_proxies: Mutex<Vec<SpaceIndex>>,
}

impl EntityTree {
    /// Create an empty tree covering the configured world volume
    pub fn new(settings: &OctreeSettings) -> Self {
        let half = settings.world_half_extent;
        let world = AABB::new(Vec3::new(-half, -half, -half), Vec3::new(half, half, half));
        let (events_tx, events_rx) = unbounded();
        Self {
            contents: RwLock::new(TreeContents {
                entities: HashMap::new(),
                octree: Octree::new(world, OctreeConfig::from(settings)),
                outliers: HashSet::new(),
            }),
            next_id: AtomicU64::new(1),
            max_parent_depth: settings.max_parent_depth,
            events_tx,
            events_rx,
            stale_proxies: Mutex::new(Vec::new()),
        }
    }

    /// Receiver for mutation notices
    pub fn events(&self) -> Receiver<TreeEvent> {
        self.events_rx.clone()
    }

    fn publish(&self, event: TreeEvent) {
        // The tree holds a receiver, so the channel never disconnects
        let _ = self.events_tx.send(event);
    }

    /// Run `f` with the tree-wide read lock held
    pub fn with_read_lock<R>(&self, f: impl FnOnce(&TreeContents) -> R) -> R {
        f(&self.contents.read())
    }

    /// Look up an entity
    pub fn find_entity(&self, id: EntityId) -> Option<Arc<EntityItem>> {
        self.contents.read().find_entity_by_id(id).cloned()
    }

    /// Number of entities
    pub fn entity_count(&self) -> usize {
        self.contents.read().len()
    }

    /// Add an entity with a freshly allocated id
    pub fn add_entity(&self, kind: EntityKind, properties: EntityProperties) -> Arc<EntityItem> {
        let id = EntityId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.add_entity_with_id(id, kind, properties)
    }

    /// Add an entity under a caller-chosen id, replacing any previous holder
    pub fn add_entity_with_id(&self, id: EntityId, kind: EntityKind, properties: EntityProperties) -> Arc<EntityItem> {
        self.next_id.fetch_max(id.value() + 1, Ordering::Relaxed);
        let entity = Arc::new(EntityItem::new(id, kind, properties));
        {
            let mut contents = self.contents.write();
            contents.index(&entity);
            if let Some(previous) = contents.entities.insert(id, Arc::clone(&entity)) {
                previous.mark_dead();
            }
        }
        debug!("Added {} ({:?})", id, entity.kind());
        self.publish(TreeEvent::Adding(id));
        entity
    }

    /// Remove an entity; its spatial slot is queued for release
    pub fn delete_entity(&self, id: EntityId) -> bool {
        let removed = {
            let mut contents = self.contents.write();
            contents.unindex(id);
            contents.entities.remove(&id)
        };
        let Some(entity) = removed else {
            trace!("Delete of unknown {}", id);
            return false;
        };
        entity.mark_dead();
        if let Some(index) = entity.space_index() {
            self.stale_proxies.lock().push(index);
        }
        debug!("Deleted {}", id);
        self.publish(TreeEvent::Deleting(id));
        true
    }

    /// Edit an entity's mutable state and reindex it
    pub fn edit_entity(&self, id: EntityId, edit: impl FnOnce(&mut EntityState)) -> bool {
        {
            let mut contents = self.contents.write();
            let Some(entity) = contents.entities.get(&id).cloned() else {
                return false;
            };
            entity.edit_state(edit);
            contents.index(&entity);
        }
        self.publish(TreeEvent::Changed(id));
        true
    }

    /// Replace an entity's script URL
    pub fn set_script(&self, id: EntityId, url: impl Into<String>, reload: bool) -> bool {
        let url = url.into();
        let Some(entity) = self.find_entity(id) else {
            return false;
        };
        entity.edit_state(|state| state.script = url);
        self.publish(TreeEvent::ScriptChanging { id, reload });
        true
    }

    /// Whether every ancestor of `entity` is present, within the depth limit
    pub fn is_parent_path_complete(&self, entity: &EntityItem) -> bool {
        let contents = self.contents.read();
        let mut next = entity.parent_id();
        let mut depth = 0;
        while let Some(parent_id) = next {
            depth += 1;
            if depth > self.max_parent_depth {
                return false;
            }
            match contents.entities.get(&parent_id) {
                Some(parent) => next = parent.parent_id(),
                None => return false,
            }
        }
        true
    }

    /// Move queued stale spatial slots into `out`
    pub fn swap_stale_proxies(&self, out: &mut Vec<SpaceIndex>) {
        std::mem::swap(&mut *self.stale_proxies.lock(), out);
    }

    /// Delete every entity matching `predicate`; returns the deleted ids
    pub fn delete_entities_where(&self, predicate: impl Fn(&EntityItem) -> bool) -> Vec<EntityId> {
        let doomed: Vec<EntityId> = self
            .contents
            .read()
            .iter()
            .filter(|entity| predicate(entity))
            .map(|entity| entity.id())
            .collect();
        doomed.into_iter().filter(|id| self.delete_entity(*id)).collect()
    }
}
