//! Entity-to-renderable map and the pending-add queue

use super::renderable::Renderable;
use crate::entities::{EntityId, EntityItem, EntityTree};
use crate::foundation::math::Sphere;
use crate::render::{RenderScene, Transaction};
use crate::spatial::{Space, SpaceTransaction};
use log::trace;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

/// Owns every live [`Renderable`] and the entities waiting for promotion
#[derive(Debug, Default)]
pub struct RenderableRegistry {
    pending: BTreeMap<EntityId, Weak<EntityItem>>,
    live: HashMap<EntityId, Arc<Renderable>>,
}

impl RenderableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an entity for promotion; returns false if it already expired
    pub fn enqueue(&mut self, entity: &Weak<EntityItem>) -> bool {
        match entity.upgrade() {
            Some(live) => {
                self.pending.insert(live.id(), Weak::clone(entity));
                true
            }
            None => false,
        }
    }

    /// Drop an entity from the pending queue
    pub fn dequeue(&mut self, id: EntityId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Whether an entity is waiting for promotion
    pub fn is_pending(&self, id: EntityId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of entities waiting for promotion
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Promote every staged entity whose parent chain resolves
    ///
    /// Spatial-index slots are allocated on first promotion. Entities that
    /// cannot be promoted yet stay staged. Returns the promoted ids.
    pub fn tick_pending(
        &mut self,
        tree: &EntityTree,
        space: &Mutex<Space>,
        scene: &RenderScene,
        now_us: u64,
        transaction: &mut Transaction,
    ) -> Vec<EntityId> {
        self.pending
            .retain(|_, entity| entity.upgrade().map_or(false, |entity| !entity.is_dead()));

        let mut promoted = Vec::new();
        for entity in self.pending.values().filter_map(Weak::upgrade) {
            if !tree.is_parent_path_complete(&entity) {
                trace!("{} waits for its parent chain", entity.id());
                continue;
            }
            if entity.space_index().is_none() {
                let mut space = space.lock();
                let index = space.allocate_id();
                let mut space_transaction = SpaceTransaction::new();
                space_transaction.reset(
                    index,
                    Sphere::new(entity.world_position(), entity.bounding_radius()),
                    Arc::downgrade(&entity),
                );
                space.enqueue_transaction(space_transaction);
                entity.set_space_index(index);
            }

            let renderable = Arc::new(Renderable::new(&entity, scene.allocate_id(), now_us));
            renderable.add_to_scene(&entity, transaction);
            if let Some(previous) = self.live.insert(entity.id(), renderable) {
                previous.remove_from_scene(transaction);
            }
            promoted.push(entity.id());
        }

        for id in &promoted {
            self.pending.remove(id);
        }
        promoted
    }

    /// Renderable of an entity
    pub fn lookup(&self, id: EntityId) -> Option<Arc<Renderable>> {
        self.live.get(&id).cloned()
    }

    /// Whether an entity has a renderable
    pub fn contains(&self, id: EntityId) -> bool {
        self.live.contains_key(&id)
    }

    /// Detach a renderable, handing it to the caller for teardown
    pub fn remove(&mut self, id: EntityId) -> Option<Arc<Renderable>> {
        self.live.remove(&id)
    }

    /// Detach every renderable for which `keep` is false
    pub fn remove_where(&mut self, mut keep: impl FnMut(&Renderable) -> bool) -> Vec<Arc<Renderable>> {
        let doomed: Vec<EntityId> = self
            .live
            .iter()
            .filter(|(_, renderable)| !keep(renderable))
            .map(|(id, _)| *id)
            .collect();
        doomed.into_iter().filter_map(|id| self.live.remove(&id)).collect()
    }

    /// Detach every renderable and forget pending entities
    pub fn drain(&mut self) -> Vec<Arc<Renderable>> {
        self.pending.clear();
        self.live.drain().map(|(_, renderable)| renderable).collect()
    }

    /// Ids of every live renderable, ascending
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.live.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live renderables
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no renderable is live
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OctreeSettings;
    use crate::entities::{EntityKind, EntityProperties};
    use crate::render::RenderOp;

    struct Fixture {
        tree: EntityTree,
        space: Mutex<Space>,
        scene: Arc<RenderScene>,
        receiver: crate::render::TransactionReceiver,
        registry: RenderableRegistry,
    }

    fn fixture() -> Fixture {
        let (scene, receiver) = RenderScene::new();
        Fixture {
            tree: EntityTree::new(&OctreeSettings::default()),
            space: Mutex::new(Space::new()),
            scene,
            receiver,
            registry: RenderableRegistry::new(),
        }
    }

    impl Fixture {
        fn tick(&mut self) -> Vec<EntityId> {
            let mut transaction = Transaction::new();
            let promoted = self
                .registry
                .tick_pending(&self.tree, &self.space, &self.scene, 0, &mut transaction);
            self.scene.enqueue_transaction(transaction);
            promoted
        }
    }

    #[test]
    fn test_enqueue_expired_is_noop() {
        let mut fixture = fixture();
        let entity = fixture.tree.add_entity(EntityKind::Model, EntityProperties::default());
        let weak = Arc::downgrade(&entity);
        fixture.tree.delete_entity(entity.id());
        drop(entity);

        assert!(!fixture.registry.enqueue(&weak));
        assert_eq!(fixture.registry.pending_len(), 0);
    }

    #[test]
    fn test_promotion_allocates_slot_and_adds_item() {
        let mut fixture = fixture();
        let entity = fixture.tree.add_entity(EntityKind::Model, EntityProperties::default());
        fixture.registry.enqueue(&Arc::downgrade(&entity));

        assert_eq!(fixture.tick(), vec![entity.id()]);
        assert!(entity.space_index().is_some());
        assert_eq!(fixture.space.lock().process_transactions(), 1);

        let renderable = fixture.registry.lookup(entity.id()).expect("promoted");
        assert_eq!(
            fixture.receiver.drain(),
            vec![RenderOp::AddItem(
                renderable.item_id(),
                crate::render::RenderItemPayload {
                    entity: entity.id(),
                    bounds: entity.bounds(),
                    visible: true,
                }
            )]
        );
        assert_eq!(fixture.registry.pending_len(), 0);
    }

    #[test]
    fn test_deleted_pending_entity_is_dropped() {
        let mut fixture = fixture();
        let entity = fixture.tree.add_entity(EntityKind::Model, EntityProperties::default());
        fixture.registry.enqueue(&Arc::downgrade(&entity));
        fixture.tree.delete_entity(entity.id());

        assert!(fixture.tick().is_empty());
        assert_eq!(fixture.registry.pending_len(), 0);
        assert!(fixture.registry.is_empty());
    }

    #[test]
    fn test_repromotion_keeps_one_renderable_per_id() {
        let mut fixture = fixture();
        let entity = fixture.tree.add_entity(EntityKind::Model, EntityProperties::default());
        fixture.registry.enqueue(&Arc::downgrade(&entity));
        fixture.tick();
        let first = fixture.registry.lookup(entity.id()).expect("promoted");

        fixture.registry.enqueue(&Arc::downgrade(&entity));
        fixture.tick();

        assert_eq!(fixture.registry.len(), 1);
        let ops = fixture.receiver.drain();
        assert!(ops.contains(&RenderOp::RemoveItem(first.item_id())));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut fixture = fixture();
        let entity = fixture.tree.add_entity(EntityKind::Model, EntityProperties::default());
        fixture.registry.enqueue(&Arc::downgrade(&entity));
        fixture.tick();

        assert!(fixture.registry.remove(entity.id()).is_some());
        assert!(fixture.registry.remove(entity.id()).is_none());
    }
}
