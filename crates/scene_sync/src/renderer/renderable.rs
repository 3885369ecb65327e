//! Render-facing counterpart of an entity

use crate::entities::{EntityId, EntityItem, EntityKind};
use crate::render::{RenderItemId, RenderItemPayload, Transaction};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// One renderable per live entity
///
/// Holds only a weak reference to its entity; every use checks expiry.
#[derive(Debug)]
pub struct Renderable {
    entity: Weak<EntityItem>,
    entity_id: EntityId,
    item_id: RenderItemId,
    is_web: bool,
    update_time_us: AtomicU64,
}

impl Renderable {
    pub(crate) fn new(entity: &Arc<EntityItem>, item_id: RenderItemId, now_us: u64) -> Self {
        Self {
            entity: Arc::downgrade(entity),
            entity_id: entity.id(),
            item_id,
            is_web: matches!(entity.kind(), EntityKind::Web),
            update_time_us: AtomicU64::new(now_us),
        }
    }

    /// Owning entity, if it is still alive
    pub fn entity(&self) -> Option<Arc<EntityItem>> {
        self.entity.upgrade().filter(|entity| !entity.is_dead())
    }

    /// Id of the owning entity
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Render item registered for this renderable
    pub fn item_id(&self) -> RenderItemId {
        self.item_id
    }

    /// Time of the last update handed to the scene
    pub fn update_time_us(&self) -> u64 {
        self.update_time_us.load(Ordering::Relaxed)
    }

    /// Embedded web surfaces take keyboard focus
    pub fn wants_keyboard_focus(&self) -> bool {
        self.is_web
    }

    /// Embedded web surfaces take hand-controller pointer events
    pub fn wants_pointer_events(&self) -> bool {
        self.is_web
    }

    fn payload(&self, entity: &EntityItem) -> RenderItemPayload {
        RenderItemPayload {
            entity: self.entity_id,
            bounds: entity.bounds(),
            visible: entity.is_visible(),
        }
    }

    pub(crate) fn add_to_scene(&self, entity: &EntityItem, transaction: &mut Transaction) {
        transaction.add_item(self.item_id, self.payload(entity));
    }

    /// Queue a refresh of the render item from the entity's current state
    pub fn update_in_scene(&self, entity: &EntityItem, now_us: u64, transaction: &mut Transaction) {
        entity.set_needs_render_update(true);
        transaction.update_item(self.item_id, self.payload(entity));
        self.update_time_us.store(now_us, Ordering::Relaxed);
    }

    /// Queue an immediate removal of the render item
    pub fn remove_from_scene(&self, transaction: &mut Transaction) {
        transaction.remove_item(self.item_id);
    }

    /// Queue a fade-out of the render item
    pub fn fade_out(&self, transaction: &mut Transaction) {
        transaction.fade_out(self.item_id);
    }
}
