//! Workload space: proxy spheres for live entities
//!
//! A slot is allocated the first time an entity is promoted to a
//! renderable. Positions then flow in as batched transactions, drained once
//! per tick, so writers never touch the proxies directly.

use crate::entities::EntityItem;
use crate::foundation::math::Sphere;
use slotmap::{new_key_type, SlotMap};
use std::sync::{Arc, Weak};

new_key_type! {
    /// Generational handle of a proxy slot
    pub struct SpaceIndex;
}

/// Proxy tracked for one entity
#[derive(Debug, Clone)]
pub struct SpaceProxy {
    /// Current bounding sphere
    pub sphere: Sphere,
    /// Entity the proxy stands for
    pub owner: Weak<EntityItem>,
}

impl SpaceProxy {
    /// Owning entity, if it still exists
    pub fn owner(&self) -> Option<Arc<EntityItem>> {
        self.owner.upgrade()
    }
}

/// One queued change to the space
#[derive(Debug, Clone)]
pub enum SpaceOp {
    /// (Re)initialise a slot with a sphere and owner
    Reset(SpaceIndex, Sphere, Weak<EntityItem>),
    /// Move an existing proxy
    Update(SpaceIndex, Sphere),
    /// Free a slot
    Remove(SpaceIndex),
}

/// Ordered batch of space changes
#[derive(Debug, Clone, Default)]
pub struct SpaceTransaction {
    ops: Vec<SpaceOp>,
}

impl SpaceTransaction {
    /// Create an empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a slot reset
    pub fn reset(&mut self, index: SpaceIndex, sphere: Sphere, owner: Weak<EntityItem>) {
        self.ops.push(SpaceOp::Reset(index, sphere, owner));
    }

    /// Queue a batch of proxy moves
    pub fn update(&mut self, updates: impl IntoIterator<Item = (SpaceIndex, Sphere)>) {
        self.ops
            .extend(updates.into_iter().map(|(index, sphere)| SpaceOp::Update(index, sphere)));
    }

    /// Queue a batch of slot removals
    pub fn remove(&mut self, indices: impl IntoIterator<Item = SpaceIndex>) {
        self.ops.extend(indices.into_iter().map(SpaceOp::Remove));
    }

    /// Whether the transaction carries no changes
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued operations in order
    pub fn ops(&self) -> &[SpaceOp] {
        &self.ops
    }
}

/// Proxy store with lazily allocated slots
#[derive(Debug, Default)]
pub struct Space {
    proxies: SlotMap<SpaceIndex, SpaceProxy>,
    pending: Vec<SpaceTransaction>,
}

impl Space {
    /// Create an empty space
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot; it stays ownerless until a reset is processed
    pub fn allocate_id(&mut self) -> SpaceIndex {
        self.proxies.insert(SpaceProxy {
            sphere: Sphere::new(crate::foundation::math::Vec3::zeros(), 0.0),
            owner: Weak::new(),
        })
    }

    /// Queue a transaction for the next [`Space::process_transactions`]
    pub fn enqueue_transaction(&mut self, transaction: SpaceTransaction) {
        if !transaction.is_empty() {
            self.pending.push(transaction);
        }
    }

    /// Apply every queued transaction in order; returns the number of ops applied
    pub fn process_transactions(&mut self) -> usize {
        let mut applied = 0;
        for transaction in std::mem::take(&mut self.pending) {
            for op in transaction.ops {
                match op {
                    SpaceOp::Reset(index, sphere, owner) => {
                        if let Some(proxy) = self.proxies.get_mut(index) {
                            proxy.sphere = sphere;
                            proxy.owner = owner;
                            applied += 1;
                        }
                    }
                    SpaceOp::Update(index, sphere) => {
                        // Stale handles (slot already freed) fall through silently
                        if let Some(proxy) = self.proxies.get_mut(index) {
                            proxy.sphere = sphere;
                            applied += 1;
                        }
                    }
                    SpaceOp::Remove(index) => {
                        if self.proxies.remove(index).is_some() {
                            applied += 1;
                        }
                    }
                }
            }
        }
        applied
    }

    /// Look up a proxy
    pub fn proxy(&self, index: SpaceIndex) -> Option<&SpaceProxy> {
        self.proxies.get(index)
    }

    /// Number of allocated slots
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Whether no slot is allocated
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Drop every slot and pending transaction
    pub fn clear(&mut self) {
        self.proxies.clear();
        self.pending.clear();
    }
}
