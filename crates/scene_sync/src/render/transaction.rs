//! Render transactions
//!
//! A transaction is an opaque, ordered batch of scene mutations applied by
//! the render consumer in one go.

use crate::entities::EntityId;
use crate::foundation::math::AABB;

/// Handle of an item registered with the render scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderItemId(pub u64);

/// Render-facing snapshot of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItemPayload {
    /// Entity the item mirrors
    pub entity: EntityId,
    /// World-space bounds
    pub bounds: AABB,
    /// Whether the item should be drawn
    pub visible: bool,
}

/// A single scene mutation
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    /// Register a new item
    AddItem(RenderItemId, RenderItemPayload),
    /// Refresh an existing item
    UpdateItem(RenderItemId, RenderItemPayload),
    /// Unregister an item immediately
    RemoveItem(RenderItemId),
    /// Fade an item out, then unregister it
    FadeOut(RenderItemId),
    /// Replace the contents of a named selection
    ResetSelection {
        /// Selection name
        name: String,
        /// Items in selection order
        items: Vec<RenderItemId>,
    },
}

/// Ordered batch of [`RenderOp`]s
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    ops: Vec<RenderOp>,
}

impl Transaction {
    /// Create an empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an item registration
    pub fn add_item(&mut self, id: RenderItemId, payload: RenderItemPayload) {
        self.ops.push(RenderOp::AddItem(id, payload));
    }

    /// Queue an item refresh
    pub fn update_item(&mut self, id: RenderItemId, payload: RenderItemPayload) {
        self.ops.push(RenderOp::UpdateItem(id, payload));
    }

    /// Queue an immediate removal
    pub fn remove_item(&mut self, id: RenderItemId) {
        self.ops.push(RenderOp::RemoveItem(id));
    }

    /// Queue a fade-out
    pub fn fade_out(&mut self, id: RenderItemId) {
        self.ops.push(RenderOp::FadeOut(id));
    }

    /// Queue a selection reset
    pub fn reset_selection(&mut self, name: impl Into<String>, items: Vec<RenderItemId>) {
        self.ops.push(RenderOp::ResetSelection {
            name: name.into(),
            items,
        });
    }

    /// Append another transaction's ops
    pub fn merge(&mut self, other: Transaction) {
        self.ops.extend(other.ops);
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of queued ops
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Queued ops in order
    pub fn ops(&self) -> &[RenderOp] {
        &self.ops
    }

    /// Consume into the queued ops
    pub fn into_ops(self) -> Vec<RenderOp> {
        self.ops
    }
}
