//! Zone culling stack
//!
//! The stack holds the zones the observer is inside, in entry order. Its
//! evaluation produces the skip list consulted by the render visibility
//! filter.
//!
//! Polarity: an `Outside` zone appends its *content list* to the skip
//! list. The content list names what the zone keeps visible; the render
//! filter skips everything outside those contents. A `Disabled` zone wipes
//! the skip list so everything renders.

use crate::entities::{EntityId, EntityItem, EntityTree, PickFilter, ZoneCullingMode};
use log::warn;
use std::collections::BTreeSet;

/// Entity ids produced by evaluating the culling stack
pub type SkipList = BTreeSet<EntityId>;

/// Owner classes a zone's content list is gathered from
const CONTENT_FILTER: PickFilter = PickFilter::DOMAIN_ENTITIES
    .union(PickFilter::AVATAR_ENTITIES)
    .union(PickFilter::LOCAL_ENTITIES);

/// Ordered stack of entered zones and its evaluated skip list
#[derive(Debug)]
pub struct ZoneCullingStack {
    stack: Vec<EntityId>,
    evaluated: Vec<EntityId>,
    skip_list: SkipList,
    ghosting_allowed: bool,
}

impl Default for ZoneCullingStack {
    fn default() -> Self {
        Self {
            stack: Vec::new(),
            evaluated: Vec::new(),
            skip_list: SkipList::new(),
            ghosting_allowed: true,
        }
    }
}

impl ZoneCullingStack {
    /// Empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an entered zone; ignored if already on the stack
    pub fn push(&mut self, id: EntityId) -> bool {
        if self.stack.contains(&id) {
            return false;
        }
        self.stack.push(id);
        true
    }

    /// Remove a left zone wherever it sits
    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.stack.len();
        self.stack.retain(|entry| *entry != id);
        self.stack.len() != before
    }

    /// Remove every zone
    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Zones in entry order
    pub fn ids(&self) -> &[EntityId] {
        &self.stack
    }

    /// Whether the stack differs from the one last evaluated
    pub fn has_changed(&self) -> bool {
        self.stack != self.evaluated
    }

    /// Current skip list
    pub fn skip_list(&self) -> &SkipList {
        &self.skip_list
    }

    /// Empty the skip list without touching the stack
    pub fn clear_skip_list(&mut self) {
        self.skip_list.clear();
    }

    /// Ghosting flag of the last zone evaluated
    pub fn ghosting_allowed(&self) -> bool {
        self.ghosting_allowed
    }

    /// Recompute the skip list if the stack changed or `forced`
    ///
    /// Zones that no longer resolve are dropped from the stack. Returns
    /// whether an evaluation ran.
    pub fn evaluate(&mut self, tree: &EntityTree, forced: bool) -> bool {
        if !forced && !self.has_changed() {
            return false;
        }
        self.skip_list.clear();

        let mut disabled = false;
        let mut unresolved = Vec::new();
        for &id in &self.stack {
            let Some(zone) = tree.find_entity(id).filter(|entity| entity.is_zone()) else {
                warn!("Culling stack holds {} which is not a live zone", id);
                unresolved.push(id);
                continue;
            };
            let Some(properties) = zone.as_zone() else {
                continue;
            };
            match properties.culling_mode() {
                ZoneCullingMode::Inherit => {}
                ZoneCullingMode::Outside => {
                    update_zone_contents(tree, &zone);
                    self.skip_list.extend(properties.content_list());
                }
                ZoneCullingMode::Disabled => {
                    update_zone_contents(tree, &zone);
                    disabled = true;
                }
            }
            self.ghosting_allowed = properties.ghosting_allowed();
        }

        // Disabled anywhere on the stack wins over every Outside zone
        if disabled {
            self.skip_list.clear();
        }

        self.stack.retain(|id| !unresolved.contains(id));
        self.evaluated.clone_from(&self.stack);
        true
    }
}

/// Refresh a zone's content list from the entities inside its box
pub fn update_zone_contents(tree: &EntityTree, zone: &EntityItem) {
    let Some(properties) = zone.as_zone() else {
        return;
    };
    let bounds = zone.bounds();
    let mut contents = tree.with_read_lock(|tree| tree.eval_entities_in_box(&bounds, CONTENT_FILTER));
    contents.sort_unstable();
    properties.set_content_list(contents);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OctreeSettings;
    use crate::entities::{EntityKind, EntityProperties, ZoneProperties};
    use crate::foundation::math::Vec3;
    use std::sync::Arc;

    fn zone(tree: &EntityTree, mode: ZoneCullingMode, size: f32, ghosting: bool) -> Arc<EntityItem> {
        tree.add_entity(
            EntityKind::Zone(ZoneProperties::new(mode).with_ghosting_allowed(ghosting)),
            EntityProperties::default().with_dimensions(Vec3::new(size, size, size)),
        )
    }

    #[test]
    fn test_outside_adds_contents() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let z = zone(&tree, ZoneCullingMode::Outside, 10.0, true);
        let inside = tree.add_entity(EntityKind::Model, EntityProperties::at(Vec3::new(2.0, 0.0, 0.0)));
        tree.add_entity(EntityKind::Model, EntityProperties::at(Vec3::new(50.0, 0.0, 0.0)));

        let mut stack = ZoneCullingStack::new();
        stack.push(z.id());
        assert!(stack.evaluate(&tree, false));

        assert!(stack.skip_list().contains(&inside.id()));
        assert!(stack.skip_list().contains(&z.id()));
        assert_eq!(stack.skip_list().len(), 2);
    }

    #[test]
    fn test_disabled_wipes_outer_contributions() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let outer = zone(&tree, ZoneCullingMode::Outside, 20.0, true);
        let inner = zone(&tree, ZoneCullingMode::Disabled, 5.0, false);
        tree.add_entity(EntityKind::Model, EntityProperties::at(Vec3::new(8.0, 0.0, 0.0)));

        let mut stack = ZoneCullingStack::new();
        stack.push(outer.id());
        stack.push(inner.id());
        stack.evaluate(&tree, false);

        assert!(stack.skip_list().is_empty());
        assert!(!stack.ghosting_allowed());
        assert!(!inner.as_zone().map(ZoneProperties::content_list).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_disabled_wipes_later_outside_contributions() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let disabled = zone(&tree, ZoneCullingMode::Disabled, 4.0, true);
        let outside = zone(&tree, ZoneCullingMode::Outside, 20.0, false);
        tree.add_entity(EntityKind::Model, EntityProperties::at(Vec3::new(3.0, 0.0, 0.0)));

        let mut stack = ZoneCullingStack::new();
        stack.push(disabled.id());
        stack.push(outside.id());
        stack.evaluate(&tree, false);

        assert!(stack.skip_list().is_empty());
        assert!(!stack.ghosting_allowed());
        assert!(!outside.as_zone().map(ZoneProperties::content_list).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_unchanged_stack_is_not_reevaluated() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let z = zone(&tree, ZoneCullingMode::Inherit, 10.0, true);
        let mut stack = ZoneCullingStack::new();
        stack.push(z.id());

        assert!(stack.evaluate(&tree, false));
        assert!(!stack.evaluate(&tree, false));
        assert!(stack.evaluate(&tree, true));
    }

    #[test]
    fn test_unresolvable_zone_is_dropped() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let z = zone(&tree, ZoneCullingMode::Outside, 10.0, true);
        let mut stack = ZoneCullingStack::new();
        stack.push(z.id());
        tree.delete_entity(z.id());

        assert!(stack.evaluate(&tree, false));
        assert!(stack.ids().is_empty());
        assert!(stack.skip_list().is_empty());
    }

    #[test]
    fn test_push_and_remove() {
        let mut stack = ZoneCullingStack::new();
        let a = EntityId::new(1);
        let b = EntityId::new(2);
        assert!(stack.push(a));
        assert!(stack.push(b));
        assert!(!stack.push(a));
        assert!(stack.remove(a));
        assert!(!stack.remove(a));
        assert_eq!(stack.ids(), &[b]);
    }
}
