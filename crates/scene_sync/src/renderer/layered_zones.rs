//! Ranked selection of containing zones
//!
//! Smaller zones rank first, so a zone nested in another one takes effect
//! while the observer is inside both. Ties break on id.

use crate::entities::{EntityId, EntityItem};
use crate::foundation::math::Vec3;
use crate::render::RenderItemId;
use std::cmp::Ordering;
use std::sync::{Arc, Weak};

/// One containing zone with its rank key
#[derive(Debug, Clone)]
pub struct LayeredZone {
    zone: Weak<EntityItem>,
    id: EntityId,
    volume: f32,
}

impl LayeredZone {
    /// Capture a zone and its current volume
    pub fn new(zone: &Arc<EntityItem>) -> Self {
        Self {
            zone: Arc::downgrade(zone),
            id: zone.id(),
            volume: zone.bounds().volume(),
        }
    }

    /// Zone id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Volume at capture time
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// The zone, if still alive
    pub fn zone(&self) -> Option<Arc<EntityItem>> {
        self.zone.upgrade().filter(|zone| !zone.is_dead())
    }
}

impl PartialEq for LayeredZone {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.volume.to_bits() == other.volume.to_bits()
    }
}

impl Eq for LayeredZone {}

impl PartialOrd for LayeredZone {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LayeredZone {
    fn cmp(&self, other: &Self) -> Ordering {
        self.volume
            .total_cmp(&other.volume)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sorted list of containing, visible, rendered zones
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LayeredZoneSelector {
    zones: Vec<LayeredZone>,
}

impl LayeredZoneSelector {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sorted selection from candidate zones
    pub fn from_candidates(candidates: &[Arc<EntityItem>]) -> Self {
        let mut selector = Self {
            zones: candidates.iter().map(LayeredZone::new).collect(),
        };
        selector.sort();
        selector
    }

    /// Drop expired entries and restore rank order
    pub fn sort(&mut self) {
        self.zones.retain(|entry| entry.zone().is_some());
        self.zones.sort();
    }

    /// Same length and pairwise identical `(id, volume)`
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }

    /// Replace the selection; returns whether it changed
    pub fn replace(&mut self, other: Self) -> bool {
        if self.equals(&other) {
            return false;
        }
        *self = other;
        true
    }

    /// Entries in rank order
    pub fn zones(&self) -> &[LayeredZone] {
        &self.zones
    }

    /// Ids in rank order
    pub fn ids(&self) -> Vec<EntityId> {
        self.zones.iter().map(LayeredZone::id).collect()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Forget every entry
    pub fn clear(&mut self) {
        self.zones.clear();
    }

    /// Keep only live local and my-avatar zones; returns whether anything was removed
    pub fn clear_domain_and_non_owned(&mut self) -> bool {
        let before = self.zones.len();
        self.zones.retain(|entry| {
            entry
                .zone()
                .map_or(false, |zone| zone.owner().is_local_or_my_avatar())
        });
        let changed = self.zones.len() != before;
        if changed {
            self.sort();
        }
        changed
    }

    /// Re-rank a zone whose position, size or visibility changed
    ///
    /// The zone is removed and re-inserted only if it is visible, rendered
    /// and still contains `position`. Returns whether the selection needs
    /// republishing.
    pub fn update(&mut self, zone: &Arc<EntityItem>, position: Vec3, has_renderable: bool) -> bool {
        let mut needs_resort = false;
        if let Some(index) = self.zones.iter().position(|entry| entry.id == zone.id()) {
            self.zones.remove(index);
            needs_resort = true;
        }
        if zone.is_visible() && has_renderable && zone.contains(position) {
            self.zones.push(LayeredZone::new(zone));
            needs_resort = true;
        }
        if needs_resort {
            self.sort();
        }
        needs_resort
    }

    /// Render items of the live entries, in rank order
    pub fn render_ids(&self, lookup: impl Fn(EntityId) -> Option<RenderItemId>) -> Vec<RenderItemId> {
        self.zones
            .iter()
            .filter(|entry| entry.zone().is_some())
            .filter_map(|entry| lookup(entry.id))
            .collect()
    }

    /// `(flying_allowed, ghosting_allowed)` of the highest-ranked domain zone
    pub fn zone_interaction_properties(&self) -> (bool, bool) {
        self.zones
            .iter()
            .filter_map(LayeredZone::zone)
            .filter(|zone| zone.owner() == crate::entities::EntityOwner::Domain)
            .find_map(|zone| {
                zone.as_zone()
                    .map(|properties| (properties.flying_allowed(), properties.ghosting_allowed()))
            })
            .unwrap_or((true, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OctreeSettings;
    use crate::entities::{EntityKind, EntityOwner, EntityProperties, EntityTree, ZoneCullingMode, ZoneProperties};

    fn zone(tree: &EntityTree, size: f32, owner: EntityOwner, flying: bool) -> Arc<EntityItem> {
        tree.add_entity(
            EntityKind::Zone(ZoneProperties::new(ZoneCullingMode::Inherit).with_flying_allowed(flying)),
            EntityProperties::default()
                .with_dimensions(Vec3::new(size, size, size))
                .with_owner(owner),
        )
    }

    #[test]
    fn test_smaller_zones_rank_first() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let big = zone(&tree, 20.0, EntityOwner::Domain, true);
        let small = zone(&tree, 5.0, EntityOwner::Domain, true);

        let selector = LayeredZoneSelector::from_candidates(&[Arc::clone(&big), Arc::clone(&small)]);
        assert_eq!(selector.ids(), vec![small.id(), big.id()]);
    }

    #[test]
    fn test_equal_volumes_break_ties_on_id() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let a = zone(&tree, 5.0, EntityOwner::Domain, true);
        let b = zone(&tree, 5.0, EntityOwner::Domain, true);

        let forward = LayeredZoneSelector::from_candidates(&[Arc::clone(&a), Arc::clone(&b)]);
        let backward = LayeredZoneSelector::from_candidates(&[Arc::clone(&b), Arc::clone(&a)]);
        assert!(forward.equals(&backward));
        assert_eq!(forward.ids(), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_replace_reports_changes_only() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let a = zone(&tree, 5.0, EntityOwner::Domain, true);
        let mut selector = LayeredZoneSelector::new();

        assert!(selector.replace(LayeredZoneSelector::from_candidates(&[Arc::clone(&a)])));
        assert!(!selector.replace(LayeredZoneSelector::from_candidates(&[Arc::clone(&a)])));
        assert!(selector.replace(LayeredZoneSelector::new()));
    }

    #[test]
    fn test_interaction_properties_come_from_first_domain_zone() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let local = zone(&tree, 2.0, EntityOwner::Local, true);
        let domain = zone(&tree, 10.0, EntityOwner::Domain, false);

        let selector = LayeredZoneSelector::from_candidates(&[local, domain]);
        assert_eq!(selector.zone_interaction_properties(), (false, true));
        assert_eq!(LayeredZoneSelector::new().zone_interaction_properties(), (true, true));
    }

    #[test]
    fn test_clear_domain_keeps_local_zones() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let local = zone(&tree, 2.0, EntityOwner::Local, true);
        let domain = zone(&tree, 10.0, EntityOwner::Domain, true);
        let mut selector = LayeredZoneSelector::from_candidates(&[Arc::clone(&local), domain]);

        assert!(selector.clear_domain_and_non_owned());
        assert_eq!(selector.ids(), vec![local.id()]);
        assert!(!selector.clear_domain_and_non_owned());
    }

    #[test]
    fn test_update_resorts_resized_zone() {
        let tree = EntityTree::new(&OctreeSettings::default());
        let a = zone(&tree, 5.0, EntityOwner::Domain, true);
        let b = zone(&tree, 10.0, EntityOwner::Domain, true);
        let mut selector = LayeredZoneSelector::from_candidates(&[Arc::clone(&a), Arc::clone(&b)]);

        tree.edit_entity(a.id(), |state| state.dimensions = Vec3::new(30.0, 30.0, 30.0));
        assert!(selector.update(&a, Vec3::zeros(), true));
        assert_eq!(selector.ids(), vec![b.id(), a.id()]);

        tree.edit_entity(a.id(), |state| state.visible = false);
        assert!(selector.update(&a, Vec3::zeros(), true));
        assert_eq!(selector.ids(), vec![b.id()]);
    }
}
