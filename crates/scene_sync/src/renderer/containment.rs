//! Observer containment tracking
//!
//! Containment is recomputed when the observer moved far enough, enough
//! time passed, or a recheck was forced. The new set is diffed against the
//! previous one to derive leave and enter transitions.

use super::events::ContainmentEvent;
use crate::config::ContainmentConfig;
use crate::entities::{EntityId, EntityItem, EntityTree, PickFilter};
use crate::foundation::math::Vec3;
use log::trace;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Ids of the entities currently containing the observer
pub type ContainmentSet = BTreeSet<EntityId>;

/// Tracker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Waiting for a trigger
    Idle,
    /// Recomputing containment
    Rechecking,
}

/// Result of a recheck
#[derive(Debug, Default)]
pub struct Recheck {
    /// Leaves (ascending) followed by enters (ascending)
    pub transitions: Vec<ContainmentEvent>,
    /// Zones among the new containment set
    pub zones: BTreeSet<EntityId>,
    /// Visible containing zones with a renderable, for layering
    pub layered_candidates: Vec<Arc<EntityItem>>,
    /// Whether the recheck was forced
    pub forced: bool,
}

impl Recheck {
    /// Ids that were left
    pub fn leaves(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.transitions.iter().filter_map(|event| match event {
            ContainmentEvent::Leave(id) => Some(*id),
            ContainmentEvent::Enter(_) => None,
        })
    }

    /// Ids that were entered
    pub fn enters(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.transitions.iter().filter_map(|event| match event {
            ContainmentEvent::Enter(id) => Some(*id),
            ContainmentEvent::Leave(_) => None,
        })
    }
}

/// Tracks which zones and scripted entities contain the observer
#[derive(Debug)]
pub struct SpatialContainmentTracker {
    config: ContainmentConfig,
    state: TrackerState,
    force_recheck: bool,
    last_position: Vec3,
    last_check_us: Option<u64>,
    inside: ContainmentSet,
}

impl SpatialContainmentTracker {
    /// Create a tracker; the first check always runs
    pub fn new(config: ContainmentConfig) -> Self {
        Self {
            config,
            state: TrackerState::Idle,
            force_recheck: true,
            last_position: Vec3::zeros(),
            last_check_us: None,
            inside: ContainmentSet::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Request a recheck on the next call regardless of movement or time
    pub fn force_recheck(&mut self) {
        self.force_recheck = true;
    }

    /// Whether a forced recheck is pending
    pub fn is_recheck_forced(&self) -> bool {
        self.force_recheck
    }

    /// Observer position at the last recheck
    pub fn last_position(&self) -> Vec3 {
        self.last_position
    }

    /// Entities currently containing the observer
    pub fn inside(&self) -> &ContainmentSet {
        &self.inside
    }

    /// Whether the observer is inside `id`
    pub fn is_inside(&self, id: EntityId) -> bool {
        self.inside.contains(&id)
    }

    /// Whether a recheck is due for an observer at `position`
    pub fn needs_recheck(&self, position: Vec3, now_us: u64) -> bool {
        if self.force_recheck {
            return true;
        }
        let moved_enough = (position - self.last_position).magnitude() > self.config.check_distance;
        let enough_time_elapsed = self
            .last_check_us
            .map_or(true, |last| now_us.saturating_sub(last) > self.config.check_interval_us);
        moved_enough || enough_time_elapsed
    }

    /// Recompute containment if due
    ///
    /// `has_renderable` tells whether a zone has a live render item; only
    /// such zones are layering candidates.
    pub fn recheck(
        &mut self,
        tree: &EntityTree,
        position: Vec3,
        now_us: u64,
        has_renderable: impl Fn(EntityId) -> bool,
    ) -> Option<Recheck> {
        if !self.needs_recheck(position, now_us) {
            return None;
        }
        self.state = TrackerState::Rechecking;
        self.last_position = position;
        self.last_check_us = Some(now_us);
        let forced = std::mem::replace(&mut self.force_recheck, false);

        // Collect under the read lock, evaluate after releasing it
        let candidates: Vec<Arc<EntityItem>> = tree.with_read_lock(|contents| {
            contents
                .eval_entities_in_sphere(position, self.config.query_radius, PickFilter::all())
                .into_iter()
                .filter_map(|id| contents.find_entity_by_id(id).cloned())
                .collect()
        });

        let mut containing = ContainmentSet::new();
        let mut recheck = Recheck {
            forced,
            ..Recheck::default()
        };
        for entity in candidates {
            let is_zone = entity.is_zone();
            let has_script = entity.has_script();
            let script_loaded = has_script && entity.is_script_preload_finished();
            if !(is_zone || script_loaded) || !entity.contains(position) {
                continue;
            }
            if is_zone && entity.is_visible() && has_renderable(entity.id()) {
                recheck.layered_candidates.push(Arc::clone(&entity));
            }
            if (is_zone && !has_script) || script_loaded {
                if is_zone {
                    recheck.zones.insert(entity.id());
                }
                containing.insert(entity.id());
            }
        }

        recheck.transitions.extend(
            self.inside
                .difference(&containing)
                .map(|id| ContainmentEvent::Leave(*id)),
        );
        recheck.transitions.extend(
            containing
                .difference(&self.inside)
                .map(|id| ContainmentEvent::Enter(*id)),
        );
        if !recheck.transitions.is_empty() {
            trace!("Containment changed: {:?}", recheck.transitions);
        }
        self.inside = containing;
        self.state = TrackerState::Idle;
        Some(recheck)
    }

    /// Forget containment of `id`; returns whether the observer was inside
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.inside.remove(&id)
    }

    /// Leave everything; returns the ids left, ascending
    pub fn leave_all(&mut self) -> Vec<EntityId> {
        self.force_recheck = true;
        std::mem::take(&mut self.inside).into_iter().collect()
    }

    /// Leave every entity for which `keep` is false; returns the ids left
    pub fn leave_where(&mut self, mut keep: impl FnMut(EntityId) -> bool) -> Vec<EntityId> {
        let (kept, left): (ContainmentSet, ContainmentSet) = std::mem::take(&mut self.inside)
            .into_iter()
            .partition(|id| keep(*id));
        self.inside = kept;
        self.force_recheck = true;
        left.into_iter().collect()
    }
}
