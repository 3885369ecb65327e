//! Time-budgeted renderable update pass
//!
//! Dirty renderables are split by their entity's priority classification.
//! Prioritized ones are always updated. Automatic ones are updated in bulk
//! when the running cost estimate fits the budget, otherwise ranked by view
//! relevance and updated until the budget runs out; the rest stay deferred
//! for later ticks. Static ones are only refreshed when zone culling
//! changes.

use super::priority::{ConicalView, PrioritySorter};
use super::registry::RenderableRegistry;
use super::renderable::Renderable;
use crate::config::{PriorityWeights, SchedulerConfig};
use crate::entities::{EntityId, EntityItem, EntityPriority};
use crate::foundation::time::Clock;
use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Statistics of the most recent pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassStats {
    /// Automatic renderables that needed an update
    pub total_needed: usize,
    /// Automatic renderables updated
    pub updated: usize,
    /// Prioritized renderables updated
    pub prioritized: usize,
    /// Automatic renderables left for a later pass
    pub deferred: usize,
    /// Whether the ranked path ran
    pub ranked: bool,
    /// Running average cost per renderable after the pass
    pub average_cost_us: f32,
}

/// Collaborators a pass reads from
pub struct PassContext<'a> {
    /// Live renderables
    pub registry: &'a RenderableRegistry,
    /// Views used for ranking
    pub views: &'a [ConicalView],
    /// Time source checked before every ranked item
    pub clock: &'a dyn Clock,
    /// Until the scene is ready every renderable is treated as Automatic
    pub scene_ready: bool,
}

struct Ranked {
    id: EntityId,
    renderable: Arc<Renderable>,
    entity: Arc<EntityItem>,
    starved: bool,
    deferrals: u32,
    priority: f32,
}

impl Ranked {
    fn urgency(&self, other: &Self) -> Ordering {
        other
            .starved
            .cmp(&self.starved)
            .then_with(|| {
                if self.starved && other.starved {
                    other.deferrals.cmp(&self.deferrals)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| other.priority.total_cmp(&self.priority))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Budgeted, cost-adaptive update scheduler
#[derive(Debug)]
pub struct UpdateScheduler {
    config: SchedulerConfig,
    weights: PriorityWeights,
    average_cost_us: f32,
    /// Automatic renderables still owed an update, with their deferral count
    deferred: HashMap<EntityId, u32>,
    static_ids: BTreeSet<EntityId>,
    edit_mode: bool,
    bypass_priority_sorting: bool,
    last_pass: PassStats,
}

impl UpdateScheduler {
    /// Create a scheduler
    pub fn new(config: SchedulerConfig, weights: PriorityWeights) -> Self {
        Self {
            average_cost_us: config.initial_update_cost_us,
            config,
            weights,
            deferred: HashMap::new(),
            static_ids: BTreeSet::new(),
            edit_mode: false,
            bypass_priority_sorting: false,
            last_pass: PassStats::default(),
        }
    }

    /// Treat everything as Automatic while editing
    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    /// Treat everything as Automatic during bulk operations
    pub fn set_bypass_priority_sorting(&mut self, bypass: bool) {
        self.bypass_priority_sorting = bypass;
    }

    /// Running average update cost per renderable
    pub fn average_cost_us(&self) -> f32 {
        self.average_cost_us
    }

    /// Statistics of the most recent pass
    pub fn last_pass(&self) -> PassStats {
        self.last_pass
    }

    /// Whether an Automatic renderable is still owed an update
    pub fn is_deferred(&self, id: EntityId) -> bool {
        self.deferred.contains_key(&id)
    }

    /// Number of Automatic renderables still owed an update
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Renderables classified Static, ascending
    pub fn static_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.static_ids.iter().copied()
    }

    /// Forget the Static set
    pub fn clear_static(&mut self) {
        self.static_ids.clear();
    }

    /// Drop every trace of a renderable
    pub fn forget(&mut self, id: EntityId) {
        self.deferred.remove(&id);
        self.static_ids.remove(&id);
    }

    /// Keep only renderables for which `keep` holds
    pub fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.deferred.retain(|id, _| keep(*id));
        self.static_ids.retain(|id| keep(*id));
    }

    /// Drop all per-renderable state
    pub fn clear(&mut self) {
        self.deferred.clear();
        self.static_ids.clear();
    }

    fn classify(&self, entity: &EntityItem, scene_ready: bool) -> EntityPriority {
        if !scene_ready || self.edit_mode || self.bypass_priority_sorting {
            return EntityPriority::Automatic;
        }
        match entity.priority() {
            EntityPriority::Static if entity.forbids_static() => EntityPriority::Automatic,
            priority => priority,
        }
    }

    fn blend_cost(&mut self, elapsed_us: u64, count: usize) {
        let observed = elapsed_us as f32 / count.max(1) as f32;
        let blend = self.config.cost_blend;
        self.average_cost_us = (1.0 - blend) * self.average_cost_us + blend * observed;
    }

    /// Run one pass over `dirty` plus whatever earlier passes deferred
    ///
    /// `apply` performs the update of one renderable. Returns the number of
    /// renderables updated.
    pub fn run_pass(
        &mut self,
        dirty: impl IntoIterator<Item = EntityId>,
        context: &PassContext<'_>,
        apply: &mut dyn FnMut(&Renderable, &EntityItem),
    ) -> usize {
        let mut prioritized = Vec::new();
        for id in dirty {
            let Some(renderable) = context.registry.lookup(id) else {
                trace!("No renderable for dirty {}", id);
                continue;
            };
            let Some(entity) = renderable.entity() else {
                trace!("Dirty {} expired", id);
                self.forget(id);
                continue;
            };
            match self.classify(&entity, context.scene_ready) {
                EntityPriority::Static => {
                    self.deferred.remove(&id);
                    self.static_ids.insert(id);
                }
                EntityPriority::Prioritized => {
                    self.forget(id);
                    prioritized.push((renderable, entity));
                }
                EntityPriority::Automatic => {
                    self.static_ids.remove(&id);
                    self.deferred.entry(id).or_insert(0);
                }
            }
        }

        prioritized.sort_by_key(|(renderable, _)| renderable.entity_id());
        for (renderable, entity) in &prioritized {
            apply(renderable, entity);
        }

        let mut ids: Vec<EntityId> = self.deferred.keys().copied().collect();
        ids.sort_unstable();
        let mut automatic = Vec::with_capacity(ids.len());
        for id in ids {
            match context.registry.lookup(id).and_then(|r| r.entity().map(|e| (r, e))) {
                Some((renderable, entity)) => automatic.push((id, renderable, entity)),
                None => {
                    self.deferred.remove(&id);
                }
            }
        }

        let total_needed = automatic.len();
        let expected_cost = self.average_cost_us * total_needed as f32;
        let max_budget = self.config.max_update_time_budget_us;
        let mut stats = PassStats {
            total_needed,
            prioritized: prioritized.len(),
            ..PassStats::default()
        };

        if expected_cost < max_budget as f32 {
            let update_start = context.clock.now_usecs();
            for (_, renderable, entity) in &automatic {
                apply(renderable, entity);
            }
            self.deferred.clear();
            let elapsed = context.clock.now_usecs().saturating_sub(update_start);
            self.blend_cost(elapsed, total_needed);
            stats.updated = total_needed;
        } else {
            let sort_start = context.clock.now_usecs();
            let sorter = PrioritySorter::new(context.views, self.weights.clone(), sort_start);
            let mut ranked: Vec<Ranked> = automatic
                .into_iter()
                .map(|(id, renderable, entity)| {
                    let deferrals = self.deferred.get(&id).copied().unwrap_or(0);
                    Ranked {
                        id,
                        starved: deferrals >= self.config.starvation_passes,
                        deferrals,
                        priority: sorter.priority(
                            entity.world_position(),
                            entity.bounding_radius(),
                            renderable.update_time_us(),
                        ),
                        renderable,
                        entity,
                    }
                })
                .collect();
            ranked.sort_by(Ranked::urgency);

            let update_start = context.clock.now_usecs();
            let sort_cost = update_start.saturating_sub(sort_start);
            let min_budget = self.config.min_sorted_update_time_budget_us;
            let budget = if sort_cost < max_budget.saturating_sub(min_budget) {
                max_budget - sort_cost
            } else {
                min_budget
            };
            let expiry = update_start + budget;

            for item in &ranked {
                if context.clock.now_usecs() > expiry {
                    break;
                }
                apply(&item.renderable, &item.entity);
                self.deferred.remove(&item.id);
                stats.updated += 1;
            }
            for deferrals in self.deferred.values_mut() {
                *deferrals = deferrals.saturating_add(1);
            }

            let elapsed = context.clock.now_usecs().saturating_sub(update_start);
            self.blend_cost(elapsed, stats.updated);
            stats.ranked = true;
        }

        stats.deferred = self.deferred.len();
        stats.average_cost_us = self.average_cost_us;
        if stats.deferred > 0 {
            debug!(
                "Updated {} of {} renderables, {} deferred (avg cost {:.1}us)",
                stats.updated, stats.total_needed, stats.deferred, stats.average_cost_us
            );
        }
        self.last_pass = stats;
        stats.prioritized + stats.updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OctreeSettings;
    use crate::entities::{EntityKind, EntityProperties, EntityTree};
    use crate::foundation::math::Vec3;
    use crate::foundation::time::ManualClock;
    use crate::render::{RenderScene, Transaction};
    use crate::spatial::Space;
    use approx::assert_relative_eq;
    use parking_lot::Mutex;

    struct Fixture {
        tree: EntityTree,
        registry: RenderableRegistry,
        clock: ManualClock,
        entities: Vec<Arc<EntityItem>>,
    }

    fn fixture(kinds: &[(EntityKind, EntityPriority)]) -> Fixture {
        let tree = EntityTree::new(&OctreeSettings::default());
        let space = Mutex::new(Space::new());
        let (scene, _receiver) = RenderScene::new();
        let mut registry = RenderableRegistry::new();
        let mut entities = Vec::new();
        for (index, (kind, priority)) in kinds.iter().enumerate() {
            let kind = match kind {
                EntityKind::Shape => EntityKind::Shape,
                EntityKind::Web => EntityKind::Web,
                _ => EntityKind::Model,
            };
            let entity = tree.add_entity(
                kind,
                EntityProperties::at(Vec3::new(0.0, 0.0, -(index as f32) - 1.0)).with_priority(*priority),
            );
            registry.enqueue(&Arc::downgrade(&entity));
            entities.push(entity);
        }
        registry.tick_pending(&tree, &space, &scene, 0, &mut Transaction::new());
        Fixture {
            tree,
            registry,
            clock: ManualClock::new(0),
            entities,
        }
    }

    fn models(count: usize) -> Vec<(EntityKind, EntityPriority)> {
        (0..count)
            .map(|_| (EntityKind::Model, EntityPriority::Automatic))
            .collect()
    }

    impl Fixture {
        fn ids(&self) -> Vec<EntityId> {
            self.entities.iter().map(|entity| entity.id()).collect()
        }

        fn pass(&self, scheduler: &mut UpdateScheduler, dirty: Vec<EntityId>, cost_us: u64) -> (usize, Vec<EntityId>) {
            let context = PassContext {
                registry: &self.registry,
                views: &[],
                clock: &self.clock,
                scene_ready: true,
            };
            let mut updated = Vec::new();
            let count = scheduler.run_pass(dirty, &context, &mut |renderable: &Renderable, _: &EntityItem| {
                updated.push(renderable.entity_id());
                self.clock.advance(cost_us);
            });
            (count, updated)
        }
    }

    #[test]
    fn test_static_is_held_out_and_shapes_are_demoted() {
        let fixture = fixture(&[
            (EntityKind::Model, EntityPriority::Static),
            (EntityKind::Shape, EntityPriority::Static),
        ]);
        let mut scheduler = UpdateScheduler::new(SchedulerConfig::default(), PriorityWeights::default());

        let (count, updated) = fixture.pass(&mut scheduler, fixture.ids(), 1);

        assert_eq!(count, 1);
        assert_eq!(updated, vec![fixture.entities[1].id()]);
        assert_eq!(scheduler.static_ids().collect::<Vec<_>>(), vec![fixture.entities[0].id()]);
    }

    #[test]
    fn test_edit_mode_forces_automatic() {
        let fixture = fixture(&[(EntityKind::Model, EntityPriority::Static)]);
        let mut scheduler = UpdateScheduler::new(SchedulerConfig::default(), PriorityWeights::default());
        scheduler.set_edit_mode(true);

        let (count, _) = fixture.pass(&mut scheduler, fixture.ids(), 1);

        assert_eq!(count, 1);
        assert_eq!(scheduler.static_ids().count(), 0);
    }

    #[test]
    fn test_prioritized_runs_even_when_over_budget() {
        let mut kinds = models(3);
        kinds.push((EntityKind::Model, EntityPriority::Prioritized));
        let fixture = fixture(&kinds);
        let config = SchedulerConfig {
            initial_update_cost_us: 5_000.0,
            ..SchedulerConfig::default()
        };
        let mut scheduler = UpdateScheduler::new(config, PriorityWeights::default());

        let (_, updated) = fixture.pass(&mut scheduler, fixture.ids(), 3_000);

        assert_eq!(updated[0], fixture.entities[3].id());
        let stats = scheduler.last_pass();
        assert!(stats.ranked);
        assert_eq!(stats.prioritized, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.deferred, 2);
    }

    #[test]
    fn test_ranked_pass_stops_at_budget_boundary() {
        let fixture = fixture(&models(5));
        let config = SchedulerConfig {
            initial_update_cost_us: 1_000.0,
            ..SchedulerConfig::default()
        };
        let mut scheduler = UpdateScheduler::new(config, PriorityWeights::default());

        // 600us per item against a 2000us budget: items start at 0, 600,
        // 1200 and 1800; the fifth would start at 2400.
        let (count, _) = fixture.pass(&mut scheduler, fixture.ids(), 600);

        assert_eq!(count, 4);
        assert_eq!(scheduler.deferred_len(), 1);
    }

    #[test]
    fn test_deferred_items_carry_over_and_starved_go_first() {
        let fixture = fixture(&models(3));
        let config = SchedulerConfig {
            initial_update_cost_us: 10_000.0,
            min_sorted_update_time_budget_us: 0,
            max_update_time_budget_us: 1,
            starvation_passes: 2,
            cost_blend: 0.0001,
        };
        let mut scheduler = UpdateScheduler::new(config, PriorityWeights::default());

        let (_, first) = fixture.pass(&mut scheduler, fixture.ids(), 5);
        assert_eq!(first.len(), 1);
        assert_eq!(scheduler.deferred_len(), 2);

        // Nothing newly dirty; the carried items still get served
        let (_, second) = fixture.pass(&mut scheduler, Vec::new(), 5);
        assert_eq!(second.len(), 1);
        assert_ne!(second[0], first[0]);

        // The remaining item was deferred twice and jumps the queue
        let starving = fixture
            .ids()
            .into_iter()
            .find(|id| scheduler.is_deferred(*id))
            .expect("one item left");
        let (_, third) = fixture.pass(&mut scheduler, fixture.ids(), 5);
        assert_eq!(third[0], starving);
    }

    #[test]
    fn test_average_cost_converges_to_item_cost() {
        let fixture = fixture(&models(10));
        let mut scheduler = UpdateScheduler::new(SchedulerConfig::default(), PriorityWeights::default());

        for _ in 0..60 {
            fixture.pass(&mut scheduler, fixture.ids(), 10);
        }

        assert_relative_eq!(scheduler.average_cost_us(), 10.0, max_relative = 0.01);
    }

    #[test]
    fn test_expired_entities_are_skipped() {
        let fixture = fixture(&models(2));
        let mut scheduler = UpdateScheduler::new(SchedulerConfig::default(), PriorityWeights::default());
        fixture.tree.delete_entity(fixture.entities[0].id());

        let (count, updated) = fixture.pass(&mut scheduler, fixture.ids(), 1);

        assert_eq!(count, 1);
        assert_eq!(updated, vec![fixture.entities[1].id()]);
    }
}
