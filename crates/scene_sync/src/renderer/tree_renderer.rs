//! Entity tree renderer
//!
//! The context object a hosting session constructs once and ticks every
//! frame. It mirrors the entity tree into the render scene, tracks which
//! zones contain the observer and keeps the zone culling and layering
//! state derived from that containment.
//!
//! Only the tick thread touches the renderer. Other threads report entity
//! changes through a [`ChangeNotifier`] and mutate the tree, whose
//! notifications are drained at the start of every tick.

use super::containment::SpatialContainmentTracker;
use super::culling::ZoneCullingStack;
use super::events::{ContainmentEvent, ContainmentEvents, ContainmentListener};
use super::layered_zones::LayeredZoneSelector;
use super::registry::RenderableRegistry;
use super::renderable::Renderable;
use super::scheduler::{PassContext, PassStats, UpdateScheduler};
use super::view_state::ViewState;
use crate::config::SyncConfig;
use crate::entities::{EntityId, EntityItem, EntityTree, TreeEvent};
use crate::foundation::math::Sphere;
use crate::foundation::time::Clock;
use crate::render::{RenderItemId, RenderScene, Transaction};
use crate::scripting::{methods, Collision, ScriptArg, ScriptEngine, ScriptHost, ScriptNotice};
use crate::spatial::{Space, SpaceIndex, SpaceTransaction};
use crossbeam_channel::Receiver;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Name of the selection holding the ranked zone render items
pub const RANKED_ZONES_SELECTION: &str = "RankedZones";

#[derive(Debug, Default)]
struct Inbox {
    changed: Mutex<HashSet<EntityId>>,
    space_updates: Mutex<Vec<(SpaceIndex, Sphere)>>,
}

/// Thread-safe handle for reporting changes between ticks
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    inbox: Arc<Inbox>,
}

impl ChangeNotifier {
    /// Mark an entity as needing a render update
    pub fn entity_changed(&self, id: EntityId) {
        self.inbox.changed.lock().insert(id);
    }

    /// Buffer a new bounding sphere for a spatial-index slot
    pub fn space_update(&self, index: SpaceIndex, sphere: Sphere) {
        self.inbox.space_updates.lock().push((index, sphere));
    }

    fn take_changed(&self) -> HashSet<EntityId> {
        std::mem::take(&mut *self.inbox.changed.lock())
    }

    fn take_space_updates(&self) -> Vec<(SpaceIndex, Sphere)> {
        std::mem::take(&mut *self.inbox.space_updates.lock())
    }
}

/// Synchronizes an [`EntityTree`] with a [`RenderScene`]
pub struct EntityTreeRenderer {
    config: SyncConfig,
    tree: Option<Arc<EntityTree>>,
    tree_events: Option<Receiver<TreeEvent>>,
    scene: Option<Arc<RenderScene>>,
    view_state: Arc<dyn ViewState>,
    clock: Arc<dyn Clock>,
    scripts: Option<ScriptEngine>,
    space: Mutex<Space>,
    notifier: ChangeNotifier,
    registry: RenderableRegistry,
    scheduler: UpdateScheduler,
    tracker: SpatialContainmentTracker,
    culling: ZoneCullingStack,
    layered_zones: LayeredZoneSelector,
    listeners: ContainmentEvents,
    ids_last_in_scene: Vec<EntityId>,
    scene_ready: bool,
    shutting_down: bool,
}

impl EntityTreeRenderer {
    /// Create a renderer over `tree` feeding `scene`
    pub fn new(
        config: SyncConfig,
        tree: Arc<EntityTree>,
        scene: Arc<RenderScene>,
        view_state: Arc<dyn ViewState>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler: UpdateScheduler::new(config.scheduler.clone(), config.priority.clone()),
            tracker: SpatialContainmentTracker::new(config.containment.clone()),
            config,
            tree_events: Some(tree.events()),
            tree: Some(tree),
            scene: Some(scene),
            view_state,
            clock,
            scripts: None,
            space: Mutex::new(Space::new()),
            notifier: ChangeNotifier::default(),
            registry: RenderableRegistry::new(),
            culling: ZoneCullingStack::new(),
            layered_zones: LayeredZoneSelector::new(),
            listeners: ContainmentEvents::new(),
            ids_last_in_scene: Vec::new(),
            scene_ready: false,
            shutting_down: false,
        }
    }

    /// Run entity scripts on `host`; ignored when scripts are disabled
    pub fn with_script_host<H: ScriptHost + 'static>(mut self, host: H) -> Self {
        if !self.config.want_scripts {
            debug!("Scripts disabled, not starting a script engine");
            return self;
        }
        if let Some(tree) = &self.tree {
            self.scripts = Some(ScriptEngine::spawn(host, Arc::downgrade(tree)));
        }
        self
    }

    /// Register a containment listener
    pub fn register_listener(&mut self, listener: Box<dyn ContainmentListener>) {
        self.listeners.register(listener);
    }

    /// Handle for reporting changes from other threads
    pub fn notifier(&self) -> ChangeNotifier {
        self.notifier.clone()
    }

    /// Mark an entity as needing a render update
    pub fn on_entity_changed(&self, id: EntityId) {
        self.notifier.entity_changed(id);
    }

    /// Buffer a spatial-index update, applied on the next tick
    pub fn handle_space_update(&self, index: SpaceIndex, sphere: Sphere) {
        self.notifier.space_update(index, sphere);
    }

    /// Replace the tree; state derived from the previous one is dropped
    pub fn set_tree(&mut self, tree: Option<Arc<EntityTree>>) {
        self.clear();
        self.tree_events = tree.as_ref().map(|tree| tree.events());
        self.tree = tree;
    }

    /// Replace or detach the render scene
    pub fn set_scene(&mut self, scene: Option<Arc<RenderScene>>) {
        self.scene = scene;
    }

    /// Prepare for the first tick
    ///
    /// Entities already in the tree are staged for promotion.
    pub fn init(&mut self) {
        if self.shutting_down {
            return;
        }
        let Some(tree) = self.tree.clone() else {
            warn!("init() without an entity tree");
            return;
        };
        let mut existing: Vec<EntityId> =
            tree.with_read_lock(|contents| contents.iter().map(|entity| entity.id()).collect());
        existing.sort_unstable();
        for id in existing {
            self.adding_entity(id);
        }
        if let Some(events) = &self.tree_events {
            // Entities staged above were announced too
            while events.try_recv().is_ok() {}
        }
        self.tracker.force_recheck();
        self.culling.clear_skip_list();
        info!("Entity tree renderer initialized with {} pending entities", self.registry.pending_len());
    }

    /// One simulation tick
    ///
    /// Applies tree notifications, promotes pending entities, runs the
    /// update pass, flushes spatial-index updates and, when `simulate` is
    /// set, rechecks containment.
    pub fn update(&mut self, simulate: bool) {
        if self.shutting_down {
            return;
        }
        let Some(tree) = self.tree.clone() else {
            warn!("update() without an entity tree");
            return;
        };

        // Notices first: preloads requested by this tick's events land next tick
        self.process_script_notices(&tree);
        self.process_tree_events(&tree);

        match self.scene.clone() {
            Some(scene) => {
                let mut transaction = Transaction::new();
                self.add_pending_entities(&tree, &scene, &mut transaction);
                self.update_changed_entities(&mut transaction);
                scene.enqueue_transaction(transaction);
            }
            None => warn!("update() without a render scene"),
        }

        self.flush_space_updates(&tree);

        if simulate {
            self.check_enter_leave_entities();
        }
    }

    fn process_tree_events(&mut self, tree: &EntityTree) {
        let Some(events) = self.tree_events.clone() else {
            return;
        };
        for event in events.try_iter() {
            match event {
                TreeEvent::Adding(id) => self.adding_entity(id),
                TreeEvent::Deleting(id) => self.deleting_entity(id),
                TreeEvent::ScriptChanging { id, reload } => self.entity_script_changing(id, reload),
                TreeEvent::Changed(id) => {
                    self.notifier.entity_changed(id);
                    if let Some(entity) = tree.find_entity(id) {
                        if let Some(index) = entity.space_index() {
                            self.notifier.space_update(
                                index,
                                Sphere::new(entity.world_position(), entity.bounding_radius()),
                            );
                        }
                        if entity.is_zone() {
                            self.update_zone(id);
                        }
                    }
                }
            }
        }
    }

    fn process_script_notices(&mut self, tree: &EntityTree) {
        let Some(scripts) = &self.scripts else {
            return;
        };
        for notice in scripts.drain_notices() {
            match notice {
                ScriptNotice::PreloadFinished(id) => {
                    if let Some(entity) = tree.find_entity(id) {
                        entity.set_script_preload_finished(true);
                        self.tracker.force_recheck();
                    }
                }
            }
        }
    }

    fn add_pending_entities(&mut self, tree: &EntityTree, scene: &RenderScene, transaction: &mut Transaction) {
        let now = self.clock.now_usecs();
        let promoted = self
            .registry
            .tick_pending(tree, &self.space, scene, now, transaction);
        if !promoted.is_empty() {
            debug!("Promoted {} entities", promoted.len());
            self.tracker.force_recheck();
        }
    }

    fn update_changed_entities(&mut self, transaction: &mut Transaction) {
        let changed = self.notifier.take_changed();
        let views = self.view_state.conical_views();
        let clock = Arc::clone(&self.clock);
        let context = PassContext {
            registry: &self.registry,
            views: &views,
            clock: &*clock,
            scene_ready: self.scene_ready,
        };
        self.scheduler
            .run_pass(changed, &context, &mut |renderable: &Renderable, entity: &EntityItem| {
                renderable.update_in_scene(entity, clock.now_usecs(), transaction);
            });
        self.scene_ready = true;
    }

    fn flush_space_updates(&self, tree: &EntityTree) {
        let mut space_transaction = SpaceTransaction::new();
        space_transaction.update(self.notifier.take_space_updates());
        let mut stale = Vec::new();
        tree.swap_stale_proxies(&mut stale);
        space_transaction.remove(stale);

        let mut space = self.space.lock();
        space.enqueue_transaction(space_transaction);
        let applied = space.process_transactions();
        if applied > 0 {
            trace!("Applied {} spatial-index ops", applied);
        }
    }

    /// Recompute containment if due and apply the resulting transitions
    pub fn check_enter_leave_entities(&mut self) {
        if self.shutting_down {
            return;
        }
        let Some(tree) = self.tree.clone() else {
            warn!("check_enter_leave_entities() without an entity tree");
            return;
        };
        let position = self.view_state.observer_position();
        let now = self.clock.now_usecs();
        let registry = &self.registry;
        let Some(recheck) = self
            .tracker
            .recheck(&tree, position, now, |id| registry.contains(id))
        else {
            return;
        };

        for id in recheck.leaves() {
            self.culling.remove(id);
            self.call_script(id, methods::LEAVE_ENTITY, Vec::new());
        }
        for id in recheck.enters() {
            if recheck.zones.contains(&id) {
                self.culling.push(id);
            }
            self.call_script(id, methods::ENTER_ENTITY, Vec::new());
        }
        self.listeners.dispatch(&recheck.transitions);

        let layered = LayeredZoneSelector::from_candidates(&recheck.layered_candidates);
        if self.layered_zones.replace(layered) {
            self.apply_layered_zones();
        }

        self.evaluate_zone_culling_stack(&tree, recheck.forced);
    }

    fn evaluate_zone_culling_stack(&mut self, tree: &EntityTree, forced: bool) {
        if !self.culling.evaluate(tree, forced) {
            return;
        }
        let Some(scene) = &self.scene else {
            warn!("Zone culling changed without a render scene");
            return;
        };
        // Static renderables are outside the per-tick pass
        let now = self.clock.now_usecs();
        let mut transaction = Transaction::new();
        for id in self.scheduler.static_ids() {
            let Some(renderable) = self.registry.lookup(id) else {
                continue;
            };
            if let Some(entity) = renderable.entity() {
                renderable.update_in_scene(&entity, now, &mut transaction);
            }
        }
        scene.enqueue_transaction(transaction);
    }

    fn call_script(&self, id: EntityId, method: &str, args: Vec<ScriptArg>) {
        if let Some(scripts) = &self.scripts {
            if let Err(err) = scripts.call_method(id, method, args) {
                warn!("{}() on {} not delivered: {}", method, id, err);
            }
        }
    }

    fn unload_script(&self, id: EntityId) {
        if let Some(scripts) = &self.scripts {
            if let Err(err) = scripts.unload_script(id) {
                warn!("Unload of {} not delivered: {}", id, err);
            }
        }
    }

    fn leave(&mut self, ids: &[EntityId]) {
        let mut events = Vec::with_capacity(ids.len());
        for &id in ids {
            self.culling.remove(id);
            self.call_script(id, methods::LEAVE_ENTITY, Vec::new());
            events.push(ContainmentEvent::Leave(id));
        }
        self.listeners.dispatch(&events);
    }

    /// Tree notification: an entity was added
    pub fn adding_entity(&mut self, id: EntityId) {
        self.check_and_call_preload(id, false, false);
        let Some(tree) = &self.tree else {
            return;
        };
        if let Some(entity) = tree.find_entity(id) {
            self.registry.enqueue(&Arc::downgrade(&entity));
        }
    }

    /// Tree notification: an entity is being deleted
    pub fn deleting_entity(&mut self, id: EntityId) {
        self.registry.dequeue(id);
        if self.tree.is_some() && !self.shutting_down {
            if self.tracker.remove(id) {
                self.leave(&[id]);
            }
            self.unload_script(id);
        }

        let Some(scene) = self.scene.clone() else {
            warn!("deleting_entity({}) without a render scene", id);
            return;
        };

        self.scheduler.forget(id);
        let Some(renderable) = self.registry.remove(id) else {
            return;
        };
        self.tracker.force_recheck();

        let mut transaction = Transaction::new();
        renderable.fade_out(&mut transaction);
        scene.enqueue_transaction(transaction);
    }

    /// Tree notification: an entity's script was replaced or reloaded
    pub fn entity_script_changing(&mut self, id: EntityId, reload: bool) {
        self.check_and_call_preload(id, reload, true);
        // Re-run containment so a reloaded script inside which the observer
        // stands gets its enter
        self.tracker.force_recheck();
    }

    /// Load, reload or unload the script of an entity to match its URL
    pub fn check_and_call_preload(&mut self, id: EntityId, reload: bool, unload_first: bool) {
        if self.shutting_down {
            return;
        }
        let Some(entity) = self.tree.as_ref().and_then(|tree| tree.find_entity(id)) else {
            return;
        };
        let url = entity.script();
        let should_load = !url.is_empty() && self.scripts.is_some();

        if (should_load && unload_first) || url.is_empty() {
            if self.tracker.remove(id) {
                self.leave(&[id]);
            }
            self.unload_script(id);
            entity.set_script_preload_finished(false);
        }
        if should_load {
            entity.set_script_preload_finished(false);
            if let Some(scripts) = &self.scripts {
                if let Err(err) = scripts.load_script(id, url, reload) {
                    warn!("Script load for {} not delivered: {}", id, err);
                }
            }
        }
    }

    /// Leave every contained entity and empty the culling stack
    pub fn leave_all_entities(&mut self) {
        if self.shutting_down || self.tree.is_none() {
            return;
        }
        self.culling.clear();
        let left = self.tracker.leave_all();
        self.leave(&left);
    }

    fn leave_domain_and_non_owned_entities(&mut self, tree: &EntityTree) {
        let left = self.tracker.leave_where(|id| {
            tree.find_entity(id)
                .map_or(false, |entity| entity.owner().is_local_or_my_avatar())
        });
        self.leave(&left);
    }

    /// Drop everything that belongs to the current domain
    ///
    /// Local and my-avatar entities keep their renderables, containment and
    /// layered zones.
    pub fn clear_domain_and_non_owned_entities(&mut self) {
        if self.shutting_down {
            return;
        }
        let Some(tree) = self.tree.clone() else {
            warn!("clear_domain_and_non_owned_entities() without an entity tree");
            return;
        };

        self.leave_domain_and_non_owned_entities(&tree);
        for id in self.registry.ids() {
            let domain_script = self.registry.lookup(id).and_then(|r| r.entity()).map_or(false, |entity| {
                entity.has_script() && !entity.owner().is_local_or_my_avatar()
            });
            if domain_script {
                self.unload_script(id);
            }
        }
        self.culling.clear_skip_list();

        let removed = self.registry.remove_where(|renderable| {
            renderable
                .entity()
                .map_or(false, |entity| entity.owner().is_local_or_my_avatar())
        });
        match &self.scene {
            Some(scene) => {
                let mut transaction = Transaction::new();
                for renderable in &removed {
                    renderable.fade_out(&mut transaction);
                }
                scene.enqueue_transaction(transaction);
            }
            None => warn!("Cleared domain entities without a render scene"),
        }
        let registry = &self.registry;
        self.scheduler.retain(|id| registry.contains(id));

        if self.layered_zones.clear_domain_and_non_owned() {
            self.apply_layered_zones();
        }

        let deleted = tree.delete_entities_where(|entity| !entity.owner().is_local_or_my_avatar());
        info!(
            "Cleared {} domain renderables and {} domain entities",
            removed.len(),
            deleted.len()
        );
    }

    /// Tear down every renderable and all containment state
    pub fn clear(&mut self) {
        self.leave_all_entities();
        self.culling.clear();
        self.culling.clear_skip_list();

        if let Some(scripts) = &self.scripts {
            if let Err(err) = scripts.unload_all() {
                warn!("Unloading scripts failed: {}", err);
            }
            if self.shutting_down {
                scripts.stop();
            }
        }

        let renderables = self.registry.drain();
        match &self.scene {
            Some(scene) => {
                let mut transaction = Transaction::new();
                for renderable in &renderables {
                    if self.shutting_down {
                        renderable.remove_from_scene(&mut transaction);
                    } else {
                        renderable.fade_out(&mut transaction);
                    }
                }
                scene.enqueue_transaction(transaction);
            }
            None => warn!("clear() without a render scene"),
        }

        self.scheduler.clear();
        self.layered_zones.clear();
        self.ids_last_in_scene.clear();
        self.tracker.leave_all();

        if !self.shutting_down {
            self.apply_layered_zones();
        }
    }

    /// A new domain connection started
    ///
    /// Priority classification is bypassed until the first pass afterwards.
    pub fn connected_to_domain(&mut self) {
        if self.shutting_down {
            return;
        }
        self.scene_ready = false;
        self.culling.clear_skip_list();
        self.scheduler.clear_static();
        let Some(tree) = self.tree.clone() else {
            warn!("connected_to_domain() without an entity tree");
            return;
        };
        let forced = self.tracker.is_recheck_forced();
        self.evaluate_zone_culling_stack(&tree, forced);
    }

    /// Unload every script and load them again
    pub fn reload_entity_scripts(&mut self) {
        if self.shutting_down {
            return;
        }
        let Some(scripts) = &self.scripts else {
            return;
        };
        if let Err(err) = scripts.unload_all() {
            warn!("Unloading scripts failed: {}", err);
            return;
        }
        for id in self.registry.ids() {
            let Some(entity) = self.registry.lookup(id).and_then(|r| r.entity()) else {
                continue;
            };
            if entity.has_script() {
                entity.set_script_preload_finished(false);
                if let Err(err) = scripts.load_script(id, entity.script(), true) {
                    warn!("Script reload for {} not delivered: {}", id, err);
                }
            }
        }
    }

    /// Stop for good; every later call returns immediately
    pub fn shutdown(&mut self) {
        self.shutting_down = true;
        self.clear();
        info!("Entity tree renderer shut down");
    }

    /// Hide or restore every entity
    ///
    /// Hiding removes every renderable and remembers the ids; restoring
    /// stages them for promotion again.
    pub fn update_entity_render_status(&mut self, should_render_entities: bool) {
        if should_render_entities {
            for id in std::mem::take(&mut self.ids_last_in_scene) {
                self.adding_entity(id);
            }
        } else {
            self.ids_last_in_scene = self.registry.ids();
            for id in self.ids_last_in_scene.clone() {
                self.deleting_entity(id);
            }
        }
    }

    /// Re-rank a zone after its position, size or visibility changed
    pub fn update_zone(&mut self, id: EntityId) {
        let Some(zone) = self
            .tree
            .as_ref()
            .and_then(|tree| tree.find_entity(id))
            .filter(|entity| entity.is_zone())
        else {
            return;
        };
        let has_renderable = self.registry.contains(id);
        if self
            .layered_zones
            .update(&zone, self.tracker.last_position(), has_renderable)
        {
            self.apply_layered_zones();
        }
    }

    /// Publish the ranked zone render items as the `RankedZones` selection
    pub fn apply_layered_zones(&self) -> bool {
        let Some(scene) = &self.scene else {
            warn!("apply_layered_zones() without a render scene");
            return false;
        };
        let registry = &self.registry;
        let items = self
            .layered_zones
            .render_ids(|id| registry.lookup(id).map(|renderable| renderable.item_id()));
        let mut transaction = Transaction::new();
        transaction.reset_selection(RANKED_ZONES_SELECTION, items);
        scene.enqueue_transaction(transaction);
        true
    }

    /// Deliver a collision to both entities' scripts
    ///
    /// B receives the collision from its own point of view.
    pub fn entity_collision_with_entity(&self, id_a: EntityId, id_b: EntityId, collision: &Collision) {
        if self.shutting_down {
            return;
        }
        let Some(tree) = &self.tree else {
            return;
        };
        if tree.find_entity(id_a).is_none() || tree.find_entity(id_b).is_none() {
            trace!("Collision between {} and {} involves a missing entity", id_a, id_b);
            return;
        }
        self.call_script(
            id_a,
            methods::COLLISION_WITH_ENTITY,
            vec![ScriptArg::Entity(id_b), ScriptArg::Collision(*collision)],
        );
        self.call_script(
            id_b,
            methods::COLLISION_WITH_ENTITY,
            vec![ScriptArg::Entity(id_a), ScriptArg::Collision(collision.inverted())],
        );
    }

    /// Entity ids the render visibility filter must skip, ascending
    pub fn zone_cull_skip_list(&self) -> Vec<EntityId> {
        self.culling.skip_list().iter().copied().collect()
    }

    /// Zones on the culling stack, in entry order
    pub fn zone_culling_stack(&self) -> Vec<EntityId> {
        self.culling.ids().to_vec()
    }

    /// Ranked zone ids, highest priority first
    pub fn layered_zone_ids(&self) -> Vec<EntityId> {
        self.layered_zones.ids()
    }

    /// `(flying_allowed, ghosting_allowed)` of the highest-ranked domain zone
    pub fn zone_interaction_properties(&self) -> (bool, bool) {
        self.layered_zones.zone_interaction_properties()
    }

    /// Ghosting flag of the last zone on the evaluated culling stack
    pub fn ghosting_allowed(&self) -> bool {
        self.culling.ghosting_allowed()
    }

    /// Entities currently containing the observer, ascending
    pub fn containing_entities(&self) -> Vec<EntityId> {
        self.tracker.inside().iter().copied().collect()
    }

    /// Renderable of an entity
    pub fn renderable_for_entity_id(&self, id: EntityId) -> Option<Arc<Renderable>> {
        self.registry.lookup(id)
    }

    /// Render item of an entity
    pub fn render_item_for_entity_id(&self, id: EntityId) -> Option<RenderItemId> {
        self.registry.lookup(id).map(|renderable| renderable.item_id())
    }

    /// Whether the entity's renderable takes keyboard focus
    pub fn wants_keyboard_focus(&self, id: EntityId) -> bool {
        self.registry
            .lookup(id)
            .map_or(false, |renderable| renderable.wants_keyboard_focus())
    }

    /// Whether the entity's renderable takes hand-controller pointer events
    pub fn wants_pointer_events(&self, id: EntityId) -> bool {
        self.registry
            .lookup(id)
            .map_or(false, |renderable| renderable.wants_pointer_events())
    }

    /// Number of live renderables
    pub fn renderable_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of entities waiting for promotion
    pub fn pending_count(&self) -> usize {
        self.registry.pending_len()
    }

    /// Number of allocated spatial-index slots
    pub fn space_proxy_count(&self) -> usize {
        self.space.lock().len()
    }

    /// Statistics of the most recent update pass
    pub fn pass_stats(&self) -> PassStats {
        self.scheduler.last_pass()
    }

    /// Force a containment recheck on the next tick
    pub fn force_recheck_entities(&mut self) {
        self.tracker.force_recheck();
    }

    /// Treat everything as Automatic while editing
    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.scheduler.set_edit_mode(edit_mode);
    }

    /// Treat everything as Automatic during bulk operations
    pub fn set_bypass_priority_sorting(&mut self, bypass: bool) {
        self.scheduler.set_bypass_priority_sorting(bypass);
    }

    /// Whether priority classification is active
    pub fn is_scene_ready(&self) -> bool {
        self.scene_ready
    }

    /// Whether [`EntityTreeRenderer::shutdown`] ran
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// The script engine, when scripts are enabled
    pub fn scripts(&self) -> Option<&ScriptEngine> {
        self.scripts.as_ref()
    }
}

impl std::fmt::Debug for EntityTreeRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTreeRenderer")
            .field("renderables", &self.registry.len())
            .field("pending", &self.registry.pending_len())
            .field("inside", &self.tracker.inside())
            .field("culling_stack", &self.culling.ids())
            .field("shutting_down", &self.shutting_down)
            .finish()
    }
}
