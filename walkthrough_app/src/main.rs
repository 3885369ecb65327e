//! Zone Walkthrough Demo
//!
//! Walks an observer along a straight path through a small world of nested
//! zones and scattered props:
//! - An `Outside` culling zone with a `Disabled` pavilion nested inside it
//! - A scripted beacon that greets the observer on enter/leave
//! - A render thread draining the transaction queue
//!
//! Run with an optional config path (`.toml` or `.ron`).

use rand::Rng;
use scene_sync::config::{Config, SyncConfig};
use scene_sync::entities::{EntityId, EntityItem, EntityKind, EntityPriority, EntityProperties, EntityTree};
use scene_sync::entities::{ZoneCullingMode, ZoneProperties};
use scene_sync::foundation::logging;
use scene_sync::foundation::math::Vec3;
use scene_sync::foundation::time::MonotonicClock;
use scene_sync::render::{RenderOp, RenderScene, TransactionReceiver};
use scene_sync::renderer::{ContainmentEvent, EntityTreeRenderer, StaticViewState, ViewState};
use scene_sync::scripting::{ScriptArg, ScriptError, ScriptHost};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

// World layout
const PLAZA_SIZE: f32 = 60.0;
const PAVILION_CENTER: f32 = 15.0;
const PAVILION_SIZE: f32 = 12.0;
const NUM_PROPS: usize = 40;

// Walk
const WALK_START: f32 = -50.0;
const WALK_END: f32 = 50.0;
const WALK_STEP: f32 = 2.5;
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Script host that only logs what it is asked to do
struct LoggingScriptHost;

impl ScriptHost for LoggingScriptHost {
    fn load(&mut self, entity: &EntityItem, url: &str, reload: bool) -> Result<(), ScriptError> {
        if url.is_empty() {
            return Err(ScriptError::LoadFailed {
                url: url.to_string(),
                reason: "empty script url".to_string(),
            });
        }
        log::info!("[script] load {} for {} (reload: {})", url, entity.id(), reload);
        Ok(())
    }

    fn unload(&mut self, id: EntityId) {
        log::info!("[script] unload {}", id);
    }

    fn call_method(&mut self, id: EntityId, method: &str, args: &[ScriptArg]) {
        log::info!("[script] {}.{}({} args)", id, method, args.len());
    }
}

/// Consumer side of the render queue
struct RenderThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<usize>>,
}

impl RenderThread {
    fn spawn(queue: TransactionReceiver, tree: Arc<EntityTree>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                let mut applied = 0;
                while flag.load(Ordering::Relaxed) {
                    let Some(transaction) = queue.recv_timeout(FRAME_TIME) else {
                        continue;
                    };
                    for op in transaction.into_ops() {
                        if let RenderOp::UpdateItem(_, payload) = &op {
                            if let Some(entity) = tree.find_entity(payload.entity) {
                                entity.set_needs_render_update(false);
                            }
                        }
                        if let RenderOp::ResetSelection { name, items } = &op {
                            log::debug!("[render] selection {} = {:?}", name, items);
                        }
                        applied += 1;
                    }
                }
                applied
            })
            .map_err(|err| log::error!("Failed to start render thread: {}", err))
            .ok();
        Self { running, handle }
    }

    fn stop(mut self) -> usize {
        self.running.store(false, Ordering::Relaxed);
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or(0)
    }
}

struct WalkthroughApp {
    tree: Arc<EntityTree>,
    view: Arc<StaticViewState>,
    renderer: EntityTreeRenderer,
    render_thread: RenderThread,
    beacon: EntityId,
}

impl WalkthroughApp {
    fn new(config: SyncConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let tree = Arc::new(EntityTree::new(&config.octree));
        let (scene, queue) = RenderScene::new();
        let view = Arc::new(StaticViewState::new(Vec3::new(WALK_START, 0.0, 0.0)));

        let beacon = Self::build_world(&tree);

        let mut renderer = EntityTreeRenderer::new(
            config,
            Arc::clone(&tree),
            scene,
            Arc::clone(&view) as Arc<dyn ViewState>,
            Arc::new(MonotonicClock::new()),
        )
        .with_script_host(LoggingScriptHost);
        renderer.register_listener(Box::new(|event: &ContainmentEvent| match event {
            ContainmentEvent::Enter(id) => log::info!("Entered {}", id),
            ContainmentEvent::Leave(id) => log::info!("Left {}", id),
        }));
        renderer.init();

        let render_thread = RenderThread::spawn(queue, Arc::clone(&tree));
        Ok(Self {
            tree,
            view,
            renderer,
            render_thread,
            beacon,
        })
    }

    /// Populate the tree; returns the scripted beacon
    fn build_world(tree: &EntityTree) -> EntityId {
        let plaza = tree.add_entity(
            EntityKind::Zone(ZoneProperties::new(ZoneCullingMode::Outside).with_ghosting_allowed(false)),
            EntityProperties::at(Vec3::zeros()).with_dimensions(Vec3::new(PLAZA_SIZE, 20.0, PLAZA_SIZE)),
        );
        tree.add_entity(
            EntityKind::Zone(ZoneProperties::new(ZoneCullingMode::Disabled).with_flying_allowed(false)),
            EntityProperties::at(Vec3::new(PAVILION_CENTER, 0.0, 0.0))
                .with_dimensions(Vec3::new(PAVILION_SIZE, 10.0, PAVILION_SIZE))
                .with_parent(plaza.id()),
        );

        let mut rng = rand::thread_rng();
        for i in 0..NUM_PROPS {
            let position = Vec3::new(
                rng.gen_range(-PLAZA_SIZE..PLAZA_SIZE),
                0.0,
                rng.gen_range(-PLAZA_SIZE..PLAZA_SIZE),
            );
            let priority = match i % 4 {
                0 => EntityPriority::Static,
                1 => EntityPriority::Prioritized,
                _ => EntityPriority::Automatic,
            };
            let kind = if i % 3 == 0 { EntityKind::Shape } else { EntityKind::Model };
            tree.add_entity(kind, EntityProperties::at(position).with_priority(priority));
        }

        tree.add_entity(
            EntityKind::Light,
            EntityProperties::at(Vec3::new(-20.0, 0.0, 0.0))
                .with_dimensions(Vec3::new(6.0, 6.0, 6.0))
                .with_script("file:///scripts/beacon.js"),
        )
        .id()
    }

    fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut x = WALK_START;
        let mut frame = 0_u32;
        while x <= WALK_END {
            self.view.set_observer_position(Vec3::new(x, 0.0, 0.0));

            // Props drift a little every few frames
            if frame % 4 == 0 {
                let id = EntityId::new(u64::from(frame % 40) + 3);
                self.tree.edit_entity(id, |state| state.position.y += 0.1);
            }
            if frame == 20 {
                self.tree.set_script(self.beacon, "file:///scripts/beacon_v2.js", true);
            }

            self.renderer.update(true);
            if frame % 10 == 0 {
                let stats = self.renderer.pass_stats();
                let (flying, ghosting) = self.renderer.zone_interaction_properties();
                log::info!(
                    "x={:6.1} inside={:?} skip={} layered={:?} flying={} ghosting={} updated={}/{}",
                    x,
                    self.renderer.containing_entities(),
                    self.renderer.zone_cull_skip_list().len(),
                    self.renderer.layered_zone_ids(),
                    flying,
                    ghosting,
                    stats.updated + stats.prioritized,
                    stats.total_needed + stats.prioritized,
                );
            }

            std::thread::sleep(FRAME_TIME);
            x += WALK_STEP;
            frame += 1;
        }

        self.renderer.clear_domain_and_non_owned_entities();
        self.renderer.update(true);
        self.renderer.shutdown();
        let applied = self.render_thread.stop();
        log::info!("Render thread applied {} ops", applied);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_filter("info");

    let config = match std::env::args().nth(1) {
        Some(path) => SyncConfig::load_from_file(&path)?,
        None => SyncConfig::default(),
    };

    println!("=== Zone Walkthrough Demo ===");
    println!("Walking from x={} to x={} through a culling plaza", WALK_START, WALK_END);
    println!();

    let app = WalkthroughApp::new(config)?;
    app.run()
}
