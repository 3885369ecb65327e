//! Script worker thread and its command channel

use super::host::{ScriptArg, ScriptHost};
use super::ScriptError;
use crate::entities::{EntityId, EntityTree};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Weak;
use std::thread::JoinHandle;

enum ScriptCommand {
    Load { id: EntityId, url: String, reload: bool },
    Unload(EntityId),
    UnloadAll,
    Call { id: EntityId, method: String, args: Vec<ScriptArg> },
    Flush(Sender<()>),
    Stop,
}

/// Notices sent back from the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptNotice {
    /// The script of an entity finished preloading
    PreloadFinished(EntityId),
}

struct Worker<H> {
    host: H,
    tree: Weak<EntityTree>,
    loaded: HashSet<EntityId>,
    notices: Sender<ScriptNotice>,
}

impl<H: ScriptHost> Worker<H> {
    fn run(mut self, commands: Receiver<ScriptCommand>) {
        for command in commands {
            match command {
                ScriptCommand::Load { id, url, reload } => self.load(id, &url, reload),
                ScriptCommand::Unload(id) => self.unload(id),
                ScriptCommand::UnloadAll => {
                    let mut loaded: Vec<EntityId> = self.loaded.drain().collect();
                    loaded.sort_unstable();
                    for id in loaded {
                        self.host.unload(id);
                    }
                }
                ScriptCommand::Call { id, method, args } => {
                    if self.loaded.contains(&id) {
                        self.host.call_method(id, &method, &args);
                    } else {
                        trace!("Dropping {}() for {} with no loaded script", method, id);
                    }
                }
                ScriptCommand::Flush(done) => {
                    let _ = done.send(());
                }
                ScriptCommand::Stop => break,
            }
        }
        debug!("Script worker exiting");
    }

    fn load(&mut self, id: EntityId, url: &str, reload: bool) {
        let Some(entity) = self.tree.upgrade().and_then(|tree| tree.find_entity(id)) else {
            trace!("Dropping script load for missing {}", id);
            return;
        };
        if self.loaded.remove(&id) {
            self.host.unload(id);
        }
        match self.host.load(&entity, url, reload) {
            Ok(()) => {
                self.loaded.insert(id);
                let _ = self.notices.send(ScriptNotice::PreloadFinished(id));
            }
            Err(err) => warn!("{}", err),
        }
    }

    fn unload(&mut self, id: EntityId) {
        if self.loaded.remove(&id) {
            self.host.unload(id);
        }
    }
}

/// Handle to the script worker
///
/// Every command is fire-and-forget; the only waiting call is
/// [`ScriptEngine::flush`].
pub struct ScriptEngine {
    commands: Sender<ScriptCommand>,
    notices: Receiver<ScriptNotice>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ScriptEngine {
    /// Start a worker running `host`; entity ids are resolved against `tree`
    pub fn spawn<H: ScriptHost + 'static>(host: H, tree: Weak<EntityTree>) -> Self {
        let (commands, command_rx) = unbounded();
        let (notice_tx, notices) = unbounded();
        let worker = Worker {
            host,
            tree,
            loaded: HashSet::new(),
            notices: notice_tx,
        };
        let handle = std::thread::Builder::new()
            .name("entity-scripts".to_string())
            .spawn(move || worker.run(command_rx));
        let worker = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!("Failed to start script worker: {}", err);
                None
            }
        };
        Self {
            commands,
            notices,
            worker: Mutex::new(worker),
        }
    }

    fn send(&self, command: ScriptCommand) -> Result<(), ScriptError> {
        self.commands.send(command).map_err(|_| ScriptError::Disconnected)
    }

    /// Load (or reload) the script of an entity
    pub fn load_script(&self, id: EntityId, url: impl Into<String>, reload: bool) -> Result<(), ScriptError> {
        self.send(ScriptCommand::Load {
            id,
            url: url.into(),
            reload,
        })
    }

    /// Unload the script of an entity
    pub fn unload_script(&self, id: EntityId) -> Result<(), ScriptError> {
        self.send(ScriptCommand::Unload(id))
    }

    /// Unload every loaded script
    pub fn unload_all(&self) -> Result<(), ScriptError> {
        self.send(ScriptCommand::UnloadAll)
    }

    /// Call a method on an entity's script
    pub fn call_method(&self, id: EntityId, method: &str, args: Vec<ScriptArg>) -> Result<(), ScriptError> {
        self.send(ScriptCommand::Call {
            id,
            method: method.to_string(),
            args,
        })
    }

    /// Block until every command sent before this call has been processed
    pub fn flush(&self) -> Result<(), ScriptError> {
        let (done_tx, done_rx) = bounded(1);
        self.send(ScriptCommand::Flush(done_tx))?;
        done_rx.recv().map_err(|_| ScriptError::Disconnected)
    }

    /// Notices received since the last drain
    pub fn drain_notices(&self) -> Vec<ScriptNotice> {
        self.notices.try_iter().collect()
    }

    /// Stop the worker and wait for it to exit
    pub fn stop(&self) {
        let _ = self.send(ScriptCommand::Stop);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("Script worker panicked");
            }
        }
    }
}

impl Drop for ScriptEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("running", &self.worker.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OctreeSettings;
    use crate::entities::{EntityKind, EntityProperties};
    use crate::scripting::{RecordingScriptHost, ScriptCall};
    use std::sync::Arc;

    fn setup() -> (Arc<EntityTree>, RecordingScriptHost, ScriptEngine) {
        let tree = Arc::new(EntityTree::new(&OctreeSettings::default()));
        let host = RecordingScriptHost::new();
        let engine = ScriptEngine::spawn(host.clone(), Arc::downgrade(&tree));
        (tree, host, engine)
    }

    #[test]
    fn test_load_reports_preload_finished() {
        let (tree, host, engine) = setup();
        let entity = tree.add_entity(EntityKind::Model, EntityProperties::default().with_script("a.js"));

        engine.load_script(entity.id(), "a.js", false).unwrap();
        engine.flush().unwrap();

        assert_eq!(engine.drain_notices(), vec![ScriptNotice::PreloadFinished(entity.id())]);
        assert_eq!(
            host.calls(),
            vec![ScriptCall::Load {
                id: entity.id(),
                url: "a.js".to_string(),
                reload: false
            }]
        );
    }

    #[test]
    fn test_missing_entity_is_silent_noop() {
        let (_tree, host, engine) = setup();

        engine.load_script(EntityId::new(42), "a.js", false).unwrap();
        engine.call_method(EntityId::new(42), "enterEntity", Vec::new()).unwrap();
        engine.flush().unwrap();

        assert!(host.calls().is_empty());
        assert!(engine.drain_notices().is_empty());
    }

    #[test]
    fn test_calls_reach_loaded_script_after_delete() {
        let (tree, host, engine) = setup();
        let entity = tree.add_entity(EntityKind::Model, EntityProperties::default().with_script("a.js"));
        engine.load_script(entity.id(), "a.js", false).unwrap();
        engine.flush().unwrap();
        host.clear();

        tree.delete_entity(entity.id());
        engine.call_method(entity.id(), "leaveEntity", Vec::new()).unwrap();
        engine.unload_script(entity.id()).unwrap();
        engine.unload_script(entity.id()).unwrap();
        engine.flush().unwrap();

        assert_eq!(
            host.calls(),
            vec![
                ScriptCall::Method {
                    id: entity.id(),
                    method: "leaveEntity".to_string(),
                    args: Vec::new()
                },
                ScriptCall::Unload(entity.id()),
            ]
        );
    }

    #[test]
    fn test_stopped_engine_reports_disconnected() {
        let (_tree, _host, engine) = setup();
        engine.stop();
        assert_eq!(engine.unload_all(), Err(ScriptError::Disconnected));
    }
}
