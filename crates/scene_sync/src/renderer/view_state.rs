//! Observer and view state consumed by the renderer

use super::priority::ConicalView;
use crate::foundation::math::Vec3;
use parking_lot::RwLock;

/// Source of the observer position and the active views
pub trait ViewState: Send + Sync {
    /// Current observer (avatar) position
    fn observer_position(&self) -> Vec3;

    /// Views used to rank deferred updates
    fn conical_views(&self) -> Vec<ConicalView>;
}

/// Settable view state for hosts that push the observer each frame
#[derive(Debug, Default)]
pub struct StaticViewState {
    position: RwLock<Vec3>,
    views: RwLock<Vec<ConicalView>>,
}

impl StaticViewState {
    /// Observer at `position` with no views
    pub fn new(position: Vec3) -> Self {
        Self {
            position: RwLock::new(position),
            views: RwLock::new(Vec::new()),
        }
    }

    /// Move the observer
    pub fn set_observer_position(&self, position: Vec3) {
        *self.position.write() = position;
    }

    /// Replace the active views
    pub fn set_views(&self, views: Vec<ConicalView>) {
        *self.views.write() = views;
    }
}

impl ViewState for StaticViewState {
    fn observer_position(&self) -> Vec3 {
        *self.position.read()
    }

    fn conical_views(&self) -> Vec<ConicalView> {
        self.views.read().clone()
    }
}
