//! Relevance ranking for deferred updates
//!
//! Items close to and centered in a view rank higher, and the longer an item
//! has waited since its last update the more its relevance is amplified.

use crate::config::PriorityWeights;
use crate::foundation::math::Vec3;
use crate::foundation::time::USECS_PER_SECOND;

const DISTANCE_EPSILON: f32 = 0.001;
const MIN_RADIUS: f32 = 0.1;
const OUT_OF_VIEW_PENALTY: f32 = -10.0;

/// A view cone with a spherical keyhole around its apex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicalView {
    position: Vec3,
    direction: Vec3,
    half_angle: f32,
    radius: f32,
    far_clip: f32,
}

impl ConicalView {
    /// Create a view; `direction` is normalized, `half_angle` is in radians
    pub fn new(position: Vec3, direction: Vec3, half_angle: f32, radius: f32, far_clip: f32) -> Self {
        let direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| Vec3::new(0.0, 0.0, -1.0));
        Self {
            position,
            direction,
            half_angle,
            radius,
            far_clip,
        }
    }

    /// Apex of the cone
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Keyhole radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Whether a sphere at `offset` from the apex touches the view
    pub fn intersects(&self, offset: Vec3, distance: f32, radius: f32) -> bool {
        if distance < self.radius + radius {
            return true;
        }
        if distance > self.far_clip + radius {
            return false;
        }
        let cos_to_direction = (offset.dot(&self.direction) / distance).clamp(-1.0, 1.0);
        let angle_to_direction = cos_to_direction.acos();
        let angular_radius = (radius / distance).min(1.0).asin();
        angle_to_direction - angular_radius <= self.half_angle
    }
}

/// Computes the ranking metric for a set of views
#[derive(Debug, Clone)]
pub struct PrioritySorter<'a> {
    views: &'a [ConicalView],
    weights: PriorityWeights,
    now_us: u64,
}

impl<'a> PrioritySorter<'a> {
    /// Rank against `views` at time `now_us`
    pub fn new(views: &'a [ConicalView], weights: PriorityWeights, now_us: u64) -> Self {
        Self { views, weights, now_us }
    }

    /// Highest priority over all views; higher is more urgent
    pub fn priority(&self, position: Vec3, radius: f32, last_update_us: u64) -> f32 {
        let age = self.now_us.saturating_sub(last_update_us) as f32 / USECS_PER_SECOND as f32;
        let radius = radius.max(MIN_RADIUS);

        self.views
            .iter()
            .map(|view| {
                let offset = position - view.position();
                let distance = offset.magnitude() + DISTANCE_EPSILON;
                let cosine = offset.dot(&view.direction()) / distance;
                let mut priority = (self.weights.angular * radius / distance + self.weights.center * cosine)
                    * (age + 1.0)
                    + self.weights.age * age;
                if distance - radius > view.radius() && !view.intersects(offset, distance, radius) {
                    priority += OUT_OF_VIEW_PENALTY;
                }
                priority
            })
            .reduce(f32::max)
            .unwrap_or(self.weights.age * age)
    }
}
