//! Math utilities and types
//!
//! Provides the vector aliases and bounding volumes used by the entity
//! tree, the spatial index and the containment tests.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents (half-size)
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Create an AABB centered at a point with given full dimensions
    pub fn from_center_dimensions(center: Vec3, dimensions: Vec3) -> Self {
        Self::from_center_extents(center, dimensions * 0.5)
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Enclosed volume; degenerate boxes report zero
    pub fn volume(&self) -> f32 {
        let size = self.max - self.min;
        size.x.max(0.0) * size.y.max(0.0) * size.z.max(0.0)
    }

    /// Check if this AABB contains a point (boundary inclusive)
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Squared distance from a point to the closest point of the box
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        let closest = Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        );
        (closest - point).magnitude_squared()
    }
}

/// Bounding sphere used by the spatial index proxies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Sphere center in world space
    pub center: Vec3,
    /// Sphere radius
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check whether this sphere overlaps a box
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        aabb.distance_squared_to(self.center) <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_contains_point() {
        let aabb = AABB::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        );

        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(aabb.contains_point(Vec3::new(1.0, 0.5, -1.0)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_from_dimensions_and_volume() {
        let aabb = AABB::from_center_dimensions(Vec3::new(10.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 6.0));

        assert_eq!(aabb.min, Vec3::new(9.0, -2.0, -3.0));
        assert_eq!(aabb.max, Vec3::new(11.0, 2.0, 3.0));
        assert!((aabb.volume() - 48.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sphere_intersects_aabb() {
        let aabb = AABB::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

        assert!(Sphere::new(Vec3::new(1.5, 0.5, 0.5), 0.6).intersects_aabb(&aabb));
        assert!(!Sphere::new(Vec3::new(3.0, 0.5, 0.5), 1.0).intersects_aabb(&aabb));
    }
}
