//! Octree spatial partitioning structure
//!
//! Efficiently divides 3D space into hierarchical regions for fast
//! spatial queries. Each node subdivides into 8 octants when entity
//! density exceeds a threshold.

use crate::config::OctreeSettings;
use crate::entities::EntityId;
use crate::foundation::math::{Vec3, AABB};

/// Configuration for octree behavior
#[derive(Debug, Clone)]
pub struct OctreeConfig {
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

impl From<&OctreeSettings> for OctreeConfig {
    fn from(settings: &OctreeSettings) -> Self {
        Self {
            max_entities_per_node: settings.max_entities_per_node,
            max_depth: settings.max_depth,
            min_node_size: settings.min_node_size,
        }
    }
}

/// Entity stored in octree with position and bounding radius
#[derive(Debug, Clone, Copy)]
pub struct OctreeEntity {
    /// Entity identity
    pub id: EntityId,
    /// Center of the entity's bounds
    pub position: Vec3,
    /// Bounding sphere radius
    pub radius: f32,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Entities contained in this node (if leaf)
    pub entities: Vec<OctreeEntity>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

fn octant_index(center: Vec3, position: Vec3) -> usize {
    let x_bit = usize::from(position.x >= center.x);
    let y_bit = usize::from(position.y >= center.y);
    let z_bit = usize::from(position.z >= center.z);
    (z_bit << 2) | (y_bit << 1) | x_bit
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entities: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Subdivide this node into 8 children
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;

        let children: [OctreeNode; 8] = std::array::from_fn(|octant| {
            let x_sign = if octant & 1 != 0 { 1.0 } else { -1.0 };
            let y_sign = if octant & 2 != 0 { 1.0 } else { -1.0 };
            let z_sign = if octant & 4 != 0 { 1.0 } else { -1.0 };

            let child_center = Vec3::new(
                center.x + quarter_extents.x * x_sign,
                center.y + quarter_extents.y * y_sign,
                center.z + quarter_extents.z * z_sign,
            );

            OctreeNode::new(AABB::from_center_extents(child_center, quarter_extents), depth)
        });
        let mut children = Box::new(children);

        // Redistribute existing entities to children
        for entity in std::mem::take(&mut self.entities) {
            children[octant_index(center, entity.position)].entities.push(entity);
        }

        self.children = Some(children);
    }

    /// Insert an entity into this node
    pub fn insert(&mut self, entity: OctreeEntity, config: &OctreeConfig) -> bool {
        if !self.bounds.contains_point(entity.position) {
            return false;
        }

        if self.is_leaf() {
            let should_subdivide = self.entities.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().x > config.min_node_size;

            if !should_subdivide {
                self.entities.push(entity);
                return true;
            }
            self.subdivide();
        }

        let octant = octant_index(self.bounds.center(), entity.position);
        match self.children.as_mut() {
            Some(children) => children[octant].insert(entity, config),
            None => false,
        }
    }

    /// Remove an entity from this node
    pub fn remove(&mut self, entity_id: EntityId) -> Option<OctreeEntity> {
        if let Some(index) = self.entities.iter().position(|e| e.id == entity_id) {
            return Some(self.entities.swap_remove(index));
        }

        if let Some(ref mut children) = self.children {
            for child in children.iter_mut() {
                if let Some(removed) = child.remove(entity_id) {
                    return Some(removed);
                }
            }
        }

        None
    }

    /// Query all entities whose bounding sphere overlaps a query sphere
    pub fn query_radius(&self, center: Vec3, radius: f32, max_entity_radius: f32, results: &mut Vec<OctreeEntity>) {
        // Entities may hang over their node's bounds by up to their radius
        let reach = radius + max_entity_radius;
        if self.bounds.distance_squared_to(center) > reach * reach {
            return;
        }

        for entity in &self.entities {
            let combined_radius = radius + entity.radius;
            if (entity.position - center).magnitude_squared() <= combined_radius * combined_radius {
                results.push(*entity);
            }
        }

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_radius(center, radius, max_entity_radius, results);
            }
        }
    }

    /// Query all entities whose center lies inside a box
    pub fn query_aabb(&self, aabb: &AABB, results: &mut Vec<OctreeEntity>) {
        if !self.bounds.intersects(aabb) {
            return;
        }

        results.extend(self.entities.iter().filter(|e| aabb.contains_point(e.position)));

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_aabb(aabb, results);
            }
        }
    }

    /// Count total entities in this node and all children
    pub fn count_entities(&self) -> usize {
        let mut count = self.entities.len();

        if let Some(ref children) = self.children {
            for child in children.iter() {
                count += child.count_entities();
            }
        }

        count
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node containing the entire world space
    pub root: OctreeNode,

    /// Configuration
    config: OctreeConfig,

    /// Largest entity radius inserted since the last clear
    max_entity_radius: f32,
}

impl Octree {
    /// Create a new octree with given world bounds
    pub fn new(world_bounds: AABB, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            config,
            max_entity_radius: 0.0,
        }
    }

    /// Insert an entity; returns false if its center lies outside the world bounds
    pub fn insert(&mut self, entity_id: EntityId, position: Vec3, radius: f32) -> bool {
        let entity = OctreeEntity {
            id: entity_id,
            position,
            radius,
        };

        if radius > self.max_entity_radius {
            self.max_entity_radius = radius;
        }

        self.root.insert(entity, &self.config)
    }

    /// Remove an entity from the octree
    pub fn remove(&mut self, entity_id: EntityId) -> bool {
        self.root.remove(entity_id).is_some()
    }

    /// Move an entity; returns false if the new position is out of bounds
    pub fn update(&mut self, entity_id: EntityId, position: Vec3, radius: f32) -> bool {
        self.root.remove(entity_id);
        self.insert(entity_id, position, radius)
    }

    /// Query all entities within a radius of a point
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<OctreeEntity> {
        let mut results = Vec::new();
        self.root.query_radius(center, radius, self.max_entity_radius, &mut results);
        results
    }

    /// Query all entities whose center lies inside a box
    pub fn query_aabb(&self, aabb: &AABB) -> Vec<OctreeEntity> {
        let mut results = Vec::new();
        self.root.query_aabb(aabb, &mut results);
        results
    }

    /// Get total entity count
    pub fn entity_count(&self) -> usize {
        self.root.count_entities()
    }

    /// Clear the octree
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.max_entity_radius = 0.0;
    }
}
