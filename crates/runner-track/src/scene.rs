//! Host engine capabilities the track generator depends on.
//!
//! The placement engine and path assembler never see a concrete engine
//! type; they instantiate and query geometry through these traits.

use glam::Vec3;
use runner_common::{NodeId, Transform};

use crate::segment::SegmentDefinition;

/// Collision layer flags for filtering ray queries.
#[allow(non_snake_case)]
pub mod CollisionLayer {
    /// Layer flag type.
    pub type Flags = u32;

    /// Track floor and walls.
    pub const FLOOR: Flags = 1 << 0;
    /// Collectible coins.
    pub const COIN: Flags = 1 << 1;
    /// Obstacles.
    pub const OBSTACLE: Flags = 1 << 2;
    /// All layers.
    pub const ALL: Flags = 0xFFFF_FFFF;
    /// No layers.
    pub const NONE: Flags = 0;
}

/// A ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing the direction.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Nearest hit of a ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin
    pub distance: f32,
    /// Node owning the hit collider
    pub node: NodeId,
}

/// Scene-graph instantiation and transform queries.
pub trait SceneGraph {
    /// Instantiates a segment prefab whose root (the `In` socket) is placed at `root`.
    fn spawn_segment(&mut self, definition: &SegmentDefinition, root: &Transform) -> NodeId;

    /// Instantiates an item or decoration prefab as a child of `parent`.
    fn spawn_item(&mut self, parent: NodeId, prefab: &str, world: &Transform) -> NodeId;

    /// Removes a node and all of its children.
    fn remove_node(&mut self, node: NodeId);

    /// Starts the node's looping idle animation.
    fn play_animation(&mut self, node: NodeId);

    /// World transform of a live node.
    fn world_transform(&self, node: NodeId) -> Option<Transform>;
}

/// Single-ray queries against the physics world.
pub trait PhysicsQuery {
    /// Casts a ray up to `max_distance` against colliders on `layer_mask`,
    /// returning the nearest hit.
    fn raycast_single(
        &self,
        ray: &Ray,
        max_distance: f32,
        layer_mask: CollisionLayer::Flags,
    ) -> Option<RayHit>;
}

/// Everything the generator needs from the host engine.
pub trait TrackWorld: SceneGraph + PhysicsQuery {}

impl<T: SceneGraph + PhysicsQuery> TrackWorld for T {}
