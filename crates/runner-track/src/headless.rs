//! In-memory scene graph and physics world.
//!
//! Stands in for a host engine in the autorunner binary, tests and
//! benchmarks. Nodes form a flat table with parent links; segment
//! colliders are baked to world-space AABBs on the floor layer at spawn
//! time.

use ahash::AHashMap;
use glam::Vec3;
use runner_common::{NodeId, Transform};

use crate::scene::{CollisionLayer, PhysicsQuery, Ray, RayHit, SceneGraph};
use crate::segment::SegmentDefinition;

/// World-space axis-aligned collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCollider {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
    /// Layer flags
    pub layer: CollisionLayer::Flags,
}

impl WorldCollider {
    /// Slab-method ray intersection. Returns the entry distance, or `None`
    /// when the ray misses, starts inside, or only grazes the box at its
    /// origin.
    #[must_use]
    pub fn intersect(&self, ray: &Ray, max_distance: f32) -> Option<f32> {
        let dir = ray.direction;
        let inv = Vec3::new(
            if dir.x.abs() > 1e-6 { 1.0 / dir.x } else { f32::MAX },
            if dir.y.abs() > 1e-6 { 1.0 / dir.y } else { f32::MAX },
            if dir.z.abs() > 1e-6 { 1.0 / dir.z } else { f32::MAX },
        );

        let t1 = (self.min - ray.origin) * inv;
        let t2 = (self.max - ray.origin) * inv;
        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();

        (tmin > 0.0 && tmin <= tmax && tmin <= max_distance).then_some(tmin)
    }
}

#[derive(Debug, Clone)]
struct Node {
    prefab: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    world: Transform,
    colliders: Vec<WorldCollider>,
    animating: bool,
}

/// Headless implementation of [`SceneGraph`] and [`PhysicsQuery`].
#[derive(Debug, Default)]
pub struct HeadlessWorld {
    nodes: AHashMap<NodeId, Node>,
    next_id: u64,
}

impl HeadlessWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::from_raw(self.next_id)
    }

    /// Adds a free-standing collider node, e.g. a wall in a test scene.
    pub fn add_static_collider(&mut self, min: Vec3, max: Vec3, layer: CollisionLayer::Flags) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(
            id,
            Node {
                prefab: "static".to_string(),
                parent: None,
                children: Vec::new(),
                world: Transform::from_position((min + max) * 0.5),
                colliders: vec![WorldCollider {
                    min: min.min(max),
                    max: min.max(max),
                    layer,
                }],
                animating: false,
            },
        );
        id
    }

    /// Number of live nodes, children included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a node is alive.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Prefab name of a live node.
    #[must_use]
    pub fn prefab(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.prefab.as_str())
    }

    /// Children of a live node.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(&node).map_or(&[][..], |n| n.children.as_slice())
    }

    /// Whether a node plays its looping animation.
    #[must_use]
    pub fn is_animating(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.animating)
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl SceneGraph for HeadlessWorld {
    fn spawn_segment(&mut self, definition: &SegmentDefinition, root: &Transform) -> NodeId {
        let id = self.allocate();
        let colliders = definition
            .colliders()
            .iter()
            .map(|c| {
                let (min, max) = c.world_bounds(root);
                WorldCollider {
                    min,
                    max,
                    layer: CollisionLayer::FLOOR,
                }
            })
            .collect();
        self.nodes.insert(
            id,
            Node {
                prefab: definition.prefab().to_string(),
                parent: None,
                children: Vec::new(),
                world: *root,
                colliders,
                animating: false,
            },
        );
        id
    }

    fn spawn_item(&mut self, parent: NodeId, prefab: &str, world: &Transform) -> NodeId {
        let id = self.allocate();
        let parent = self.nodes.get_mut(&parent).map(|p| {
            p.children.push(id);
            parent
        });
        self.nodes.insert(
            id,
            Node {
                prefab: prefab.to_string(),
                parent,
                children: Vec::new(),
                world: *world,
                colliders: Vec::new(),
                animating: false,
            },
        );
        id
    }

    fn remove_node(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(&node) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|&c| c != node);
        }
        let mut stack = removed.children;
        while let Some(child) = stack.pop() {
            if let Some(n) = self.nodes.remove(&child) {
                stack.extend(n.children);
            }
        }
    }

    fn play_animation(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.animating = true;
        }
    }

    fn world_transform(&self, node: NodeId) -> Option<Transform> {
        self.nodes.get(&node).map(|n| n.world)
    }
}

impl PhysicsQuery for HeadlessWorld {
    fn raycast_single(
        &self,
        ray: &Ray,
        max_distance: f32,
        layer_mask: CollisionLayer::Flags,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for (&id, node) in &self.nodes {
            for collider in node.colliders.iter().filter(|c| c.layer & layer_mask != 0) {
                if let Some(distance) = collider.intersect(ray, max_distance) {
                    if best.map_or(true, |b| distance < b.distance) {
                        best = Some(RayHit { distance, node: id });
                    }
                }
            }
        }
        best
    }
}
