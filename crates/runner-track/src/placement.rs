//! Segment placement engine.
//!
//! Places segments end to end: each new segment's `In` socket is anchored
//! at the previous segment's exit, then its exits are probed sideways
//! against the floor layer so the track never doubles back into itself.
//!
//! The anchor is threaded explicitly: [`PlacementEngine::place_segment`]
//! takes the anchor and returns the resolved exit, and only
//! [`PlacementEngine::extend_track`] commits it.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec3;
use runner_common::{GenerationError, NodeId, PlacementId, SegmentId, Transform};
use tracing::{debug, info};

use crate::catalog::SegmentCatalog;
use crate::items::{ItemConfig, ItemPlacer, SpawnedItems};
use crate::rng::TrackRng;
use crate::scene::{CollisionLayer, Ray, TrackWorld};
use crate::segment::{RailSide, SegmentDefinition, SocketRole};

// ============================================================================
// Configuration
// ============================================================================

/// Placement tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementConfig {
    /// Segments requested per extension batch
    pub batch_size: usize,
    /// Retry budget per slot before generation fails
    pub max_retries: u32,
    /// Length of the sideways clearance probe
    pub probe_distance: f32,
    /// Layers the clearance probe tests against
    pub probe_mask: CollisionLayer::Flags,
    /// Height of the character spawn point above the first segment
    pub spawn_height: f32,
    /// Queue length below which the track is extended
    pub low_water_mark: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_retries: 30,
            probe_distance: 20.0,
            probe_mask: CollisionLayer::FLOOR,
            spawn_height: 10.0,
            low_water_mark: 3,
        }
    }
}

// ============================================================================
// Placed segments and the queue
// ============================================================================

/// A segment instantiated in the world.
#[derive(Debug, Clone)]
pub struct PlacedSegment {
    slot: PlacementId,
    definition: Arc<SegmentDefinition>,
    node: NodeId,
    root: Transform,
    sockets: AHashMap<SocketRole, Transform>,
    items: SpawnedItems,
}

impl PlacedSegment {
    fn new(slot: PlacementId, definition: Arc<SegmentDefinition>, node: NodeId, root: Transform) -> Self {
        let sockets = SocketRole::ALL
            .into_iter()
            .filter_map(|role| {
                let local = definition.socket(role)?;
                // `In` is the local origin; keep the anchor bit-exact.
                let world = if role == SocketRole::In {
                    root
                } else {
                    root.compose(local)
                };
                Some((role, world))
            })
            .collect();
        Self {
            slot,
            definition,
            node,
            root,
            sockets,
            items: SpawnedItems::default(),
        }
    }

    /// Placement sequence number.
    #[must_use]
    pub const fn slot(&self) -> PlacementId {
        self.slot
    }

    /// Catalog ID of the definition.
    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.definition.id()
    }

    /// The definition this segment was instantiated from.
    #[must_use]
    pub fn definition(&self) -> &Arc<SegmentDefinition> {
        &self.definition
    }

    /// Scene node of the segment root.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// World transform of the root, equal to the `In` socket.
    #[must_use]
    pub const fn root(&self) -> &Transform {
        &self.root
    }

    /// World transform of a socket.
    #[must_use]
    pub fn socket(&self, role: SocketRole) -> Option<&Transform> {
        self.sockets.get(&role)
    }

    /// Whether the segment requires a turn decision.
    #[must_use]
    pub fn is_fork(&self) -> bool {
        self.definition.is_fork()
    }

    /// Declared exit count.
    #[must_use]
    pub fn exits(&self) -> u32 {
        self.definition.exits()
    }

    /// Rail points in world space.
    pub fn rail_world(&self, side: RailSide, socket: SocketRole) -> impl Iterator<Item = Vec3> + '_ {
        self.definition
            .rail(side, socket)
            .iter()
            .map(|p| self.root.transform_point(*p))
    }

    /// Items spawned on this segment.
    #[must_use]
    pub const fn items(&self) -> &SpawnedItems {
        &self.items
    }
}

/// FIFO of placed segments; front is nearest the character.
#[derive(Debug, Clone, Default)]
pub struct PlacementQueue {
    segments: VecDeque<PlacedSegment>,
}

impl PlacementQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Nearest segment.
    #[must_use]
    pub fn front(&self) -> Option<&PlacedSegment> {
        self.segments.front()
    }

    /// Farthest segment.
    #[must_use]
    pub fn back(&self) -> Option<&PlacedSegment> {
        self.segments.back()
    }

    /// Segment at a queue position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PlacedSegment> {
        self.segments.get(index)
    }

    /// Iterates front to back.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedSegment> {
        self.segments.iter()
    }

    /// Appends at the tail.
    pub fn push_back(&mut self, segment: PlacedSegment) {
        self.segments.push_back(segment);
    }

    /// Removes the nearest segment.
    pub fn pop_front(&mut self) -> Option<PlacedSegment> {
        self.segments.pop_front()
    }

    /// New segments may be appended unless the tail is an unresolved fork.
    #[must_use]
    pub fn can_extend(&self) -> bool {
        self.segments.back().map_or(true, |s| !s.is_fork())
    }

    /// Removes and returns every segment.
    pub fn drain(&mut self) -> Vec<PlacedSegment> {
        self.segments.drain(..).collect()
    }
}

// ============================================================================
// Placement engine
// ============================================================================

/// Result of placing one slot.
#[derive(Debug, Clone)]
pub struct Placement {
    /// The accepted segment
    pub segment: PlacedSegment,
    /// Anchor for the next segment
    pub exit: Transform,
    /// Tries used, including the accepted one
    pub attempts: u32,
    /// Definitions rejected by the clearance probe, in order
    pub rejected: Vec<SegmentId>,
}

/// Summary of one extension batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendReport {
    /// Placed segments in order
    pub placed: Vec<(PlacementId, SegmentId)>,
    /// Rejected candidates in order
    pub rejected: Vec<SegmentId>,
    /// Whether the batch stopped on a fork
    pub ended_on_fork: bool,
    /// Character spawn point, when the batch started a fresh level
    pub spawn_point: Option<Vec3>,
}

/// Places catalog segments into the world.
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    config: PlacementConfig,
    items: ItemPlacer,
    start_anchor: Transform,
    anchor: Transform,
    placed: u64,
}

impl PlacementEngine {
    /// Creates an engine anchored at `start_anchor`.
    #[must_use]
    pub fn new(config: PlacementConfig, items: ItemConfig, start_anchor: Transform) -> Self {
        Self {
            config,
            items: ItemPlacer::new(items),
            start_anchor,
            anchor: start_anchor,
            placed: 0,
        }
    }

    /// Placement tuning.
    #[must_use]
    pub const fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Where the next segment's `In` socket will be anchored.
    #[must_use]
    pub const fn anchor(&self) -> &Transform {
        &self.anchor
    }

    /// Moves the anchor to a resolved fork branch.
    pub fn set_anchor(&mut self, anchor: Transform) {
        self.anchor = anchor;
    }

    /// Segments accepted since the last reset.
    #[must_use]
    pub const fn placed_count(&self) -> u64 {
        self.placed
    }

    /// Returns to the start anchor; the next placement is the start segment.
    pub fn reset(&mut self) {
        self.anchor = self.start_anchor;
        self.placed = 0;
    }

    /// Places one segment at `anchor`, retrying rejected candidates.
    ///
    /// The first slot of a level always uses the catalog's start segment.
    /// Every candidate is spawned before its exits are probed and removed
    /// again on rejection.
    ///
    /// # Errors
    ///
    /// Fails when the catalog is empty, or when the probe still hits after
    /// the retry budget is spent.
    pub fn place_segment(
        &self,
        catalog: &SegmentCatalog,
        world: &mut impl TrackWorld,
        rng: &mut TrackRng,
        anchor: &Transform,
        slot: PlacementId,
    ) -> Result<Placement, GenerationError> {
        catalog.start()?;

        let mut retries = self.config.max_retries;
        let mut attempts = 0;
        let mut rejected = Vec::new();

        loop {
            attempts += 1;
            let index = if slot.is_first() { 0 } else { rng.index(catalog.len()) };
            let Some(definition) = catalog.at(index) else {
                continue;
            };

            let node = world.spawn_segment(definition, anchor);
            let segment = PlacedSegment::new(slot, Arc::clone(definition), node, *anchor);

            let blocked = definition.probe_sockets().iter().copied().find(|role| {
                segment.socket(*role).is_some_and(|socket| {
                    let ray = Ray::new(socket.position, socket.left());
                    world
                        .raycast_single(&ray, self.config.probe_distance, self.config.probe_mask)
                        .is_some()
                })
            });

            if let Some(role) = blocked {
                world.remove_node(node);
                debug!(
                    "Rejected {} ({}) at slot {}: {role} probe hit",
                    definition.name(),
                    definition.id(),
                    slot.raw()
                );
                if retries == 0 {
                    return Err(GenerationError::PlacementExhausted {
                        slot: slot.raw(),
                        attempts,
                    });
                }
                retries -= 1;
                rejected.push(definition.id());
                continue;
            }

            let exit = segment
                .socket(definition.primary_exit())
                .copied()
                .unwrap_or(*anchor);
            debug!(
                "Placed {} ({}) at slot {} after {attempts} attempt(s)",
                definition.name(),
                definition.id(),
                slot.raw()
            );
            return Ok(Placement {
                segment,
                exit,
                attempts,
                rejected,
            });
        }
    }

    /// Appends up to `min_segments` segments to the queue.
    ///
    /// A fork ends the batch. Items are populated once the batch is
    /// complete. On failure every segment spawned by this batch is removed
    /// and the anchor is left where the batch started.
    ///
    /// # Errors
    ///
    /// Propagates [`PlacementEngine::place_segment`] failures.
    pub fn extend_track(
        &mut self,
        catalog: &SegmentCatalog,
        world: &mut impl TrackWorld,
        rng: &mut TrackRng,
        queue: &mut PlacementQueue,
        min_segments: usize,
    ) -> Result<ExtendReport, GenerationError> {
        let mut report = ExtendReport::default();
        let mut batch: Vec<PlacedSegment> = Vec::with_capacity(min_segments);
        let mut anchor = self.anchor;

        for offset in 0..min_segments {
            let slot = PlacementId::from_raw(self.placed + offset as u64);
            let placement = match self.place_segment(catalog, world, rng, &anchor, slot) {
                Ok(placement) => placement,
                Err(e) => {
                    for segment in &batch {
                        world.remove_node(segment.node());
                    }
                    return Err(e);
                },
            };

            if slot.is_first() {
                let start = placement.segment.root().position;
                report.spawn_point = Some(Vec3::new(start.x, self.config.spawn_height, start.z));
            }
            anchor = placement.exit;
            report.rejected.extend(placement.rejected);
            report.placed.push((slot, placement.segment.id()));

            let fork = placement.segment.is_fork();
            batch.push(placement.segment);
            if fork {
                report.ended_on_fork = true;
                break;
            }
        }

        for segment in &mut batch {
            segment.items = self.items.populate(
                world,
                rng,
                &segment.definition,
                segment.node,
                &segment.root,
            );
        }

        self.anchor = anchor;
        self.placed += batch.len() as u64;
        for segment in batch {
            queue.push_back(segment);
        }

        info!(
            "Extended track by {} segment(s), {} rejected, queue length {}",
            report.placed.len(),
            report.rejected.len(),
            queue.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessWorld;
    use crate::presets::{corner_segment, default_catalog, fork_segment, straight_segment};
    use proptest::prelude::*;

    fn engine() -> PlacementEngine {
        PlacementEngine::new(PlacementConfig::default(), ItemConfig::default(), Transform::IDENTITY)
    }

    fn start_fork_catalog() -> SegmentCatalog {
        SegmentCatalog::from_definitions([
            straight_segment(0, "Start", 20.0).expect("start"),
            fork_segment(1, "Fork", 20.0).expect("fork"),
        ])
        .expect("catalog")
    }

    /// Extends in batches of `batch` until a fork ends one.
    fn extend_until_fork(
        engine: &mut PlacementEngine,
        catalog: &SegmentCatalog,
        world: &mut HeadlessWorld,
        rng: &mut TrackRng,
        queue: &mut PlacementQueue,
        batch: usize,
    ) -> Vec<ExtendReport> {
        let mut reports = Vec::new();
        for _ in 0..64 {
            let report = engine
                .extend_track(catalog, world, rng, queue, batch)
                .expect("extend");
            let done = report.ended_on_fork;
            reports.push(report);
            if done {
                break;
            }
        }
        reports
    }

    #[test]
    fn test_start_segment_first_and_fork_ends_batch() {
        let catalog = start_fork_catalog();
        let mut world = HeadlessWorld::new();
        let mut rng = TrackRng::from_seed(1);
        let mut queue = PlacementQueue::new();
        let mut engine = engine();

        let reports = extend_until_fork(&mut engine, &catalog, &mut world, &mut rng, &mut queue, 3);

        assert_eq!(reports[0].placed[0], (PlacementId::from_raw(0), SegmentId::new(0)));
        assert_eq!(reports[0].spawn_point, Some(Vec3::new(0.0, 10.0, 0.0)));
        assert!(reports[1..].iter().all(|r| r.spawn_point.is_none()));
        for report in &reports {
            let last = report.placed.len() - 1;
            for (i, (_, id)) in report.placed.iter().enumerate() {
                let is_fork = *id == SegmentId::new(1);
                assert_eq!(is_fork, report.ended_on_fork && i == last);
            }
            assert!(report.placed.len() <= 3);
        }
        assert!(queue.back().expect("tail").is_fork());
        assert!(!queue.can_extend());
    }

    #[test]
    fn test_in_socket_matches_anchor_exactly() {
        let catalog = default_catalog().expect("catalog");
        let mut world = HeadlessWorld::new();
        let mut rng = TrackRng::from_seed(99);
        let mut queue = PlacementQueue::new();
        let mut engine = engine();

        let mut expected = *engine.anchor();
        for _ in 0..6 {
            if !queue.can_extend() {
                break;
            }
            let before = queue.len();
            engine
                .extend_track(&catalog, &mut world, &mut rng, &mut queue, 1)
                .expect("extend");
            let placed = queue.get(before).expect("new segment");
            assert_eq!(placed.root(), &expected);
            assert_eq!(placed.socket(SocketRole::In), Some(&expected));
            expected = *engine.anchor();
        }
    }

    #[test]
    fn test_seeded_placement_is_reproducible() {
        let catalog = default_catalog().expect("catalog");
        let run = |seed| {
            let mut world = HeadlessWorld::new();
            let mut rng = TrackRng::from_seed(seed);
            let mut queue = PlacementQueue::new();
            let mut engine = engine();
            engine
                .extend_track(&catalog, &mut world, &mut rng, &mut queue, 3)
                .expect("extend")
        };
        assert_eq!(run(1234), run(1234));
    }

    #[test]
    fn test_fork_anchor_is_probed_right_exit() {
        let catalog = start_fork_catalog();
        let mut world = HeadlessWorld::new();
        let mut rng = TrackRng::from_seed(5);
        let mut queue = PlacementQueue::new();
        let mut engine = engine();

        extend_until_fork(&mut engine, &catalog, &mut world, &mut rng, &mut queue, 3);
        let fork = queue.back().expect("fork");
        assert!(fork.is_fork());
        assert_eq!(engine.anchor(), fork.socket(SocketRole::OutR).expect("right"));
    }

    #[test]
    fn test_fork_with_blocked_left_exit_is_rejected() {
        let catalog = start_fork_catalog();
        let fork_id = SegmentId::new(1);
        let mut saw_rejection = false;

        for seed in 0..64 {
            let mut world = HeadlessWorld::new();
            // A fork at (0, 0, 20) exits left at (-10, 0, 30) and probes -Z.
            // The right exit at (10, 0, 30) probes +Z and stays clear.
            world.add_static_collider(
                Vec3::new(-12.0, -1.0, 20.0),
                Vec3::new(-8.0, 1.0, 21.0),
                CollisionLayer::FLOOR,
            );
            let mut rng = TrackRng::from_seed(seed);
            let mut queue = PlacementQueue::new();
            let mut engine = engine();

            let report = engine
                .extend_track(&catalog, &mut world, &mut rng, &mut queue, 2)
                .expect("extend");
            let second = queue.get(1).expect("second");
            assert_ne!(second.id(), fork_id, "seed {seed}: fork placed over a blocked left exit");
            assert!(report.rejected.iter().all(|id| *id == fork_id));
            let live: usize = queue.iter().map(|s| 1 + world.children(s.node()).len()).sum();
            assert_eq!(world.node_count(), live + 1);

            if !report.rejected.is_empty() {
                saw_rejection = true;
                break;
            }
        }
        assert!(saw_rejection, "no seed drew the fork");
    }

    #[test]
    fn test_blocked_exit_is_rejected_and_removed() {
        let catalog = SegmentCatalog::from_definitions([
            straight_segment(0, "Start", 20.0).expect("start"),
            corner_segment(1, "Right", 20.0, true).expect("right"),
            corner_segment(2, "Left", 20.0, false).expect("left"),
        ])
        .expect("catalog");
        let mut world = HeadlessWorld::new();
        // Across the right corner's probe: exit at (10, 0, 30), probing +Z.
        world.add_static_collider(
            Vec3::new(8.0, -1.0, 40.0),
            Vec3::new(12.0, 1.0, 41.0),
            CollisionLayer::FLOOR,
        );
        let mut rng = TrackRng::from_seed(2);
        let mut queue = PlacementQueue::new();
        let mut engine = engine();

        let report = engine
            .extend_track(&catalog, &mut world, &mut rng, &mut queue, 2)
            .expect("extend");
        assert_ne!(queue.get(1).expect("second").id(), SegmentId::new(1));
        assert!(report.rejected.iter().all(|id| *id == SegmentId::new(1)));
        let live: usize = queue.iter().map(|s| 1 + world.children(s.node()).len()).sum();
        assert_eq!(world.node_count(), live + 1);
    }

    #[test]
    fn test_exhausted_retries_fail_and_roll_back() {
        let catalog = SegmentCatalog::from_definitions([
            corner_segment(0, "Right", 20.0, true).expect("right"),
        ])
        .expect("catalog");
        let mut world = HeadlessWorld::new();
        // The second corner exits at (20, 0, 0) facing -Z and probes +X.
        world.add_static_collider(
            Vec3::new(30.0, -1.0, -2.0),
            Vec3::new(31.0, 1.0, 2.0),
            CollisionLayer::FLOOR,
        );
        let mut rng = TrackRng::from_seed(2);
        let mut queue = PlacementQueue::new();
        let mut engine = engine();

        let err = engine
            .extend_track(&catalog, &mut world, &mut rng, &mut queue, 2)
            .expect_err("must exhaust");
        assert_eq!(
            err,
            GenerationError::PlacementExhausted {
                slot: 1,
                attempts: 31
            }
        );
        assert!(queue.is_empty());
        assert_eq!(world.node_count(), 1);
        assert_eq!(engine.anchor(), &Transform::IDENTITY);
        assert_eq!(engine.placed_count(), 0);
    }

    #[test]
    fn test_empty_catalog_is_configuration_error() {
        let catalog = SegmentCatalog::new();
        let mut world = HeadlessWorld::new();
        let mut rng = TrackRng::from_seed(0);
        let mut queue = PlacementQueue::new();
        let result = engine().extend_track(&catalog, &mut world, &mut rng, &mut queue, 3);
        assert!(matches!(result, Err(GenerationError::Catalog(_))));
    }

    #[test]
    fn test_reset_returns_to_start() {
        let catalog = default_catalog().expect("catalog");
        let mut world = HeadlessWorld::new();
        let mut rng = TrackRng::from_seed(8);
        let mut queue = PlacementQueue::new();
        let mut engine = engine();
        engine
            .extend_track(&catalog, &mut world, &mut rng, &mut queue, 2)
            .expect("extend");
        assert!(engine.placed_count() > 0);

        engine.reset();
        assert_eq!(engine.anchor(), &Transform::IDENTITY);
        assert_eq!(engine.placed_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_anchor_chain_is_exact(seed in any::<u64>(), yaw in -180.0f32..180.0) {
            let catalog = default_catalog().expect("catalog");
            let mut world = HeadlessWorld::new();
            let mut rng = TrackRng::from_seed(seed);
            let mut queue = PlacementQueue::new();
            let start = Transform::from_yaw_degrees(Vec3::new(3.0, 0.0, -7.0), yaw);
            let mut engine = PlacementEngine::new(PlacementConfig::default(), ItemConfig::default(), start);

            let result = engine.extend_track(&catalog, &mut world, &mut rng, &mut queue, 3);
            prop_assert!(result.is_ok(), "extend failed: {:?}", result.err());

            let mut expected = start;
            for segment in queue.iter() {
                prop_assert_eq!(segment.root(), &expected);
                expected = *segment.socket(segment.definition().primary_exit()).expect("exit");
            }
            prop_assert_eq!(engine.anchor(), &expected);
        }
    }
}
