//! Path assembly: turns the front of the placement queue into rail points.
//!
//! Segments with exits are read in two parts. Their `In` rails are emitted
//! when the segment is first reached and the segment stays at the queue
//! front; a later rebuild in continue mode emits the exit part (`Out`, or
//! the fork branch picked by the turn decision) and releases it.

use glam::Vec3;
use runner_common::{SegmentId, Transform};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::placement::{PlacedSegment, PlacementQueue};
use crate::segment::{RailSide, SocketRole};

/// Distance under which a segment's leading rail points are merged with the
/// previously emitted points. All three rails must coincide for a merge.
pub const WELD_EPSILON: f32 = 1e-3;

/// Outcome of the most recent fork decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// No decision yet.
    #[default]
    Pending,
    /// Left branch chosen.
    Left,
    /// Right branch chosen.
    Right,
}

impl TurnState {
    /// Fork socket selected by this decision.
    #[must_use]
    pub const fn branch(self) -> Option<SocketRole> {
        match self {
            Self::Pending => None,
            Self::Left => Some(SocketRole::OutL),
            Self::Right => Some(SocketRole::OutR),
        }
    }
}

/// Points of the three rails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RailPoints {
    /// Middle lane
    pub center: Vec<Vec3>,
    /// Left lane
    pub left: Vec<Vec3>,
    /// Right lane
    pub right: Vec<Vec3>,
}

impl RailPoints {
    /// Points of one rail.
    #[must_use]
    pub fn get(&self, side: RailSide) -> &[Vec3] {
        match side {
            RailSide::Center => &self.center,
            RailSide::Left => &self.left,
            RailSide::Right => &self.right,
        }
    }

    /// Mutable points of one rail.
    pub fn get_mut(&mut self, side: RailSide) -> &mut Vec<Vec3> {
        match side {
            RailSide::Center => &mut self.center,
            RailSide::Left => &mut self.left,
            RailSide::Right => &mut self.right,
        }
    }

    /// Whether every rail is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.center.is_empty() && self.left.is_empty() && self.right.is_empty()
    }
}

/// A fork whose branch was taken during assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFork {
    /// Catalog ID of the fork segment
    pub segment: SegmentId,
    /// Decision that resolved it
    pub turn: TurnState,
    /// World transform of the chosen branch exit, the next placement anchor
    pub exit: Transform,
}

/// Points appended by one rebuild.
#[derive(Debug, Clone, Default)]
pub struct AssembledPath {
    /// New rail points
    pub rails: RailPoints,
    /// Segments popped from the queue, nearest first
    pub consumed: Vec<PlacedSegment>,
    /// Fork resolved by this rebuild
    pub resolved_fork: Option<ResolvedFork>,
}

/// Result of [`PathAssembler::rebuild_path`].
#[derive(Debug, Clone)]
pub enum AssembleOutcome {
    /// Rails were extended (possibly by nothing, for an empty queue).
    Extended(AssembledPath),
    /// A fork is waiting for a turn decision; nothing was touched.
    Stalled,
}

/// Builds rail point sequences from the placement queue.
#[derive(Debug, Clone, Default)]
pub struct PathAssembler {
    tails: [Option<Vec3>; 3],
}

impl PathAssembler {
    /// Creates an assembler with no emitted history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets emitted points, e.g. after a level reset.
    pub fn reset(&mut self) {
        self.tails = [None; 3];
    }

    /// Last point emitted on a rail.
    #[must_use]
    pub fn tail(&self, side: RailSide) -> Option<Vec3> {
        self.tails[side.index()]
    }

    /// Reads rails from the front of the queue.
    ///
    /// With `continue_from_middle`, the front segment's exit part is read
    /// first. Reading stops after the `In` part of the next segment with
    /// exits, which stays queued. A fork reached with a pending decision
    /// stalls the whole rebuild without mutating the queue.
    pub fn rebuild_path(
        &mut self,
        queue: &mut PlacementQueue,
        continue_from_middle: bool,
        turn: TurnState,
    ) -> AssembleOutcome {
        let mut plan: Vec<(usize, SocketRole)> = Vec::new();
        let mut pop_count = 0;

        for (index, segment) in queue.iter().enumerate() {
            let closing = index == 0 && continue_from_middle && segment.exits() > 0;
            let role = if !closing {
                SocketRole::In
            } else if segment.is_fork() {
                match turn.branch() {
                    Some(role) => role,
                    None => {
                        trace!("Path rebuild stalled at fork {}", segment.id());
                        return AssembleOutcome::Stalled;
                    },
                }
            } else {
                SocketRole::Out
            };

            plan.push((index, role));
            if segment.exits() > 0 && !closing {
                break;
            }
            pop_count += 1;
        }

        let mut path = AssembledPath::default();
        for &(index, role) in &plan {
            let Some(segment) = queue.get(index) else {
                continue;
            };
            let parts = RailSide::ALL.map(|side| segment.rail_world(side, role).collect::<Vec<_>>());
            let skip = usize::from(self.welds(&parts));
            for (side, points) in RailSide::ALL.into_iter().zip(parts) {
                let Some(&last) = points.last() else {
                    continue;
                };
                path.rails.get_mut(side).extend_from_slice(&points[skip..]);
                self.tails[side.index()] = Some(last);
            }
            if role.is_branch() {
                if let Some(exit) = segment.socket(role) {
                    debug!("Fork {} resolved {turn:?}", segment.id());
                    path.resolved_fork = Some(ResolvedFork {
                        segment: segment.id(),
                        turn,
                        exit: *exit,
                    });
                }
            }
        }

        for _ in 0..pop_count {
            if let Some(segment) = queue.pop_front() {
                path.consumed.push(segment);
            }
        }

        AssembleOutcome::Extended(path)
    }

    /// Whether every rail's leading point repeats its tail.
    fn welds(&self, parts: &[Vec<Vec3>; 3]) -> bool {
        RailSide::ALL.iter().zip(parts).all(|(side, points)| {
            points
                .first()
                .zip(self.tails[side.index()])
                .is_some_and(|(point, tail)| tail.distance(*point) <= WELD_EPSILON)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SegmentCatalog;
    use crate::headless::HeadlessWorld;
    use crate::items::ItemConfig;
    use crate::placement::{PlacementConfig, PlacementEngine};
    use crate::presets::{corner_segment, default_catalog, fork_segment, straight_segment};
    use crate::rng::TrackRng;
    use crate::scene::SceneGraph;
    use proptest::prelude::*;

    struct Fixture {
        catalog: SegmentCatalog,
        world: HeadlessWorld,
        rng: TrackRng,
        queue: PlacementQueue,
        engine: PlacementEngine,
    }

    impl Fixture {
        fn new(catalog: SegmentCatalog, seed: u64) -> Self {
            Self {
                catalog,
                world: HeadlessWorld::new(),
                rng: TrackRng::from_seed(seed),
                queue: PlacementQueue::new(),
                engine: PlacementEngine::new(
                    PlacementConfig::default(),
                    ItemConfig::default(),
                    Transform::IDENTITY,
                ),
            }
        }

        fn extend(&mut self, count: usize) {
            self.engine
                .extend_track(&self.catalog, &mut self.world, &mut self.rng, &mut self.queue, count)
                .expect("extend");
        }
    }

    fn extended(outcome: AssembleOutcome) -> AssembledPath {
        match outcome {
            AssembleOutcome::Extended(path) => path,
            AssembleOutcome::Stalled => panic!("unexpected stall"),
        }
    }

    fn assert_continuous(points: &[Vec3], max_gap: f32) {
        for pair in points.windows(2) {
            assert!(
                pair[0].distance(pair[1]) <= max_gap,
                "gap {} between {:?} and {:?}",
                pair[0].distance(pair[1]),
                pair[0],
                pair[1]
            );
        }
    }

    fn straights_then_fork() -> SegmentCatalog {
        SegmentCatalog::from_definitions([
            straight_segment(0, "Start", 20.0).expect("start"),
            fork_segment(1, "Fork", 20.0).expect("fork"),
        ])
        .expect("catalog")
    }

    #[test]
    fn test_straight_run_is_consumed_and_welded() {
        let catalog = SegmentCatalog::from_definitions([straight_segment(0, "S", 20.0).expect("s")])
            .expect("catalog");
        let mut fx = Fixture::new(catalog, 1);
        fx.extend(3);

        let mut assembler = PathAssembler::new();
        let path = extended(assembler.rebuild_path(&mut fx.queue, false, TurnState::Pending));

        assert_eq!(path.consumed.len(), 3);
        assert!(fx.queue.is_empty());
        // 9 points per segment, shared endpoints welded.
        assert_eq!(path.rails.center.len(), 25);
        assert_continuous(&path.rails.center, 2.5 + 1e-4);
        assert_continuous(&path.rails.left, 2.5 + 1e-4);
        assert!(path.resolved_fork.is_none());
    }

    #[test]
    fn test_segment_with_exits_is_split() {
        let catalog =
            SegmentCatalog::from_definitions([corner_segment(0, "Corner", 20.0, true).expect("corner")])
                .expect("catalog");
        let mut fx = Fixture::new(catalog, 3);
        fx.extend(3);
        assert_eq!(fx.queue.len(), 3);

        let mut assembler = PathAssembler::new();
        let entry = extended(assembler.rebuild_path(&mut fx.queue, false, TurnState::Pending));
        assert!(entry.consumed.is_empty());
        assert_eq!(fx.queue.len(), 3);
        assert_eq!(entry.rails.center.len(), 5);
        assert!(entry.rails.center[4].abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-4));

        // Exit part of the first corner, then the entry part of the second.
        let next = extended(assembler.rebuild_path(&mut fx.queue, true, TurnState::Pending));
        assert_eq!(next.consumed.len(), 1);
        assert_eq!(fx.queue.len(), 2);
        // The turn seam only matches on the center rail, so nothing is welded there.
        assert_eq!(next.rails.center.len(), 9);
        assert_eq!(next.rails.left.len(), 9);
        assert_eq!(next.rails.right.len(), 9);
        assert!(next.rails.center[0].abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-4));
        assert!(next.rails.center[4].abs_diff_eq(Vec3::new(10.0, 0.0, 10.0), 1e-4));
        assert_continuous(&next.rails.center, 2.5 + 1e-4);
        assert!(next.resolved_fork.is_none());
    }

    #[test]
    fn test_pending_fork_is_noop() {
        let mut fx = Fixture::new(straights_then_fork(), 4);
        for _ in 0..64 {
            if !fx.queue.can_extend() {
                break;
            }
            fx.extend(3);
        }
        let mut assembler = PathAssembler::new();
        // Read everything up to the fork's entry.
        extended(assembler.rebuild_path(&mut fx.queue, false, TurnState::Pending));
        assert_eq!(fx.queue.len(), 1);
        let tails: Vec<_> = RailSide::ALL.iter().map(|s| assembler.tail(*s)).collect();

        assert!(matches!(
            assembler.rebuild_path(&mut fx.queue, true, TurnState::Pending),
            AssembleOutcome::Stalled
        ));
        assert_eq!(fx.queue.len(), 1);
        let after: Vec<_> = RailSide::ALL.iter().map(|s| assembler.tail(*s)).collect();
        assert_eq!(tails, after);
    }

    #[test]
    fn test_fork_resolution_reports_branch_exit() {
        for (turn, role) in [(TurnState::Left, SocketRole::OutL), (TurnState::Right, SocketRole::OutR)] {
            let mut fx = Fixture::new(straights_then_fork(), 9);
            for _ in 0..64 {
                if !fx.queue.can_extend() {
                    break;
                }
                fx.extend(3);
            }
            let mut assembler = PathAssembler::new();
            extended(assembler.rebuild_path(&mut fx.queue, false, TurnState::Pending));
            let fork_exit = *fx.queue.front().expect("fork").socket(role).expect("branch");

            let path = extended(assembler.rebuild_path(&mut fx.queue, true, turn));
            let resolved = path.resolved_fork.expect("resolved");
            assert_eq!(resolved.turn, turn);
            assert_eq!(resolved.exit, fork_exit);
            assert!(fx.queue.is_empty());
            let last = *path.rails.center.last().expect("branch points");
            assert!(last.abs_diff_eq(fork_exit.position, 1e-4));
        }
    }

    #[test]
    fn test_rails_stay_index_aligned_through_turns() {
        let mut fx = Fixture::new(default_catalog().expect("catalog"), 17);
        let mut assembler = PathAssembler::new();
        let mut turns = TrackRng::from_seed(71);
        let mut lengths = [0usize; 3];
        let mut corners = 0;
        let mut forks = 0;

        for _ in 0..60 {
            let path = if fx.queue.is_empty() {
                fx.extend(3);
                extended(assembler.rebuild_path(&mut fx.queue, false, TurnState::Pending))
            } else {
                let turn = if turns.coin_flip() { TurnState::Left } else { TurnState::Right };
                let path = extended(assembler.rebuild_path(&mut fx.queue, true, turn));
                if let Some(fork) = path.resolved_fork {
                    fx.engine.set_anchor(fork.exit);
                    forks += 1;
                }
                if fx.queue.len() < 3 && fx.queue.can_extend() {
                    fx.extend(3);
                }
                path
            };
            corners += path.consumed.iter().filter(|s| s.exits() == 1).count();
            for segment in &path.consumed {
                fx.world.remove_node(segment.node());
            }

            let rails = &path.rails;
            assert_eq!(rails.center.len(), rails.left.len());
            assert_eq!(rails.center.len(), rails.right.len());
            for side in RailSide::ALL {
                lengths[side.index()] += rails.get(side).len();
            }
            assert_eq!(lengths[0], lengths[1]);
            assert_eq!(lengths[0], lengths[2]);
        }
        assert!(corners > 0, "no corner was passed");
        assert!(forks > 0, "no fork was passed");
    }

    #[test]
    fn test_empty_queue_extends_nothing() {
        let mut assembler = PathAssembler::new();
        let mut queue = PlacementQueue::new();
        let path = extended(assembler.rebuild_path(&mut queue, true, TurnState::Left));
        assert!(path.rails.is_empty());
        assert!(path.consumed.is_empty());
    }

    #[test]
    fn test_turn_state_branch() {
        assert_eq!(TurnState::default(), TurnState::Pending);
        assert_eq!(TurnState::Pending.branch(), None);
        assert_eq!(TurnState::Left.branch(), Some(SocketRole::OutL));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Feeds the whole generated track through the assembler, choosing
        /// turns at random, and checks that each rail stays gap-free while
        /// it runs straight.
        #[test]
        fn prop_rails_continuous_between_segments(seed in any::<u64>()) {
            let catalog = default_catalog().expect("catalog");
            let mut fx = Fixture::new(catalog, seed);
            let mut assembler = PathAssembler::new();
            let mut turns = TrackRng::from_seed(seed ^ 0xA5A5);
            let mut center: Vec<Vec3> = Vec::new();
            let mut segments = 0;

            while segments < 12 {
                if fx.queue.is_empty() {
                    if fx.engine.extend_track(&fx.catalog, &mut fx.world, &mut fx.rng, &mut fx.queue, 3).is_err() {
                        break;
                    }
                    let path = extended(assembler.rebuild_path(&mut fx.queue, false, TurnState::Pending));
                    segments += path.consumed.len();
                    center.extend(path.rails.center);
                    continue;
                }
                let turn = if turns.coin_flip() { TurnState::Left } else { TurnState::Right };
                let path = extended(assembler.rebuild_path(&mut fx.queue, true, turn));
                if let Some(fork) = path.resolved_fork {
                    fx.engine.set_anchor(fork.exit);
                }
                segments += path.consumed.len();
                center.extend(path.rails.center);
                if fx.queue.len() < 3 && fx.queue.can_extend() && !fx.queue.is_empty() {
                    if fx.engine.extend_track(&fx.catalog, &mut fx.world, &mut fx.rng, &mut fx.queue, 3).is_err() {
                        break;
                    }
                }
            }

            // Points are spaced at most one rail step apart, so any jump
            // larger than that is a seam between segments.
            for pair in center.windows(2) {
                prop_assert!(pair[0].distance(pair[1]) <= 2.5 + 1e-3);
            }
        }
    }
}
