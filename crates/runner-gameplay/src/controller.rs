//! Game controller: drives track generation for one character.
//!
//! Owns the placement queue, the path assembler and the session, and keeps
//! the character's rails topped up each frame:
//!
//! 1. When the character is down to a few points, rebuild the path in
//!    continue mode, resolving a pending fork with its turn decision.
//! 2. Retire segments the assembler released, keeping a few behind the
//!    character in the scene.
//! 3. Replenish the queue: a fresh level batch when it is empty, or an
//!    extension when it is short and its tail is not a fork.
//!
//! A generation failure resets the level and regenerates it from the start
//! segment once before the error is surfaced.

use std::collections::VecDeque;

use glam::Vec3;
use runner_common::{GenerationError, Transform};
use runner_track::{
    AssembleOutcome, ExtendReport, ItemConfig, PathAssembler, PlacedSegment, PlacementConfig,
    PlacementEngine, PlacementQueue, RailSide, SegmentCatalog, TrackRng, TrackWorld,
};
use tracing::{debug, info, warn};

use crate::character::PathConsumer;
use crate::events::{EventBus, TrackEvent};
use crate::session::Session;

// ============================================================================
// Configuration
// ============================================================================

/// Controller tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Placement tuning
    pub placement: PlacementConfig,
    /// Coin, obstacle and decoration tuning
    pub items: ItemConfig,
    /// Where the start segment's `In` socket is placed
    pub start_anchor: Transform,
    /// Remaining points at which the path is rebuilt
    pub path_low_water: usize,
    /// Released segments kept in the scene behind the character
    pub trailing_segments: usize,
    /// Fixed seed; the wall clock is used when unset
    pub seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            items: ItemConfig::default(),
            start_anchor: Transform::from_position(Vec3::new(0.0, 0.0, -2.0)),
            path_low_water: 3,
            trailing_segments: 2,
            seed: None,
        }
    }
}

/// What [`GameController::update`] did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    /// No run in progress.
    Idle,
    /// The track was maintained.
    Running,
    /// A fork is waiting for the character's turn decision.
    AwaitingTurn,
    /// The character died this frame.
    Dead,
}

// ============================================================================
// Controller
// ============================================================================

/// Drives the placement engine and path assembler for one character.
#[derive(Debug)]
pub struct GameController {
    catalog: SegmentCatalog,
    config: ControllerConfig,
    engine: PlacementEngine,
    assembler: PathAssembler,
    queue: PlacementQueue,
    retired: VecDeque<PlacedSegment>,
    rng: TrackRng,
    session: Session,
    events: EventBus,
    spawn_point: Option<Vec3>,
    stalled: bool,
}

impl GameController {
    /// Creates a controller. Nothing is spawned until [`GameController::init_game`].
    #[must_use]
    pub fn new(catalog: SegmentCatalog, config: ControllerConfig) -> Self {
        let engine = PlacementEngine::new(
            config.placement.clone(),
            config.items.clone(),
            config.start_anchor,
        );
        let rng = config.seed.map_or_else(TrackRng::from_wall_clock, TrackRng::from_seed);
        Self {
            catalog,
            config,
            engine,
            assembler: PathAssembler::new(),
            queue: PlacementQueue::new(),
            retired: VecDeque::new(),
            rng,
            session: Session::new(),
            events: EventBus::default(),
            spawn_point: None,
            stalled: false,
        }
    }

    /// Replaces the session, e.g. with one loaded from disk.
    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Segment catalog.
    #[must_use]
    pub const fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    /// Controller tuning.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Placement engine.
    #[must_use]
    pub const fn engine(&self) -> &PlacementEngine {
        &self.engine
    }

    /// Segments ahead of the character.
    #[must_use]
    pub const fn queue(&self) -> &PlacementQueue {
        &self.queue
    }

    /// Released segments still in the scene.
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Score bookkeeping.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Seed of the current level.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Spawn point of the current level.
    #[must_use]
    pub const fn spawn_point(&self) -> Option<Vec3> {
        self.spawn_point
    }

    /// Whether the last rebuild stalled on a fork.
    #[must_use]
    pub const fn awaiting_turn(&self) -> bool {
        self.stalled
    }

    /// Starts a run: reseeds, clears the previous level and creates a new one.
    ///
    /// # Errors
    ///
    /// Fails when the first batch cannot be placed.
    pub fn init_game<W: TrackWorld, C: PathConsumer>(
        &mut self,
        world: &mut W,
        consumer: &mut C,
    ) -> Result<(), GenerationError> {
        match self.config.seed {
            Some(seed) => self.rng.reseed(seed),
            None => self.rng = TrackRng::from_wall_clock(),
        }
        info!("Starting run with seed {}", self.rng.seed());

        self.reset_game(world, consumer);
        self.session.start_run();
        self.create_level(world, consumer)?;
        Ok(())
    }

    /// Places a batch into an empty queue and feeds its rails to the consumer.
    ///
    /// # Errors
    ///
    /// Propagates placement failures; nothing from the failed batch is left
    /// in the world.
    pub fn create_level<W: TrackWorld, C: PathConsumer>(
        &mut self,
        world: &mut W,
        consumer: &mut C,
    ) -> Result<ExtendReport, GenerationError> {
        let report = self.extend(world)?;
        if let Some(spawn) = report.spawn_point {
            self.spawn_point = Some(spawn);
            consumer.spawn_at(spawn);
        }
        self.rebuild(world, consumer, false);
        Ok(report)
    }

    /// Per-frame maintenance.
    ///
    /// # Errors
    ///
    /// Fails only when regenerating from the start segment also fails.
    pub fn update<W: TrackWorld, C: PathConsumer>(
        &mut self,
        world: &mut W,
        consumer: &mut C,
    ) -> Result<ControllerStatus, GenerationError> {
        if !self.session.is_playing() {
            return Ok(ControllerStatus::Idle);
        }

        if consumer.is_dead() {
            let summary = self.session.end_run(consumer.score());
            self.events.publish(TrackEvent::RunEnded {
                score: summary.score,
                high_score: summary.high_score,
                new_record: summary.new_record,
            });
            return Ok(ControllerStatus::Dead);
        }
        self.session.set_score(consumer.score());

        if let Err(e) = self.maintain_track(world, consumer) {
            warn!("Track generation failed: {e}; regenerating from the start segment");
            self.events.publish(TrackEvent::GenerationFailed {
                reason: e.to_string(),
            });
            self.reset_game(world, consumer);
            self.create_level(world, consumer)?;
        }

        Ok(if self.stalled {
            ControllerStatus::AwaitingTurn
        } else {
            ControllerStatus::Running
        })
    }

    /// Removes every segment and clears all generation state.
    pub fn reset_game<W: TrackWorld, C: PathConsumer>(&mut self, world: &mut W, consumer: &mut C) {
        for segment in self.retired.drain(..).chain(self.queue.drain()) {
            world.remove_node(segment.node());
        }
        self.assembler.reset();
        self.engine.reset();
        consumer.reset_path();
        self.spawn_point = None;
        self.stalled = false;
        self.events.publish(TrackEvent::LevelReset);
        debug!("Level reset");
    }

    fn maintain_track<W: TrackWorld, C: PathConsumer>(
        &mut self,
        world: &mut W,
        consumer: &mut C,
    ) -> Result<(), GenerationError> {
        if consumer.num_points() <= self.config.path_low_water {
            self.rebuild(world, consumer, true);
        }

        if self.queue.is_empty() {
            self.create_level(world, consumer)?;
        } else if self.queue.len() < self.engine.config().low_water_mark && self.queue.can_extend() {
            self.extend(world)?;
        }
        Ok(())
    }

    fn extend<W: TrackWorld>(&mut self, world: &mut W) -> Result<ExtendReport, GenerationError> {
        let batch = self.engine.config().batch_size;
        let report = self
            .engine
            .extend_track(&self.catalog, world, &mut self.rng, &mut self.queue, batch)?;

        for &id in &report.rejected {
            self.events.publish(TrackEvent::SegmentRejected { id });
        }
        for &(slot, id) in &report.placed {
            self.events.publish(TrackEvent::SegmentPlaced { slot, id });
        }
        Ok(report)
    }

    fn rebuild<W: TrackWorld, C: PathConsumer>(
        &mut self,
        world: &mut W,
        consumer: &mut C,
        continue_from_middle: bool,
    ) {
        let path = match self
            .assembler
            .rebuild_path(&mut self.queue, continue_from_middle, consumer.turn_state())
        {
            AssembleOutcome::Extended(path) => path,
            AssembleOutcome::Stalled => {
                self.stalled = true;
                return;
            },
        };
        self.stalled = false;

        for side in RailSide::ALL {
            let points = path.rails.get(side);
            if !points.is_empty() {
                consumer.add_to_path(side, points);
            }
        }
        if !path.rails.center.is_empty() {
            self.events.publish(TrackEvent::PathExtended {
                points: path.rails.center.len(),
            });
        }

        if let Some(fork) = path.resolved_fork {
            self.engine.set_anchor(fork.exit);
            consumer.on_fork_resolved(fork.turn);
            self.events.publish(TrackEvent::ForkResolved {
                segment: fork.segment,
                turn: fork.turn,
            });
        }

        self.retired.extend(path.consumed);
        while self.retired.len() > self.config.trailing_segments {
            if let Some(segment) = self.retired.pop_front() {
                world.remove_node(segment.node());
            }
        }
    }
}
