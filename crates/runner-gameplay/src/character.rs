//! Character side of the path contract.
//!
//! The gameplay controller hands assembled rail points to a
//! [`PathConsumer`] and reads back its turn decision, death flag and score.
//! [`RailRunner`] is a minimal follower used by the headless driver and
//! tests; a real game plugs its steering character in instead.

use std::collections::VecDeque;

use glam::Vec3;
use runner_track::{RailSide, TurnState};
use serde::{Deserialize, Serialize};

/// Consumer of assembled rail points.
pub trait PathConsumer {
    /// Appends points to one rail.
    fn add_to_path(&mut self, side: RailSide, points: &[Vec3]);

    /// Drops the first point of every rail.
    fn remove_first_point(&mut self);

    /// Point the character is heading to on its current lane.
    fn current_point(&self) -> Option<Vec3>;

    /// Points left on the current lane.
    fn num_points(&self) -> usize;

    /// Latest fork decision.
    fn turn_state(&self) -> TurnState;

    /// Whether the character died.
    fn is_dead(&self) -> bool;

    /// Current score.
    fn score(&self) -> i32;

    /// Clears all rails, e.g. when the level is reset.
    fn reset_path(&mut self);

    /// Called once the assembler has consumed the turn decision.
    fn on_fork_resolved(&mut self, _turn: TurnState) {}

    /// Called with the spawn point of a fresh level.
    fn spawn_at(&mut self, _position: Vec3) {}
}

/// Tuning for [`RailRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailRunnerConfig {
    /// Forward speed in units per second
    pub speed: f32,
    /// Distance at which a rail point counts as reached
    pub reach_radius: f32,
}

impl Default for RailRunnerConfig {
    fn default() -> Self {
        Self {
            speed: 12.0,
            reach_radius: 0.25,
        }
    }
}

/// Reference path follower: moves from point to point along its lane.
#[derive(Debug, Clone, Default)]
pub struct RailRunner {
    config: RailRunnerConfig,
    rails: [VecDeque<Vec3>; 3],
    lane: RailSide,
    position: Vec3,
    turn: TurnState,
    dead: bool,
    points_passed: u32,
    distance: f32,
}

impl RailRunner {
    /// Creates a runner on the center lane.
    #[must_use]
    pub fn new(config: RailRunnerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Current lane.
    #[must_use]
    pub const fn lane(&self) -> RailSide {
        self.lane
    }

    /// Points left on one lane.
    #[must_use]
    pub fn lane_points(&self, side: RailSide) -> usize {
        self.rails[side.index()].len()
    }

    /// Distance travelled since the last reset.
    #[must_use]
    pub const fn distance(&self) -> f32 {
        self.distance
    }

    /// Records a fork decision.
    pub fn request_turn(&mut self, turn: TurnState) {
        self.turn = turn;
    }

    /// Moves one lane to the left or right, staying on the track.
    pub fn change_lane(&mut self, to_left: bool) {
        self.lane = match (self.lane, to_left) {
            (RailSide::Right, true) | (RailSide::Left, false) => RailSide::Center,
            (RailSide::Center, true) | (RailSide::Left, true) => RailSide::Left,
            (RailSide::Center, false) | (RailSide::Right, false) => RailSide::Right,
        };
    }

    /// Kills the runner.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// Revives the runner for a new run.
    pub fn revive(&mut self) {
        self.dead = false;
        self.turn = TurnState::Pending;
        self.points_passed = 0;
        self.distance = 0.0;
        self.lane = RailSide::Center;
    }

    /// Advances along the current lane. Running out of points is fatal.
    pub fn follow_path(&mut self, dt: f32) {
        if self.dead {
            return;
        }

        let mut budget = self.config.speed * dt;
        while budget > 0.0 {
            let Some(target) = self.current_point() else {
                self.dead = true;
                return;
            };
            let to_target = target - self.position;
            let gap = to_target.length();
            if gap <= self.config.reach_radius {
                self.remove_first_point();
                self.points_passed += 1;
                continue;
            }
            let step = budget.min(gap);
            self.position += to_target / gap * step;
            self.distance += step;
            budget -= step;
        }
    }
}

impl PathConsumer for RailRunner {
    fn add_to_path(&mut self, side: RailSide, points: &[Vec3]) {
        self.rails[side.index()].extend(points.iter().copied());
    }

    fn remove_first_point(&mut self) {
        for rail in &mut self.rails {
            rail.pop_front();
        }
    }

    fn current_point(&self) -> Option<Vec3> {
        self.rails[self.lane.index()].front().copied()
    }

    fn num_points(&self) -> usize {
        self.rails[self.lane.index()].len()
    }

    fn turn_state(&self) -> TurnState {
        self.turn
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn score(&self) -> i32 {
        self.points_passed as i32
    }

    fn reset_path(&mut self) {
        for rail in &mut self.rails {
            rail.clear();
        }
    }

    fn on_fork_resolved(&mut self, _turn: TurnState) {
        self.turn = TurnState::Pending;
    }

    fn spawn_at(&mut self, position: Vec3) {
        self.position = position;
    }
}
