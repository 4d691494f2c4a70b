//! Application lifecycle management.
//!
//! Headless simulation loop: a game controller keeps the track ahead of an
//! autopilot runner on a [`HeadlessWorld`] until the runner dies or the
//! frame limit is reached, for a configured number of runs.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use runner_gameplay::{
    ControllerStatus, GameController, PathConsumer, RailRunner, RunSummary, Session, TrackEvent,
    TurnState,
};
use runner_track::{presets, CatalogLoadError, CatalogLoader, HeadlessWorld, SegmentCatalog, TrackRng};

use crate::config::RunnerConfig;
use crate::timing::FrameTiming;

/// Loads the segment catalog, falling back to the built-in one when the
/// file does not exist.
pub fn load_catalog(path: &Path) -> Result<SegmentCatalog> {
    let mut loader = CatalogLoader::new(path);
    match loader.load() {
        Ok(catalog) => Ok(catalog),
        Err(CatalogLoadError::NotFound(path)) => {
            warn!(
                "Catalog {} not found, using the built-in segments",
                path.display()
            );
            Ok(presets::default_catalog()?)
        },
        Err(e) => Err(e).with_context(|| format!("loading catalog {}", path.display())),
    }
}

/// Random steering: picks a branch at every fork and changes lane now and then.
#[derive(Debug)]
pub struct Autopilot {
    rng: TrackRng,
    lane_change_chance: f32,
}

impl Autopilot {
    /// Creates an autopilot.
    #[must_use]
    pub fn new(seed: u64, lane_change_chance: f32) -> Self {
        Self {
            rng: TrackRng::from_seed(seed),
            lane_change_chance,
        }
    }

    /// Steers the runner for one frame.
    pub fn steer(&mut self, runner: &mut RailRunner, awaiting_turn: bool) {
        if awaiting_turn && runner.turn_state() == TurnState::Pending {
            let turn = if self.rng.coin_flip() {
                TurnState::Left
            } else {
                TurnState::Right
            };
            debug!("Autopilot turns {turn:?}");
            runner.request_turn(turn);
        }

        let roll = self.rng.range_inclusive(1, 10_000) as f32 / 10_000.0;
        if roll <= self.lane_change_chance {
            let to_left = self.rng.coin_flip();
            runner.change_lane(to_left);
        }
    }
}

/// Outcome of one simulated run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// Score bookkeeping
    pub summary: RunSummary,
    /// Frames simulated
    pub frames: u64,
    /// Simulated seconds
    pub seconds: f64,
    /// Segments accepted, including regenerated levels
    pub segments_placed: u64,
    /// Forks passed
    pub forks_resolved: u32,
    /// Generation failures recovered from
    pub generation_failures: u32,
}

/// Headless application state.
#[derive(Debug)]
pub struct RunnerApp {
    config: RunnerConfig,
    controller: GameController,
    world: HeadlessWorld,
    runner: RailRunner,
    autopilot: Autopilot,
    timing: FrameTiming,
}

impl RunnerApp {
    /// Builds the app: loads the catalog and the saved high score.
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let catalog = load_catalog(&config.catalog_path)?;
        let session = config
            .high_score_path
            .as_deref()
            .map_or_else(Session::new, Session::load_or_default);
        info!("High score so far: {}", session.high_score());

        let controller =
            GameController::new(catalog, config.controller_config()).with_session(session);
        let autopilot = Autopilot::new(
            config.seed.unwrap_or_else(|| controller.seed()).wrapping_add(1),
            config.lane_change_chance,
        );
        let mut timing = FrameTiming::new(config.target_fps).with_realtime(config.realtime);
        timing.set_fixed_dt(config.fixed_dt);

        Ok(Self {
            runner: RailRunner::new(config.runner_config()),
            world: HeadlessWorld::new(),
            controller,
            autopilot,
            timing,
            config,
        })
    }

    /// Game controller.
    #[must_use]
    pub fn controller(&self) -> &GameController {
        &self.controller
    }

    /// Simulates one run until death or the frame limit.
    pub fn run_once(&mut self) -> Result<RunReport> {
        self.runner.revive();
        self.timing.reset();
        self.controller
            .init_game(&mut self.world, &mut self.runner)
            .context("creating the level")?;

        let mut segments_placed = 0;
        let mut forks_resolved = 0;
        let mut generation_failures = 0;

        let summary = loop {
            let dt = self.timing.begin_frame();

            // Fixed step: follow the rails
            for _ in 0..self.timing.accumulate(dt) {
                self.runner.follow_path(self.timing.fixed_dt());
            }

            // Variable step: steering and track upkeep
            self.autopilot
                .steer(&mut self.runner, self.controller.awaiting_turn());
            if self.config.max_frames > 0 && self.timing.frames() >= self.config.max_frames {
                info!("Frame limit reached");
                self.runner.kill();
            }
            let status = self
                .controller
                .update(&mut self.world, &mut self.runner)
                .context("maintaining the track")?;

            for event in self.controller.events().drain() {
                match event {
                    TrackEvent::SegmentPlaced { .. } => segments_placed += 1,
                    TrackEvent::ForkResolved { .. } => forks_resolved += 1,
                    TrackEvent::GenerationFailed { reason } => {
                        warn!("Recovered from generation failure: {reason}");
                        generation_failures += 1;
                    },
                    TrackEvent::RunEnded {
                        score,
                        high_score,
                        new_record,
                    } => {
                        log_run_end(score, high_score, new_record);
                    },
                    _ => {},
                }
            }

            if status == ControllerStatus::Dead {
                break RunSummary {
                    score: self.controller.session().score(),
                    high_score: self.controller.session().high_score(),
                    new_record: self.controller.session().new_record(),
                };
            }

            self.timing.sleep_remainder();
        };

        let report = RunReport {
            summary,
            frames: self.timing.frames(),
            seconds: self.timing.elapsed(),
            segments_placed,
            forks_resolved,
            generation_failures,
        };
        info!(
            "Run over after {:.1}s ({} frames, {:.2} ms/frame): {} segments, {} forks",
            report.seconds,
            report.frames,
            self.timing.average_frame_time_ms(),
            report.segments_placed,
            report.forks_resolved
        );
        Ok(report)
    }

    /// Simulates every configured run and persists the high score.
    pub fn run(&mut self) -> Result<Vec<RunReport>> {
        let mut reports = Vec::with_capacity(self.config.max_runs as usize);
        for run in 1..=self.config.max_runs {
            info!("Run {run}/{}", self.config.max_runs);
            reports.push(self.run_once()?);
        }
        self.controller.reset_game(&mut self.world, &mut self.runner);

        if let Some(path) = &self.config.high_score_path {
            self.controller
                .session()
                .save_to(path)
                .with_context(|| format!("saving high score to {}", path.display()))?;
        }
        Ok(reports)
    }
}

fn log_run_end(score: i32, high_score: i32, new_record: bool) {
    if new_record {
        info!("New high score: {score}");
    } else {
        info!("Score {score} (high score {high_score})");
    }
}

/// Runs the application with the given configuration file.
pub fn run(config_path: &Path) -> Result<()> {
    let mut config = RunnerConfig::load_from(config_path);
    config.validate();

    info!("Configuration loaded:");
    info!("  Catalog: {}", config.catalog_path.display());
    info!("  Seed: {:?}", config.seed);
    info!("  Runs: {}", config.max_runs);

    let mut app = RunnerApp::new(config)?;
    let reports = app.run()?;

    let best = reports.iter().map(|r| r.summary.score).max().unwrap_or(0);
    info!(
        "Simulated {} run(s), best score {best}, high score {}",
        reports.len(),
        app.controller().session().high_score()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> RunnerConfig {
        RunnerConfig {
            catalog_path: dir.path().join("missing.toml"),
            seed: Some(99),
            max_frames: 900,
            max_runs: 2,
            high_score_path: Some(dir.path().join("scores.json")),
            ..RunnerConfig::default()
        }
    }

    #[test]
    fn test_missing_catalog_uses_builtin() {
        let catalog = load_catalog(Path::new("/nonexistent/segments.toml")).expect("fallback");
        assert_eq!(catalog.len(), presets::default_catalog().expect("presets").len());
    }

    #[test]
    fn test_shipped_catalog_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/segments.toml");
        let catalog = load_catalog(&path).expect("shipped catalog");
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.fork_count(), 1);
        assert_eq!(catalog.start().expect("start").exits(), 0);
    }

    #[test]
    fn test_invalid_catalog_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("segments.toml");
        std::fs::write(&path, "version = \"1.0.0\"\nsegments = []\n").expect("write");
        assert!(load_catalog(&path).is_err());
    }

    #[test]
    fn test_runs_until_frame_limit_and_saves_score() {
        let dir = TempDir::new().expect("tempdir");
        let config = test_config(&dir);
        let score_path = config.high_score_path.clone().expect("path");

        let mut app = RunnerApp::new(config).expect("app");
        let reports = app.run().expect("run");

        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert!(report.frames <= 900);
            assert!(report.segments_placed >= 3);
            assert!(report.summary.score > 0);
        }

        let saved = Session::load_from(&score_path).expect("saved session");
        assert_eq!(saved.runs(), 2);
        assert_eq!(saved.high_score(), reports[0].summary.high_score);
    }

    #[test]
    fn test_autopilot_resolves_pending_forks() {
        let mut autopilot = Autopilot::new(5, 0.0);
        let mut runner = RailRunner::default();

        autopilot.steer(&mut runner, false);
        assert_eq!(runner.turn_state(), TurnState::Pending);

        autopilot.steer(&mut runner, true);
        assert_ne!(runner.turn_state(), TurnState::Pending);
    }
}
