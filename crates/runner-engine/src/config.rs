//! Runner configuration.
//!
//! Provides configurable parameters for track generation, items, the
//! autopilot runner, the simulation loop and score persistence.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use glam::Vec3;
use runner_common::Transform;
use runner_gameplay::{ControllerConfig, RailRunnerConfig};
use runner_track::{ItemConfig, PlacementConfig, DEFAULT_CATALOG_PATH};

/// Configuration file name.
pub const CONFIG_FILE: &str = "autorunner.toml";

/// Runner configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    // === Track Settings ===
    /// Segment catalog file; the built-in catalog is used if it is missing
    pub catalog_path: PathBuf,
    /// Level seed (None = wall clock)
    pub seed: Option<u64>,
    /// Segments requested per extension batch
    pub batch_size: usize,
    /// Queue length below which the track is extended
    pub queue_low_water: usize,
    /// Remaining rail points at which the path is rebuilt
    pub path_low_water: usize,
    /// Retry budget per slot
    pub max_retries: u32,
    /// Length of the sideways clearance probe
    pub probe_distance: f32,
    /// Spawn height above the start segment
    pub spawn_height: f32,
    /// Start segment position
    pub start_position: [f32; 3],
    /// Start segment heading in degrees
    pub start_yaw: f32,
    /// Passed segments kept behind the character
    pub trailing_segments: usize,

    // === Item Settings ===
    /// Chance of a gold coin, in percent
    pub rare_coin_percent: u8,
    /// Chance of a silver coin, in percent
    pub mid_coin_percent: u8,
    /// Obstacle height above its slot
    pub obstacle_lift: f32,

    // === Runner Settings ===
    /// Runner speed in units per second
    pub runner_speed: f32,
    /// Chance per frame that the autopilot changes lane
    pub lane_change_chance: f32,

    // === Simulation Settings ===
    /// Simulated frames per second
    pub target_fps: u32,
    /// Fixed step for path following
    pub fixed_dt: f32,
    /// Frame limit per run (0 = until death)
    pub max_frames: u64,
    /// Runs to simulate
    pub max_runs: u32,
    /// Sleep to keep frames at wall-clock pace
    pub realtime: bool,

    // === Session Settings ===
    /// High score file (None = not persisted)
    pub high_score_path: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            // Track
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            seed: None,
            batch_size: 3,
            queue_low_water: 3,
            path_low_water: 3,
            max_retries: 30,
            probe_distance: 20.0,
            spawn_height: 10.0,
            start_position: [0.0, 0.0, -2.0],
            start_yaw: 0.0,
            trailing_segments: 2,

            // Items
            rare_coin_percent: 5,
            mid_coin_percent: 15,
            obstacle_lift: 0.5,

            // Runner
            runner_speed: 12.0,
            lane_change_chance: 0.01,

            // Simulation
            target_fps: 60,
            fixed_dt: 1.0 / 60.0,
            max_frames: 36_000, // 10 minutes at 60 fps
            max_runs: 3,
            realtime: false,

            // Session
            high_score_path: Some(PathBuf::from("autorunner_scores.json")),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                config.validate();
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Track
        self.batch_size = self.batch_size.clamp(1, 32);
        self.queue_low_water = self.queue_low_water.clamp(1, 32);
        self.path_low_water = self.path_low_water.clamp(1, 64);
        self.max_retries = self.max_retries.min(1000);
        self.probe_distance = self.probe_distance.clamp(0.1, 1000.0);
        self.spawn_height = self.spawn_height.max(0.0);
        self.trailing_segments = self.trailing_segments.min(64);

        // Items
        self.rare_coin_percent = self.rare_coin_percent.min(100);
        self.mid_coin_percent = self.mid_coin_percent.min(100 - self.rare_coin_percent);
        self.obstacle_lift = self.obstacle_lift.max(0.0);

        // Runner
        self.runner_speed = self.runner_speed.clamp(0.1, 200.0);
        self.lane_change_chance = self.lane_change_chance.clamp(0.0, 1.0);

        // Simulation
        self.target_fps = self.target_fps.clamp(10, 240);
        self.fixed_dt = self.fixed_dt.clamp(0.001, 0.1);
        self.max_runs = self.max_runs.max(1);
    }

    /// Transform of the start segment's `In` socket.
    #[must_use]
    pub fn start_anchor(&self) -> Transform {
        Transform::from_yaw_degrees(Vec3::from_array(self.start_position), self.start_yaw)
    }

    /// Placement engine settings.
    #[must_use]
    pub fn placement_config(&self) -> PlacementConfig {
        PlacementConfig {
            batch_size: self.batch_size,
            max_retries: self.max_retries,
            probe_distance: self.probe_distance,
            spawn_height: self.spawn_height,
            low_water_mark: self.queue_low_water,
            ..PlacementConfig::default()
        }
    }

    /// Item placement settings.
    #[must_use]
    pub fn item_config(&self) -> ItemConfig {
        ItemConfig {
            rare_coin_percent: self.rare_coin_percent,
            mid_coin_percent: self.mid_coin_percent,
            obstacle_lift: self.obstacle_lift,
            ..ItemConfig::default()
        }
    }

    /// Game controller settings.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            placement: self.placement_config(),
            items: self.item_config(),
            start_anchor: self.start_anchor(),
            path_low_water: self.path_low_water,
            trailing_segments: self.trailing_segments,
            seed: self.seed,
        }
    }

    /// Autopilot runner settings.
    #[must_use]
    pub fn runner_config(&self) -> RailRunnerConfig {
        RailRunnerConfig {
            speed: self.runner_speed,
            ..RailRunnerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_retries, 30);
        assert_eq!(config.catalog_path, PathBuf::from("assets/segments.toml"));
        assert_eq!(config.start_anchor().position, Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();

        config.batch_size = 0;
        config.rare_coin_percent = 90;
        config.mid_coin_percent = 50;
        config.fixed_dt = 0.0;

        config.validate();

        assert_eq!(config.batch_size, 1);
        assert_eq!(config.mid_coin_percent, 10);
        assert!((config.fixed_dt - 0.001).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("autorunner.toml");

        let mut config = RunnerConfig::default();
        config.seed = Some(12345);
        config.trailing_segments = 4;
        config.high_score_path = Some(temp_dir.path().join("scores.json"));

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = RunnerConfig::load_from(&config_path);
        assert_eq!(loaded.seed, Some(12345));
        assert_eq!(loaded.trailing_segments, 4);
        assert_eq!(loaded.high_score_path, config.high_score_path);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("autorunner.toml");
        fs::write(&config_path, "seed = 7\nmax_runs = 0\n").expect("write");

        let loaded = RunnerConfig::load_from(&config_path);
        assert_eq!(loaded.seed, Some(7));
        assert_eq!(loaded.max_runs, 1);
        assert_eq!(loaded.runner_speed, 12.0);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = RunnerConfig::load_from("/nonexistent/path/autorunner.toml");
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("autorunner.toml");
        fs::write(&config_path, "batch_size = \"many\"").expect("write");

        assert_eq!(RunnerConfig::load_from(&config_path), RunnerConfig::default());
    }

    #[test]
    fn test_controller_config_mapping() {
        let mut config = RunnerConfig::default();
        config.queue_low_water = 5;
        config.obstacle_lift = 1.25;
        config.seed = Some(3);

        let controller = config.controller_config();
        assert_eq!(controller.placement.low_water_mark, 5);
        assert_eq!(controller.items.obstacle_lift, 1.25);
        assert_eq!(controller.seed, Some(3));
        assert_eq!(controller.path_low_water, 3);
    }
}
