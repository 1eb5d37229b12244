use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlockError, Result};

pub const DEFAULT_FLOCK_SIZE: usize = 30;
pub const DEFAULT_REFERENCE_HZ: f32 = 60.0;
/// Flocks at least this large scan neighbors through the grid when the
/// search mode is `Auto`.
pub const GRID_THRESHOLD: usize = 128;

/// How a tick's velocity is turned into displacement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScale {
    /// Velocity is a per-tick displacement; `dt` is ignored.
    PerTick,
    /// Velocity is a displacement per reference frame at the given rate, so
    /// displacement is `velocity * dt * hz`.
    FrameRate(f32),
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::FrameRate(DEFAULT_REFERENCE_HZ)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborSearch {
    BruteForce,
    Grid,
    #[default]
    Auto,
}

impl NeighborSearch {
    pub fn uses_grid(self, count: usize) -> bool {
        match self {
            Self::BruteForce => false,
            Self::Grid => true,
            Self::Auto => count >= GRID_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub visual_range: f32,
    pub protected_range: f32,
    pub matching_factor: f32,
    pub centering_factor: f32,
    pub avoid_factor: f32,
    pub turn_factor: f32,
    pub max_speed: f32,
    pub min_speed: f32,
    pub bounds_xz: f32,
    pub altitude_min: f32,
    pub altitude_max: f32,
    /// Bank angle per radian of yaw change; render-only.
    pub bank_gain: f32,
    pub time_scale: TimeScale,
    /// Upper bound on a single frame's `dt`, in seconds.
    pub max_dt: f32,
    pub neighbor_search: NeighborSearch,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            visual_range: 15.0,
            protected_range: 2.0,
            matching_factor: 0.05,
            centering_factor: 0.0005,
            avoid_factor: 0.05,
            turn_factor: 0.2,
            max_speed: 0.3,
            min_speed: 0.15,
            bounds_xz: 80.0,
            altitude_min: 10.0,
            altitude_max: 40.0,
            bank_gain: 20.0,
            time_scale: TimeScale::default(),
            max_dt: 0.1,
            neighbor_search: NeighborSearch::default(),
        }
    }
}

impl FlockConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("visual_range", self.visual_range),
            ("protected_range", self.protected_range),
            ("matching_factor", self.matching_factor),
            ("centering_factor", self.centering_factor),
            ("avoid_factor", self.avoid_factor),
            ("turn_factor", self.turn_factor),
            ("max_speed", self.max_speed),
            ("min_speed", self.min_speed),
            ("bounds_xz", self.bounds_xz),
            ("altitude_min", self.altitude_min),
            ("altitude_max", self.altitude_max),
            ("bank_gain", self.bank_gain),
            ("max_dt", self.max_dt),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(invalid(field, "must be finite"));
            }
        }

        let non_negative = [
            ("visual_range", self.visual_range),
            ("protected_range", self.protected_range),
            ("matching_factor", self.matching_factor),
            ("centering_factor", self.centering_factor),
            ("avoid_factor", self.avoid_factor),
            ("turn_factor", self.turn_factor),
            ("min_speed", self.min_speed),
            ("bank_gain", self.bank_gain),
        ];
        for (field, value) in non_negative {
            if value < 0.0 {
                return Err(invalid(field, "must be non-negative"));
            }
        }

        if self.max_speed <= 0.0 {
            return Err(invalid("max_speed", "must be positive"));
        }
        if self.min_speed > self.max_speed {
            return Err(invalid("min_speed", "must not exceed max_speed"));
        }
        if self.protected_range > self.visual_range {
            return Err(invalid("protected_range", "must not exceed visual_range"));
        }
        if self.bounds_xz <= 0.0 {
            return Err(invalid("bounds_xz", "must be positive"));
        }
        if self.altitude_min > self.altitude_max {
            return Err(invalid("altitude_min", "must not exceed altitude_max"));
        }
        if self.max_dt <= 0.0 {
            return Err(invalid("max_dt", "must be positive"));
        }
        if let TimeScale::FrameRate(hz) = self.time_scale {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(invalid("time_scale", "frame rate must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> FlockError {
    FlockError::InvalidConfig { field, reason }
}

/// Box that initial positions are drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnVolume {
    pub min: [f32; 3],
    pub max: [f32; 3],
    /// Initial vertical speed as a fraction of the horizontal spread.
    pub vertical_speed_ratio: f32,
}

impl Default for SpawnVolume {
    fn default() -> Self {
        Self {
            min: [-50.0, 10.0, -50.0],
            max: [50.0, 30.0, 50.0],
            vertical_speed_ratio: 0.1,
        }
    }
}

impl SpawnVolume {
    pub fn validate(&self) -> Result<()> {
        for axis in 0..3 {
            if !self.min[axis].is_finite() || !self.max[axis].is_finite() {
                return Err(FlockError::InvalidSpawn {
                    reason: "corners must be finite",
                });
            }
            if self.min[axis] > self.max[axis] {
                return Err(FlockError::InvalidSpawn {
                    reason: "min corner must not exceed max corner",
                });
            }
        }
        if !self.vertical_speed_ratio.is_finite() || self.vertical_speed_ratio < 0.0 {
            return Err(FlockError::InvalidSpawn {
                reason: "vertical_speed_ratio must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Everything a host needs to build a flock, as read from a TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockSetup {
    pub count: usize,
    /// Zero draws a seed from the OS entropy source.
    pub seed: u64,
    pub flock: FlockConfig,
    pub spawn: SpawnVolume,
}

impl Default for FlockSetup {
    fn default() -> Self {
        Self {
            count: DEFAULT_FLOCK_SIZE,
            seed: 0,
            flock: FlockConfig::default(),
            spawn: SpawnVolume::default(),
        }
    }
}

impl FlockSetup {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let setup: FlockSetup = toml::from_str(text)?;
        setup.validate()?;
        tracing::debug!(count = setup.count, seed = setup.seed, "parsed flock setup");
        Ok(setup)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(FlockError::EmptyFlock);
        }
        self.flock.validate()?;
        self.spawn.validate()
    }
}
