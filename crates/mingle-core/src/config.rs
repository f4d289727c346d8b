use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Candidate-cell selection policy for neighbor queries with
/// `radius <= cell_size`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePolicy {
    /// Always examine the full 3x3 block around the reference cell. Never
    /// misses a true neighbor.
    #[default]
    Block,
    /// Only the reference cell, the orthogonal neighbors on the nearer
    /// side per axis, and their shared diagonal. Bounded approximation: a
    /// point near a cell edge can have true neighbors in an unselected
    /// cell. Kept selectable for compatibility with the original behavior.
    NearestEdges,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible runs.
    pub seed: u64,
    /// Plane width in world units. Must be a positive multiple of `cell_size`.
    pub width: f64,
    /// Plane height in world units. Must be a positive multiple of `cell_size`.
    pub height: f64,
    /// Edge length of each square sector cell.
    pub cell_size: f64,
    /// Number of social agents placed by `reset`/construction.
    pub social_count: usize,
    /// Number of antisocial agents placed by `reset`/construction.
    pub antisocial_count: usize,
    /// Interaction radius assigned to social agents.
    pub social_radius: f64,
    /// Interaction radius assigned to antisocial agents.
    pub antisocial_radius: f64,
    /// Delay between steps in the `play` loop, milliseconds.
    pub step_interval_ms: u64,
    /// Candidate-cell rule for small-radius neighbor queries.
    pub candidate_policy: CandidatePolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 100.0,
            height: 100.0,
            cell_size: 10.0,
            social_count: 25,
            antisocial_count: 25,
            social_radius: 10.0,
            antisocial_radius: 10.0,
            step_interval_ms: 50,
            candidate_policy: CandidatePolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimConfigError {
    InvalidExtent { width: f64, height: f64 },
    InvalidCellSize { cell_size: f64 },
    ExtentNotDivisible { width: f64, height: f64, cell_size: f64 },
    InvalidRadius { temperament: &'static str, radius: f64 },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::InvalidExtent { width, height } => {
                write!(f, "width and height must be positive finite (got {width} x {height})")
            }
            SimConfigError::InvalidCellSize { cell_size } => {
                write!(f, "cell_size must be positive finite (got {cell_size})")
            }
            SimConfigError::ExtentNotDivisible {
                width,
                height,
                cell_size,
            } => write!(
                f,
                "width and height must be exact multiples of cell_size ({width} x {height} vs {cell_size})"
            ),
            SimConfigError::InvalidRadius {
                temperament,
                radius,
            } => write!(
                f,
                "{temperament} radius must be non-negative finite (got {radius})"
            ),
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(SimConfigError::InvalidExtent {
                width: self.width,
                height: self.height,
            });
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(SimConfigError::InvalidCellSize {
                cell_size: self.cell_size,
            });
        }
        if self.width % self.cell_size != 0.0 || self.height % self.cell_size != 0.0 {
            return Err(SimConfigError::ExtentNotDivisible {
                width: self.width,
                height: self.height,
                cell_size: self.cell_size,
            });
        }
        if !self.social_radius.is_finite() || self.social_radius < 0.0 {
            return Err(SimConfigError::InvalidRadius {
                temperament: "social",
                radius: self.social_radius,
            });
        }
        if !self.antisocial_radius.is_finite() || self.antisocial_radius < 0.0 {
            return Err(SimConfigError::InvalidRadius {
                temperament: "antisocial",
                radius: self.antisocial_radius,
            });
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
