//! Uniform sector grid over the plane.
//!
//! Each cell owns a [`SequenceContainer`] bucket of agent handles. A side
//! table maps every tracked handle to its bucket node, so moving an agent
//! between cells is an O(1) remove plus an O(1) append.

use crate::agent::Agent;
use crate::config::CandidatePolicy;
use crate::sequence::{NodeId, SequenceContainer};
use std::collections::HashMap;
use std::{error::Error, fmt};

/// Handle into the roster, used as the bucket element type.
pub type AgentHandle = NodeId;

#[derive(Clone, Debug, PartialEq)]
pub enum SectorGridError {
    InvalidCellSize { cell_size: f64 },
    InvalidExtent { width: f64, height: f64 },
    ExtentNotDivisible { width: f64, height: f64, cell_size: f64 },
}

impl fmt::Display for SectorGridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorGridError::InvalidCellSize { cell_size } => {
                write!(f, "cell_size must be positive finite (got {cell_size})")
            }
            SectorGridError::InvalidExtent { width, height } => {
                write!(f, "grid extent must be positive finite (got {width} x {height})")
            }
            SectorGridError::ExtentNotDivisible {
                width,
                height,
                cell_size,
            } => write!(
                f,
                "grid extent must be an exact multiple of cell_size ({width} x {height} vs {cell_size})"
            ),
        }
    }
}

impl Error for SectorGridError {}

#[derive(Clone, Copy, Debug)]
struct Placement {
    cell: usize,
    node: NodeId,
}

pub struct SectorGrid {
    cell_size: f64,
    width: f64,
    height: f64,
    rows: usize,
    cols: usize,
    policy: CandidatePolicy,
    buckets: Vec<SequenceContainer<AgentHandle>>,
    membership: HashMap<AgentHandle, Placement>,
}

impl SectorGrid {
    /// Build an empty grid. Dimensions that are not positive exact
    /// multiples of `cell_size` are a configuration error and refuse to
    /// construct.
    pub fn new(
        width: f64,
        height: f64,
        cell_size: f64,
        policy: CandidatePolicy,
    ) -> Result<Self, SectorGridError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SectorGridError::InvalidCellSize { cell_size });
        }
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(SectorGridError::InvalidExtent { width, height });
        }
        if width % cell_size != 0.0 || height % cell_size != 0.0 {
            return Err(SectorGridError::ExtentNotDivisible {
                width,
                height,
                cell_size,
            });
        }
        let cols = (width / cell_size) as usize;
        let rows = (height / cell_size) as usize;
        let buckets = (0..rows * cols).map(|_| SequenceContainer::new()).collect();
        Ok(Self {
            cell_size,
            width,
            height,
            rows,
            cols,
            policy,
            buckets,
            membership: HashMap::new(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of agent handles currently tracked.
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// Map a point to its `(row, col)` cell, or `None` outside the grid.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        if x < 0.0 || x >= self.width || y < 0.0 || y >= self.height {
            return None;
        }
        let col = (x / self.cell_size).floor() as usize;
        let row = (y / self.cell_size).floor() as usize;
        Some((row, col))
    }

    fn cell_index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Cell containing `handle`, or `None` when untracked.
    pub fn placement_of(&self, handle: AgentHandle) -> Option<(usize, usize)> {
        self.membership
            .get(&handle)
            .map(|p| (p.cell / self.cols, p.cell % self.cols))
    }

    /// Members of the bucket at `(row, col)`.
    pub fn bucket_len(&self, row: usize, col: usize) -> usize {
        self.buckets[self.cell_index(row, col)].len()
    }

    /// Start tracking `handle` at `pos`.
    ///
    /// # Panics
    /// Panics when `pos` lies outside the grid or `handle` is already
    /// tracked; the engine maintains both as invariants.
    pub fn insert(&mut self, handle: AgentHandle, pos: [f64; 2]) {
        let (row, col) = self
            .cell_of(pos[0], pos[1])
            .expect("agent position lies outside the grid");
        let cell = self.cell_index(row, col);
        let node = self.buckets[cell].push_back(handle);
        let prior = self.membership.insert(handle, Placement { cell, node });
        assert!(prior.is_none(), "agent handle tracked twice");
    }

    /// Stop tracking `handle`. O(1).
    ///
    /// # Panics
    /// Panics when `handle` is not tracked.
    pub fn remove(&mut self, handle: AgentHandle) {
        let placement = self
            .membership
            .remove(&handle)
            .expect("agent handle is not tracked by the grid");
        self.buckets[placement.cell].remove(placement.node);
    }

    /// Re-establish the bucket invariant after a position change: remove
    /// from the old cell, append to the cell computed from `new_pos`. A
    /// same-cell move is a harmless remove plus re-append.
    pub fn relocate(&mut self, handle: AgentHandle, new_pos: [f64; 2]) {
        self.remove(handle);
        self.insert(handle, new_pos);
    }

    /// Drop all buckets and tracked handles, keeping the grid shape.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.membership.clear();
    }

    fn clip(&self, row: i64, col: i64) -> Option<(usize, usize)> {
        if row < 0 || row >= self.rows as i64 || col < 0 || col >= self.cols as i64 {
            None
        } else {
            Some((row as usize, col as usize))
        }
    }

    /// Cells a query at `(x, y)` inspects before distance filtering.
    fn candidate_cells(&self, x: f64, y: f64, row: usize, col: usize, radius: f64) -> Vec<(usize, usize)> {
        let row = row as i64;
        let col = col as i64;
        let mut cells = Vec::new();
        if radius > self.cell_size {
            let span = (radius / self.cell_size).floor() as i64;
            for dr in -span..=span {
                for dc in -span..=span {
                    cells.extend(self.clip(row + dr, col + dc));
                }
            }
            return cells;
        }
        match self.policy {
            CandidatePolicy::Block => {
                for dr in -1..=1 {
                    for dc in -1..=1 {
                        cells.extend(self.clip(row + dr, col + dc));
                    }
                }
            }
            CandidatePolicy::NearestEdges => {
                let half = self.cell_size / 2.0;
                let dc: i64 = if x % self.cell_size < half { -1 } else { 1 };
                let dr: i64 = if y % self.cell_size < half { -1 } else { 1 };
                cells.extend(self.clip(row, col));
                cells.extend(self.clip(row, col + dc));
                cells.extend(self.clip(row + dr, col));
                cells.extend(self.clip(row + dr, col + dc));
            }
        }
        cells
    }

    /// All tracked agents within Euclidean distance `radius` of `(x, y)`,
    /// restricted to the candidate cells of the configured policy.
    ///
    /// The querying agent matches itself; callers exclude self-matches
    /// explicitly. A reference point outside the grid is reported as a
    /// diagnostic and yields an empty result.
    pub fn neighbors(
        &self,
        x: f64,
        y: f64,
        radius: f64,
        roster: &SequenceContainer<Agent>,
    ) -> Vec<AgentHandle> {
        let Some((row, col)) = self.cell_of(x, y) else {
            tracing::warn!(x, y, "neighbor query reference point lies outside the grid");
            return Vec::new();
        };
        let r_sq = radius * radius;
        let mut out = Vec::new();
        for (r, c) in self.candidate_cells(x, y, row, col, radius) {
            for &handle in self.buckets[self.cell_index(r, c)].iter() {
                let Some(agent) = roster.node(handle) else {
                    continue;
                };
                let [ax, ay] = agent.position();
                let dx = ax - x;
                let dy = ay - y;
                if dx * dx + dy * dy <= r_sq {
                    out.push(handle);
                }
            }
        }
        out
    }
}
