pub mod cancel;
pub mod generation;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LayoutResult;

pub use cancel::CancelToken;
pub use generation::GenerationLayout;

/// One cell as seen by the layout worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCell {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Ids of live parents (from live edges)
    pub parents: Vec<String>,
}

/// Owned copy of the live graph; the worker never touches the model itself
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub cells: Vec<SnapshotCell>,
}

impl GraphSnapshot {
    pub fn new(cells: Vec<SnapshotCell>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Topological depth, used as the column
    pub generation: usize,
    /// Slot within the generation, newest commit first
    pub row: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub positions: HashMap<String, Position>,
}

impl Layout {
    pub fn get(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of distinct generations
    pub fn depth(&self) -> usize {
        self.positions.values().map(|p| p.generation + 1).max().unwrap_or(0)
    }
}

/// How a layout pass ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRun {
    Completed(Layout),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Cells positioned between cancellation polls
    pub cancel_check_interval: usize,
    /// Refuse to lay out graphs larger than this
    pub max_cells: Option<usize>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self { cancel_check_interval: 1, max_cells: None }
    }
}

/// Computes positions for a snapshot. Runs on the layout worker thread.
pub trait LayoutEngine: Send + Sync {
    fn layout(&self, snapshot: &GraphSnapshot, cancel: &CancelToken) -> LayoutResult<LayoutRun>;
}
