use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::edge::EdgeId;
use crate::menu::MenuEntry;

/// Identity of one Cell instance in the model's arena.
///
/// Distinct from the commit id: a replaced commit keeps its id but gets a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey(pub(crate) u64);

/// Where a commit is known to exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Local,
    Remote,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellShape {
    #[default]
    Default,
    TrackedBranchHead,
    UntrackedBranchHead,
}

impl CellShape {
    pub fn branch_head(tracked: bool) -> Self {
        if tracked {
            CellShape::TrackedBranchHead
        } else {
            CellShape::UntrackedBranchHead
        }
    }
}

/// A ref (branch or tag) pointing at a commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefLabel {
    pub name: String,
    pub is_remote: bool,
    pub is_tag: bool,
}

impl RefLabel {
    pub fn branch(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_remote: false, is_tag: false }
    }

    pub fn remote(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_remote: true, is_tag: false }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_remote: false, is_tag: true }
    }
}

/// Display text attached to a cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellLabels {
    /// Commit descriptor (short id + summary)
    pub descriptor: String,
    pub refs: Vec<RefLabel>,
    /// Refs that are currently checked out
    pub current: BTreeSet<String>,
    /// Remote branches pointing here
    pub remote: Vec<String>,
    /// Context actions per ref label
    pub ref_actions: BTreeMap<String, Vec<MenuEntry>>,
}

/// A commit node.
///
/// Cells live in the [`GraphModel`](super::GraphModel) arena; values handed out
/// by the model are snapshots.
#[derive(Debug, Clone)]
pub struct Cell {
    pub(crate) key: CellKey,
    pub(crate) id: String,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) cell_type: CellType,
    pub(crate) shape: CellShape,
    pub(crate) labels: CellLabels,
    /// Resolved parents, fixed at construction
    pub(crate) parents: Vec<CellKey>,
    pub(crate) children: Vec<CellKey>,
    pub(crate) edges: Vec<EdgeId>,
}

impl Cell {
    pub(crate) fn new(
        key: CellKey,
        id: String,
        timestamp: DateTime<Utc>,
        parents: Vec<CellKey>,
        cell_type: CellType,
    ) -> Self {
        Self {
            key,
            id,
            timestamp,
            cell_type,
            shape: CellShape::Default,
            labels: CellLabels::default(),
            parents,
            children: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn key(&self) -> CellKey {
        self.key
    }

    /// Commit id
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn shape(&self) -> CellShape {
        self.shape
    }

    pub fn labels(&self) -> &CellLabels {
        &self.labels
    }

    /// Parent instances resolved when this cell was inserted.
    ///
    /// A parent replaced later keeps its old key here, and that key stops
    /// resolving once the graph is reconciled. Use
    /// `GraphModel::relatives` for the live parents.
    pub fn parents(&self) -> &[CellKey] {
        &self.parents
    }

    /// Child instances linked so far; may name instances pruned since
    pub fn children(&self) -> &[CellKey] {
        &self.children
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Check if this is a root commit (no resolved parents)
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Check if this is a merge commit (multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub(crate) fn remove_child(&mut self, child: CellKey) {
        self.children.retain(|c| *c != child);
    }

    pub(crate) fn remove_edge(&mut self, edge: EdgeId) {
        self.edges.retain(|e| *e != edge);
    }
}
