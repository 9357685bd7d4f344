use serde::{Deserialize, Serialize};

use super::cell::CellKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Regular parent-child relationship
    Regular,
    /// Edge into a merge commit
    Merge,
}

/// A directed parent -> child edge.
///
/// Endpoints are arena keys plus their commit ids so a removed edge can still
/// be reported after its endpoint left the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub id: EdgeId,
    /// Parent cell
    pub source: CellKey,
    /// Child cell
    pub target: CellKey,
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
}

impl Edge {
    pub(crate) fn new(
        id: EdgeId,
        (source, source_id): (CellKey, String),
        (target, target_id): (CellKey, String),
        edge_type: EdgeType,
    ) -> Self {
        Self { id, source, target, source_id, target_id, edge_type }
    }

    /// (parent id, child id)
    pub fn ids(&self) -> (&str, &str) {
        (&self.source_id, &self.target_id)
    }
}
