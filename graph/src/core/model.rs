use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::cell::{Cell, CellKey, CellShape, CellType, RefLabel};
use super::edge::{Edge, EdgeId, EdgeType};
use super::record::CommitRecord;
use crate::error::{GraphError, GraphResult};
use crate::layout::{GraphSnapshot, SnapshotCell};
use crate::menu::{CellMenu, MenuEntry, Relatives};

/// Commit graph shared between the UI thread, command threads and the layout
/// coordinator.
///
/// Structural changes hit the index immediately and are also staged as a
/// delta; the committed cell set only advances on [`GraphModel::reconcile`].
/// Every method takes the same lock for its whole duration.
#[derive(Debug, Default)]
pub struct GraphModel {
    state: Mutex<ModelState>,
}

/// The staged delta, read in one lock acquisition
#[derive(Debug, Clone, Default)]
pub struct GraphDelta {
    pub added_cells: Vec<Cell>,
    pub removed_cells: Vec<Cell>,
    pub added_edges: Vec<Edge>,
    pub removed_edges: Vec<Edge>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.added_cells.is_empty()
            && self.removed_cells.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

#[derive(Debug, Default)]
struct ModelState {
    /// Arena of every cell instance still visible to someone: live, staged or committed
    cells: HashMap<CellKey, Cell>,
    edges: HashMap<EdgeId, Edge>,
    /// commit id -> live cell
    index: HashMap<String, CellKey>,
    committed: Vec<CellKey>,
    added_cells: Vec<CellKey>,
    removed_cells: Vec<CellKey>,
    added_edges: Vec<EdgeId>,
    removed_edges: Vec<EdgeId>,
    /// Cells whose shape, type or labels differ from the defaults
    non_default: Vec<CellKey>,
    last_displayed: Option<PathBuf>,
    next_cell: u64,
    next_edge: u64,
}

impl ModelState {
    fn live_key(&self, id: &str) -> Option<CellKey> {
        self.index.get(id).copied()
    }

    fn live_mut(&mut self, id: &str) -> GraphResult<&mut Cell> {
        let key = self.live_key(id).ok_or_else(|| GraphError::UnknownCell(id.to_string()))?;
        self.cells.get_mut(&key).ok_or_else(|| GraphError::UnknownCell(id.to_string()))
    }

    fn is_live(&self, key: CellKey) -> bool {
        self.cells
            .get(&key)
            .is_some_and(|cell| self.index.get(&cell.id) == Some(&key))
    }

    fn snapshot_cells(&self, keys: &[CellKey]) -> Vec<Cell> {
        keys.iter().filter_map(|k| self.cells.get(k).cloned()).collect()
    }

    fn snapshot_edges(&self, ids: &[EdgeId]) -> Vec<Edge> {
        ids.iter().filter_map(|e| self.edges.get(e).cloned()).collect()
    }

    fn track_non_default(&mut self, key: CellKey) {
        self.non_default.push(key);
    }

    fn insert_commit(&mut self, record: &CommitRecord, label: String, refs: Vec<RefLabel>) -> CellKey {
        let mut parents: Vec<CellKey> = Vec::with_capacity(record.parents.len());
        for parent_id in &record.parents {
            match self.live_key(parent_id) {
                Some(key) if !parents.contains(&key) => parents.push(key),
                Some(_) => {}
                None => debug!(commit = %record.id, parent = %parent_id, "parent not in graph, skipping"),
            }
        }

        if let Some(old) = self.live_key(&record.id) {
            debug!(commit = %record.id, "replacing cell");
            self.detach(old);
        }

        let key = CellKey(self.next_cell);
        self.next_cell += 1;

        let mut cell = Cell::new(key, record.id.clone(), record.timestamp, parents.clone(), record.cell_type);
        let has_refs = !refs.is_empty();
        cell.labels.descriptor = label;
        cell.labels.refs = refs;

        self.cells.insert(key, cell);
        self.index.insert(record.id.clone(), key);
        self.added_cells.push(key);
        if has_refs {
            self.track_non_default(key);
        }

        // One edge per parent; octopus merges get as many as they have parents
        let edge_type = if parents.len() > 1 { EdgeType::Merge } else { EdgeType::Regular };
        for parent in parents {
            self.link(parent, key, edge_type);
        }
        key
    }

    /// Take a cell out of the index and stage it and its edges for removal
    fn detach(&mut self, key: CellKey) {
        let Some(cell) = self.cells.get(&key) else {
            return;
        };
        let id = cell.id.clone();
        let parents = cell.parents.clone();
        let edges = cell.edges.clone();

        if self.index.get(&id) == Some(&key) {
            self.index.remove(&id);
        }
        for parent in parents {
            if let Some(parent) = self.cells.get_mut(&parent) {
                parent.remove_child(key);
            }
        }
        self.removed_cells.push(key);
        for edge in edges {
            self.unlink(edge);
        }
    }

    fn link(&mut self, source: CellKey, target: CellKey, edge_type: EdgeType) -> Option<EdgeId> {
        let source_id = self.cells.get(&source)?.id.clone();
        let target_id = self.cells.get(&target)?.id.clone();

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges
            .insert(id, Edge::new(id, (source, source_id), (target, target_id), edge_type));

        if let Some(cell) = self.cells.get_mut(&source) {
            cell.edges.push(id);
            if !cell.children.contains(&target) {
                cell.children.push(target);
            }
        }
        if let Some(cell) = self.cells.get_mut(&target) {
            cell.edges.push(id);
        }
        self.added_edges.push(id);
        Some(id)
    }

    fn unlink(&mut self, edge_id: EdgeId) {
        let Some(edge) = self.edges.get(&edge_id) else {
            return;
        };
        let endpoints = [edge.source, edge.target];
        for key in endpoints {
            if let Some(cell) = self.cells.get_mut(&key) {
                cell.remove_edge(edge_id);
            }
        }
        self.removed_edges.push(edge_id);
    }

    fn has_live_edge(&self, source: CellKey, target: CellKey) -> bool {
        self.cells.get(&source).is_some_and(|cell| {
            cell.edges
                .iter()
                .filter_map(|e| self.edges.get(e))
                .any(|e| e.source == source && e.target == target)
        })
    }

    /// Reconnect children that lost their parent edge because the parent was
    /// replaced by a cell with the same id. Safe to run repeatedly.
    fn stitch_replacements(&mut self) -> usize {
        if self.removed_edges.is_empty() {
            return 0;
        }
        let removed: HashSet<CellKey> = self.removed_cells.iter().copied().collect();

        let mut repairs = Vec::new();
        for edge in self.removed_edges.iter().filter_map(|e| self.edges.get(e)) {
            if !removed.contains(&edge.source) || removed.contains(&edge.target) {
                continue;
            }
            let Some(replacement) = self.live_key(&edge.source_id) else {
                continue;
            };
            if self.is_live(edge.target) {
                repairs.push((replacement, edge.target, edge.edge_type));
            }
        }

        let mut stitched = 0;
        for (source, target, edge_type) in repairs {
            if self.has_live_edge(source, target) {
                continue;
            }
            if let Some(id) = self.link(source, target, edge_type) {
                debug!(edge = ?id, "stitched edge to replacement cell");
                stitched += 1;
            }
        }
        stitched
    }

    fn live_parents(&self, key: CellKey) -> Vec<String> {
        self.live_neighbours(key, true)
    }

    fn live_children(&self, key: CellKey) -> Vec<String> {
        self.live_neighbours(key, false)
    }

    fn live_neighbours(&self, key: CellKey, incoming: bool) -> Vec<String> {
        let Some(cell) = self.cells.get(&key) else {
            return Vec::new();
        };
        let mut out: Vec<String> = Vec::new();
        for edge in cell.edges.iter().filter_map(|e| self.edges.get(e)) {
            let (near, other, other_id) = if incoming {
                (edge.target, edge.source, &edge.source_id)
            } else {
                (edge.source, edge.target, &edge.target_id)
            };
            if near == key && self.is_live(other) && !out.contains(other_id) {
                out.push(other_id.clone());
            }
        }
        out
    }

    fn reconcile(&mut self) -> (usize, usize) {
        // Removed edges are the only record of links to replaced parents
        self.stitch_replacements();
        let added = std::mem::take(&mut self.added_cells);
        let removed: HashSet<CellKey> = self.removed_cells.drain(..).collect();
        let counts = (added.len(), removed.len());

        self.committed.extend(added);
        self.committed.retain(|k| !removed.contains(k));

        // Drop instances nobody can observe any more
        let keep: HashSet<CellKey> = self
            .committed
            .iter()
            .chain(self.index.values())
            .copied()
            .collect();
        self.cells.retain(|k, _| keep.contains(k));
        for edge in self.removed_edges.drain(..) {
            self.edges.remove(&edge);
        }
        self.added_edges.clear();
        let cells = &self.cells;
        self.non_default.retain(|k| cells.contains_key(k));

        counts
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live cell with this id exists
    pub fn contains_id(&self, id: &str) -> bool {
        self.state.lock().index.contains_key(id)
    }

    pub fn get_cell(&self, id: &str) -> Option<Cell> {
        let state = self.state.lock();
        state.live_key(id).and_then(|k| state.cells.get(&k).cloned())
    }

    /// Number of live cells
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all live cells, unordered
    pub fn ids(&self) -> Vec<String> {
        self.state.lock().index.keys().cloned().collect()
    }

    /// Number of cells as of the last reconcile
    pub fn num_cells(&self) -> usize {
        self.state.lock().committed.len()
    }

    /// The committed cell set
    pub fn all_cells(&self) -> Vec<Cell> {
        let state = self.state.lock();
        state.snapshot_cells(&state.committed)
    }

    /// Add a commit whose parents are already in the graph.
    ///
    /// Parents that cannot be resolved are left out. An existing cell with the
    /// same id is replaced.
    pub fn add_commit_cell(&self, record: &CommitRecord, label: impl Into<String>, refs: Vec<RefLabel>) -> CellKey {
        self.state.lock().insert_commit(record, label.into(), refs)
    }

    /// Stage a cell and its edges for removal. Returns false if absent.
    pub fn remove_cell(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        match state.live_key(id) {
            Some(key) => {
                state.detach(key);
                true
            }
            None => false,
        }
    }

    pub fn add_edge(&self, source_id: &str, target_id: &str) -> GraphResult<EdgeId> {
        let mut state = self.state.lock();
        let missing = || GraphError::MissingEndpoint {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
        };
        let (Some(source), Some(target)) = (state.live_key(source_id), state.live_key(target_id)) else {
            warn!(source_id, target_id, "rejecting edge with unresolved endpoint");
            return Err(missing());
        };
        state.link(source, target, EdgeType::Regular).ok_or_else(missing)
    }

    /// Add an edge between two live cell instances
    pub fn add_edge_between(&self, source: CellKey, target: CellKey) -> GraphResult<EdgeId> {
        let mut state = self.state.lock();
        if !state.is_live(source) || !state.is_live(target) {
            let id_of = |k: CellKey| {
                state.cells.get(&k).map(|c| c.id.clone()).unwrap_or_else(|| format!("{:?}", k))
            };
            let err = GraphError::MissingEndpoint { source_id: id_of(source), target_id: id_of(target) };
            warn!(%err, "rejecting edge");
            return Err(err);
        }
        state.link(source, target, EdgeType::Regular).ok_or(GraphError::MissingEndpoint {
            source_id: format!("{:?}", source),
            target_id: format!("{:?}", target),
        })
    }

    pub fn set_labels(&self, id: &str, descriptor: impl Into<String>, refs: Vec<RefLabel>) -> GraphResult<()> {
        let mut state = self.state.lock();
        let cell = state.live_mut(id)?;
        let key = cell.key;
        let has_refs = !refs.is_empty();
        cell.labels.descriptor = descriptor.into();
        cell.labels.refs = refs;
        if has_refs {
            state.track_non_default(key);
        }
        Ok(())
    }

    pub fn set_current_labels<I, S>(&self, id: &str, refs: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        state.live_mut(id)?.labels.current = refs.into_iter().map(Into::into).collect();
        Ok(())
    }

    pub fn set_remote_labels(&self, id: &str, remote_branches: Vec<String>) -> GraphResult<()> {
        let mut state = self.state.lock();
        state.live_mut(id)?.labels.remote = remote_branches;
        Ok(())
    }

    /// Context actions for each ref label on the cell
    pub fn set_label_actions(&self, id: &str, actions: BTreeMap<String, Vec<MenuEntry>>) -> GraphResult<()> {
        let mut state = self.state.lock();
        state.live_mut(id)?.labels.ref_actions = actions;
        Ok(())
    }

    pub fn set_shape(&self, id: &str, shape: CellShape) -> GraphResult<()> {
        let mut state = self.state.lock();
        let cell = state.live_mut(id)?;
        cell.shape = shape;
        let key = cell.key;
        if shape != CellShape::default() {
            state.track_non_default(key);
        }
        Ok(())
    }

    pub fn set_type(&self, id: &str, cell_type: CellType) -> GraphResult<()> {
        let mut state = self.state.lock();
        let cell = state.live_mut(id)?;
        cell.cell_type = cell_type;
        let key = cell.key;
        if cell_type != CellType::default() {
            state.track_non_default(key);
        }
        Ok(())
    }

    /// Put every tracked cell back to the default shape.
    ///
    /// Returns the ids of the committed cells that were reset.
    pub fn reset_to_defaults(&self) -> Vec<String> {
        let mut state = self.state.lock();
        let tracked = std::mem::take(&mut state.non_default);
        let committed: HashSet<CellKey> = state.committed.iter().copied().collect();

        let mut reset = Vec::new();
        for key in tracked {
            let Some(cell) = state.cells.get_mut(&key) else {
                continue;
            };
            cell.shape = CellShape::default();
            if committed.contains(&key) && !reset.contains(&cell.id) {
                reset.push(cell.id.clone());
            }
        }
        reset
    }

    /// Advance the committed set by the staged delta and clear the delta
    pub fn reconcile(&self) {
        let mut state = self.state.lock();
        let (added, removed) = state.reconcile();
        info!(added, removed, cells = state.committed.len(), "graph reconciled");
    }

    pub fn get_added_cells(&self) -> Vec<Cell> {
        let state = self.state.lock();
        state.snapshot_cells(&state.added_cells)
    }

    pub fn get_removed_cells(&self) -> Vec<Cell> {
        let state = self.state.lock();
        state.snapshot_cells(&state.removed_cells)
    }

    pub fn get_added_edges(&self) -> Vec<Edge> {
        let mut state = self.state.lock();
        state.stitch_replacements();
        state.snapshot_edges(&state.added_edges)
    }

    /// Edges staged for removal. Children of replaced cells are reconnected
    /// to the replacement first, so those edges show up as added.
    pub fn get_removed_edges(&self) -> Vec<Edge> {
        let mut state = self.state.lock();
        state.stitch_replacements();
        state.snapshot_edges(&state.removed_edges)
    }

    /// All four delta lists from one lock acquisition
    pub fn delta(&self) -> GraphDelta {
        let mut state = self.state.lock();
        state.stitch_replacements();
        GraphDelta {
            added_cells: state.snapshot_cells(&state.added_cells),
            removed_cells: state.snapshot_cells(&state.removed_cells),
            added_edges: state.snapshot_edges(&state.added_edges),
            removed_edges: state.snapshot_edges(&state.removed_edges),
        }
    }

    /// Copy of the live graph for the layout worker
    pub fn layout_snapshot(&self) -> GraphSnapshot {
        let mut state = self.state.lock();
        state.stitch_replacements();

        let mut cells: Vec<SnapshotCell> = state
            .index
            .values()
            .filter_map(|&key| {
                let cell = state.cells.get(&key)?;
                Some(SnapshotCell {
                    id: cell.id.clone(),
                    timestamp: cell.timestamp,
                    parents: state.live_parents(key),
                })
            })
            .collect();
        cells.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        GraphSnapshot::new(cells)
    }

    /// Ids of the live parents and/or children of a cell
    pub fn relatives(&self, id: &str, which: Relatives) -> Vec<String> {
        let mut state = self.state.lock();
        state.stitch_replacements();
        let Some(key) = state.live_key(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if which.includes_parents() {
            out.extend(state.live_parents(key));
        }
        if which.includes_children() {
            out.extend(state.live_children(key));
        }
        out
    }

    pub fn menu_for(&self, id: &str) -> Option<CellMenu> {
        self.contains_id(id).then(|| CellMenu::for_commit(id))
    }

    /// Record that `repo` is being displayed.
    ///
    /// Returns false the first time a repository is shown (or after switching
    /// from another one), true when the same repository is shown again.
    pub fn mark_displayed(&self, repo: &Path) -> bool {
        let mut state = self.state.lock();
        if state.last_displayed.as_deref() == Some(repo) {
            return true;
        }
        state.last_displayed = Some(repo.to_path_buf());
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{CancelToken, GenerationLayout, LayoutEngine, LayoutRun, Position};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    fn commit(id: &str, secs: i64, parents: &[&str], cell_type: CellType) -> CommitRecord {
        CommitRecord::new(
            id,
            Utc.timestamp_opt(secs, 0).unwrap(),
            parents.iter().map(|p| p.to_string()).collect(),
            cell_type,
        )
    }

    fn add(model: &GraphModel, id: &str, secs: i64, parents: &[&str]) -> CellKey {
        model.add_commit_cell(&commit(id, secs, parents, CellType::Both), id, vec![])
    }

    fn edge_pairs(edges: &[Edge]) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = edges
            .iter()
            .map(|e| (e.source_id.clone(), e.target_id.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    fn sorted_ids(cells: &[Cell]) -> Vec<String> {
        let mut ids: Vec<_> = cells.iter().map(|c| c.id().to_string()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn replacement_survives_reconcile_without_queries() {
        let model = GraphModel::new();
        model.add_commit_cell(&commit("A", 1, &[], CellType::Local), "A", vec![]);
        add(&model, "B", 2, &["A"]);
        model.reconcile();

        let new_a = add(&model, "A", 1, &[]);
        model.reconcile();

        // captured parent key is the replaced instance
        assert_ne!(model.get_cell("B").unwrap().parents().to_vec(), vec![new_a]);
        assert_eq!(model.relatives("B", Relatives::Parents), vec!["A"]);
        assert_eq!(model.relatives("A", Relatives::Children), vec!["B"]);
        let snapshot = model.layout_snapshot();
        let b = snapshot.cells.iter().find(|c| c.id == "B").unwrap();
        assert_eq!(b.parents, vec!["A".to_string()]);
    }

    #[test]
    fn fork_then_reconcile() {
        let model = GraphModel::new();
        add(&model, "A", 1, &[]);
        add(&model, "B", 2, &["A"]);
        add(&model, "C", 3, &["A"]);

        assert_eq!(
            edge_pairs(&model.get_added_edges()),
            vec![("A".into(), "B".into()), ("A".into(), "C".into())]
        );
        assert_eq!(model.num_cells(), 0);

        let snapshot = model.layout_snapshot();
        model.reconcile();

        assert_eq!(sorted_ids(&model.all_cells()), vec!["A", "B", "C"]);
        assert_eq!(model.num_cells(), 3);
        assert!(model.delta().is_empty());

        let layout = match GenerationLayout::default().layout(&snapshot, &CancelToken::new()).unwrap() {
            LayoutRun::Completed(layout) => layout,
            LayoutRun::Cancelled => panic!("cancelled"),
        };
        assert_eq!(layout.get("A").map(|p| p.generation), Some(0));
        assert_eq!(layout.get("B").map(|p| p.generation), Some(1));
        assert_eq!(layout.get("C"), Some(Position { generation: 1, row: 0 }));
    }

    #[test]
    fn edges_only_reference_indexed_cells() {
        let model = GraphModel::new();
        add(&model, "r", 0, &[]);
        add(&model, "a", 1, &["r"]);
        add(&model, "b", 2, &["r"]);
        add(&model, "m", 3, &["a", "b"]);
        add(&model, "n", 4, &["m", "missing"]);

        for edge in model.get_added_edges() {
            assert!(model.contains_id(&edge.source_id), "{} missing", edge.source_id);
            assert!(model.contains_id(&edge.target_id), "{} missing", edge.target_id);
        }
        let n = model.get_cell("n").unwrap();
        assert_eq!(n.parents().len(), 1);
    }

    #[test]
    fn octopus_merge_gets_edge_per_parent() {
        let model = GraphModel::new();
        add(&model, "base", 0, &[]);
        for (i, id) in ["p1", "p2", "p3", "p4"].iter().enumerate() {
            add(&model, id, i as i64 + 1, &["base"]);
        }
        add(&model, "octo", 10, &["p1", "p2", "p3", "p4"]);

        let into_octo: Vec<_> = model
            .get_added_edges()
            .into_iter()
            .filter(|e| e.target_id == "octo")
            .collect();
        assert_eq!(into_octo.len(), 4);
        assert!(into_octo.iter().all(|e| e.edge_type == EdgeType::Merge));
        assert_eq!(model.get_cell("octo").unwrap().parents().len(), 4);
        assert!(model.get_cell("octo").unwrap().is_merge());
    }

    #[test]
    fn replacement_stitches_children() {
        let model = GraphModel::new();
        let old_a = model.add_commit_cell(&commit("A", 1, &[], CellType::Local), "A", vec![]);
        add(&model, "B", 2, &["A"]);
        model.reconcile();

        let new_a = model.add_commit_cell(&commit("A", 1, &[], CellType::Both), "A", vec![]);
        assert_ne!(old_a, new_a);

        let removed: Vec<_> = model.get_removed_cells().iter().map(|c| c.key()).collect();
        assert_eq!(removed, vec![old_a]);
        let added: Vec<_> = model.get_added_cells().iter().map(|c| c.key()).collect();
        assert_eq!(added, vec![new_a]);
        assert_eq!(model.get_cell("A").unwrap().cell_type(), CellType::Both);

        let removed_edges = model.get_removed_edges();
        assert_eq!(edge_pairs(&removed_edges), vec![("A".into(), "B".into())]);
        assert_eq!(removed_edges[0].source, old_a);

        let added_edges = model.get_added_edges();
        assert_eq!(added_edges.len(), 1);
        assert_eq!(added_edges[0].source, new_a);
        assert_eq!(added_edges[0].target_id, "B");

        // querying again must not duplicate the repair
        model.get_removed_edges();
        assert_eq!(model.get_added_edges().len(), 1);
        assert_eq!(model.relatives("B", Relatives::Parents), vec!["A".to_string()]);
    }

    #[test]
    fn no_stitch_when_child_also_removed() {
        let model = GraphModel::new();
        model.add_commit_cell(&commit("A", 1, &[], CellType::Local), "A", vec![]);
        add(&model, "B", 2, &["A"]);
        model.reconcile();

        model.add_commit_cell(&commit("A", 1, &[], CellType::Both), "A", vec![]);
        assert!(model.remove_cell("B"));

        assert!(model.get_removed_edges().iter().all(|e| e.target_id == "B"));
        assert!(model.get_added_edges().is_empty());
    }

    #[test]
    fn repeated_replacement_keeps_one_live_edge() {
        let model = GraphModel::new();
        model.add_commit_cell(&commit("A", 1, &[], CellType::Local), "A", vec![]);
        add(&model, "B", 2, &["A"]);
        model.reconcile();

        model.add_commit_cell(&commit("A", 1, &[], CellType::Remote), "A", vec![]);
        model.get_removed_edges();
        model.add_commit_cell(&commit("A", 1, &[], CellType::Both), "A", vec![]);
        model.get_removed_edges();

        let snapshot = model.layout_snapshot();
        let b = snapshot.cells.iter().find(|c| c.id == "B").unwrap();
        assert_eq!(b.parents, vec!["A".to_string()]);
        assert_eq!(model.relatives("A", Relatives::Children), vec!["B".to_string()]);

        model.reconcile();
        assert_eq!(sorted_ids(&model.all_cells()), vec!["A", "B"]);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let model = GraphModel::new();
        add(&model, "A", 1, &[]);
        add(&model, "B", 2, &["A"]);
        model.reconcile();
        let first = sorted_ids(&model.all_cells());
        model.reconcile();
        assert_eq!(sorted_ids(&model.all_cells()), first);
        assert_eq!(model.num_cells(), 2);
    }

    #[test]
    fn removal_is_staged_until_reconcile() {
        let model = GraphModel::new();
        add(&model, "A", 1, &[]);
        add(&model, "B", 2, &["A"]);
        model.reconcile();

        assert!(model.remove_cell("B"));
        assert!(!model.contains_id("B"));
        assert_eq!(model.num_cells(), 2);
        assert_eq!(sorted_ids(&model.get_removed_cells()), vec!["B"]);
        assert_eq!(edge_pairs(&model.get_removed_edges()), vec![("A".into(), "B".into())]);
        assert!(model.relatives("A", Relatives::Children).is_empty());

        model.reconcile();
        assert_eq!(sorted_ids(&model.all_cells()), vec!["A"]);
    }

    #[test]
    fn removing_absent_cell_is_noop() {
        let model = GraphModel::new();
        assert!(!model.remove_cell("nope"));
        assert!(model.delta().is_empty());
    }

    #[test]
    fn edge_with_missing_endpoint_is_rejected() {
        let model = GraphModel::new();
        add(&model, "A", 1, &[]);
        let err = model.add_edge("A", "ghost").unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingEndpoint { source_id: "A".into(), target_id: "ghost".into() }
        );
        assert!(model.get_added_edges().is_empty());
    }

    #[test]
    fn manual_edges() {
        let model = GraphModel::new();
        let a = add(&model, "A", 1, &[]);
        let b = add(&model, "B", 2, &[]);
        model.add_edge("A", "B").unwrap();
        model.add_edge_between(a, b).unwrap();
        assert_eq!(model.get_added_edges().len(), 2);
        assert_eq!(model.relatives("B", Relatives::Parents), vec!["A".to_string()]);

        model.remove_cell("A");
        assert!(model.add_edge_between(a, b).is_err());
    }

    #[test]
    fn reset_restores_tracked_shapes() {
        let model = GraphModel::new();
        add(&model, "A", 1, &[]);
        model.add_commit_cell(&commit("B", 2, &["A"], CellType::Both), "B", vec![RefLabel::branch("main")]);
        model.reconcile();

        model.set_shape("A", CellShape::branch_head(true)).unwrap();
        model.set_shape("A", CellShape::branch_head(false)).unwrap();
        model.set_type("A", CellType::Local).unwrap();
        add(&model, "C", 3, &["B"]);
        model.set_shape("C", CellShape::TrackedBranchHead).unwrap();

        let reset = model.reset_to_defaults();
        // C is not committed yet
        assert_eq!(reset, vec!["B".to_string(), "A".to_string()]);
        assert_eq!(model.get_cell("A").unwrap().shape(), CellShape::Default);
        assert_eq!(model.get_cell("C").unwrap().shape(), CellShape::Default);
        assert_eq!(model.get_cell("A").unwrap().cell_type(), CellType::Local);
        assert!(model.reset_to_defaults().is_empty());
    }

    #[test]
    fn label_setters() {
        let model = GraphModel::new();
        add(&model, "A", 1, &[]);
        model.set_labels("A", "A first", vec![RefLabel::branch("main"), RefLabel::tag("v1")]).unwrap();
        model.set_current_labels("A", ["main"]).unwrap();
        model.set_remote_labels("A", vec!["origin/main".to_string()]).unwrap();
        let menu = CellMenu::for_commit("A");
        let mut actions: BTreeMap<String, Vec<MenuEntry>> = BTreeMap::new();
        actions.insert("main".to_string(), menu.entries().into_iter().cloned().collect());
        model.set_label_actions("A", actions).unwrap();

        let cell = model.get_cell("A").unwrap();
        assert_eq!(cell.labels().descriptor, "A first");
        assert_eq!(cell.labels().refs.len(), 2);
        assert!(cell.labels().current.contains("main"));
        assert_eq!(cell.labels().remote, vec!["origin/main".to_string()]);
        assert_eq!(cell.labels().ref_actions["main"].len(), 12);

        assert_eq!(
            model.set_shape("ghost", CellShape::TrackedBranchHead),
            Err(GraphError::UnknownCell("ghost".into()))
        );
        assert!(model.menu_for("A").is_some());
        assert!(model.menu_for("ghost").is_none());
    }

    #[test]
    fn first_display_of_repository() {
        let model = GraphModel::new();
        assert!(!model.mark_displayed(Path::new("/repos/one")));
        assert!(model.mark_displayed(Path::new("/repos/one")));
        assert!(!model.mark_displayed(Path::new("/repos/two")));
        assert!(!model.mark_displayed(Path::new("/repos/one")));
    }

    #[test]
    fn concurrent_writers_keep_edges_consistent() {
        let model = Arc::new(GraphModel::new());
        add(&model, "root", 0, &[]);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let model = Arc::clone(&model);
                thread::spawn(move || {
                    let mut parent = "root".to_string();
                    for i in 0..50 {
                        let id = format!("t{}-{}", t, i);
                        let record = commit(&id, (t * 100 + i) as i64, &[parent.as_str()], CellType::Local);
                        model.add_commit_cell(&record, &id, vec![]);
                        let _ = model.get_added_edges();
                        parent = id;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(model.len(), 201);
        let edges = model.get_added_edges();
        assert_eq!(edges.len(), 200);
        for edge in edges {
            assert!(model.contains_id(&edge.source_id));
            assert!(model.contains_id(&edge.target_id));
        }
    }
}
