use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use commit_graph::{CellShape, CommitRecord, GraphModel, LayoutEngine, LayoutResult, RefLabel};
use tracing::{debug, info};

use crate::config::DisplayConfig;
use crate::coordinator::{DisplayCoordinator, FocusHandler};

/// commit id -> refs pointing at it
pub type RefMap = HashMap<String, Vec<RefLabel>>;

/// What one call to [`CommitTree::update`] changed in the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: usize,
    pub replaced: usize,
    pub removed: usize,
    pub cycle: u64,
}

/// A commit tree view: a graph model plus the coordinator that lays it out
pub struct CommitTree {
    model: Arc<GraphModel>,
    coordinator: DisplayCoordinator,
}

impl CommitTree {
    pub fn new(config: DisplayConfig) -> Self {
        let model = Arc::new(GraphModel::new());
        let coordinator = DisplayCoordinator::new(config, Arc::clone(&model));
        Self { model, coordinator }
    }

    pub fn with_engine(config: DisplayConfig, engine: Arc<dyn LayoutEngine>) -> Self {
        let model = Arc::new(GraphModel::new());
        let coordinator = DisplayCoordinator::with_engine(config, Arc::clone(&model), engine);
        Self { model, coordinator }
    }

    pub fn with_focus_handler(mut self, focus: impl FocusHandler + 'static) -> Self {
        self.coordinator = self.coordinator.with_focus_handler(focus);
        self
    }

    pub fn model(&self) -> &Arc<GraphModel> {
        &self.model
    }

    pub fn coordinator(&self) -> &DisplayCoordinator {
        &self.coordinator
    }

    /// Note which repository is shown. True if it was already the one on screen.
    pub fn open(&self, repo: &Path) -> bool {
        let repeat = self.model.mark_displayed(repo);
        if !repeat {
            info!(view = %self.coordinator.name(), repo = %repo.display(), "displaying new repository");
        }
        repeat
    }

    /// Bring the model in line with `commits` and run one display cycle.
    ///
    /// `commits` must list parents before children. Cells whose id is not in
    /// `commits` are removed; cells whose classification changed are replaced.
    pub fn update(&self, commits: &[CommitRecord], refs: &RefMap, focus: Option<&str>) -> LayoutResult<UpdateSummary> {
        let mut summary = UpdateSummary::default();
        self.model.reset_to_defaults();

        let wanted: HashSet<&str> = commits.iter().map(|c| c.id.as_str()).collect();
        for id in self.model.ids() {
            if !wanted.contains(id.as_str()) && self.model.remove_cell(&id) {
                summary.removed += 1;
            }
        }

        for record in commits {
            let labels = refs.get(&record.id).cloned().unwrap_or_default();
            match self.model.get_cell(&record.id) {
                None => {
                    self.model.add_commit_cell(record, record.descriptor(), labels);
                    summary.added += 1;
                }
                Some(cell) if cell.cell_type() != record.cell_type => {
                    debug!(commit = %record.id, from = ?cell.cell_type(), to = ?record.cell_type, "classification changed");
                    self.model.add_commit_cell(record, record.descriptor(), labels);
                    summary.replaced += 1;
                }
                Some(_) => {
                    if let Err(error) = self.model.set_labels(&record.id, record.descriptor(), labels) {
                        debug!(%error, commit = %record.id, "labels not refreshed");
                    }
                }
            }
        }

        self.apply_refs(refs);

        info!(
            view = %self.coordinator.name(),
            added = summary.added,
            replaced = summary.replaced,
            removed = summary.removed,
            "commit tree updated"
        );
        summary.cycle = self.coordinator.request_display(focus.map(str::to_string))?;
        Ok(summary)
    }

    /// Branch-head shapes and remote labels.
    ///
    /// A local branch counts as tracked when a remote branch of the same
    /// name points at the same commit. Cells with no remote refs get their
    /// remote labels cleared.
    fn apply_refs(&self, refs: &RefMap) {
        let empty = Vec::new();
        for id in self.model.ids() {
            let labels = refs.get(&id).unwrap_or(&empty);
            let remotes: Vec<String> = labels
                .iter()
                .filter(|r| r.is_remote)
                .map(|r| r.name.clone())
                .collect();
            let locals: Vec<&RefLabel> = labels.iter().filter(|r| !r.is_remote && !r.is_tag).collect();

            if !locals.is_empty() {
                let tracked = locals.iter().any(|local| {
                    remotes
                        .iter()
                        .any(|remote| remote.rsplit_once('/').is_some_and(|(_, branch)| branch == local.name))
                });
                if let Err(error) = self.model.set_shape(&id, CellShape::branch_head(tracked)) {
                    debug!(%error, commit = %id, "branch head shape not applied");
                }
            }
            if let Err(error) = self.model.set_remote_labels(&id, remotes) {
                debug!(%error, commit = %id, "remote labels not applied");
            }
        }
    }
}
