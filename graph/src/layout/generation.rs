use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::{CancelToken, GraphSnapshot, Layout, LayoutEngine, LayoutOptions, LayoutRun, Position};
use crate::error::{LayoutError, LayoutResult};

/// Generational layout: a cell's column is one past its deepest parent, and
/// cells sharing a column are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct GenerationLayout {
    options: LayoutOptions,
}

impl GenerationLayout {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    fn check_interval(&self) -> usize {
        self.options.cancel_check_interval.max(1)
    }

    /// Longest-path depth for every cell, in snapshot order.
    /// Returns `None` if cancelled.
    fn generations(
        &self,
        snapshot: &GraphSnapshot,
        cancel: &CancelToken,
    ) -> LayoutResult<Option<Vec<usize>>> {
        let n = snapshot.len();
        let slot: HashMap<&str, usize> = snapshot
            .cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();

        let mut indegree = vec![0usize; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, cell) in snapshot.cells.iter().enumerate() {
            let mut parents: Vec<usize> = cell
                .parents
                .iter()
                .filter_map(|p| slot.get(p.as_str()).copied())
                .collect();
            parents.sort_unstable();
            parents.dedup();
            indegree[i] = parents.len();
            for p in parents {
                children[p].push(i);
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut generation = vec![0usize; n];
        let mut processed = 0usize;
        let interval = self.check_interval();

        while let Some(i) = queue.pop_front() {
            if processed % interval == 0 && cancel.is_cancelled() {
                return Ok(None);
            }
            processed += 1;
            for &child in &children[i] {
                generation[child] = generation[child].max(generation[i] + 1);
                indegree[child] -= 1;
                if indegree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if processed < n {
            return Err(LayoutError::Cycle { remaining: n - processed });
        }
        Ok(Some(generation))
    }
}

impl LayoutEngine for GenerationLayout {
    fn layout(&self, snapshot: &GraphSnapshot, cancel: &CancelToken) -> LayoutResult<LayoutRun> {
        if snapshot.is_empty() {
            return Ok(LayoutRun::Completed(Layout::default()));
        }
        if let Some(limit) = self.options.max_cells {
            if snapshot.len() > limit {
                return Err(LayoutError::TooLarge { cells: snapshot.len(), limit });
            }
        }

        let Some(generation) = self.generations(snapshot, cancel)? else {
            debug!("layout cancelled while ranking generations");
            return Ok(LayoutRun::Cancelled);
        };

        let mut by_generation: Vec<Vec<usize>> = Vec::new();
        for (i, &g) in generation.iter().enumerate() {
            if by_generation.len() <= g {
                by_generation.resize_with(g + 1, Vec::new);
            }
            by_generation[g].push(i);
        }

        let cells = &snapshot.cells;
        let interval = self.check_interval();
        let mut positions = HashMap::with_capacity(cells.len());
        for (g, members) in by_generation.iter_mut().enumerate() {
            members.sort_by(|&a, &b| {
                cells[b]
                    .timestamp
                    .cmp(&cells[a].timestamp)
                    .then_with(|| cells[a].id.cmp(&cells[b].id))
            });
            for (row, &i) in members.iter().enumerate() {
                if positions.len() % interval == 0 && cancel.is_cancelled() {
                    debug!(positioned = positions.len(), "layout cancelled");
                    return Ok(LayoutRun::Cancelled);
                }
                positions.insert(cells[i].id.clone(), Position { generation: g, row });
            }
        }

        Ok(LayoutRun::Completed(Layout { positions }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SnapshotCell;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn cell(id: &str, secs: i64, parents: &[&str]) -> SnapshotCell {
        SnapshotCell {
            id: id.to_string(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn completed(run: LayoutRun) -> Layout {
        match run {
            LayoutRun::Completed(layout) => layout,
            LayoutRun::Cancelled => panic!("layout was cancelled"),
        }
    }

    #[test]
    fn empty_graph() {
        let run = GenerationLayout::default()
            .layout(&GraphSnapshot::default(), &CancelToken::new())
            .unwrap();
        assert!(completed(run).is_empty());
    }

    #[test]
    fn fork_generations() {
        let snapshot = GraphSnapshot::new(vec![
            cell("A", 100, &[]),
            cell("B", 200, &["A"]),
            cell("C", 300, &["A"]),
        ]);
        let layout = completed(GenerationLayout::default().layout(&snapshot, &CancelToken::new()).unwrap());

        assert_eq!(layout.get("A"), Some(Position { generation: 0, row: 0 }));
        // newest first within a generation
        assert_eq!(layout.get("C"), Some(Position { generation: 1, row: 0 }));
        assert_eq!(layout.get("B"), Some(Position { generation: 1, row: 1 }));
        assert_eq!(layout.depth(), 2);
    }

    #[test]
    fn merge_sits_past_deepest_parent() {
        let snapshot = GraphSnapshot::new(vec![
            cell("base", 1, &[]),
            cell("b1", 2, &["base"]),
            cell("b2", 3, &["b1"]),
            cell("side", 4, &["base"]),
            cell("other", 5, &[]),
            cell("merge", 6, &["b2", "side", "other"]),
        ]);
        let layout = completed(GenerationLayout::default().layout(&snapshot, &CancelToken::new()).unwrap());

        assert_eq!(layout.get("merge").map(|p| p.generation), Some(3));
        assert_eq!(layout.get("side").map(|p| p.generation), Some(1));
        assert_eq!(layout.get("other").map(|p| p.generation), Some(0));
        assert_eq!(layout.len(), 6);
    }

    #[test]
    fn unknown_parents_are_ignored() {
        let snapshot = GraphSnapshot::new(vec![cell("B", 2, &["gone"])]);
        let layout = completed(GenerationLayout::default().layout(&snapshot, &CancelToken::new()).unwrap());
        assert_eq!(layout.get("B"), Some(Position { generation: 0, row: 0 }));
    }

    #[test]
    fn cycle_is_fatal() {
        let snapshot = GraphSnapshot::new(vec![
            cell("root", 0, &[]),
            cell("x", 1, &["y"]),
            cell("y", 2, &["x"]),
        ]);
        let err = GenerationLayout::default()
            .layout(&snapshot, &CancelToken::new())
            .unwrap_err();
        assert_eq!(err, LayoutError::Cycle { remaining: 2 });
    }

    #[test]
    fn honours_cancellation() {
        let snapshot = GraphSnapshot::new(vec![cell("A", 1, &[]), cell("B", 2, &["A"])]);
        let token = CancelToken::new();
        token.cancel();
        let run = GenerationLayout::default().layout(&snapshot, &token).unwrap();
        assert_eq!(run, LayoutRun::Cancelled);
    }

    #[test]
    fn size_limit() {
        let snapshot = GraphSnapshot::new(vec![cell("A", 1, &[]), cell("B", 2, &["A"])]);
        let engine = GenerationLayout::new(LayoutOptions { max_cells: Some(1), ..Default::default() });
        let err = engine.layout(&snapshot, &CancelToken::new()).unwrap_err();
        assert_eq!(err, LayoutError::TooLarge { cells: 2, limit: 1 });
    }
}
