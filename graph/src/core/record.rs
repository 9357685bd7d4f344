use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cell::CellType;

/// A commit as delivered by the repository collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Parent commit ids, in commit order
    pub parents: Vec<String>,
    pub cell_type: CellType,
    /// Short summary used for the label
    pub summary: String,
}

impl CommitRecord {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, parents: Vec<String>, cell_type: CellType) -> Self {
        Self {
            id: id.into(),
            timestamp,
            parents,
            cell_type,
            summary: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Label text: abbreviated id followed by the summary
    pub fn descriptor(&self) -> String {
        let short: String = self.id.chars().take(7).collect();
        if self.summary.is_empty() {
            short
        } else {
            format!("{} {}", short, self.summary)
        }
    }
}
