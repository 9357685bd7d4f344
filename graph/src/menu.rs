//! Context actions for a commit cell.
//!
//! Menus are plain data: the UI layer decides what each [`CellAction`] does.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResetMode {
    Soft,
    Mixed,
    Hard,
}

/// Which relatives of a commit to select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relatives {
    Parents,
    Children,
    Both,
}

impl Relatives {
    pub fn includes_parents(self) -> bool {
        matches!(self, Relatives::Parents | Relatives::Both)
    }

    pub fn includes_children(self) -> bool {
        matches!(self, Relatives::Children | Relatives::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellAction {
    Revert,
    RevertSelected,
    RevertHelp,
    Reset,
    AdvancedReset(ResetMode),
    ResetHelp,
    CheckoutFiles,
    ShowRelatives(Relatives),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub label: String,
    pub action: CellAction,
    /// Commit id the action applies to
    pub target: String,
    /// Only enabled while several commits are selected
    pub requires_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuItem {
    Entry(MenuEntry),
    Submenu { label: String, items: Vec<MenuItem> },
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMenu {
    pub target: String,
    pub items: Vec<MenuItem>,
}

impl CellMenu {
    /// Standard menu for a commit: revert, reset, checkout, relatives
    pub fn for_commit(commit_id: &str) -> Self {
        let entry = |label: &str, action: CellAction| {
            MenuItem::Entry(MenuEntry {
                label: label.to_string(),
                action,
                target: commit_id.to_string(),
                requires_selection: action == CellAction::RevertSelected,
            })
        };
        let submenu = |label: &str, items: Vec<MenuItem>| MenuItem::Submenu { label: label.to_string(), items };

        let revert = submenu(
            "Revert...",
            vec![
                entry("Revert this commit", CellAction::Revert),
                entry("Revert multiple commits...", CellAction::RevertSelected),
                entry("Help", CellAction::RevertHelp),
            ],
        );
        let advanced = submenu(
            "Advanced",
            vec![
                entry("reset --hard", CellAction::AdvancedReset(ResetMode::Hard)),
                entry("reset --mixed", CellAction::AdvancedReset(ResetMode::Mixed)),
                entry("reset --soft", CellAction::AdvancedReset(ResetMode::Soft)),
            ],
        );
        let reset = submenu(
            "Reset...",
            vec![
                entry("Reset to this commit", CellAction::Reset),
                advanced,
                entry("Help", CellAction::ResetHelp),
            ],
        );
        let relatives = submenu(
            "Show Relatives",
            vec![
                entry("Parents", CellAction::ShowRelatives(Relatives::Parents)),
                entry("Children", CellAction::ShowRelatives(Relatives::Children)),
                entry("Both", CellAction::ShowRelatives(Relatives::Both)),
            ],
        );

        Self {
            target: commit_id.to_string(),
            items: vec![
                revert,
                reset,
                entry("Checkout files...", CellAction::CheckoutFiles),
                MenuItem::Separator,
                relatives,
            ],
        }
    }

    /// All leaf entries, depth first
    pub fn entries(&self) -> Vec<&MenuEntry> {
        fn walk<'a>(items: &'a [MenuItem], out: &mut Vec<&'a MenuEntry>) {
            for item in items {
                match item {
                    MenuItem::Entry(entry) => out.push(entry),
                    MenuItem::Submenu { items, .. } => walk(items, out),
                    MenuItem::Separator => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.items, &mut out);
        out
    }

    pub fn find(&self, action: CellAction) -> Option<&MenuEntry> {
        self.entries().into_iter().find(|e| e.action == action)
    }
}
