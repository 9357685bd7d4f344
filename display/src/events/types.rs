use commit_graph::LayoutError;

/// Lifecycle of a display coordinator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayState {
    #[default]
    Idle,
    LayoutRunning,
    Finalizing,
}

/// How one display cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOutcome {
    Finalized { cycle: u64, positioned: usize },
    Cancelled { cycle: u64 },
    Failed { cycle: u64, error: LayoutError },
}

impl DisplayOutcome {
    pub fn cycle(&self) -> u64 {
        match self {
            DisplayOutcome::Finalized { cycle, .. }
            | DisplayOutcome::Cancelled { cycle }
            | DisplayOutcome::Failed { cycle, .. } => *cycle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    StateChanged { cycle: u64, state: DisplayState },
    LayoutStarted { cycle: u64, cells: usize },
    LayoutCancelled { cycle: u64 },
    Finalized { cycle: u64, positioned: usize, focus: Option<String> },
    LayoutFailed { cycle: u64, error: LayoutError },
}
