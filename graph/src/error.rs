use thiserror::Error;

/// Structural misuse of the graph model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cannot add edge {source_id} -> {target_id}: endpoint not in graph")]
    MissingEndpoint { source_id: String, target_id: String },

    #[error("no cell with id {0}")]
    UnknownCell(String),
}

/// Fatal layout failures. Cancellation is not one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("commit graph contains a cycle through {remaining} cell(s)")]
    Cycle { remaining: usize },

    #[error("graph has {cells} cells, layout limit is {limit}")]
    TooLarge { cells: usize, limit: usize },

    #[error("failed to spawn layout worker: {0}")]
    WorkerSpawn(String),

    #[error("layout worker panicked")]
    WorkerPanicked,
}

pub type GraphResult<T> = Result<T, GraphError>;
pub type LayoutResult<T> = Result<T, LayoutError>;
