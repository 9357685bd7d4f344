//! Commit graph model and layout.
//!
//! [`GraphModel`] is the shared, lock-guarded graph with a staged delta;
//! [`layout`] turns a snapshot of it into positions on a worker thread.

pub mod core;
pub mod error;
pub mod layout;
pub mod menu;

pub use crate::core::{
    Cell, CellKey, CellLabels, CellShape, CellType, CommitRecord, Edge, EdgeId, EdgeType, GraphDelta, GraphModel,
    RefLabel,
};
pub use error::{GraphError, GraphResult, LayoutError, LayoutResult};
pub use layout::{
    CancelToken, GenerationLayout, GraphSnapshot, Layout, LayoutEngine, LayoutOptions, LayoutRun, Position,
    SnapshotCell,
};
pub use menu::{CellAction, CellMenu, MenuEntry, MenuItem, Relatives, ResetMode};
