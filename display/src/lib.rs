//! Background layout of commit graphs.
//!
//! A [`DisplayCoordinator`] lays out a shared [`commit_graph::GraphModel`]
//! on a worker thread and reconciles the model once the layout is applied.
//! [`CommitTree`] feeds commit records into a model and drives the coordinator.

pub mod config;
pub mod coordinator;
pub mod events;
pub mod task;
pub mod tree;

pub use config::{ConfigError, ConfigResult, DisplayConfig, LOCAL_TREE_NAME, REMOTE_TREE_NAME};
pub use coordinator::{DisplayCoordinator, FocusHandler};
pub use events::{DisplayEvent, DisplayOutcome, DisplayState, EventBus};
pub use task::{TaskHandle, TaskSupervisor};
pub use tree::{CommitTree, RefMap, UpdateSummary};
