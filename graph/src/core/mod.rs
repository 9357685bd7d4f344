pub mod cell;
pub mod edge;
pub mod model;
pub mod record;

pub use cell::{Cell, CellKey, CellLabels, CellShape, CellType, RefLabel};
pub use edge::{Edge, EdgeId, EdgeType};
pub use model::{GraphDelta, GraphModel};
pub use record::CommitRecord;
