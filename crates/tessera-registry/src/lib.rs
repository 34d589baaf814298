//! The per-worker tile registry and the boundary classification algorithm
//! that turns a replicated ownership grid into a send queue.

mod analyzer;
mod registry;
mod tile;

pub use analyzer::{BoundaryAnalyzer, SendQueue};
pub use registry::TileRegistry;
pub use tile::{CommDescriptor, TileRecord};
