//! Coordinate addressing for the `tessera` workspace: the `D`-dimensional
//! index space used to compute tile ids and enumerate periodic neighbors,
//! and the dense ownership grid every worker replicates.

mod grid;
mod space;

pub use grid::{OwnershipGrid, UNASSIGNED};
pub use space::IndexSpace;
