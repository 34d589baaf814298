//! `tessera`: a distributed spatial-decomposition framework for
//! `D`-dimensional grid simulations.
//!
//! The workspace is organized leaf-first: [`tessera_index`] provides
//! coordinate addressing and the replicated ownership grid,
//! [`tessera_registry`] provides per-tile storage and boundary
//! classification, and [`tessera_exchange`] provides the wire codec and the
//! MPI-backed exchange protocol. This crate composes all three behind the
//! single [`Node`] facade a simulation driver actually talks to.

mod node;

pub use node::Node;

pub use tessera_exchange::{FIRST_USER_TAG, NTILES, TILEDATA};
pub use tessera_index::{IndexSpace, OwnershipGrid, UNASSIGNED};
pub use tessera_registry::{BoundaryAnalyzer, CommDescriptor, SendQueue, TileRecord, TileRegistry};
pub use tessera_traits::{Error, PayloadHandle, Result, TilePayload};
