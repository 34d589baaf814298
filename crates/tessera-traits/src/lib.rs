//! Shared error types and the tile payload capability trait used across the
//! `tessera` workspace.

mod error;
mod payload;

pub use error::{Error, Result};
pub use payload::{PayloadHandle, TilePayload};
