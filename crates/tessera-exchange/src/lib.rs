//! The wire codec and the two-phase exchange protocol, built directly on
//! the `mpi` crate.

mod codec;
mod engine;
mod tags;

pub use codec::{decode_descriptor, encode_descriptor, WIRE_VERSION};
pub use engine::ExchangeEngine;
pub use tags::{is_reserved, FIRST_USER_TAG, NTILES, TILEDATA};
