//! The capability interface tile payloads implement.
//!
//! The core never inspects payload bytes; it only calls these two hooks at
//! the points `BoundaryAnalyzer`/`ExchangeEngine` have decided a transfer is
//! needed. Keeping the interface to two methods (plus `Default` for virtual
//! mirrors created on first receive) is what lets `TileRegistry` stay generic
//! over arbitrary payload types instead of depending on a concrete
//! simulation kernel.

use mpi::topology::Communicator;

use crate::error::Result;

/// A handle for a payload message posted to the transport.
///
/// The transport posts payload sends and receives synchronously (see
/// `DESIGN.md` for why escaping non-blocking `mpi` request lifetimes across
/// the exchange-round boundary is not worth the complexity here), so by the
/// time a handle is returned the transfer has already completed. The type
/// still exists, rather than `()`, so `ExchangeEngine::wait_payload` has
/// something concrete to drain and so double-posting on the same tag can be
/// diagnosed as [`crate::Error::PendingRequests`].
#[derive(Debug)]
pub struct PayloadHandle(());

impl PayloadHandle {
    /// Construct a handle for an already-completed transfer.
    pub fn completed() -> Self {
        PayloadHandle(())
    }
}

/// The hooks a tile's payload must supply so the core can ship its boundary
/// state without ever looking at it.
///
/// `Default` is required because `TileRegistry::create_tile` constructs a
/// payload value for a virtual mirror the moment its descriptor is first
/// received, before any payload bytes have arrived; the tile's content is
/// filled in by the first matching `recv_payload` call.
pub trait TilePayload: Default {
    /// Send this tile's payload for simulation step `tag` to `dest_rank`.
    ///
    /// Returns one handle per message posted, so a payload that splits its
    /// state across several messages (e.g. separate buffers per field) can
    /// still be tracked uniformly by the engine.
    fn send_payload<C: Communicator>(
        &self,
        comm: &C,
        dest_rank: i32,
        tag: i32,
    ) -> Result<Vec<PayloadHandle>>;

    /// Receive this tile's payload for simulation step `tag` from
    /// `source_rank`, the owning rank of the local tile this is a virtual
    /// mirror of.
    fn recv_payload<C: Communicator>(
        &mut self,
        comm: &C,
        source_rank: i32,
        tag: i32,
    ) -> Result<Vec<PayloadHandle>>;
}
