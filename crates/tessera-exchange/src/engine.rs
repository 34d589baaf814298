//! Drives the two-phase exchange protocol for a single worker: the
//! bootstrap ownership broadcast, the tile-metadata announce/descriptor
//! round, and per-tag payload transfer.
//!
//! Every non-blocking `mpi` request posted here is waited-on with
//! `mpi::request::scope`/`WaitGuard` before the posting call returns (see
//! `DESIGN.md`'s "non-blocking requests with eager wait" note) — the engine
//! never exports half-open request state.

use std::collections::HashMap;

use mpi::request::WaitGuard;
use mpi::traits::*;
use tracing::{debug, instrument};

use tessera_index::OwnershipGrid;
use tessera_registry::{SendQueue, TileRegistry};
use tessera_traits::{Error, PayloadHandle, Result, TilePayload};

use crate::codec::{decode_descriptor, encode_descriptor};
use crate::tags::{is_reserved, NTILES, TILEDATA};

/// Per-worker state for the tile-metadata and payload exchange rounds.
///
/// Holds no MPI resources itself (every operation borrows the communicator
/// for the duration of the call); what it does hold is the ledger of
/// posted-but-not-yet-waited payload batches used to raise
/// [`Error::PendingRequests`].
#[derive(Debug, Default)]
pub struct ExchangeEngine {
    sent_data: HashMap<i32, Vec<PayloadHandle>>,
    recv_data: HashMap<i32, Vec<PayloadHandle>>,
}

impl ExchangeEngine {
    /// A fresh engine with no outstanding payload batches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast `grid` from `root` to every other worker. Must be called
    /// after the initial `add_tile`s on `root` and before `analyze`.
    #[instrument(skip(self, comm, grid))]
    pub fn bcast_ownership<C: Communicator, const D: usize>(
        &self,
        comm: &C,
        grid: &mut OwnershipGrid<D>,
        root: i32,
    ) -> Result<()> {
        let expected_len = grid.lengths().iter().product::<u64>() as usize;
        let mut flat = if comm.rank() == root {
            grid.serialize()
        } else {
            vec![0i32; expected_len]
        };

        comm.process_at_rank(root).broadcast_into(&mut flat);

        if comm.rank() != root {
            grid.deserialize(&flat)?;
        }
        debug!(root, ranks = flat.len(), "ownership grid broadcast complete");
        Ok(())
    }

    /// Sender side of the tile-metadata round: for each destination, a
    /// count announce on [`NTILES`] followed by one descriptor per queued
    /// tile on [`TILEDATA`].
    #[instrument(skip(self, comm, registry, send_queue))]
    pub fn send_tiles<C: Communicator, const D: usize, P>(
        &self,
        comm: &C,
        registry: &TileRegistry<D, P>,
        send_queue: &SendQueue,
    ) -> Result<()> {
        let rank = comm.rank();
        let size = comm.size();

        mpi::request::scope(|scope| -> Result<()> {
            for dest in 0..size {
                if dest == rank {
                    continue;
                }
                let count = send_queue
                    .entries()
                    .iter()
                    .filter(|(_, owners)| owners.contains(&dest))
                    .count() as i32;
                let _ = WaitGuard::from(
                    comm.process_at_rank(dest)
                        .immediate_send_with_tag(scope, &count, NTILES),
                );
            }

            for (cid, owners) in send_queue.entries() {
                let tile = registry.get(*cid)?;
                let bytes = encode_descriptor(
                    tile.communication(),
                    tile.lengths(),
                    tile.mins(),
                    tile.maxs(),
                );
                for &dest in owners {
                    let _ = WaitGuard::from(
                        comm.process_at_rank(dest)
                            .immediate_send_with_tag(scope, &bytes[..], TILEDATA),
                    );
                }
            }
            Ok(())
        })?;

        debug!(entries = send_queue.entries().len(), "tile metadata sent");
        Ok(())
    }

    /// Receiver side of the tile-metadata round: for every other worker,
    /// receive its [`NTILES`] count and that many [`TILEDATA`] descriptors,
    /// creating or updating the corresponding registry entry.
    #[instrument(skip(self, comm, registry, grid))]
    pub fn recv_tiles<C: Communicator, const D: usize, P: TilePayload>(
        &self,
        comm: &C,
        registry: &mut TileRegistry<D, P>,
        grid: &mut OwnershipGrid<D>,
    ) -> Result<()> {
        let rank = comm.rank();
        let size = comm.size();
        let mut received = 0usize;

        for source in 0..size {
            if source == rank {
                continue;
            }
            let (count, _status) = comm.process_at_rank(source).receive_with_tag::<i32>(NTILES);
            for _ in 0..count {
                let (bytes, _status) = comm
                    .process_at_rank(source)
                    .receive_vec_with_tag::<u8>(TILEDATA);
                let (mut descriptor, lengths, mins, maxs) = decode_descriptor::<D>(&bytes)?;
                descriptor.local = false;

                let known = registry.get_or_null(descriptor.cid).is_some();
                if descriptor.owner == rank && !known {
                    return Err(Error::InconsistentTopology(format!(
                        "descriptor for cid {} claims self-ownership but is unknown locally",
                        descriptor.cid
                    )));
                }

                if known {
                    registry.update_tile(grid, descriptor)?;
                } else {
                    registry.create_tile(grid, descriptor, lengths, mins, maxs, P::default())?;
                }
                received += 1;
            }
        }

        debug!(received, "tile metadata received");
        Ok(())
    }

    /// Post this step's outbound boundary payload on `tag`: for every
    /// boundary tile, its `send_payload` hook is called once per virtual
    /// owner.
    #[instrument(skip(self, comm, registry))]
    pub fn send_payload<C: Communicator, const D: usize, P: TilePayload>(
        &mut self,
        comm: &C,
        registry: &TileRegistry<D, P>,
        self_rank: i32,
        tag: i32,
    ) -> Result<()> {
        Self::check_user_tag(tag)?;
        if let Some(outstanding) = self.sent_data.get(&tag).filter(|h| !h.is_empty()) {
            return Err(Error::PendingRequests {
                tag,
                outstanding: outstanding.len(),
            });
        }

        let mut handles = Vec::new();
        for cid in registry.boundary_ids(self_rank, false) {
            let tile = registry.get(cid)?;
            for &dest in &tile.communication().virtual_owners {
                handles.extend(tile.payload.send_payload(comm, dest, tag)?);
            }
        }
        debug!(tag, posted = handles.len(), "posted boundary payload sends");
        self.sent_data.insert(tag, handles);
        Ok(())
    }

    /// Post this step's inbound virtual-tile payload receives on `tag`.
    #[instrument(skip(self, comm, registry))]
    pub fn recv_payload<C: Communicator, const D: usize, P: TilePayload>(
        &mut self,
        comm: &C,
        registry: &mut TileRegistry<D, P>,
        tag: i32,
    ) -> Result<()> {
        Self::check_user_tag(tag)?;
        if let Some(outstanding) = self.recv_data.get(&tag).filter(|h| !h.is_empty()) {
            return Err(Error::PendingRequests {
                tag,
                outstanding: outstanding.len(),
            });
        }

        let mut handles = Vec::new();
        for cid in registry.virtual_ids(false) {
            let source = registry.get(cid)?.communication().owner;
            let tile = registry.get_mut(cid)?;
            handles.extend(tile.payload.recv_payload(comm, source, tag)?);
        }
        debug!(tag, posted = handles.len(), "posted virtual payload receives");
        self.recv_data.insert(tag, handles);
        Ok(())
    }

    /// Block until every receive posted on `tag` by [`Self::recv_payload`]
    /// has completed, and drop the matching send ledger for `tag`.
    ///
    /// Handles complete synchronously by the time `send_payload`/
    /// `recv_payload` return (see the module docs), so this call's only
    /// remaining job is draining the bookkeeping that guards
    /// [`Error::PendingRequests`].
    #[instrument(skip(self))]
    pub fn wait_payload(&mut self, tag: i32) -> Result<()> {
        self.recv_data.remove(&tag);
        self.sent_data.remove(&tag);
        Ok(())
    }

    fn check_user_tag(tag: i32) -> Result<()> {
        if is_reserved(tag) {
            return Err(Error::InvariantViolation(format!(
                "tag {tag} is reserved for the tile-metadata exchange and cannot carry payload"
            )));
        }
        Ok(())
    }
}
