//! `Node<D, P>`: the single worker-visible facade over the index, registry,
//! and exchange layers.

use mpi::topology::Communicator;
use tracing::instrument;

use tessera_exchange::ExchangeEngine;
use tessera_index::OwnershipGrid;
use tessera_registry::{BoundaryAnalyzer, SendQueue, TileRecord, TileRegistry};
use tessera_traits::{Result, TilePayload};

/// One worker's view of a `D`-dimensional decomposition distributed over
/// `comm`, with tile payloads of type `P`.
///
/// Owns the replicated [`OwnershipGrid`], this worker's [`TileRegistry`],
/// the [`SendQueue`] `analyze_boundaries` regenerates each round, and the
/// [`ExchangeEngine`] that drives every MPI operation. Per §5, there is no
/// locking anywhere in here: a `Node` is driven by exactly one logical
/// control flow.
pub struct Node<'c, C, const D: usize, P> {
    comm: &'c C,
    self_rank: i32,
    grid: OwnershipGrid<D>,
    registry: TileRegistry<D, P>,
    send_queue: SendQueue,
    engine: ExchangeEngine,
}

impl<'c, C: Communicator, const D: usize, P> Node<'c, C, D, P> {
    /// Construct a node bound to `comm`, with a fresh ownership grid of the
    /// given per-dimension `lengths` and no tiles registered yet.
    pub fn new(comm: &'c C, lengths: [u64; D]) -> Result<Self> {
        Ok(Self {
            comm,
            self_rank: comm.rank(),
            grid: OwnershipGrid::new(lengths)?,
            registry: TileRegistry::new(),
            send_queue: SendQueue::new(),
            engine: ExchangeEngine::new(),
        })
    }

    /// This worker's rank.
    pub fn rank(&self) -> i32 {
        self.self_rank
    }

    /// Total number of workers in `comm`.
    pub fn world_size(&self) -> i32 {
        self.comm.size()
    }

    /// Register a tile this worker owns at `idx`.
    pub fn add_tile(&mut self, idx: [u64; D], payload: P) -> Result<u64> {
        self.registry
            .add_tile(&mut self.grid, idx, self.self_rank, payload)
    }

    /// Overwrite the physical bounding box of a tile already registered at
    /// `cid`.
    pub fn set_bounds(&mut self, cid: u64, mins: [f64; D], maxs: [f64; D]) -> Result<()> {
        self.registry.get_mut(cid)?.set_bounds(mins, maxs);
        Ok(())
    }

    /// Broadcast the ownership grid from rank 0 to every worker. Must be
    /// called after the initial `add_tile`s on rank 0 and before
    /// [`Node::analyze_boundaries`].
    #[instrument(skip(self))]
    pub fn bcast_ownership(&mut self) -> Result<()> {
        self.engine.bcast_ownership(self.comm, &mut self.grid, 0)
    }

    /// Classify every local tile as interior or boundary and regenerate the
    /// send queue from scratch. Clears any stale queue first — see
    /// `DESIGN.md` on why this crate always clears before analyzing.
    #[instrument(skip(self))]
    pub fn analyze_boundaries(&mut self) -> Result<()> {
        self.send_queue.clear();
        BoundaryAnalyzer::analyze(&self.grid, &mut self.registry, self.self_rank, &mut self.send_queue)
    }

    /// The foreign ranks bordering a single tile, independent of a full
    /// analyze pass.
    pub fn virtual_neighborhood(&self, cid: u64) -> Result<Vec<i32>> {
        BoundaryAnalyzer::virtual_neighborhood(&self.grid, &self.registry, cid, self.self_rank)
    }

    /// Sender side of the tile-metadata round: ship every queued tile's
    /// descriptor to its virtual owners.
    #[instrument(skip(self))]
    pub fn send_tiles(&mut self) -> Result<()> {
        self.engine.send_tiles(self.comm, &self.registry, &self.send_queue)
    }

    /// Receiver side of the tile-metadata round: receive every descriptor
    /// addressed to this worker and create or update the matching registry
    /// entry.
    #[instrument(skip(self))]
    pub fn recv_tiles(&mut self) -> Result<()>
    where
        P: TilePayload,
    {
        self.engine.recv_tiles(self.comm, &mut self.registry, &mut self.grid)
    }

    /// Post this step's outbound boundary payload on `tag`.
    #[instrument(skip(self))]
    pub fn send_payload(&mut self, tag: i32) -> Result<()>
    where
        P: TilePayload,
    {
        self.engine
            .send_payload(self.comm, &self.registry, self.self_rank, tag)
    }

    /// Post this step's inbound virtual-tile payload receives on `tag`.
    #[instrument(skip(self))]
    pub fn recv_payload(&mut self, tag: i32) -> Result<()>
    where
        P: TilePayload,
    {
        self.engine.recv_payload(self.comm, &mut self.registry, tag)
    }

    /// Block until every receive posted on `tag` completes.
    #[instrument(skip(self))]
    pub fn wait_payload(&mut self, tag: i32) -> Result<()> {
        self.engine.wait_payload(tag)
    }

    /// Drop every queued send-queue entry.
    pub fn clear_send_queue(&mut self) {
        self.send_queue.clear();
    }

    /// The current send queue, as last produced by `analyze_boundaries`.
    pub fn send_queue(&self) -> &SendQueue {
        &self.send_queue
    }

    /// Every registered tile id.
    pub fn ids(&self, sorted: bool) -> Vec<u64> {
        self.registry.all_ids(sorted)
    }

    /// Ids of tiles owned by this worker.
    pub fn local_ids(&self, sorted: bool) -> Vec<u64> {
        self.registry.local_ids(sorted)
    }

    /// Ids of virtual (non-owned) tiles.
    pub fn virtual_ids(&self, sorted: bool) -> Vec<u64> {
        self.registry.virtual_ids(sorted)
    }

    /// Ids of local tiles with at least one foreign neighbor.
    pub fn boundary_ids(&self, sorted: bool) -> Vec<u64> {
        self.registry.boundary_ids(self.self_rank, sorted)
    }

    /// Fetch a tile by id, failing if absent.
    pub fn get(&self, cid: u64) -> Result<&TileRecord<D, P>> {
        self.registry.get(cid)
    }

    /// Mutable access to a tile by id, failing if absent.
    pub fn get_mut(&mut self, cid: u64) -> Result<&mut TileRecord<D, P>> {
        self.registry.get_mut(cid)
    }

    /// True iff a tile with this id is registered and owned by this worker.
    pub fn is_local(&self, cid: u64) -> bool {
        self.registry.is_local(cid)
    }

    /// The owning rank recorded for `idx` in the ownership grid.
    pub fn ownership(&self, idx: [u64; D]) -> Result<i32> {
        self.grid.get(idx)
    }

    /// The tile id addressed by `idx`, without needing to go through
    /// `add_tile`.
    pub fn cid_of(&self, idx: [u64; D]) -> Result<u64> {
        self.grid.space().id(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_traits::PayloadHandle;

    #[derive(Debug, Default)]
    struct NullPayload;

    impl TilePayload for NullPayload {
        fn send_payload<C: Communicator>(
            &self,
            _comm: &C,
            _dest_rank: i32,
            _tag: i32,
        ) -> Result<Vec<PayloadHandle>> {
            Ok(vec![PayloadHandle::completed()])
        }

        fn recv_payload<C: Communicator>(
            &mut self,
            _comm: &C,
            _source_rank: i32,
            _tag: i32,
        ) -> Result<Vec<PayloadHandle>> {
            Ok(vec![PayloadHandle::completed()])
        }
    }

    /// Single-rank degenerate case of scenario C: a 2x2 periodic grid with
    /// one worker has no boundary tiles and an empty send queue.
    ///
    /// `MPI_Comm_rank`/`MPI_Comm_size` are undefined before `MPI_Init`, so
    /// the communicator must come from an initialized `Universe` (as the
    /// `demos/life` binary does), not `SystemCommunicator::world()` called
    /// cold.
    #[test]
    fn single_rank_periodic_grid_has_no_boundary_tiles() {
        let universe = mpi::initialize().expect("MPI failed to initialize");
        let comm = universe.world();
        let mut node: Node<_, 2, NullPayload> = Node::new(&comm, [2, 2]).unwrap();

        for i in 0..2u64 {
            for j in 0..2u64 {
                node.add_tile([i, j], NullPayload).unwrap();
            }
        }

        node.bcast_ownership().unwrap();
        node.analyze_boundaries().unwrap();

        assert!(node.send_queue().is_empty());
        assert_eq!(node.boundary_ids(true), Vec::<u64>::new());
        assert_eq!(node.local_ids(true).len(), 4);
    }
}
