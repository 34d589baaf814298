//! The boundary classification algorithm: for each local tile, determine
//! which remote ranks must receive a copy and which one is its primary
//! mirror, without any coordinator.

use tessera_index::OwnershipGrid;
use tessera_traits::Result;
use tracing::debug;

use crate::registry::TileRegistry;

/// The per-round list of `(cid, destination ranks)` pairs [`analyze`] regenerates.
///
/// A `cid` is appended at most once per round; if a tile's virtual-owner set
/// changes without an intervening [`SendQueue::clear`], the stale entry is
/// kept (see `DESIGN.md`'s resolution of the send-queue membership open
/// question — callers should clear before every analyze).
#[derive(Debug, Default, Clone)]
pub struct SendQueue {
    entries: Vec<(u64, Vec<i32>)>,
}

impl SendQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every queued entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The queued `(cid, destination ranks)` pairs, in the order analyze
    /// produced them.
    pub fn entries(&self) -> &[(u64, Vec<i32>)] {
        &self.entries
    }

    /// True iff nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_once(&mut self, cid: u64, virtual_owners: Vec<i32>) {
        if !self.entries.iter().any(|(existing, _)| *existing == cid) {
            self.entries.push((cid, virtual_owners));
        }
    }
}

/// Classifies local tiles as interior or boundary and populates their
/// communication descriptors.
pub struct BoundaryAnalyzer;

impl BoundaryAnalyzer {
    /// Classify every local tile in `registry` against `grid` and append
    /// boundary tiles to `send_queue`.
    ///
    /// Because `foreign` is derived entirely from `grid` (globally
    /// consistent after bootstrap) and [`tessera_index::IndexSpace::full_neighborhood`]
    /// has a fixed, stable order, every worker computes the identical
    /// `top_virtual_owner` and `virtual_owners` for a given tile without any
    /// coordination — this is the substitute for a consensus protocol.
    pub fn analyze<const D: usize, P>(
        grid: &OwnershipGrid<D>,
        registry: &mut TileRegistry<D, P>,
        self_rank: i32,
        send_queue: &mut SendQueue,
    ) -> Result<()> {
        let mut boundary_count = 0usize;
        for cid in registry.local_ids(false) {
            let idx = registry.get(cid)?.index();
            let mut foreign = Self::foreign_neighbor_owners(grid, registry, idx, self_rank)?;

            let tile = registry.get_mut(cid)?;
            let comm = tile.communication_mut();

            if foreign.is_empty() {
                comm.mark_interior();
                continue;
            }

            foreign.sort_unstable();
            comm.number_of_virtual_neighbors = foreign.len() as u64;
            comm.top_virtual_owner = plurality(&foreign, self_rank);

            foreign.dedup();
            comm.communications = foreign.len() as u64;
            comm.virtual_owners = foreign.clone();
            boundary_count += 1;

            send_queue.push_once(cid, foreign);
        }
        debug!(
            self_rank,
            boundary_count,
            queued = send_queue.entries().len(),
            "boundary analysis complete"
        );
        Ok(())
    }

    /// The (non-deduplicated) owning rank of every neighbor of `idx` that is
    /// not local to this worker, excluding `self_rank` itself.
    ///
    /// The exclusion is defensive: under a globally-consistent ownership
    /// grid a non-local neighbor can never be owned by `self_rank`, but
    /// guarding against it here is what keeps §8 property 4
    /// (`virtual_owners` excludes `self_rank`) true even if `grid` and the
    /// registry are momentarily out of step.
    pub fn foreign_neighbor_owners<const D: usize, P>(
        grid: &OwnershipGrid<D>,
        registry: &TileRegistry<D, P>,
        idx: [u64; D],
        self_rank: i32,
    ) -> Result<Vec<i32>> {
        let mut foreign = Vec::new();
        for neighbor in grid.space().full_neighborhood(idx) {
            let neighbor_id = grid.space().id(neighbor)?;
            if !registry.is_local(neighbor_id) {
                let owner = grid.get(neighbor)?;
                if owner != self_rank {
                    foreign.push(owner);
                }
            }
        }
        Ok(foreign)
    }

    /// The list of foreign ranks bordering a single tile, independent of a
    /// full analyze pass. Useful for diagnostics and for `analyze` itself.
    pub fn virtual_neighborhood<const D: usize, P>(
        grid: &OwnershipGrid<D>,
        registry: &TileRegistry<D, P>,
        cid: u64,
        self_rank: i32,
    ) -> Result<Vec<i32>> {
        let idx = registry.get(cid)?.index();
        Self::foreign_neighbor_owners(grid, registry, idx, self_rank)
    }
}

/// The rank with the highest multiplicity in `sorted`, smallest rank on
/// ties. `sorted` must already be sorted ascending.
fn plurality(sorted: &[i32], self_rank: i32) -> i32 {
    let Some(&first) = sorted.first() else {
        return self_rank;
    };
    let mut best = first;
    let mut best_count = 0usize;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let count = j - i;
        if count > best_count {
            best_count = count;
            best = sorted[i];
        }
        i = j;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::CommDescriptor;

    /// 1D, 4 cells, 2 workers: cells 0,1 owned by worker 0, 2,3 by worker 1.
    fn scenario_a_grid() -> OwnershipGrid<1> {
        let mut grid = OwnershipGrid::<1>::new([4]).unwrap();
        grid.set([0], 0).unwrap();
        grid.set([1], 0).unwrap();
        grid.set([2], 1).unwrap();
        grid.set([3], 1).unwrap();
        grid
    }

    #[test]
    fn scenario_a_worker0_boundary_tiles() {
        let grid = scenario_a_grid();
        let mut registry: TileRegistry<1, ()> = TileRegistry::new();
        let mut scratch = OwnershipGrid::<1>::new([4]).unwrap();
        registry.add_tile(&mut scratch, [0], 0, ()).unwrap();
        registry.add_tile(&mut scratch, [1], 0, ()).unwrap();

        let mut queue = SendQueue::new();
        BoundaryAnalyzer::analyze(&grid, &mut registry, 0, &mut queue).unwrap();

        let tile0 = registry.get(0).unwrap().communication();
        assert_eq!(tile0.number_of_virtual_neighbors, 1);
        assert_eq!(tile0.virtual_owners, vec![1]);
        assert_eq!(tile0.top_virtual_owner, 1);

        let tile1 = registry.get(1).unwrap().communication();
        assert_eq!(tile1.number_of_virtual_neighbors, 1);
        assert_eq!(tile1.virtual_owners, vec![1]);
        assert_eq!(tile1.top_virtual_owner, 1);

        assert_eq!(queue.entries().len(), 2);
    }

    /// 2D, 4x4, 4 workers in 2x2 blocks: every corner tile sees 3 foreign
    /// neighbors from 3 distinct remote workers.
    #[test]
    fn scenario_b_corner_tile_has_three_distinct_foreign_owners() {
        let mut grid = OwnershipGrid::<2>::new([4, 4]).unwrap();
        for i in 0..4u64 {
            for j in 0..4u64 {
                let owner = (i / 2) + 2 * (j / 2);
                grid.set([i, j], owner as i32).unwrap();
            }
        }

        let mut registry: TileRegistry<2, ()> = TileRegistry::new();
        let mut scratch = OwnershipGrid::<2>::new([4, 4]).unwrap();
        // Worker 0 owns the 2x2 block at (0,0)-(1,1); (1,1) is its corner tile.
        for i in 0..2u64 {
            for j in 0..2u64 {
                registry.add_tile(&mut scratch, [i, j], 0, ()).unwrap();
            }
        }

        let mut queue = SendQueue::new();
        BoundaryAnalyzer::analyze(&grid, &mut registry, 0, &mut queue).unwrap();

        let corner_cid = grid.space().id([1, 1]).unwrap();
        let corner = registry.get(corner_cid).unwrap().communication();
        assert_eq!(corner.communications, 3);
        assert_eq!(corner.virtual_owners, vec![1, 2, 3]);
        assert_eq!(corner.top_virtual_owner, 1);
    }

    /// Periodic wrap, 2D 2x2, 1 worker: every neighbor is local.
    #[test]
    fn scenario_c_single_worker_has_no_boundary_tiles() {
        let mut grid = OwnershipGrid::<2>::new([2, 2]).unwrap();
        let mut registry: TileRegistry<2, ()> = TileRegistry::new();
        for i in 0..2u64 {
            for j in 0..2u64 {
                registry.add_tile(&mut grid, [i, j], 0, ()).unwrap();
            }
        }

        let mut queue = SendQueue::new();
        BoundaryAnalyzer::analyze(&grid, &mut registry, 0, &mut queue).unwrap();

        assert!(queue.is_empty());
        for cid in registry.local_ids(false) {
            assert_eq!(registry.get(cid).unwrap().communication().number_of_virtual_neighbors, 0);
        }
    }

    /// Re-running analyze without intervening mutation reproduces the same
    /// send-queue contents.
    #[test]
    fn analyze_is_idempotent() {
        let grid = scenario_a_grid();
        let mut registry: TileRegistry<1, ()> = TileRegistry::new();
        let mut scratch = OwnershipGrid::<1>::new([4]).unwrap();
        registry.add_tile(&mut scratch, [0], 0, ()).unwrap();
        registry.add_tile(&mut scratch, [1], 0, ()).unwrap();

        let mut queue = SendQueue::new();
        BoundaryAnalyzer::analyze(&grid, &mut registry, 0, &mut queue).unwrap();
        let first = queue.entries().to_vec();

        queue.clear();
        BoundaryAnalyzer::analyze(&grid, &mut registry, 0, &mut queue).unwrap();
        let second = queue.entries().to_vec();

        assert_eq!(first, second);
    }

    /// Changing one tile's owner to a foreign rank and re-analyzing grows
    /// its neighbors' virtual-owner sets, appending each cid once.
    ///
    /// `foreign_neighbor_owners` gates on `registry.is_local`, not on the
    /// grid's owner value alone, so the tile that changes hands must stop
    /// being a local registration and become a virtual mirror — mutating
    /// the grid in isolation would leave it registry-local and therefore
    /// still invisible to its neighbors' foreign-owner count.
    #[test]
    fn scenario_f_topology_change_updates_neighbors() {
        let mut grid = OwnershipGrid::<2>::new([2, 2]).unwrap();
        let mut registry: TileRegistry<2, ()> = TileRegistry::new();
        for i in 0..2u64 {
            for j in 0..2u64 {
                registry.add_tile(&mut grid, [i, j], 0, ()).unwrap();
            }
        }

        let mut queue = SendQueue::new();
        BoundaryAnalyzer::analyze(&grid, &mut registry, 0, &mut queue).unwrap();
        assert!(queue.is_empty());

        let cid_11 = grid.space().id([1, 1]).unwrap();
        let descriptor = CommDescriptor::new_local(cid_11, [1, 1], 7);
        registry
            .create_tile(&mut grid, descriptor, [2, 2], [0.0; 2], [1.0; 2], ())
            .unwrap();

        queue.clear();
        BoundaryAnalyzer::analyze(&grid, &mut registry, 0, &mut queue).unwrap();

        let cid_00 = grid.space().id([0, 0]).unwrap();
        let tile = registry.get(cid_00).unwrap().communication();
        assert!(tile.virtual_owners.contains(&7));
        assert_eq!(queue.entries().iter().filter(|(cid, _)| *cid == cid_00).count(), 1);
    }
}
