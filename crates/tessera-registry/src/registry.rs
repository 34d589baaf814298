//! The per-worker map from tile id to tile record.

use std::collections::HashMap;

use tessera_index::OwnershipGrid;
use tessera_traits::{Error, Result};
use tracing::trace;

use crate::tile::{CommDescriptor, TileRecord};

/// Owns every tile this worker knows about, local or virtual.
///
/// Keys are unique tile ids; insertion order is irrelevant (queries that
/// need a deterministic order sort explicitly).
#[derive(Debug, Default)]
pub struct TileRegistry<const D: usize, P> {
    tiles: HashMap<u64, TileRecord<D, P>>,
}

impl<const D: usize, P> TileRegistry<D, P> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            tiles: HashMap::new(),
        }
    }

    /// Register a tile this worker owns at `idx`.
    ///
    /// Overwrites any existing entry at the same id. Stamps the
    /// communication descriptor's `cid`, `owner := self_rank`,
    /// `local := true`, and records `lengths` on the record. As a side
    /// effect, marks `self_rank` as the owner of `idx` in `grid`.
    pub fn add_tile(
        &mut self,
        grid: &mut OwnershipGrid<D>,
        idx: [u64; D],
        self_rank: i32,
        payload: P,
    ) -> Result<u64> {
        let cid = grid.space().id(idx)?;
        let lengths = *grid.lengths();
        let record = TileRecord::new_local(cid, idx, self_rank, lengths, payload);
        self.tiles.insert(cid, record);
        grid.set(idx, self_rank)?;
        trace!(cid, ?idx, self_rank, "added local tile");
        Ok(cid)
    }

    /// Construct a virtual mirror tile from a descriptor received over the
    /// wire, inserting it at `descriptor.cid`. As a side effect, records
    /// `descriptor.owner` as the owner of `descriptor.indices` in `grid`.
    pub fn create_tile(
        &mut self,
        grid: &mut OwnershipGrid<D>,
        mut descriptor: CommDescriptor<D>,
        lengths: [u64; D],
        mins: [f64; D],
        maxs: [f64; D],
        payload: P,
    ) -> Result<()> {
        descriptor.local = false;
        let cid = descriptor.cid;
        let indices = descriptor.indices;
        let owner = descriptor.owner;
        let mut record = TileRecord::from_descriptor(descriptor, lengths, payload);
        record.set_bounds(mins, maxs);
        self.tiles.insert(cid, record);
        grid.set(indices, owner)?;
        trace!(cid, owner, "created virtual mirror tile");
        Ok(())
    }

    /// Overwrite the communication descriptor of the tile with id
    /// `descriptor.cid`, and record `descriptor.owner` as the owner of its
    /// index in `grid`.
    ///
    /// Fails with [`Error::UnknownTile`] if no such id is registered.
    pub fn update_tile(&mut self, grid: &mut OwnershipGrid<D>, descriptor: CommDescriptor<D>) -> Result<()> {
        let cid = descriptor.cid;
        let record = self
            .tiles
            .get_mut(&cid)
            .ok_or(Error::UnknownTile(cid))?;
        let indices = record.index();
        let owner = descriptor.owner;
        *record.communication_mut() = descriptor;
        grid.set(indices, owner)?;
        trace!(cid, owner, "updated tile descriptor");
        Ok(())
    }

    /// Fetch a tile by id, failing with [`Error::UnknownTile`] if absent.
    pub fn get(&self, cid: u64) -> Result<&TileRecord<D, P>> {
        self.tiles.get(&cid).ok_or(Error::UnknownTile(cid))
    }

    /// Fetch a tile by id, returning `None` rather than erroring if absent.
    pub fn get_or_null(&self, cid: u64) -> Option<&TileRecord<D, P>> {
        self.tiles.get(&cid)
    }

    /// Mutable access to a tile by id, failing with [`Error::UnknownTile`]
    /// if absent.
    pub fn get_mut(&mut self, cid: u64) -> Result<&mut TileRecord<D, P>> {
        self.tiles.get_mut(&cid).ok_or(Error::UnknownTile(cid))
    }

    /// True iff a tile with this id is registered and owned by this worker.
    pub fn is_local(&self, cid: u64) -> bool {
        self.tiles.get(&cid).map(|t| t.is_local()).unwrap_or(false)
    }

    /// Every registered tile id.
    pub fn all_ids(&self, sorted: bool) -> Vec<u64> {
        self.collect_ids(|_| true, sorted)
    }

    /// Ids of tiles owned by this worker.
    pub fn local_ids(&self, sorted: bool) -> Vec<u64> {
        self.collect_ids(|t| t.is_local(), sorted)
    }

    /// Ids of virtual (non-owned) tiles.
    pub fn virtual_ids(&self, sorted: bool) -> Vec<u64> {
        self.collect_ids(|t| !t.is_local(), sorted)
    }

    /// Ids of local tiles that have at least one foreign neighbor.
    pub fn boundary_ids(&self, self_rank: i32, sorted: bool) -> Vec<u64> {
        self.collect_ids(
            |t| t.is_local() && t.communication().owner == self_rank && t.communication().number_of_virtual_neighbors > 0,
            sorted,
        )
    }

    /// Number of registered tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True iff no tiles are registered.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn collect_ids(&self, pred: impl Fn(&TileRecord<D, P>) -> bool, sorted: bool) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .tiles
            .iter()
            .filter(|(_, t)| pred(t))
            .map(|(&cid, _)| cid)
            .collect();
        if sorted {
            ids.sort_unstable();
        }
        ids
    }

    /// Iterate over every registered tile, for `BoundaryAnalyzer`'s internal
    /// use.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&u64, &TileRecord<D, P>)> {
        self.tiles.iter()
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut HashMap<u64, TileRecord<D, P>> {
        &mut self.tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid2() -> OwnershipGrid<2> {
        OwnershipGrid::new([2, 2]).unwrap()
    }

    #[test]
    fn add_tile_stamps_descriptor_and_grid() {
        let mut grid = grid2();
        let mut reg: TileRegistry<2, ()> = TileRegistry::new();
        let cid = reg.add_tile(&mut grid, [1, 0], 3, ()).unwrap();
        assert_eq!(cid, 1);
        let tile = reg.get(cid).unwrap();
        assert!(tile.is_local());
        assert_eq!(tile.communication().owner, 3);
        assert_eq!(grid.get([1, 0]).unwrap(), 3);
    }

    #[test]
    fn get_missing_tile_errors() {
        let reg: TileRegistry<2, ()> = TileRegistry::new();
        assert!(matches!(reg.get(0), Err(Error::UnknownTile(0))));
        assert!(reg.get_or_null(0).is_none());
    }

    #[test]
    fn update_tile_requires_existing_entry() {
        let mut grid = grid2();
        let mut reg: TileRegistry<2, ()> = TileRegistry::new();
        let descriptor = CommDescriptor::new_local(0, [0, 0], 1);
        assert!(matches!(
            reg.update_tile(&mut grid, descriptor),
            Err(Error::UnknownTile(0))
        ));
    }

    #[test]
    fn local_and_virtual_ids_partition_registry() {
        let mut grid = grid2();
        let mut reg: TileRegistry<2, ()> = TileRegistry::new();
        reg.add_tile(&mut grid, [0, 0], 0, ()).unwrap();
        let descriptor = CommDescriptor::new_local(3, [1, 1], 1);
        reg.create_tile(&mut grid, descriptor, [2, 2], [0.0; 2], [1.0; 2], ())
            .unwrap();

        assert_eq!(reg.local_ids(true), vec![0]);
        assert_eq!(reg.virtual_ids(true), vec![3]);
        assert_eq!(reg.all_ids(true), vec![0, 3]);
    }
}
