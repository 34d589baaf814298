//! The replicated ownership grid: a dense map from every valid index to the
//! worker rank that owns it.

use tessera_traits::{Error, Result};

use crate::space::IndexSpace;

/// Sentinel rank for an index that has not yet been assigned an owner.
pub const UNASSIGNED: i32 = -1;

/// A dense `D`-dimensional array of worker ranks.
///
/// After the bootstrap broadcast this is byte-identical on every worker;
/// from then on it is mutated only by `TileRegistry::add_tile`,
/// `create_tile`, `update_tile`, and by [`OwnershipGrid::deserialize`] itself
/// — never read-modify-written from more than one logical flow, so no
/// locking is needed under the single-threaded worker model.
#[derive(Debug, Clone)]
pub struct OwnershipGrid<const D: usize> {
    space: IndexSpace<D>,
    ranks: Vec<i32>,
}

impl<const D: usize> OwnershipGrid<D> {
    /// Construct a grid with every index `UNASSIGNED`.
    pub fn new(lengths: [u64; D]) -> Result<Self> {
        let space = IndexSpace::new(lengths)?;
        let ranks = vec![UNASSIGNED; space.size() as usize];
        Ok(Self { space, ranks })
    }

    /// The underlying index space.
    pub fn space(&self) -> &IndexSpace<D> {
        &self.space
    }

    /// Per-dimension lengths.
    pub fn lengths(&self) -> &[u64; D] {
        self.space.lengths()
    }

    /// Owning rank of `idx`, or [`UNASSIGNED`] if none has been set yet.
    pub fn get(&self, idx: [u64; D]) -> Result<i32> {
        let id = self.space.id(idx)?;
        Ok(self.ranks[id as usize])
    }

    /// Owning rank of the tile with the given `cid`, skipping a fresh
    /// `id()` validation round-trip when the id is already known to be
    /// in-range (as it always is once it was produced by `IndexSpace::id`).
    pub fn get_by_id(&self, cid: u64) -> i32 {
        self.ranks[cid as usize]
    }

    /// Record `rank` as the owner of `idx`.
    pub fn set(&mut self, idx: [u64; D], rank: i32) -> Result<()> {
        let id = self.space.id(idx)?;
        self.ranks[id as usize] = rank;
        Ok(())
    }

    /// Flatten the grid into a serializable sequence.
    ///
    /// The order is ascending tile id (the same column-major order
    /// `IndexSpace::id` uses for addressing); the wire format only requires
    /// that `serialize`/`deserialize` are inverses on every worker, so this
    /// is simply the cheapest choice given the grid is already stored that
    /// way.
    pub fn serialize(&self) -> Vec<i32> {
        self.ranks.clone()
    }

    /// Restore a grid previously produced by [`OwnershipGrid::serialize`].
    pub fn deserialize(&mut self, flat: &[i32]) -> Result<()> {
        if flat.len() != self.ranks.len() {
            return Err(Error::InvariantViolation(format!(
                "expected {} serialized ranks, got {}",
                self.ranks.len(),
                flat.len()
            )));
        }
        self.ranks.copy_from_slice(flat);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_grid_is_unassigned_everywhere() {
        let grid = OwnershipGrid::<2>::new([2, 2]).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(grid.get([i, j]).unwrap(), UNASSIGNED);
            }
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut grid = OwnershipGrid::<2>::new([2, 2]).unwrap();
        grid.set([1, 0], 3).unwrap();
        assert_eq!(grid.get([1, 0]).unwrap(), 3);
        assert_eq!(grid.get([0, 0]).unwrap(), UNASSIGNED);
    }

    #[test]
    fn serialize_deserialize_round_trip() {
        let mut grid = OwnershipGrid::<2>::new([3, 3]).unwrap();
        grid.set([0, 0], 0).unwrap();
        grid.set([2, 2], 5).unwrap();
        grid.set([1, 2], 2).unwrap();

        let flat = grid.serialize();
        let mut other = OwnershipGrid::<2>::new([3, 3]).unwrap();
        other.deserialize(&flat).unwrap();

        assert_eq!(other.serialize(), flat);
        assert_eq!(other.get([2, 2]).unwrap(), 5);
    }

    #[test]
    fn deserialize_rejects_mismatched_length() {
        let mut grid = OwnershipGrid::<2>::new([2, 2]).unwrap();
        assert!(matches!(
            grid.deserialize(&[0, 1, 2]),
            Err(Error::InvariantViolation(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Serializing an arbitrary assignment of ranks and deserializing
        /// into a fresh grid reproduces the original exactly.
        #[test]
        fn serialize_deserialize_round_trips(
            ranks in proptest::collection::vec(-1i32..8, 16),
        ) {
            let mut grid = OwnershipGrid::<2>::new([4, 4]).unwrap();
            for (id, &rank) in ranks.iter().enumerate() {
                let i = (id as u64) % 4;
                let j = (id as u64) / 4;
                grid.set([i, j], rank).unwrap();
            }

            let flat = grid.serialize();
            let mut restored = OwnershipGrid::<2>::new([4, 4]).unwrap();
            restored.deserialize(&flat).unwrap();

            prop_assert_eq!(restored.serialize(), flat);
            for (id, &rank) in ranks.iter().enumerate() {
                let i = (id as u64) % 4;
                let j = (id as u64) / 4;
                prop_assert_eq!(restored.get([i, j]).unwrap(), rank);
            }
        }
    }
}
