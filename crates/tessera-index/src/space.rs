//! The `D`-dimensional coordinate space: column-major tile ids, periodic
//! wrap, and relative-neighbor enumeration.

use itertools::Itertools;
use tessera_traits::{Error, Result};

/// A `D`-dimensional coordinate space with fixed, positive side lengths.
///
/// Tile ids are column-major: `id(i) = sum_k coeffs[k] * i[k]` where
/// `coeffs[k] = product(lengths[0..k])`. This is fixed and observable — ids
/// travel in messages, so every worker must compute the same id for the same
/// index without any coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpace<const D: usize> {
    lengths: [u64; D],
    coeffs: [u64; D],
}

impl<const D: usize> IndexSpace<D> {
    /// Construct a space with the given per-dimension lengths.
    ///
    /// Fails with [`Error::InvariantViolation`] if any length is zero —
    /// dimensionality mismatches or degenerate grids are a caller bug, not a
    /// recoverable runtime condition.
    pub fn new(lengths: [u64; D]) -> Result<Self> {
        if lengths.iter().any(|&l| l == 0) {
            return Err(Error::InvariantViolation(format!(
                "IndexSpace lengths must all be positive, got {lengths:?}"
            )));
        }

        let mut coeffs = [1u64; D];
        for k in 1..D {
            coeffs[k] = coeffs[k - 1] * lengths[k - 1];
        }

        Ok(Self { lengths, coeffs })
    }

    /// Number of dimensions.
    pub const fn dims() -> usize {
        D
    }

    /// Per-dimension lengths.
    pub fn lengths(&self) -> &[u64; D] {
        &self.lengths
    }

    /// Length of a single dimension.
    pub fn len(&self, dim: usize) -> u64 {
        self.lengths[dim]
    }

    /// Total number of valid indices, `product(lengths)`.
    pub fn size(&self) -> u64 {
        self.lengths.iter().product()
    }

    /// Validate and encode an index tuple into its linear tile id.
    pub fn id(&self, idx: [u64; D]) -> Result<u64> {
        self.validate(idx)?;
        Ok((0..D).map(|k| self.coeffs[k] * idx[k]).sum())
    }

    fn validate(&self, idx: [u64; D]) -> Result<()> {
        if (0..D).all(|k| idx[k] < self.lengths[k]) {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                index: idx.iter().map(|&v| v as i64).collect(),
                lengths: self.lengths.to_vec(),
            })
        }
    }

    /// Periodic wrap of a signed offset into `[0, len(dim))`.
    ///
    /// Equivalent to Euclidean modulo: defined for any signed input.
    pub fn wrap(&self, i: i64, dim: usize) -> u64 {
        let len = self.lengths[dim] as i64;
        (((i % len) + len) % len) as u64
    }

    /// Component-wise wrapped offset of `idx` by `offsets`.
    pub fn neighbors_of(&self, idx: [u64; D], offsets: [i64; D]) -> [u64; D] {
        let mut out = [0u64; D];
        for k in 0..D {
            out[k] = self.wrap(idx[k] as i64 + offsets[k], k);
        }
        out
    }

    /// All `3^D - 1` wrapped neighbor indices of `idx`, one per nonzero
    /// offset in `{-1,0,1}^D`.
    ///
    /// Order is lexicographic over offsets (dimension 0 varies slowest) and
    /// is stable across calls and across workers: tests and the boundary
    /// analyzer's convergent-agreement invariant both rely on it.
    pub fn full_neighborhood(&self, idx: [u64; D]) -> Vec<[u64; D]> {
        offset_tuples::<D>()
            .into_iter()
            .map(|offsets| self.neighbors_of(idx, offsets))
            .collect_vec()
    }
}

/// Every offset tuple in `{-1,0,1}^D` except the all-zero tuple, in
/// lexicographic order (dimension 0 varies slowest).
fn offset_tuples<const D: usize>() -> Vec<[i64; D]> {
    let mut result = Vec::with_capacity(3usize.pow(D as u32) - 1);
    let mut current = [0i64; D];
    fill_offsets(0, &mut current, &mut result);
    result
}

fn fill_offsets<const D: usize>(dim: usize, current: &mut [i64; D], result: &mut Vec<[i64; D]>) {
    if dim == D {
        if current.iter().any(|&v| v != 0) {
            result.push(*current);
        }
        return;
    }
    for v in -1..=1i64 {
        current[dim] = v;
        fill_offsets(dim + 1, current, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_matches_column_major_coefficients() {
        let space = IndexSpace::<2>::new([3, 4]).unwrap();
        assert_eq!(space.id([0, 0]).unwrap(), 0);
        assert_eq!(space.id([1, 0]).unwrap(), 1);
        assert_eq!(space.id([0, 1]).unwrap(), 3);
        assert_eq!(space.id([2, 3]).unwrap(), 11);
    }

    #[test]
    fn id_rejects_out_of_range_index() {
        let space = IndexSpace::<2>::new([3, 4]).unwrap();
        assert!(matches!(
            space.id([3, 0]),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn wrap_handles_negative_and_overflowing_input() {
        let space = IndexSpace::<1>::new([4]).unwrap();
        assert_eq!(space.wrap(-1, 0), 3);
        assert_eq!(space.wrap(4, 0), 0);
        assert_eq!(space.wrap(0, 0), 0);
        assert_eq!(space.wrap(-5, 0), 3);
    }

    #[test]
    fn full_neighborhood_1d_has_two_entries() {
        let space = IndexSpace::<1>::new([4]).unwrap();
        let nbrs = space.full_neighborhood([0]);
        assert_eq!(nbrs, vec![[3], [1]]);
    }

    #[test]
    fn full_neighborhood_2d_has_eight_entries_in_lexicographic_order() {
        let space = IndexSpace::<2>::new([4, 4]).unwrap();
        let nbrs = space.full_neighborhood([1, 1]);
        assert_eq!(nbrs.len(), 8);
        assert_eq!(
            nbrs,
            vec![
                [0, 0],
                [0, 1],
                [0, 2],
                [1, 0],
                [1, 2],
                [2, 0],
                [2, 1],
                [2, 2],
            ]
        );
    }

    #[test]
    fn zero_length_dimension_is_an_invariant_violation() {
        assert!(matches!(
            IndexSpace::<2>::new([0, 4]),
            Err(Error::InvariantViolation(_))
        ));
    }
}
