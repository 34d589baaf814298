//! Per-tile metadata: the wire-portable communication descriptor and the
//! tile record that pairs it with physical bounds and a payload.

use tessera_traits::TilePayload;

/// The wire-portable metadata sub-record of a tile.
///
/// Field order here is significant: `tessera-exchange`'s codec writes and
/// reads these fields in exactly this order, so reordering them here without
/// updating the codec breaks the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommDescriptor<const D: usize> {
    /// Rank that owns this tile.
    pub owner: i32,
    /// Tile id, `IndexSpace::id(indices)`.
    pub cid: u64,
    /// D-dimensional index tuple this tile occupies.
    pub indices: [u64; D],
    /// True iff `owner == self_rank` on the holding worker.
    pub local: bool,
    /// The rank hosting the plurality of this tile's foreign neighbors
    /// (smallest rank on ties). Meaningless for interior tiles.
    pub top_virtual_owner: i32,
    /// Number of distinct remote ranks that must receive a copy,
    /// `virtual_owners.len()`.
    pub communications: u64,
    /// Count of neighbor indices whose owner differs from this tile's.
    pub number_of_virtual_neighbors: u64,
    /// Sorted, deduplicated list of distinct remote ranks that must
    /// receive a copy.
    pub virtual_owners: Vec<i32>,
    /// Open-ended set of integer tags for user classification.
    pub types: Vec<i32>,
}

impl<const D: usize> CommDescriptor<D> {
    /// A fresh descriptor for a tile newly added at `indices` by `self_rank`.
    pub fn new_local(cid: u64, indices: [u64; D], self_rank: i32) -> Self {
        Self {
            owner: self_rank,
            cid,
            indices,
            local: true,
            top_virtual_owner: self_rank,
            communications: 0,
            number_of_virtual_neighbors: 0,
            virtual_owners: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Reset the classification fields to "purely interior": no foreign
    /// neighbors, empty send targets.
    pub fn mark_interior(&mut self) {
        self.number_of_virtual_neighbors = 0;
        self.communications = 0;
        self.virtual_owners.clear();
        self.top_virtual_owner = self.owner;
    }

    /// Does this descriptor carry `tag` among its user classification tags?
    pub fn is_type(&self, tag: i32) -> bool {
        self.types.contains(&tag)
    }

    /// Do all of `tags` appear among this descriptor's classification tags?
    pub fn is_types(&self, tags: &[i32]) -> bool {
        tags.iter().all(|t| self.is_type(*t))
    }
}

/// A tile: a communication descriptor, physical bounds, and an opaque
/// payload.
///
/// The registry exclusively owns every `TileRecord`; external references are
/// short-lived views acquired via lookup and must not outlive a mutation
/// that erases the id.
#[derive(Debug, Clone)]
pub struct TileRecord<const D: usize, P> {
    communication: CommDescriptor<D>,
    lengths: [u64; D],
    mins: [f64; D],
    maxs: [f64; D],
    /// The opaque payload. `pub` because the core never inspects it; only
    /// the payload's own `TilePayload` hooks act on it.
    pub payload: P,
}

impl<const D: usize, P> TileRecord<D, P> {
    /// Construct a local tile record, defaulting bounds to the unit cube
    /// `[0, 1)^D`, matching the reference implementation's default bounds.
    pub fn new_local(cid: u64, indices: [u64; D], self_rank: i32, lengths: [u64; D], payload: P) -> Self {
        Self {
            communication: CommDescriptor::new_local(cid, indices, self_rank),
            lengths,
            mins: [0.0; D],
            maxs: [1.0; D],
            payload,
        }
    }

    /// Construct a virtual mirror from a received descriptor.
    pub fn from_descriptor(communication: CommDescriptor<D>, lengths: [u64; D], payload: P) -> Self {
        Self {
            communication,
            lengths,
            mins: [0.0; D],
            maxs: [1.0; D],
            payload,
        }
    }

    /// The tile's communication descriptor.
    pub fn communication(&self) -> &CommDescriptor<D> {
        &self.communication
    }

    /// Mutable access to the communication descriptor, used by
    /// `BoundaryAnalyzer` and `TileRegistry::update_tile`.
    pub fn communication_mut(&mut self) -> &mut CommDescriptor<D> {
        &mut self.communication
    }

    /// Tile id.
    pub fn cid(&self) -> u64 {
        self.communication.cid
    }

    /// D-dimensional index tuple.
    pub fn index(&self) -> [u64; D] {
        self.communication.indices
    }

    /// True iff this worker owns the tile.
    pub fn is_local(&self) -> bool {
        self.communication.local
    }

    /// The snapshot of grid lengths recorded when this tile was created.
    pub fn lengths(&self) -> &[u64; D] {
        &self.lengths
    }

    /// Lower bound of the tile's physical bounding box.
    pub fn mins(&self) -> &[f64; D] {
        &self.mins
    }

    /// Upper bound of the tile's physical bounding box.
    pub fn maxs(&self) -> &[f64; D] {
        &self.maxs
    }

    /// Lower physical bound along a single dimension.
    pub fn bound_min(&self, dim: usize) -> f64 {
        self.mins[dim]
    }

    /// Upper physical bound along a single dimension.
    pub fn bound_max(&self, dim: usize) -> f64 {
        self.maxs[dim]
    }

    /// Overwrite the tile's bounding box.
    pub fn set_bounds(&mut self, mins: [f64; D], maxs: [f64; D]) {
        self.mins = mins;
        self.maxs = maxs;
    }

    /// Does this tile carry `tag` among its user classification tags?
    pub fn is_type(&self, tag: i32) -> bool {
        self.communication.is_type(tag)
    }

    /// Do all of `tags` appear among this tile's classification tags?
    pub fn is_types(&self, tags: &[i32]) -> bool {
        self.communication.is_types(tags)
    }
}

impl<const D: usize, P: TilePayload> TileRecord<D, P> {
    /// Whether this tile has at least one foreign neighbor, making it a
    /// send-queue candidate.
    pub fn is_boundary(&self) -> bool {
        self.communication.number_of_virtual_neighbors > 0
    }
}
