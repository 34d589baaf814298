//! Reserved MPI message tags.

/// Carries the forthcoming-descriptor count for a tile-metadata round.
pub const NTILES: i32 = 1;

/// Carries a single communication descriptor plus its physical metadata.
pub const TILEDATA: i32 = 2;

/// The smallest tag a payload hook may use. `NTILES`/`TILEDATA` are reserved
/// for the tile-metadata exchange and must not be reused by user payloads.
pub const FIRST_USER_TAG: i32 = 3;

/// True iff `tag` is one of the tags this protocol reserves for itself.
pub fn is_reserved(tag: i32) -> bool {
    tag == NTILES || tag == TILEDATA
}
