//! Error types shared by every `tessera` crate.

/// Errors raised by the spatial-decomposition core.
///
/// Every fallible public operation in this workspace returns [`Result`], so a
/// `Display`ed error should be self-explanatory without consulting the design
/// docs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An index tuple had a component outside `[0, length)` for its dimension.
    #[error("index {index:?} is out of range for lengths {lengths:?}")]
    OutOfRange {
        /// The offending index tuple.
        index: Vec<i64>,
        /// The grid lengths it was checked against.
        lengths: Vec<u64>,
    },

    /// A lookup or update referenced a `cid` absent from the registry.
    #[error("no tile registered with cid {0}")]
    UnknownTile(u64),

    /// A received descriptor contradicted locally-held state.
    #[error("inconsistent topology: {0}")]
    InconsistentTopology(String),

    /// A new exchange round was started while a prior batch on the same tag
    /// still had outstanding, un-waited request handles.
    #[error("cannot start a new exchange on tag {tag}: {outstanding} requests are still pending")]
    PendingRequests {
        /// The tag with outstanding requests.
        tag: i32,
        /// How many requests were still outstanding.
        outstanding: usize,
    },

    /// The underlying MPI transport reported a failure.
    #[error("transport error: {0}")]
    TransportError(String),

    /// A programmer error: malformed construction arguments, mismatched
    /// dimensionality, or another condition that indicates a bug in the
    /// caller rather than a recoverable runtime condition. Always fatal.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result alias used throughout the `tessera` workspace.
pub type Result<T> = std::result::Result<T, Error>;
