use locus_common::EntityId;

/// Errors surfaced by kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("invalid grid dimensions {width}x{height}x{depth}: each extent must be positive and the cell count addressable")]
    InvalidDimensions { width: i32, height: i32, depth: i32 },

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("unknown map: {0}")]
    UnknownMap(String),

    #[error("map already exists: {0}")]
    DuplicateMap(String),

    #[error("identity {0} is already registered")]
    DuplicateIdentity(EntityId),

    #[error("snapshot grid does not match its declared dimensions for map {0}")]
    MalformedGrid(String),
}
