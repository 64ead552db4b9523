//! Visibility: Bresenham traversal and line-of-sight over a [`SpatialGrid`].
//!
//! Queries are stateless and read only grid occupancy plus the roles each
//! occupant held when it was placed (or last reindexed).
//!
//! [`SpatialGrid`]: locus_kernel::SpatialGrid

pub mod bresenham;
pub mod levels;
pub mod los;

pub use bresenham::BresenhamLine;
pub use levels::VisibleLevels;
pub use los::{LineOfSight, Shade, VisionConfig};
