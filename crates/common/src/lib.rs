//! Shared types for the locus world core: integer grid coordinates, the
//! six-way direction set, and entity identity allocation.
//!
//! # Invariants
//! - `Position` is an immutable value; equality is by coordinates.
//! - `EntityId(0)` is reserved as the invalid identity.
//! - Identity allocation is the only operation in the core that is safe to
//!   call from several threads at once.

mod direction;
mod identity;
mod position;

pub use direction::{Direction, ParseDirectionError};
pub use identity::{EntityId, Identity, IdentityAllocator};
pub use position::Position;
