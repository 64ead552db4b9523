//! World kernel: entities, spatial grids, the entity registry and the
//! fixed-step tick loop.
//!
//! # Invariants
//! - A grid cell holds at most one entity; an entity occupies at most one cell.
//! - An entity appears in a grid's id and role indices iff it occupies a cell
//!   of that grid. Role indices reflect the roles held at placement time.
//! - Health stays within `[0, max_health]`; the death hook fires once.
//! - All mutation happens on the thread owning the [`World`]; other threads
//!   go through [`CommandSender`].

pub mod clock;
pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod factory;
pub mod grid;
pub mod registry;
pub mod system;
pub mod world;

pub use clock::{FixedStep, FrameTimer};
pub use command::{CommandQueue, CommandSender, WorldCommand};
pub use config::{MapConfig, WorldConfig};
pub use entity::{AsAny, Behavior, Capability, Entity, EntitySnapshot, Location, Role};
pub use error::KernelError;
pub use factory::Factory;
pub use grid::{CellRef, GridSnapshot, GridStats, SpatialGrid};
pub use registry::Registry;
pub use system::{MapSet, System};
pub use world::{RunSummary, World, WorldEvent};
