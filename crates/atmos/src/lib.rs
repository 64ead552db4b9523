//! Atmospherics: gas mixtures per grid cell, diffusion between neighbors,
//! fire and temperature exchange.
//!
//! # Invariants
//! - Gas quantities are never negative; removal clamps to what is present.
//! - Pressure is derived (`n·R·T / V`) and recomputed after every mutation.
//! - Diffusion conserves total moles across the two mixtures involved.
//! - Passes are throttled by accumulated simulated time, never wall-clock time.

pub mod atmosphere;
pub mod config;
pub mod gas;
pub mod tile;

pub use atmosphere::{Atmosphere, AtmosphereSnapshot, AtmosphereSystem, TileEntry};
pub use config::{AtmosConfig, FireConfig};
pub use gas::{
    DEFAULT_TEMPERATURE, DEFAULT_VOLUME, GAS_CONSTANT, GasMixture, GasMixtureSnapshot, GasType,
    ONE_ATMOSPHERE, ParseGasError,
};
pub use tile::{TileAtmos, TileAtmosSnapshot};
