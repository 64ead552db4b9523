//! Developer tooling: read-only world inspection and ASCII map views.
//!
//! # Invariants
//! - Tools never mutate the world they inspect.

pub mod inspector;
pub mod view;

pub use inspector::{EntityInfo, MapSummary, WorldInspector, WorldSummary};
pub use view::{glyph_for, render_atmosphere, render_level, render_visibility};
