use std::collections::BTreeMap;

use crate::entity::AsAny;
use crate::grid::SpatialGrid;

/// Named grids owned by a world.
pub type MapSet = BTreeMap<String, SpatialGrid>;

/// A world-level process ticked before entities on every tick.
///
/// Systems see the maps read-only; anything they mutate is their own state.
pub trait System: AsAny + Send {
    fn name(&self) -> &str;

    fn tick(&mut self, maps: &MapSet, dt: f64);
}
