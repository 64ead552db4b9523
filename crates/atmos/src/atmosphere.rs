use locus_common::{Direction, Position};
use locus_kernel::{MapSet, SpatialGrid, System};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

use crate::config::AtmosConfig;
use crate::gas::GasMixture;
use crate::tile::{TileAtmos, TileAtmosSnapshot};

/// Slack when comparing accumulated time against the interval, so sums of
/// `1 / tick_rate` land on the boundary they add up to.
const INTERVAL_EPSILON: f64 = 1e-9;

/// Per-position atmospheric state over one grid's coordinate space.
///
/// Tiles are created lazily and are independent of grid occupancy. A tile
/// whose position falls outside the grid passed to [`Atmosphere::process`]
/// is skipped, never removed; call [`Atmosphere::prune`] to drop such tiles.
#[derive(Debug, Clone)]
pub struct Atmosphere {
    tiles: BTreeMap<Position, TileAtmos>,
    config: AtmosConfig,
    running: bool,
    pending: f64,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self::new(AtmosConfig::default())
    }
}

impl Atmosphere {
    pub fn new(config: AtmosConfig) -> Self {
        Self {
            tiles: BTreeMap::new(),
            config,
            running: false,
            pending: 0.0,
        }
    }

    pub fn config(&self) -> &AtmosConfig {
        &self.config
    }

    pub fn process_interval(&self) -> f64 {
        self.config.process_interval
    }

    pub fn set_process_interval(&mut self, interval: f64) {
        self.config.process_interval = interval.max(0.0);
    }

    pub fn start(&mut self) {
        self.running = true;
        info!(tiles = self.tiles.len(), "atmosphere started");
    }

    pub fn stop(&mut self) {
        self.running = false;
        info!("atmosphere stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn get(&self, pos: Position) -> Option<&TileAtmos> {
        self.tiles.get(&pos)
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut TileAtmos> {
        self.tiles.get_mut(&pos)
    }

    /// The tile at `pos`, created with default air if missing.
    pub fn tile(&mut self, pos: Position) -> &mut TileAtmos {
        self.tiles.entry(pos).or_default()
    }

    pub fn insert(&mut self, pos: Position, tile: TileAtmos) -> Option<TileAtmos> {
        self.tiles.insert(pos, tile)
    }

    pub fn remove(&mut self, pos: Position) -> Option<TileAtmos> {
        self.tiles.remove(&pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.tiles.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &TileAtmos)> {
        self.tiles.iter().map(|(p, t)| (*p, t))
    }

    /// Give every cell of `grid` its own copy of `air`, replacing what was there.
    pub fn fill(&mut self, grid: &SpatialGrid, air: &GasMixture) {
        for pos in grid.positions() {
            self.tiles.insert(pos, TileAtmos::new(air.clone()));
        }
        debug!(grid = grid.name(), tiles = self.tiles.len(), "atmosphere filled");
    }

    /// Drop tiles outside `grid`. Returns how many were removed.
    pub fn prune(&mut self, grid: &SpatialGrid) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|pos, _| grid.valid(*pos));
        let removed = before - self.tiles.len();
        if removed > 0 {
            debug!(grid = grid.name(), removed, "pruned stale atmosphere tiles");
        }
        removed
    }

    pub fn fire_positions(&self) -> Vec<Position> {
        self.iter().filter(|(_, t)| t.on_fire()).map(|(p, _)| p).collect()
    }

    pub fn smoky_positions(&self) -> Vec<Position> {
        self.iter().filter(|(_, t)| t.smoky()).map(|(p, _)| p).collect()
    }

    pub fn on_fire(&self, pos: Position) -> bool {
        self.tiles.get(&pos).is_some_and(TileAtmos::on_fire)
    }

    /// Ignite the tile at `pos`, creating it if needed.
    pub fn ignite(&mut self, pos: Position) -> bool {
        let fire = self.config.fire.clone();
        let lit = self.tile(pos).ignite_with(&fire);
        if lit {
            debug!(%pos, "tile ignited");
        }
        lit
    }

    /// Put out the fire at `pos`. False if no tile exists there.
    pub fn extinguish(&mut self, pos: Position) -> bool {
        match self.tiles.get_mut(&pos) {
            Some(tile) => {
                tile.extinguish();
                true
            }
            None => false,
        }
    }

    /// Accumulate `delta` and run a pass once at least `process_interval`
    /// simulated seconds have built up. The pass uses the accumulated time.
    /// Returns whether a pass ran.
    pub fn process(&mut self, grid: &SpatialGrid, delta: f64) -> bool {
        if !self.running {
            return false;
        }
        self.pending += delta.max(0.0);
        if self.pending + INTERVAL_EPSILON < self.config.process_interval {
            return false;
        }
        let step = std::mem::take(&mut self.pending);
        self.pass(grid, step);
        true
    }

    /// Tick every in-bounds tile once against its cardinal neighbors.
    pub fn pass(&mut self, grid: &SpatialGrid, delta: f64) {
        let positions: Vec<Position> = self.tiles.keys().copied().collect();
        let mut skipped = 0usize;

        for pos in positions {
            if !grid.valid(pos) {
                skipped += 1;
                continue;
            }
            let Some(mut current) = self.tiles.get_mut(&pos).map(std::mem::take) else {
                continue;
            };
            let mut taken: Vec<(Position, TileAtmos)> = Direction::CARDINAL
                .iter()
                .map(|d| pos.neighbor(*d))
                .filter(|p| grid.valid(*p))
                .filter_map(|p| self.tiles.get_mut(&p).map(|t| (p, std::mem::take(t))))
                .collect();

            {
                let mut neighbors: Vec<&mut TileAtmos> =
                    taken.iter_mut().map(|(_, t)| t).collect();
                current.tick_with(&self.config, delta, &mut neighbors);
            }

            for (p, tile) in taken {
                self.tiles.insert(p, tile);
            }
            self.tiles.insert(pos, current);
        }

        trace!(
            grid = grid.name(),
            tiles = self.tiles.len(),
            skipped,
            delta,
            "atmosphere pass"
        );
    }

    pub fn snapshot(&self) -> AtmosphereSnapshot {
        AtmosphereSnapshot {
            process_interval: self.config.process_interval,
            pending: self.pending,
            tiles: self
                .iter()
                .map(|(pos, tile)| TileEntry {
                    position: pos.to_array(),
                    atmos: tile.snapshot(),
                })
                .collect(),
        }
    }

    /// Rebuild from a snapshot. The result is stopped; other tuning comes
    /// from `config`.
    pub fn from_snapshot(snapshot: &AtmosphereSnapshot, config: AtmosConfig) -> Self {
        let mut atmos = Self::new(config);
        atmos.set_process_interval(snapshot.process_interval);
        atmos.pending = snapshot.pending.max(0.0);
        for entry in &snapshot.tiles {
            atmos
                .tiles
                .insert(Position::from(entry.position), TileAtmos::from_snapshot(&entry.atmos));
        }
        atmos
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereSnapshot {
    pub process_interval: f64,
    /// Simulated seconds accumulated towards the next pass.
    #[serde(default)]
    pub pending: f64,
    pub tiles: Vec<TileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntry {
    pub position: [i32; 3],
    pub atmos: TileAtmosSnapshot,
}

/// World system driving an [`Atmosphere`] over one named map.
#[derive(Debug)]
pub struct AtmosphereSystem {
    map: String,
    atmosphere: Atmosphere,
}

impl AtmosphereSystem {
    pub fn new(map: impl Into<String>, atmosphere: Atmosphere) -> Self {
        Self {
            map: map.into(),
            atmosphere,
        }
    }

    pub fn map(&self) -> &str {
        &self.map
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }

    pub fn atmosphere_mut(&mut self) -> &mut Atmosphere {
        &mut self.atmosphere
    }
}

impl System for AtmosphereSystem {
    fn name(&self) -> &str {
        "atmosphere"
    }

    fn tick(&mut self, maps: &MapSet, dt: f64) {
        match maps.get(&self.map) {
            Some(grid) => {
                self.atmosphere.process(grid, dt);
            }
            None => trace!(map = %self.map, "atmosphere map missing, pass skipped"),
        }
    }
}
