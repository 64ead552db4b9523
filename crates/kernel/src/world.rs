use locus_common::{Direction, EntityId, IdentityAllocator, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::clock::FixedStep;
use crate::command::{CommandQueue, CommandSender, WorldCommand};
use crate::config::WorldConfig;
use crate::entity::{Capability, Entity, EntitySnapshot, Role};
use crate::error::KernelError;
use crate::factory::Factory;
use crate::grid::{GridSnapshot, SpatialGrid};
use crate::registry::Registry;
use crate::system::{MapSet, System};

/// A record produced by every structural mutation to the world.
///
/// Hosts drain the log to feed persistence or replication; nothing inside
/// the kernel reads it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    MapCreated {
        name: String,
    },
    MapDeleted {
        name: String,
    },
    Spawned {
        id: EntityId,
        kind: String,
    },
    Deleted {
        id: EntityId,
    },
    Placed {
        id: EntityId,
        map: String,
        pos: Position,
    },
    Removed {
        id: EntityId,
        map: String,
        pos: Position,
    },
    Moved {
        id: EntityId,
        map: String,
        from: Position,
        to: Position,
    },
    Ticked {
        tick: u64,
    },
}

/// Outcome of [`World::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub overruns: u64,
    pub average_tick: Duration,
    pub max_tick: Duration,
}

/// The authoritative world: named maps, the entity registry, registered
/// systems and the fixed-step tick loop.
///
/// All mutation happens on the thread that owns the `World`. Other threads
/// submit [`WorldCommand`]s through a [`CommandSender`]; a running world
/// applies them at the start of the next tick.
pub struct World {
    ids: Arc<IdentityAllocator>,
    factory: Factory,
    registry: Registry,
    maps: MapSet,
    active_map: Option<String>,
    systems: Vec<Box<dyn System>>,
    commands: CommandQueue,
    data: BTreeMap<String, Value>,
    events: Vec<WorldEvent>,
    running: bool,
    tick: u64,
    tick_rate: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::with_allocator(Arc::new(IdentityAllocator::new()))
    }
}

impl World {
    /// An empty, stopped world with no maps and the builtin factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty world issuing ids from a shared allocator.
    pub fn with_allocator(ids: Arc<IdentityAllocator>) -> Self {
        Self {
            ids,
            factory: Factory::with_builtin(),
            registry: Registry::new(),
            maps: MapSet::new(),
            active_map: None,
            systems: Vec::new(),
            commands: CommandQueue::new(),
            data: BTreeMap::new(),
            events: Vec::new(),
            running: false,
            tick: 0,
            tick_rate: WorldConfig::default().tick_rate,
        }
    }

    /// Build a world and create every configured map.
    pub fn from_config(config: &WorldConfig) -> Result<Self, KernelError> {
        let mut world = Self::new();
        world.tick_rate = config.tick_rate.max(1);
        for map in &config.maps {
            world.create_map(&map.name, map.width, map.height, map.depth)?;
        }
        Ok(world)
    }

    pub fn identities(&self) -> &Arc<IdentityAllocator> {
        &self.ids
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut Factory {
        &mut self.factory
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn set_tick_rate(&mut self, tick_rate: u32) {
        self.tick_rate = tick_rate.max(1);
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Set the tick counter directly (used for snapshot restore).
    pub fn set_tick_count(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            info!(tick = self.tick, "world started");
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!(tick = self.tick, "world stopped");
        }
    }

    // --- Maps ---

    /// Create an empty map. The first map created becomes the active map.
    pub fn create_map(
        &mut self,
        name: &str,
        width: i32,
        height: i32,
        depth: i32,
    ) -> Result<&mut SpatialGrid, KernelError> {
        let grid = SpatialGrid::new(name, width, height, depth)?;
        self.insert_map(grid)
    }

    /// Adopt an already built grid. Its occupants are not registered.
    pub fn insert_map(&mut self, grid: SpatialGrid) -> Result<&mut SpatialGrid, KernelError> {
        let name = grid.name().to_owned();
        if self.maps.contains_key(&name) {
            return Err(KernelError::DuplicateMap(name));
        }
        info!(map = %name, width = grid.width(), height = grid.height(), depth = grid.depth(), "map created");
        if self.active_map.is_none() {
            self.active_map = Some(name.clone());
        }
        self.events.push(WorldEvent::MapCreated { name: name.clone() });
        Ok(self.maps.entry(name).or_insert(grid))
    }

    pub fn map(&self, name: &str) -> Option<&SpatialGrid> {
        self.maps.get(name)
    }

    pub fn map_mut(&mut self, name: &str) -> Option<&mut SpatialGrid> {
        self.maps.get_mut(name)
    }

    pub fn maps(&self) -> &MapSet {
        &self.maps
    }

    /// Drop a map. Its occupants stay registered but lose their location.
    pub fn delete_map(&mut self, name: &str) -> Option<SpatialGrid> {
        let grid = self.maps.remove(name)?;
        for id in grid.entity_ids() {
            if let Some(entity) = self.registry.get_mut(id) {
                entity.clear_location();
            }
        }
        if self.active_map.as_deref() == Some(name) {
            self.active_map = self.maps.keys().next().cloned();
        }
        info!(map = %name, evicted = grid.len(), "map deleted");
        self.events.push(WorldEvent::MapDeleted {
            name: name.to_owned(),
        });
        Some(grid)
    }

    pub fn active_map(&self) -> Option<&SpatialGrid> {
        self.active_map.as_deref().and_then(|n| self.maps.get(n))
    }

    pub fn active_map_name(&self) -> Option<&str> {
        self.active_map.as_deref()
    }

    pub fn set_active_map(&mut self, name: &str) -> bool {
        if !self.maps.contains_key(name) {
            return false;
        }
        self.active_map = Some(name.to_owned());
        true
    }

    // --- Entities ---

    /// Construct an entity of `kind` through the factory and register it.
    pub fn spawn(&mut self, kind: &str) -> Result<EntityId, KernelError> {
        let entity = self.factory.create(kind, &self.ids)?;
        self.add_entity(entity)
    }

    /// Register an entity, issuing an identity if it has none.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<EntityId, KernelError> {
        if entity.id().is_valid() {
            self.ids.observe(entity.id());
        } else {
            entity.assign_identity(self.ids.allocate(entity.kind().to_owned()));
        }
        let kind = entity.kind().to_owned();
        let id = self.registry.insert(entity)?;
        debug!(entity = %id, %kind, "entity registered");
        self.events.push(WorldEvent::Spawned { id, kind });
        Ok(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.registry.get_mut(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.registry.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mark an entity deleted and drop it from the registry.
    ///
    /// Grid occupancy is left alone: a placed entity leaves a dangling id in
    /// its cell until the caller removes it.
    pub fn delete_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.registry.delete(id)?;
        if let Some(location) = entity.location() {
            warn!(entity = %id, map = %location.grid, pos = %location.pos, "deleted entity still occupies a cell");
        }
        debug!(entity = %id, "entity deleted");
        self.events.push(WorldEvent::Deleted { id });
        Some(entity)
    }

    /// Place a registered entity on a map.
    ///
    /// `Ok(false)` when the entity is unknown or already placed somewhere,
    /// or when the cell is out of bounds or occupied.
    pub fn place(&mut self, map: &str, pos: Position, id: EntityId) -> Result<bool, KernelError> {
        let grid = self
            .maps
            .get_mut(map)
            .ok_or_else(|| KernelError::UnknownMap(map.to_owned()))?;
        let Some(entity) = self.registry.get_mut(id) else {
            return Ok(false);
        };
        if entity.location().is_some() || !grid.place(pos, entity, &self.ids) {
            return Ok(false);
        }
        self.events.push(WorldEvent::Placed {
            id,
            map: map.to_owned(),
            pos,
        });
        Ok(true)
    }

    /// Empty a cell on a map, returning the evicted occupant.
    pub fn remove(&mut self, map: &str, pos: Position) -> Result<Option<EntityId>, KernelError> {
        let grid = self
            .maps
            .get_mut(map)
            .ok_or_else(|| KernelError::UnknownMap(map.to_owned()))?;
        let removed = grid.remove(pos, &mut self.registry);
        if let Some(id) = removed {
            self.events.push(WorldEvent::Removed {
                id,
                map: map.to_owned(),
                pos,
            });
        }
        Ok(removed)
    }

    /// Step a placed, movable entity one cell in `dir`. The destination must
    /// be in bounds and empty.
    pub fn move_entity(&mut self, id: EntityId, dir: Direction) -> bool {
        let Some(entity) = self.registry.get(id) else {
            return false;
        };
        if !entity.has_capability(Capability::Movable) {
            return false;
        }
        let Some(location) = entity.location().cloned() else {
            return false;
        };
        let Some(grid) = self.maps.get_mut(&location.grid) else {
            return false;
        };
        let to = location.pos.neighbor(dir);
        if !grid.move_entity(location.pos, to, &mut self.registry) {
            return false;
        }
        self.events.push(WorldEvent::Moved {
            id,
            map: location.grid,
            from: location.pos,
            to,
        });
        true
    }

    /// Tag an entity and refresh the role index of the grid it occupies.
    pub fn add_role(&mut self, id: EntityId, role: Role) -> bool {
        self.retag(id, |e| e.add_role(role))
    }

    pub fn remove_role(&mut self, id: EntityId, role: Role) -> bool {
        self.retag(id, |e| e.remove_role(role))
    }

    fn retag(&mut self, id: EntityId, f: impl FnOnce(&mut Entity) -> bool) -> bool {
        let Some(entity) = self.registry.get_mut(id) else {
            return false;
        };
        if !f(entity) {
            return false;
        }
        if let Some(grid) = entity
            .location()
            .and_then(|l| self.maps.get_mut(&l.grid))
        {
            grid.reindex(entity);
        }
        true
    }

    // --- Systems ---

    pub fn add_system(&mut self, system: impl System + 'static) {
        info!(system = system.name(), "system registered");
        self.systems.push(Box::new(system));
    }

    /// First registered system of type `T`.
    pub fn system<T: System + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| (**s).as_any().downcast_ref::<T>())
    }

    pub fn system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| (**s).as_any_mut().downcast_mut::<T>())
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    // --- Data bag ---

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn data_bag(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    // --- Events ---

    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Commands ---

    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    /// Apply every queued command now. Returns how many were applied.
    pub fn apply_commands(&mut self) -> usize {
        let commands = self.commands.drain();
        let count = commands.len();
        for command in commands {
            self.apply(command);
        }
        count
    }

    fn apply(&mut self, command: WorldCommand) {
        match command {
            WorldCommand::Spawn { entity, placement } => match self.add_entity(entity) {
                Ok(id) => {
                    if let Some((map, pos)) = placement {
                        self.apply_place(&map, pos, id);
                    }
                }
                Err(err) => warn!(%err, "spawn command rejected"),
            },
            WorldCommand::Place { map, pos, id } => self.apply_place(&map, pos, id),
            WorldCommand::Remove { map, pos } => {
                if let Err(err) = self.remove(&map, pos) {
                    warn!(%err, "remove command rejected");
                }
            }
            WorldCommand::Move { id, dir } => {
                if !self.move_entity(id, dir) {
                    debug!(entity = %id, %dir, "move command had no effect");
                }
            }
            WorldCommand::Delete { id } => {
                self.delete_entity(id);
            }
            WorldCommand::SetHealth { id, health, max } => {
                if let Some(entity) = self.registry.get_mut(id) {
                    entity.set_health(health, max);
                }
            }
            WorldCommand::ModifyHealth { id, delta } => {
                if let Some(entity) = self.registry.get_mut(id) {
                    entity.modify_health(delta);
                }
            }
            WorldCommand::AddRole { id, role } => {
                self.add_role(id, role);
            }
            WorldCommand::RemoveRole { id, role } => {
                self.remove_role(id, role);
            }
            WorldCommand::Start => self.start(),
            WorldCommand::Stop => self.stop(),
        }
    }

    fn apply_place(&mut self, map: &str, pos: Position, id: EntityId) {
        match self.place(map, pos, id) {
            Ok(true) => {}
            Ok(false) => debug!(entity = %id, %map, %pos, "place command had no effect"),
            Err(err) => warn!(%err, "place command rejected"),
        }
    }

    // --- Tick loop ---

    /// Advance one tick. No-op while stopped.
    ///
    /// Order: queued commands, tick counter, systems in registration order,
    /// then entities in identity order. A queued stop ends the tick before
    /// the counter moves.
    pub fn tick(&mut self, dt: f64) {
        if !self.running {
            return;
        }
        let _span = tracing::info_span!("world_tick", tick = self.tick + 1).entered();
        let applied = self.apply_commands();
        if !self.running {
            debug!(tick = self.tick, applied, "stopped by queued command");
            return;
        }
        self.tick += 1;

        for system in &mut self.systems {
            system.tick(&self.maps, dt);
        }
        for entity in self.registry.iter_mut() {
            entity.tick(dt);
        }

        self.events.push(WorldEvent::Ticked { tick: self.tick });
        trace!(
            tick = self.tick,
            applied,
            entities = self.registry.len(),
            "tick complete"
        );
    }

    /// Run the fixed-step loop until stopped or `max_ticks` ticks have run.
    ///
    /// Each tick is given `1 / tick_rate` seconds of simulated time and the
    /// same amount of wall-clock time. Overruns are counted, not caught up.
    pub fn run(&mut self, max_ticks: Option<u64>) -> RunSummary {
        let mut step = FixedStep::new(self.tick_rate);
        let dt = step.dt();
        let first = self.tick;
        self.start();
        info!(tick_rate = self.tick_rate, ?max_ticks, "run loop started");

        while self.running {
            if max_ticks.is_some_and(|max| self.tick - first >= max) {
                break;
            }
            let started = Instant::now();
            self.tick(dt);
            step.finish_tick(started);
        }
        self.stop();

        let summary = RunSummary {
            ticks: self.tick - first,
            overruns: step.overruns(),
            average_tick: step.timer().average(),
            max_tick: step.timer().max(),
        };
        info!(
            ticks = summary.ticks,
            overruns = summary.overruns,
            average = ?summary.average_tick,
            "run loop finished"
        );
        summary
    }

    // --- Snapshots ---

    pub fn map_snapshot(&self, name: &str) -> Option<GridSnapshot> {
        self.maps.get(name).map(|g| g.snapshot(&self.registry))
    }

    /// Snapshots of every registered entity, placed or not, in identity order.
    pub fn entity_snapshots(&self) -> Vec<EntitySnapshot> {
        self.registry.iter().map(Entity::snapshot).collect()
    }

    /// Rebuild and register an entity through the factory.
    pub fn restore_entity(&mut self, snapshot: &EntitySnapshot) -> Result<EntityId, KernelError> {
        let entity = self.factory.restore(snapshot, &self.ids)?;
        self.add_entity(entity)
    }

    /// Recreate a map from its snapshot. Entities listed in the snapshot
    /// that are not yet registered are restored first; cells whose identity
    /// is still unknown afterwards stay empty. On error nothing is
    /// registered.
    pub fn restore_map(&mut self, snapshot: &GridSnapshot) -> Result<(), KernelError> {
        if self.maps.contains_key(&snapshot.name) {
            return Err(KernelError::DuplicateMap(snapshot.name.clone()));
        }
        let shape_ok = snapshot.grid.len() == snapshot.depth as usize
            && snapshot.grid.iter().all(|plane| {
                plane.len() == snapshot.height as usize
                    && plane.iter().all(|row| row.len() == snapshot.width as usize)
            });
        if !shape_ok {
            return Err(KernelError::MalformedGrid(snapshot.name.clone()));
        }

        let mut grid = SpatialGrid::new(
            snapshot.name.clone(),
            snapshot.width,
            snapshot.height,
            snapshot.depth,
        )?;
        grid.set_description(snapshot.description.clone());

        // Rebuild every missing entity before touching the registry so a
        // failure leaves the world as it was.
        let mut missing = BTreeMap::new();
        for entity in &snapshot.entities {
            if !self.registry.contains(entity.identity) && !missing.contains_key(&entity.identity) {
                missing.insert(entity.identity, self.factory.restore(entity, &self.ids)?);
            }
        }
        for entity in missing.into_values() {
            self.add_entity(entity)?;
        }

        for (pos, id) in snapshot.occupied_cells() {
            if !self.registry.contains(id) {
                warn!(map = %snapshot.name, entity = %id, %pos, "snapshot cell references unknown entity");
                continue;
            }
            grid.replace(pos, Some(id), &mut self.registry);
        }
        self.insert_map(grid)?;
        Ok(())
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("running", &self.running)
            .field("tick_rate", &self.tick_rate)
            .field("maps", &self.maps.keys().collect::<Vec<_>>())
            .field("active_map", &self.active_map)
            .field("entities", &self.registry.len())
            .field("systems", &self.system_names())
            .finish()
    }
}
