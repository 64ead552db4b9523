use anyhow::Context;
use locus_atmos::{Atmosphere, AtmosphereSystem, GasMixture, GasType};
use locus_common::{EntityId, Identity, Position};
use locus_kernel::{Behavior, Capability, Entity, Factory, Role, World};
use tracing::{debug, info};

use crate::config::SimulationConfig;

/// Counts down and logs when it expires. Lets the demo show entity ticks.
#[derive(Debug, Default)]
pub struct Fuse {
    pub remaining: f64,
}

impl Behavior for Fuse {
    fn on_tick(&mut self, entity: &mut Entity, dt: f64) {
        if self.remaining <= 0.0 {
            return;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            info!(entity = %entity.id(), "fuse burnt out");
            entity.set_attribute("spent", true);
        }
    }
}

/// Factory with the kinds the demo station uses.
pub fn factory() -> Factory {
    let mut factory = Factory::with_builtin();
    factory.register("wall", |identity: Identity| {
        Entity::new(identity, "wall")
            .with_role(Role::Wall)
            .with_role(Role::Opaque)
            .with_role(Role::Solid)
    });
    factory.register("window", |identity: Identity| {
        Entity::new(identity, "window")
            .with_role(Role::Structure)
            .with_role(Role::Transparent)
            .with_role(Role::Solid)
    });
    factory.register("crate", |identity: Identity| {
        Entity::new(identity, "crate")
            .with_role(Role::Item)
            .with_capability(Capability::Movable)
            .with_capability(Capability::Flammable)
    });
    factory.register("person", |identity: Identity| {
        Entity::new(identity, "person")
            .with_role(Role::Mob)
            .with_capability(Capability::Movable)
            .with_capability(Capability::Damageable)
            .with_health(100, 100)
    });
    factory.register("flare", |identity: Identity| {
        Entity::new(identity, "flare")
            .with_role(Role::Item)
            .with_behavior(Fuse { remaining: 0.5 })
    });
    factory
}

/// Handles to the interesting pieces of the demo station.
#[derive(Debug, Clone, Copy)]
pub struct Station {
    pub person: EntityId,
    pub fire: Position,
}

/// Build the demo world: an outer wall with a window, a partition wall with
/// a doorway, a person, a crate, a flare and a plasma leak that is already
/// burning. Atmosphere runs on the active map.
pub fn build(config: &SimulationConfig) -> anyhow::Result<(World, Station)> {
    let mut world = World::from_config(&config.world)?;
    *world.factory_mut() = factory();
    let map = world
        .active_map_name()
        .map(str::to_owned)
        .context("configuration defines no maps")?;
    let (width, height) = world
        .active_map()
        .map(|g| (g.width(), g.height()))
        .context("active map missing")?;
    anyhow::ensure!(width >= 8 && height >= 6, "demo station needs at least an 8x6 map");

    let mut walls = Vec::new();
    for x in 0..width {
        walls.push(Position::new(x, 0, 0));
        walls.push(Position::new(x, height - 1, 0));
    }
    for y in 1..height - 1 {
        walls.push(Position::new(0, y, 0));
        walls.push(Position::new(width - 1, y, 0));
    }
    let partition = width / 2;
    for y in 1..height - 2 {
        walls.push(Position::new(partition, y, 0));
    }
    let window = Position::new(partition / 2, 0, 0);
    for pos in walls {
        let kind = if pos == window { "window" } else { "wall" };
        spawn_at(&mut world, &map, kind, pos)?;
    }

    let person = spawn_at(&mut world, &map, "person", Position::new(2, 2, 0))?;
    spawn_at(&mut world, &map, "crate", Position::new(partition - 2, height - 3, 0))?;
    world.spawn("flare")?;

    let fire = Position::new(width - 3, height - 3, 0);
    let mut atmos = Atmosphere::new(config.atmos.clone());
    if let Some(grid) = world.map(&map) {
        atmos.fill(grid, &GasMixture::standard_air());
    }
    atmos.tile(fire).air_mut().add(GasType::Plasma, 20.0);
    atmos.ignite(fire);
    atmos.start();
    world.add_system(AtmosphereSystem::new(map.clone(), atmos));

    world.set_data("scenario", "demo-station");
    info!(%map, width, height, entities = world.entity_count(), "demo station built");
    Ok((world, Station { person, fire }))
}

fn spawn_at(world: &mut World, map: &str, kind: &str, pos: Position) -> anyhow::Result<EntityId> {
    let id = world.spawn(kind)?;
    let placed = world.place(map, pos, id)?;
    anyhow::ensure!(placed, "{kind} could not be placed at {pos}");
    debug!(%id, kind, %pos, "demo entity placed");
    Ok(id)
}
