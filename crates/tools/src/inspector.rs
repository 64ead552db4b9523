use locus_common::{EntityId, Position};
use locus_kernel::{Role, World};
use std::collections::BTreeMap;
use std::fmt;

/// World inspector for developer tooling.
///
/// Provides read-only queries against the world state for debugging and
/// the command-line views.
pub struct WorldInspector;

impl WorldInspector {
    pub fn summary(world: &World) -> WorldSummary {
        WorldSummary {
            tick: world.tick_count(),
            running: world.is_running(),
            tick_rate: world.tick_rate(),
            maps: world.maps().len(),
            active_map: world.active_map_name().map(str::to_owned),
            entity_count: world.entity_count(),
            systems: world.system_names().into_iter().map(str::to_owned).collect(),
            pending_events: world.events().len(),
        }
    }

    /// Per-map statistics in map name order.
    pub fn maps(world: &World) -> Vec<MapSummary> {
        world
            .maps()
            .values()
            .map(|grid| {
                let stats = grid.stats();
                MapSummary {
                    name: stats.name,
                    dims: stats.dims,
                    occupants: stats.occupants,
                    by_role: stats.by_role,
                }
            })
            .collect()
    }

    pub fn inspect_entity(world: &World, id: EntityId) -> Option<EntityInfo> {
        world.entity(id).map(|e| EntityInfo {
            id,
            kind: e.kind().to_owned(),
            name: e.name().to_owned(),
            health: e.health(),
            max_health: e.max_health(),
            roles: e.roles().iter().copied().collect(),
            location: e.location().map(|l| (l.grid.clone(), l.pos)),
        })
    }

    /// All registered entity ids in identity order.
    pub fn list_entities(world: &World) -> Vec<EntityId> {
        world.entities().map(|e| e.id()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldSummary {
    pub tick: u64,
    pub running: bool,
    pub tick_rate: u32,
    pub maps: usize,
    pub active_map: Option<String>,
    pub entity_count: usize,
    pub systems: Vec<String>,
    pub pending_events: usize,
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "World: tick={} running={} rate={}/s maps={} active={} entities={} systems=[{}] pending_events={}",
            self.tick,
            self.running,
            self.tick_rate,
            self.maps,
            self.active_map.as_deref().unwrap_or("-"),
            self.entity_count,
            self.systems.join(", "),
            self.pending_events
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSummary {
    pub name: String,
    pub dims: [i32; 3],
    pub occupants: usize,
    pub by_role: BTreeMap<Role, usize>,
}

impl fmt::Display for MapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [w, h, d] = self.dims;
        write!(f, "Map '{}' {w}x{h}x{d} objects={}", self.name, self.occupants)?;
        for (role, count) in &self.by_role {
            write!(f, " {role:?}={count}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub kind: String,
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub roles: Vec<Role>,
    pub location: Option<(String, Position)>,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entity {} [{}] '{}' hp={}/{}",
            self.id, self.kind, self.name, self.health, self.max_health
        )?;
        match &self.location {
            Some((grid, pos)) => write!(f, " at {grid}{pos}"),
            None => write!(f, " unplaced"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_common::Identity;
    use locus_kernel::Entity;

    fn world() -> (World, EntityId) {
        let mut world = World::new();
        world.create_map("main", 4, 4, 1).expect("map");
        let wall = world
            .add_entity(Entity::unassigned("wall", "Wall").with_role(Role::Wall))
            .expect("add");
        world.place("main", Position::new(1, 1, 0), wall).expect("place");
        world.spawn("object").expect("spawn");
        (world, wall)
    }

    #[test]
    fn summary_empty_world() {
        let summary = WorldInspector::summary(&World::new());
        assert_eq!(summary.tick, 0);
        assert_eq!(summary.entity_count, 0);
        assert_eq!(summary.active_map, None);
        assert!(format!("{summary}").contains("tick=0"));
    }

    #[test]
    fn summary_counts_maps_and_entities() {
        let (mut world, _) = world();
        world.start();
        world.tick(0.05);
        let summary = WorldInspector::summary(&world);
        assert_eq!(summary.tick, 1);
        assert!(summary.running);
        assert_eq!(summary.maps, 1);
        assert_eq!(summary.entity_count, 2);
        assert_eq!(summary.active_map.as_deref(), Some("main"));
    }

    #[test]
    fn map_stats_by_role() {
        let (world, _) = world();
        let maps = WorldInspector::maps(&world);
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].occupants, 1);
        assert_eq!(maps[0].by_role.get(&Role::Wall), Some(&1));
        assert_eq!(format!("{}", maps[0]), "Map 'main' 4x4x1 objects=1 Wall=1");
    }

    #[test]
    fn inspect_entity_reports_location() {
        let (world, wall) = world();
        let info = WorldInspector::inspect_entity(&world, wall).expect("found");
        assert_eq!(info.kind, "wall");
        assert_eq!(info.location, Some(("main".to_owned(), Position::new(1, 1, 0))));
        assert!(format!("{info}").ends_with("at main(1, 1, 0)"));
        assert!(WorldInspector::inspect_entity(&world, EntityId(999)).is_none());
    }

    #[test]
    fn list_entities_in_identity_order() {
        let (mut world, wall) = world();
        let extra = world
            .add_entity(Entity::new(Identity::new(EntityId(50), "object"), "late"))
            .expect("add");
        let ids = WorldInspector::list_entities(&world);
        assert_eq!(ids.first(), Some(&wall));
        assert_eq!(ids.last(), Some(&extra));
        assert_eq!(ids.len(), 3);
    }
}
