use locus_atmos::{AtmosConfig, Atmosphere, AtmosphereSnapshot, AtmosphereSystem};
use locus_kernel::{EntitySnapshot, Factory, GridSnapshot, World};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::codec::{cbor_serialize, sha256_hex};
use crate::error::PersistError;

/// Bumped whenever the snapshot field set changes incompatibly.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Atmosphere attached to one map, with the tuning it ran under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereState {
    pub map: String,
    pub running: bool,
    #[serde(default)]
    pub config: AtmosConfig,
    pub tiles: AtmosphereSnapshot,
}

/// Everything needed to rebuild a world at a given tick.
///
/// Unplaced entities are carried in `entities`; each map lists its own
/// occupants again so a map snapshot stays usable on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub schema_version: u32,
    pub tick: u64,
    pub tick_rate: u32,
    #[serde(default)]
    pub active_map: Option<String>,
    pub maps: Vec<GridSnapshot>,
    pub entities: Vec<EntitySnapshot>,
    #[serde(default)]
    pub atmosphere: Option<AtmosphereState>,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl WorldSnapshot {
    /// Capture the world's state. The atmosphere is taken from the first
    /// registered [`AtmosphereSystem`], if any.
    pub fn capture(world: &World) -> Self {
        let maps: Vec<GridSnapshot> = world
            .maps()
            .keys()
            .filter_map(|name| world.map_snapshot(name))
            .collect();
        let atmosphere = world.system::<AtmosphereSystem>().map(|system| {
            let atmos = system.atmosphere();
            AtmosphereState {
                map: system.map().to_owned(),
                running: atmos.is_running(),
                config: atmos.config().clone(),
                tiles: atmos.snapshot(),
            }
        });

        let snapshot = Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            tick: world.tick_count(),
            tick_rate: world.tick_rate(),
            active_map: world.active_map_name().map(str::to_owned),
            maps,
            entities: world.entity_snapshots(),
            atmosphere,
            data: world.data_bag().clone(),
        };
        debug!(
            tick = snapshot.tick,
            maps = snapshot.maps.len(),
            entities = snapshot.entities.len(),
            "world captured"
        );
        snapshot
    }

    /// Rebuild a stopped world, constructing entities through `factory`.
    ///
    /// Kinds missing from `factory` fail with [`KernelError::UnknownKind`].
    ///
    /// [`KernelError::UnknownKind`]: locus_kernel::KernelError::UnknownKind
    pub fn restore(&self, factory: Factory) -> Result<World, PersistError> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(PersistError::SchemaMismatch {
                file_version: self.schema_version,
                expected_version: SNAPSHOT_SCHEMA_VERSION,
            });
        }

        let mut world = World::new();
        *world.factory_mut() = factory;
        world.set_tick_rate(self.tick_rate);
        world.set_tick_count(self.tick);

        for entity in &self.entities {
            world.restore_entity(entity)?;
        }
        for map in &self.maps {
            world.restore_map(map)?;
        }
        if let Some(name) = &self.active_map {
            world.set_active_map(name);
        }
        for (key, value) in &self.data {
            world.set_data(key.clone(), value.clone());
        }

        if let Some(state) = &self.atmosphere {
            let mut atmos = Atmosphere::from_snapshot(&state.tiles, state.config.clone());
            if state.running {
                atmos.start();
            }
            world.add_system(AtmosphereSystem::new(state.map.clone(), atmos));
        }

        // Restoring is not an authoring operation.
        world.drain_events();
        info!(
            tick = self.tick,
            maps = self.maps.len(),
            entities = world.entity_count(),
            "world restored"
        );
        Ok(world)
    }

    /// sha256 over the CBOR encoding; equal snapshots have equal digests.
    pub fn digest(&self) -> Result<String, PersistError> {
        Ok(sha256_hex(&cbor_serialize(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_cbor_zst, decode_json, encode_cbor_zst, encode_json};
    use locus_atmos::{GasMixture, GasType};
    use locus_common::{Identity, Position};
    use locus_kernel::{Capability, Entity, KernelError, Role};

    fn factory() -> Factory {
        let mut factory = Factory::with_builtin();
        factory.register("wall", |identity: Identity| {
            Entity::new(identity, "Wall")
                .with_role(Role::Wall)
                .with_role(Role::Opaque)
        });
        factory.register("crate", |identity: Identity| {
            Entity::new(identity, "Crate")
                .with_role(Role::Item)
                .with_capability(Capability::Movable)
        });
        factory
    }

    fn sample_world() -> World {
        let mut world = World::new();
        *world.factory_mut() = factory();
        world.create_map("station", 4, 3, 2).expect("map");
        world.create_map("annex", 2, 2, 1).expect("map");

        let wall = world.spawn("wall").expect("wall");
        world.place("station", Position::new(1, 1, 0), wall).expect("place");
        let crate_id = world.spawn("crate").expect("crate");
        world.place("annex", Position::new(0, 1, 0), crate_id).expect("place");
        let loose = world.spawn("object").expect("object");
        if let Some(e) = world.entity_mut(loose) {
            e.set_attribute("note", "unplaced");
            e.set_health(40, Some(50));
        }

        let mut atmos = Atmosphere::default();
        if let Some(grid) = world.map("station") {
            atmos.fill(grid, &GasMixture::standard_air());
        }
        atmos.tile(Position::new(2, 2, 0)).air_mut().add(GasType::Plasma, 5.0);
        atmos.ignite(Position::new(2, 2, 0));
        atmos.start();
        world.add_system(AtmosphereSystem::new("station", atmos));

        world.set_data("round", 3);
        world.start();
        world.tick(0.05);
        world.tick(0.05);
        world.stop();
        world
    }

    #[test]
    fn restore_rebuilds_maps_entities_and_atmosphere() {
        let world = sample_world();
        let snap = WorldSnapshot::capture(&world);
        assert_eq!(snap.tick, 2);
        assert_eq!(snap.maps.len(), 2);
        assert_eq!(snap.entities.len(), 3);

        let restored = snap.restore(factory()).expect("restore");
        assert_eq!(restored.tick_count(), 2);
        assert!(!restored.is_running());
        assert_eq!(restored.entity_count(), 3);
        assert_eq!(restored.active_map_name(), Some("station"));
        assert_eq!(restored.data("round"), Some(&Value::from(3)));

        let station = restored.map("station").expect("station");
        let wall = station.get(Position::new(1, 1, 0)).expect("wall placed");
        assert_eq!(station.entities_with_role(Role::Opaque), &[wall]);
        assert_eq!(
            restored.entity(wall).and_then(|e| e.location()).map(|l| l.pos),
            Some(Position::new(1, 1, 0))
        );

        let system = restored.system::<AtmosphereSystem>().expect("atmosphere");
        assert!(system.atmosphere().is_running());
        assert!(system.atmosphere().on_fire(Position::new(2, 2, 0)));
        assert_eq!(system.atmosphere().len(), 24);

        assert!(restored.events().is_empty());
        assert_eq!(WorldSnapshot::capture(&restored), snap);
    }

    #[test]
    fn new_ids_do_not_collide_with_restored_ones() {
        let snap = WorldSnapshot::capture(&sample_world());
        let max = snap.entities.iter().map(|e| e.identity).max().expect("entities");
        let mut restored = snap.restore(factory()).expect("restore");
        let fresh = restored.spawn("object").expect("spawn");
        assert!(fresh > max);
    }

    #[test]
    fn unknown_kind_fails_restore() {
        let snap = WorldSnapshot::capture(&sample_world());
        let err = snap.restore(Factory::with_builtin()).expect_err("wall unknown");
        assert!(matches!(err, PersistError::Restore(KernelError::UnknownKind(k)) if k == "wall"));
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let mut snap = WorldSnapshot::capture(&World::new());
        snap.schema_version = 99;
        assert!(matches!(
            snap.restore(Factory::with_builtin()),
            Err(PersistError::SchemaMismatch { file_version: 99, .. })
        ));
    }

    #[test]
    fn encodings_preserve_snapshot() {
        let snap = WorldSnapshot::capture(&sample_world());
        let json: WorldSnapshot = decode_json(&encode_json(&snap).expect("json")).expect("json");
        assert_eq!(json, snap);
        let cbor: WorldSnapshot =
            decode_cbor_zst(&encode_cbor_zst(&snap).expect("cbor")).expect("cbor");
        assert_eq!(cbor, snap);
    }

    #[test]
    fn digest_tracks_content() {
        let world = sample_world();
        let a = WorldSnapshot::capture(&world);
        let mut b = a.clone();
        assert_eq!(a.digest().expect("digest"), b.digest().expect("digest"));
        b.tick += 1;
        assert_ne!(a.digest().expect("digest"), b.digest().expect("digest"));
    }

    #[test]
    fn grid_snapshot_field_shape() {
        let snap = WorldSnapshot::capture(&sample_world());
        let value = serde_json::to_value(&snap.maps[1]).expect("json");
        assert_eq!(value["name"], "station");
        assert_eq!(value["grid"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["grid"][0][1][1]["type"], "wall");
        assert!(value["grid"][0][0][0].is_null());
    }
}
