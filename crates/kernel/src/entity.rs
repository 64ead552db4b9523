//! Flat entity record with role tags, a free-form attribute bag, capability
//! markers, and a pluggable [`Behavior`] for hooks.

use locus_common::{EntityId, Identity, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Indexed role tag. Grids index their occupants by role at placement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Opaque,
    Transparent,
    Solid,
    Passable,
    Turf,
    Floor,
    Wall,
    Structure,
    Item,
    Mob,
    Destroyed,
}

/// Optional capability an entity advertises to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Positionable,
    Damageable,
    InventoryHolder,
    Flammable,
    Movable,
}

/// Where an entity currently sits. Maintained by the grid hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub grid: String,
    pub pos: Position,
}

/// Object-safe access to `Any` for behaviors, enabling typed downcasts.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Content-specific hooks attached to an entity.
///
/// Every hook has a no-op default. The entity is handed back mutably so a
/// behavior can adjust health, roles, or attributes.
pub trait Behavior: AsAny + Send + fmt::Debug {
    fn on_tick(&mut self, _entity: &mut Entity, _dt: f64) {}
    fn on_placed(&mut self, _entity: &mut Entity, _grid: &str, _pos: Position) {}
    fn on_removed(&mut self, _entity: &mut Entity, _grid: &str, _pos: Position) {}
    fn on_moved(&mut self, _entity: &mut Entity, _from: Position, _to: Position) {}
    fn on_death(&mut self, _entity: &mut Entity) {}
}

/// Base entity.
///
/// Equality is by identity only. Health stays inside `[0, max_health]`.
#[derive(Debug)]
pub struct Entity {
    identity: Identity,
    name: String,
    description: Option<String>,
    roles: BTreeSet<Role>,
    attributes: BTreeMap<String, Value>,
    capabilities: BTreeSet<Capability>,
    health: i32,
    max_health: i32,
    dead: bool,
    deleted: bool,
    inanimate: bool,
    location: Option<Location>,
    behavior: Option<Box<dyn Behavior>>,
}

impl Entity {
    /// Create an entity with an already issued (or not yet issued) identity.
    pub fn new(identity: Identity, name: impl Into<String>) -> Self {
        Self {
            identity,
            name: name.into(),
            description: None,
            roles: BTreeSet::new(),
            attributes: BTreeMap::new(),
            capabilities: BTreeSet::new(),
            health: 0,
            max_health: 0,
            dead: false,
            deleted: false,
            inanimate: false,
            location: None,
            behavior: None,
        }
    }

    /// Create an entity whose identity will be issued when it is placed or
    /// registered.
    pub fn unassigned(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Identity::invalid(kind), name)
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_health(mut self, health: i32, max_health: i32) -> Self {
        self.max_health = max_health.max(0);
        self.health = health.clamp(0, self.max_health);
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn id(&self) -> EntityId {
        self.identity.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn kind(&self) -> &str {
        &self.identity.kind
    }

    pub(crate) fn assign_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    // --- Roles ---

    /// Tag the entity. Grids that already hold this entity keep the role set
    /// they recorded at placement.
    pub fn add_role(&mut self, role: Role) -> bool {
        self.roles.insert(role)
    }

    pub fn remove_role(&mut self, role: Role) -> bool {
        self.roles.remove(&role)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    // --- Attributes (not indexed) ---

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    // --- Capabilities ---

    pub fn add_capability(&mut self, capability: Capability) -> bool {
        self.capabilities.insert(capability)
    }

    pub fn remove_capability(&mut self, capability: Capability) -> bool {
        self.capabilities.remove(&capability)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    // --- Health ---

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn health_percentage(&self) -> f64 {
        if self.max_health > 0 {
            f64::from(self.health) / f64::from(self.max_health)
        } else {
            0.0
        }
    }

    /// Set health (and optionally the maximum), clamped to `[0, max_health]`.
    pub fn set_health(&mut self, amount: i32, max: Option<i32>) {
        if let Some(max) = max {
            self.max_health = max.max(0);
        }
        let before = self.health;
        self.health = amount.clamp(0, self.max_health);
        self.check_death(before);
    }

    /// Add `delta` to health, clamped to `[0, max_health]`.
    pub fn modify_health(&mut self, delta: i32) {
        let before = self.health;
        self.health = self.health.saturating_add(delta).clamp(0, self.max_health);
        self.check_death(before);
    }

    pub fn alive(&self) -> bool {
        !self.dead && self.health > 0
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    fn check_death(&mut self, before: i32) {
        if self.dead || before <= 0 || self.health > 0 {
            return;
        }
        self.dead = true;
        tracing::debug!(entity = %self.identity, "entity died");
        self.run_behavior(|b, e| b.on_death(e));
    }

    // --- Lifecycle ---

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn is_inanimate(&self) -> bool {
        self.inanimate
    }

    /// Inanimate entities are skipped by the tick loop.
    pub fn set_inanimate(&mut self, inanimate: bool) {
        self.inanimate = inanimate;
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Per-tick hook invoked by the world.
    pub fn tick(&mut self, dt: f64) {
        if self.deleted || self.inanimate {
            return;
        }
        self.run_behavior(|b, e| b.on_tick(e, dt));
    }

    pub(crate) fn notify_placed(&mut self, grid: &str, pos: Position) {
        self.location = Some(Location {
            grid: grid.to_owned(),
            pos,
        });
        self.run_behavior(|b, e| b.on_placed(e, grid, pos));
    }

    pub(crate) fn notify_removed(&mut self, grid: &str, pos: Position) {
        self.run_behavior(|b, e| b.on_removed(e, grid, pos));
        self.location = None;
    }

    pub(crate) fn notify_moved(&mut self, from: Position, to: Position) {
        if let Some(location) = self.location.as_mut() {
            location.pos = to;
        }
        self.run_behavior(|b, e| b.on_moved(e, from, to));
    }

    /// Drop the location without firing hooks (used when a grid cell is
    /// overwritten underneath the entity).
    pub(crate) fn clear_location(&mut self) {
        self.location = None;
    }

    // --- Behavior ---

    pub fn set_behavior(&mut self, behavior: Option<Box<dyn Behavior>>) {
        self.behavior = behavior;
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    /// Typed view of the attached behavior, if it is a `T`.
    pub fn behavior<T: Behavior + 'static>(&self) -> Option<&T> {
        self.behavior
            .as_deref()
            .and_then(|b| b.as_any().downcast_ref::<T>())
    }

    pub fn behavior_mut<T: Behavior + 'static>(&mut self) -> Option<&mut T> {
        self.behavior
            .as_deref_mut()
            .and_then(|b| b.as_any_mut().downcast_mut::<T>())
    }

    fn run_behavior(&mut self, f: impl FnOnce(&mut dyn Behavior, &mut Entity)) {
        if let Some(mut behavior) = self.behavior.take() {
            f(&mut *behavior, self);
            // A hook may have installed a replacement; keep it.
            if self.behavior.is_none() {
                self.behavior = Some(behavior);
            }
        }
    }

    // --- Snapshots ---

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            identity: self.id(),
            kind: self.kind().to_owned(),
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.roles.clone(),
            capabilities: self.capabilities.clone(),
            health: self.health,
            max_health: self.max_health,
            dead: self.dead,
            data: self.attributes.clone(),
        }
    }

    /// Overwrite this entity's state from a snapshot. The identity is taken
    /// from the snapshot; the behavior is left as constructed.
    pub fn apply_snapshot(&mut self, snapshot: &EntitySnapshot) {
        self.identity = Identity::new(snapshot.identity, snapshot.kind.clone());
        self.name = snapshot.name.clone();
        self.description = snapshot.description.clone();
        self.roles = snapshot.tags.clone();
        self.capabilities = snapshot.capabilities.clone();
        self.attributes = snapshot.data.clone();
        self.max_health = snapshot.max_health.max(0);
        self.health = snapshot.health.clamp(0, self.max_health);
        self.dead = snapshot.dead;
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

/// Serializable field set of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub identity: EntityId,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: BTreeSet<Role>,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    pub health: i32,
    pub max_health: i32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dead: bool,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        ticks: u32,
        deaths: u32,
        placed: Vec<Position>,
    }

    impl Behavior for Counter {
        fn on_tick(&mut self, _entity: &mut Entity, _dt: f64) {
            self.ticks += 1;
        }

        fn on_placed(&mut self, _entity: &mut Entity, _grid: &str, pos: Position) {
            self.placed.push(pos);
        }

        fn on_death(&mut self, entity: &mut Entity) {
            self.deaths += 1;
            entity.add_role(Role::Destroyed);
        }
    }

    fn sample() -> Entity {
        Entity::new(Identity::new(EntityId(1), "object"), "Test")
    }

    #[test]
    fn roles_add_remove() {
        let mut e = sample();
        assert!(e.add_role(Role::Solid));
        assert!(e.has_role(Role::Solid));
        assert!(!e.has_role(Role::Destroyed));
        assert!(e.remove_role(Role::Solid));
        assert!(!e.has_role(Role::Solid));
        assert!(!e.remove_role(Role::Solid));
    }

    #[test]
    fn attributes_are_free_form() {
        let mut e = sample();
        e.set_attribute("passable", false);
        assert_eq!(e.attribute("passable"), Some(&Value::Bool(false)));
        assert!(e.attribute("missing").is_none());
        assert_eq!(e.remove_attribute("passable"), Some(Value::Bool(false)));
    }

    #[test]
    fn health_is_clamped() {
        let mut e = sample();
        e.set_health(75, Some(100));
        assert_eq!(e.health(), 75);
        assert_eq!(e.max_health(), 100);
        assert!((e.health_percentage() - 0.75).abs() < 1e-9);

        e.modify_health(-10);
        assert_eq!(e.health(), 65);

        e.modify_health(500);
        assert_eq!(e.health(), 100);

        e.set_health(150, None);
        assert_eq!(e.health(), 100);
    }

    #[test]
    fn health_percentage_zero_without_max() {
        let e = sample();
        assert_eq!(e.health_percentage(), 0.0);
    }

    #[test]
    fn death_hook_fires_once() {
        let mut e = sample()
            .with_health(10, 10)
            .with_behavior(Counter::default());
        e.modify_health(-4);
        assert!(e.alive());
        e.modify_health(-100);
        assert_eq!(e.health(), 0);
        assert!(e.is_dead());
        assert!(!e.alive());
        e.modify_health(-5);
        e.set_health(5, None);
        e.set_health(0, None);

        let counter = e.behavior::<Counter>().expect("counter behavior");
        assert_eq!(counter.deaths, 1);
        assert!(e.has_role(Role::Destroyed));
    }

    #[test]
    fn restored_dead_entity_stays_dead() {
        let mut e = sample()
            .with_health(10, 10)
            .with_behavior(Counter::default());
        e.modify_health(-10);
        let snap = e.snapshot();
        assert!(snap.dead);

        let mut restored = sample()
            .with_health(10, 10)
            .with_behavior(Counter::default());
        restored.apply_snapshot(&snap);
        assert!(restored.is_dead());
        restored.set_health(5, None);
        restored.set_health(0, None);
        restored.modify_health(-5);
        let counter = restored.behavior::<Counter>().expect("counter behavior");
        assert_eq!(counter.deaths, 0);
    }

    #[test]
    fn tick_skips_inanimate_and_deleted() {
        let mut e = sample().with_behavior(Counter::default());
        e.tick(0.1);
        e.set_inanimate(true);
        e.tick(0.1);
        e.set_inanimate(false);
        e.mark_deleted();
        e.tick(0.1);
        assert_eq!(e.behavior::<Counter>().map(|c| c.ticks), Some(1));
    }

    #[test]
    fn placement_hook_tracks_location() {
        let mut e = sample().with_behavior(Counter::default());
        e.notify_placed("main", Position::new(1, 2, 0));
        assert_eq!(e.location().map(|l| l.pos), Some(Position::new(1, 2, 0)));
        e.notify_moved(Position::new(1, 2, 0), Position::new(2, 2, 0));
        assert_eq!(e.location().map(|l| l.pos), Some(Position::new(2, 2, 0)));
        e.notify_removed("main", Position::new(2, 2, 0));
        assert!(e.location().is_none());
        assert_eq!(
            e.behavior::<Counter>().map(|c| c.placed.clone()),
            Some(vec![Position::new(1, 2, 0)])
        );
    }

    #[test]
    fn downcast_to_wrong_type_is_none() {
        #[derive(Debug)]
        struct Other;
        impl Behavior for Other {}

        let e = sample().with_behavior(Counter::default());
        assert!(e.behavior::<Other>().is_none());
        assert!(e.behavior::<Counter>().is_some());
    }

    #[test]
    fn equality_by_identity() {
        let a = sample();
        let mut b = Entity::new(Identity::new(EntityId(1), "object"), "Other name");
        b.add_role(Role::Wall);
        assert_eq!(a, b);
        assert_ne!(a, Entity::new(Identity::new(EntityId(2), "object"), "Test"));
    }

    #[test]
    fn snapshot_roundtrip_through_apply() {
        let mut e = sample().with_health(40, 50).with_role(Role::Mob);
        e.set_attribute("faction", "crew");
        e.add_capability(Capability::Damageable);
        let snap = e.snapshot();

        let json = serde_json::to_value(&snap).expect("serialize");
        assert_eq!(json["type"], "object");
        assert_eq!(json["identity"], 1);
        assert_eq!(json["tags"][0], "mob");

        let mut restored = Entity::unassigned("object", "");
        restored.apply_snapshot(&snap);
        assert_eq!(restored.id(), EntityId(1));
        assert_eq!(restored.name(), "Test");
        assert_eq!(restored.health(), 40);
        assert!(restored.has_role(Role::Mob));
        assert!(restored.has_capability(Capability::Damageable));
        assert_eq!(restored.attribute("faction"), Some(&Value::from("crew")));
    }
}
