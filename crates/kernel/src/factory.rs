use locus_common::{Identity, IdentityAllocator};
use std::collections::BTreeMap;
use std::fmt;

use crate::entity::{Entity, EntitySnapshot};
use crate::error::KernelError;

type Constructor = Box<dyn Fn(Identity) -> Entity + Send + Sync>;

/// Builds entities by kind name. Used for spawning by name and for
/// rebuilding entities from snapshots.
#[derive(Default)]
pub struct Factory {
    constructors: BTreeMap<String, Constructor>,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that already knows the plain `object` kind.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        factory.register("object", |identity| Entity::new(identity, "object"));
        factory
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        constructor: impl Fn(Identity) -> Entity + Send + Sync + 'static,
    ) {
        let kind = kind.into();
        if self
            .constructors
            .insert(kind.clone(), Box::new(constructor))
            .is_some()
        {
            tracing::debug!(%kind, "constructor replaced");
        }
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build a new entity of `kind` with a freshly issued identity.
    pub fn create(&self, kind: &str, ids: &IdentityAllocator) -> Result<Entity, KernelError> {
        let constructor = self.constructor(kind)?;
        Ok(constructor(ids.allocate(kind)))
    }

    /// Build an entity with an identity chosen by the caller.
    pub fn create_with_identity(&self, identity: Identity) -> Result<Entity, KernelError> {
        let constructor = self.constructor(&identity.kind)?;
        Ok(constructor(identity))
    }

    /// Rebuild an entity from its snapshot, keeping its identity and making
    /// sure `ids` will not reissue it.
    pub fn restore(
        &self,
        snapshot: &EntitySnapshot,
        ids: &IdentityAllocator,
    ) -> Result<Entity, KernelError> {
        let mut entity =
            self.create_with_identity(Identity::new(snapshot.identity, snapshot.kind.clone()))?;
        entity.apply_snapshot(snapshot);
        ids.observe(snapshot.identity);
        Ok(entity)
    }

    fn constructor(&self, kind: &str) -> Result<&Constructor, KernelError> {
        self.constructors
            .get(kind)
            .ok_or_else(|| KernelError::UnknownKind(kind.to_owned()))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("kinds", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Role;
    use locus_common::EntityId;

    fn factory() -> Factory {
        let mut f = Factory::with_builtin();
        f.register("wall", |identity| {
            Entity::new(identity, "Wall")
                .with_role(Role::Wall)
                .with_role(Role::Opaque)
        });
        f
    }

    #[test]
    fn create_assigns_fresh_identity() {
        let f = factory();
        let ids = IdentityAllocator::new();
        let a = f.create("wall", &ids).expect("known kind");
        let b = f.create("object", &ids).expect("known kind");
        assert_eq!(a.id(), EntityId(1));
        assert_eq!(a.kind(), "wall");
        assert!(a.has_role(Role::Opaque));
        assert_eq!(b.id(), EntityId(2));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let f = factory();
        let ids = IdentityAllocator::new();
        assert!(matches!(
            f.create("dragon", &ids),
            Err(KernelError::UnknownKind(k)) if k == "dragon"
        ));
        assert_eq!(ids.peek_next(), EntityId(1));
    }

    #[test]
    fn restore_keeps_identity_and_observes_it() {
        let f = factory();
        let ids = IdentityAllocator::new();
        let mut original = f.create("wall", &IdentityAllocator::starting_after(40)).expect("wall");
        original.set_name("North wall");
        original.set_health(30, Some(50));
        let snap = original.snapshot();

        let restored = f.restore(&snap, &ids).expect("restore");
        assert_eq!(restored.id(), EntityId(41));
        assert_eq!(restored.name(), "North wall");
        assert_eq!(restored.health(), 30);
        assert_eq!(restored.max_health(), 50);
        assert_eq!(ids.next_id(), EntityId(42));
    }
}
