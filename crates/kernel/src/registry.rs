use locus_common::EntityId;
use std::collections::{BTreeMap, BTreeSet};

use crate::entity::{Entity, Role};
use crate::error::KernelError;

/// Owning store of every live entity, indexed by identity and by kind.
///
/// Iteration is in identity order, which is also creation order for ids
/// issued by a single allocator.
#[derive(Debug, Default)]
pub struct Registry {
    entities: BTreeMap<EntityId, Entity>,
    by_kind: BTreeMap<String, BTreeSet<EntityId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an entity that already carries a valid identity.
    pub fn insert(&mut self, entity: Entity) -> Result<EntityId, KernelError> {
        let id = entity.id();
        if !id.is_valid() || self.entities.contains_key(&id) {
            return Err(KernelError::DuplicateIdentity(id));
        }
        self.by_kind
            .entry(entity.kind().to_owned())
            .or_default()
            .insert(id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Mark an entity deleted and hand it back. Grid cells still holding its
    /// id are the caller's concern.
    pub fn delete(&mut self, id: EntityId) -> Option<Entity> {
        let mut entity = self.entities.remove(&id)?;
        if let Some(ids) = self.by_kind.get_mut(entity.kind()) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_kind.remove(entity.kind());
            }
        }
        entity.mark_deleted();
        Some(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Ids of every live entity of `kind`, in identity order.
    pub fn by_kind(&self, kind: &str) -> Vec<EntityId> {
        self.by_kind
            .get(kind)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&str, usize)> {
        self.by_kind.iter().map(|(k, ids)| (k.as_str(), ids.len()))
    }

    /// Ids of entities currently carrying `role`.
    pub fn find_by_role(&self, role: Role) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.has_role(role))
            .map(Entity::id)
            .collect()
    }

    /// Highest registered id, if any.
    pub fn max_id(&self) -> Option<EntityId> {
        self.entities.keys().next_back().copied()
    }

    /// Drop every entity, marking each deleted.
    pub fn clear(&mut self) {
        for entity in self.entities.values_mut() {
            entity.mark_deleted();
        }
        self.entities.clear();
        self.by_kind.clear();
    }
}
