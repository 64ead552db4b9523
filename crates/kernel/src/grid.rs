use locus_common::{Direction, EntityId, IdentityAllocator, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::entity::{Entity, EntitySnapshot, Role};
use crate::error::KernelError;
use crate::registry::Registry;

/// Index record kept for every occupant. Roles are captured at placement and
/// are not refreshed if the entity is re-tagged afterwards.
#[derive(Debug, Clone)]
struct Placement {
    pos: Position,
    kind: String,
    roles: Vec<Role>,
}

/// Dense 3D grid of single-occupancy cells with identity and role indices.
///
/// An entity is present in `by_id` and in `by_role` for each of its recorded
/// roles iff it occupies a cell of this grid.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    name: String,
    description: Option<String>,
    width: i32,
    height: i32,
    depth: i32,
    cells: Vec<Option<EntityId>>,
    by_id: HashMap<EntityId, Placement>,
    by_role: HashMap<Role, Vec<EntityId>>,
}

impl SpatialGrid {
    /// Create an empty grid. Every extent must be positive.
    pub fn new(
        name: impl Into<String>,
        width: i32,
        height: i32,
        depth: i32,
    ) -> Result<Self, KernelError> {
        let invalid = KernelError::InvalidDimensions {
            width,
            height,
            depth,
        };
        if width <= 0 || height <= 0 || depth <= 0 {
            return Err(invalid);
        }
        let max_cells = isize::MAX as usize / std::mem::size_of::<Option<EntityId>>();
        let volume = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(depth as usize))
            .filter(|&v| v <= max_cells)
            .ok_or(invalid)?;
        Ok(Self {
            name: name.into(),
            description: None,
            width,
            height,
            depth,
            cells: vec![None; volume],
            by_id: HashMap::new(),
            by_role: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    /// True iff each axis is within `[0, extent)`.
    pub fn valid(&self, pos: Position) -> bool {
        pos.within(self.width, self.height, self.depth)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if !self.valid(pos) {
            return None;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        Some(pos.z as usize * w * h + pos.y as usize * w + pos.x as usize)
    }

    /// Occupant of `pos`, or `None` for empty or out-of-bounds cells.
    pub fn get(&self, pos: Position) -> Option<EntityId> {
        self.index(pos).and_then(|i| self.cells[i])
    }

    pub fn occupied(&self, pos: Position) -> bool {
        self.get(pos).is_some()
    }

    /// Overwrite a cell. Returns the previous occupant.
    ///
    /// The previous occupant leaves the indices but is neither notified nor
    /// told it lost its cell; [`SpatialGrid::replace`] does both through a
    /// registry, and [`SpatialGrid::remove`] is the notified removal. The
    /// new occupant is indexed under its current roles and receives its
    /// placed hook. If it already sat elsewhere in this grid, that cell is
    /// vacated first. Out-of-bounds positions and entities without a valid
    /// identity are ignored.
    pub fn set(&mut self, pos: Position, occupant: Option<&mut Entity>) -> Option<EntityId> {
        let idx = self.index(pos)?;
        let prev = self.cells[idx];
        let next = occupant.as_ref().map(|e| e.id());
        if prev == next {
            return prev;
        }
        if next.is_some_and(|id| !id.is_valid()) {
            tracing::warn!(grid = %self.name, %pos, "refusing to store an entity without identity");
            return None;
        }

        if let Some(prev) = prev {
            self.unindex(prev);
        }
        self.cells[idx] = None;

        if let Some(entity) = occupant {
            let id = entity.id();
            if let Some(old) = self.unindex(id) {
                if let Some(old_idx) = self.index(old.pos) {
                    self.cells[old_idx] = None;
                }
                tracing::debug!(grid = %self.name, entity = %id, from = %old.pos, to = %pos, "entity relocated by set");
            }
            self.cells[idx] = Some(id);
            self.index_entity(entity, pos);
            entity.notify_placed(&self.name, pos);
        }
        prev
    }

    /// [`SpatialGrid::set`] for registered entities. An evicted occupant
    /// loses its location so it can be placed again. Returns the evicted
    /// occupant, or `None` if nothing was displaced.
    pub fn replace(
        &mut self,
        pos: Position,
        occupant: Option<EntityId>,
        registry: &mut Registry,
    ) -> Option<EntityId> {
        let prev = self.get(pos);
        if prev == occupant {
            return None;
        }
        let stored = match occupant {
            Some(id) => {
                let entity = registry.get_mut(id)?;
                self.set(pos, Some(entity))
            }
            None => self.set(pos, None),
        };
        let evicted = stored.filter(|&id| Some(id) != occupant)?;
        if let Some(entity) = registry.get_mut(evicted) {
            entity.clear_location();
        }
        tracing::debug!(grid = %self.name, %pos, entity = %evicted, "occupant evicted");
        Some(evicted)
    }

    /// Put an entity into an empty, in-bounds cell, issuing an identity if
    /// it has none. Returns false if the cell is invalid or occupied.
    pub fn place(&mut self, pos: Position, entity: &mut Entity, ids: &IdentityAllocator) -> bool {
        if !self.valid(pos) || self.occupied(pos) {
            return false;
        }
        if !entity.id().is_valid() {
            let identity = ids.allocate(entity.kind().to_owned());
            entity.assign_identity(identity);
        }
        self.set(pos, Some(entity));
        tracing::debug!(grid = %self.name, entity = %entity.identity(), %pos, "entity placed");
        true
    }

    /// Empty a cell, firing the occupant's removed hook if it is registered.
    /// Returns `None` if the cell was already empty.
    pub fn remove(&mut self, pos: Position, registry: &mut Registry) -> Option<EntityId> {
        let id = self.get(pos)?;
        if let Some(entity) = registry.get_mut(id) {
            entity.notify_removed(&self.name, pos);
        }
        self.set(pos, None);
        tracing::debug!(grid = %self.name, entity = %id, %pos, "entity removed");
        Some(id)
    }

    /// Move the occupant of `from` to the empty cell `to`.
    pub fn move_entity(&mut self, from: Position, to: Position, registry: &mut Registry) -> bool {
        let (Some(from_idx), Some(to_idx)) = (self.index(from), self.index(to)) else {
            return false;
        };
        let Some(id) = self.cells[from_idx] else {
            return false;
        };
        if self.cells[to_idx].is_some() {
            return false;
        }
        self.cells[from_idx] = None;
        self.cells[to_idx] = Some(id);
        if let Some(placement) = self.by_id.get_mut(&id) {
            placement.pos = to;
        }
        if let Some(entity) = registry.get_mut(id) {
            entity.notify_moved(from, to);
        }
        true
    }

    /// In-bounds neighbors of `pos` in the given directions.
    pub fn neighbors(&self, pos: Position, dirs: &[Direction]) -> Vec<(Direction, Position)> {
        dirs.iter()
            .map(|&d| (d, pos.neighbor(d)))
            .filter(|(_, p)| self.valid(*p))
            .collect()
    }

    pub fn cardinal_neighbors(&self, pos: Position) -> Vec<(Direction, Position)> {
        self.neighbors(pos, &Direction::CARDINAL)
    }

    /// True iff the neighbor in `dir` is in bounds and empty.
    pub fn direction_clear(&self, pos: Position, dir: Direction) -> bool {
        let next = pos.neighbor(dir);
        self.valid(next) && !self.occupied(next)
    }

    /// Every position in z, y, x order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.depth).flat_map(move |z| {
            (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y, z)))
        })
    }

    /// All positions matching `pred`. Visits every cell.
    pub fn scan(&self, mut pred: impl FnMut(Position, Option<EntityId>) -> bool) -> Vec<Position> {
        self.positions()
            .filter(|&p| pred(p, self.get(p)))
            .collect()
    }

    /// First position (z, y, x order) matching `pred`.
    pub fn find_first(
        &self,
        mut pred: impl FnMut(Position, Option<EntityId>) -> bool,
    ) -> Option<Position> {
        self.positions().find(|&p| pred(p, self.get(p)))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Cell currently holding `id`.
    pub fn locate(&self, id: EntityId) -> Option<Position> {
        self.by_id.get(&id).map(|p| p.pos)
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.by_id.keys().copied()
    }

    /// Occupants that carried `role` when they were placed.
    pub fn entities_with_role(&self, role: Role) -> &[EntityId] {
        self.by_role.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Roles recorded for the occupant of `pos` when it was placed.
    pub fn roles_at(&self, pos: Position) -> &[Role] {
        self.get(pos)
            .and_then(|id| self.by_id.get(&id))
            .map(|p| p.roles.as_slice())
            .unwrap_or(&[])
    }

    /// Re-record a placed entity's roles from its current state. Returns
    /// false if the entity does not occupy a cell here.
    pub fn reindex(&mut self, entity: &Entity) -> bool {
        let Some(placement) = self.unindex(entity.id()) else {
            return false;
        };
        self.index_entity(entity, placement.pos);
        true
    }

    pub fn count_with_role(&self, role: Role) -> usize {
        self.entities_with_role(role).len()
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Empty every cell without firing hooks. Returns the evicted ids.
    pub fn clear(&mut self) -> Vec<EntityId> {
        let mut evicted: Vec<EntityId> = self.by_id.keys().copied().collect();
        evicted.sort();
        self.cells.iter_mut().for_each(|c| *c = None);
        self.by_id.clear();
        self.by_role.clear();
        evicted
    }

    pub fn stats(&self) -> GridStats {
        GridStats {
            name: self.name.clone(),
            dims: [self.width, self.height, self.depth],
            occupants: self.by_id.len(),
            by_role: self
                .by_role
                .iter()
                .filter(|(_, ids)| !ids.is_empty())
                .map(|(role, ids)| (*role, ids.len()))
                .collect(),
        }
    }

    fn index_entity(&mut self, entity: &Entity, pos: Position) {
        let roles: Vec<Role> = entity.roles().iter().copied().collect();
        for role in &roles {
            self.by_role.entry(*role).or_default().push(entity.id());
        }
        self.by_id.insert(
            entity.id(),
            Placement {
                pos,
                kind: entity.kind().to_owned(),
                roles,
            },
        );
    }

    fn unindex(&mut self, id: EntityId) -> Option<Placement> {
        let placement = self.by_id.remove(&id)?;
        for role in &placement.roles {
            if let Some(ids) = self.by_role.get_mut(role) {
                ids.retain(|other| *other != id);
            }
        }
        Some(placement)
    }

    /// Capture the grid's field set. Occupants missing from `registry` keep
    /// their cell reference but are left out of the entity list.
    pub fn snapshot(&self, registry: &Registry) -> GridSnapshot {
        let grid = (0..self.depth)
            .map(|z| {
                (0..self.height)
                    .map(|y| {
                        (0..self.width)
                            .map(|x| {
                                let id = self.get(Position::new(x, y, z))?;
                                let placement = self.by_id.get(&id)?;
                                Some(CellRef {
                                    kind: placement.kind.clone(),
                                    identity: id,
                                })
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();

        let mut ids: Vec<EntityId> = self.by_id.keys().copied().collect();
        ids.sort();
        let entities = ids
            .into_iter()
            .filter_map(|id| registry.get(id))
            .map(Entity::snapshot)
            .collect();

        GridSnapshot {
            name: self.name.clone(),
            description: self.description.clone(),
            width: self.width,
            height: self.height,
            depth: self.depth,
            grid,
            entities,
        }
    }
}

/// Summary counts for a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridStats {
    pub name: String,
    pub dims: [i32; 3],
    pub occupants: usize,
    pub by_role: BTreeMap<Role, usize>,
}

/// Reference to an occupant inside a grid snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub identity: EntityId,
}

/// Serializable field set of a grid. `grid` is indexed `[z][y][x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub grid: Vec<Vec<Vec<Option<CellRef>>>>,
    pub entities: Vec<EntitySnapshot>,
}

impl GridSnapshot {
    /// Occupied cells as `(position, identity)` pairs in z, y, x order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (Position, EntityId)> + '_ {
        self.grid.iter().enumerate().flat_map(|(z, plane)| {
            plane.iter().enumerate().flat_map(move |(y, row)| {
                row.iter().enumerate().filter_map(move |(x, cell)| {
                    cell.as_ref()
                        .map(|c| (Position::new(x as i32, y as i32, z as i32), c.identity))
                })
            })
        })
    }
}
