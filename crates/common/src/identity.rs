use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique numeric identifier for an entity. `0` is reserved as invalid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const INVALID: EntityId = EntityId(0);

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity handle: the numeric id plus the kind of entity it was issued for.
///
/// Equality and hashing use the numeric id only. Validity is derived from the
/// id, so an `Identity` can never be "valid" while carrying id `0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: EntityId,
    pub kind: String,
}

impl Identity {
    pub fn new(id: EntityId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
        }
    }

    /// An identity that has not been issued yet.
    pub fn invalid(kind: impl Into<String>) -> Self {
        Self::new(EntityId::INVALID, kind)
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}_{}", self.kind, self.id.0)
        } else {
            f.write_str("invalid")
        }
    }
}

/// Issues strictly increasing entity ids.
///
/// Safe to share between threads (e.g. behind an `Arc`). Network or loader
/// threads may allocate while the tick thread runs.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    last: AtomicU64,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start issuing ids after `last`.
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Issue a fresh identity for an entity of `kind`.
    pub fn allocate(&self, kind: impl Into<String>) -> Identity {
        Identity::new(self.next_id(), kind)
    }

    /// Issue a fresh numeric id.
    pub fn next_id(&self) -> EntityId {
        EntityId(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The id the next call to [`IdentityAllocator::next_id`] would return,
    /// assuming no concurrent allocation.
    pub fn peek_next(&self) -> EntityId {
        EntityId(self.last.load(Ordering::SeqCst) + 1)
    }

    /// Record an externally supplied id (e.g. from a snapshot) so later
    /// allocations are always greater than it.
    pub fn observe(&self, id: EntityId) {
        self.last.fetch_max(id.0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_start_at_one_and_increase() {
        let alloc = IdentityAllocator::new();
        let a = alloc.allocate("object");
        let b = alloc.allocate("object");
        assert_eq!(a.id, EntityId(1));
        assert_eq!(b.id, EntityId(2));
        assert!(a.is_valid());
        assert_eq!(alloc.peek_next(), EntityId(3));
    }

    #[test]
    fn zero_is_invalid() {
        assert!(!EntityId::INVALID.is_valid());
        assert!(!Identity::invalid("object").is_valid());
        assert_eq!(Identity::invalid("object").to_string(), "invalid");
    }

    #[test]
    fn identity_equality_ignores_kind() {
        let a = Identity::new(EntityId(7), "turf");
        let b = Identity::new(EntityId(7), "mob");
        assert_eq!(a, b);
        assert_ne!(a, Identity::new(EntityId(8), "turf"));
    }

    #[test]
    fn observe_skips_past_supplied_ids() {
        let alloc = IdentityAllocator::new();
        alloc.observe(EntityId(41));
        assert_eq!(alloc.next_id(), EntityId(42));
        alloc.observe(EntityId(3));
        assert_eq!(alloc.next_id(), EntityId(43));
    }

    #[test]
    fn concurrent_allocation_yields_distinct_increasing_ids() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;
        let alloc = IdentityAllocator::new();

        let per_thread: Vec<Vec<EntityId>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| s.spawn(|| (0..PER_THREAD).map(|_| alloc.next_id()).collect()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("allocator thread panicked"))
                .collect()
        });

        let mut seen = HashSet::new();
        for ids in &per_thread {
            // Each caller observes its own ids strictly increasing.
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in ids {
                assert!(seen.insert(*id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), THREADS * PER_THREAD);
        assert_eq!(seen.iter().max(), Some(&EntityId((THREADS * PER_THREAD) as u64)));
    }
}
