//! Persistence: whole-world snapshots, their encodings, and a file store.
//!
//! # Invariants
//! - A snapshot restores to a world with the same tick, maps, cell
//!   occupancy, entity field sets and atmosphere tiles.
//! - Restored identities are observed by the allocator, so new ids never
//!   collide with restored ones.
//! - Stored files are hash-chained; a mismatching hash fails the load.

pub mod codec;
pub mod error;
pub mod snapshot;
pub mod store;

pub use codec::{decode_cbor_zst, decode_json, encode_cbor_zst, encode_json, sha256_hex};
pub use error::PersistError;
pub use snapshot::{AtmosphereState, SNAPSHOT_SCHEMA_VERSION, WorldSnapshot};
pub use store::{IntegrityManifest, ManifestEntry, SnapshotStore, StoreMeta};
