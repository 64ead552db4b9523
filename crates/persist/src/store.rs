//! File-backed snapshot store.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json              - schema version and counters
//! snapshots/
//!   000001.snapshot.cbor.zst   - CBOR+zstd compressed world snapshots
//! events/
//!   000001.log.cbor.zst        - CBOR+zstd compressed world event segments
//! integrity/
//!   manifest.json              - sha256 hash chain over every written file
//! ```

use locus_kernel::WorldEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::codec::{decode_cbor_zst, encode_cbor_zst, sha256_hex};
use crate::error::PersistError;
use crate::snapshot::{SNAPSHOT_SCHEMA_VERSION, WorldSnapshot};

const META_FILE: &str = "store.meta.json";
const MANIFEST_FILE: &str = "manifest.json";

/// Contents of `store.meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
    pub snapshot_count: u32,
    pub event_segment_count: u32,
}

/// One written file in the hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

impl IntegrityManifest {
    fn entry(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.filename == filename)
    }
}

/// Directory of numbered snapshots and event segments with a hash chain.
///
/// Every read is checked against the manifest; a file that is missing from
/// the manifest or whose hash differs is refused.
#[derive(Debug)]
pub struct SnapshotStore {
    root: PathBuf,
    meta: StoreMeta,
    manifest: IntegrityManifest,
}

impl SnapshotStore {
    /// Open the store at `path`, creating an empty one if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("snapshots"))?;
        std::fs::create_dir_all(root.join("events"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join(META_FILE);
        let manifest_path = root.join("integrity").join(MANIFEST_FILE);

        let store = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != SNAPSHOT_SCHEMA_VERSION {
                return Err(PersistError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: SNAPSHOT_SCHEMA_VERSION,
                });
            }
            let manifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                warn!(root = %root.display(), "manifest missing, every stored file will be refused");
                IntegrityManifest::default()
            };
            Self {
                root,
                meta,
                manifest,
            }
        } else {
            let store = Self {
                root,
                meta: StoreMeta {
                    schema_version: SNAPSHOT_SCHEMA_VERSION,
                    snapshot_count: 0,
                    event_segment_count: 0,
                },
                manifest: IntegrityManifest::default(),
            };
            store.save_meta()?;
            store.save_manifest()?;
            info!(root = %store.root.display(), "snapshot store created");
            store
        };
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn manifest(&self) -> &IntegrityManifest {
        &self.manifest
    }

    pub fn snapshot_count(&self) -> u32 {
        self.meta.snapshot_count
    }

    /// Write `snapshot` as the next numbered file. Returns its index.
    pub fn save(&mut self, snapshot: &WorldSnapshot) -> Result<u32, PersistError> {
        let index = self.meta.snapshot_count + 1;
        let dir = self.root.join("snapshots");
        self.write_chained(&dir, &snapshot_filename(index), snapshot)?;
        self.meta.snapshot_count = index;
        self.save_meta()?;
        info!(index, tick = snapshot.tick, "snapshot saved");
        Ok(index)
    }

    /// Load snapshot `index` (1-based), verifying its hash first.
    pub fn load(&self, index: u32) -> Result<WorldSnapshot, PersistError> {
        if index == 0 || index > self.meta.snapshot_count {
            return Err(PersistError::MissingSnapshot(index));
        }
        self.read_verified(&self.root.join("snapshots"), &snapshot_filename(index))
    }

    pub fn load_latest(&self) -> Result<WorldSnapshot, PersistError> {
        if self.meta.snapshot_count == 0 {
            return Err(PersistError::NoSnapshots);
        }
        self.load(self.meta.snapshot_count)
    }

    /// Append drained world events as a new segment. Empty input writes
    /// nothing and returns `None`.
    pub fn append_events(&mut self, events: &[WorldEvent]) -> Result<Option<u32>, PersistError> {
        if events.is_empty() {
            return Ok(None);
        }
        let index = self.meta.event_segment_count + 1;
        let dir = self.root.join("events");
        self.write_chained(&dir, &segment_filename(index), events)?;
        self.meta.event_segment_count = index;
        self.save_meta()?;
        debug!(index, events = events.len(), "event segment appended");
        Ok(Some(index))
    }

    /// Every stored event, oldest segment first.
    pub fn load_events(&self) -> Result<Vec<WorldEvent>, PersistError> {
        let mut events = Vec::new();
        for index in 1..=self.meta.event_segment_count {
            let segment: Vec<WorldEvent> =
                self.read_verified(&self.root.join("events"), &segment_filename(index))?;
            events.extend(segment);
        }
        Ok(events)
    }

    /// Walk the whole chain: link continuity plus every file's hash.
    pub fn verify_integrity(&self) -> Result<(), PersistError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash != prev_hash {
                return Err(PersistError::IntegrityMismatch {
                    file: entry.filename.clone(),
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }
            let data = std::fs::read(self.path_of(&entry.filename))?;
            let actual = sha256_hex(&data);
            if actual != entry.sha256 {
                return Err(PersistError::IntegrityMismatch {
                    file: entry.filename.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    fn write_chained<T: Serialize + ?Sized>(
        &mut self,
        dir: &Path,
        filename: &str,
        value: &T,
    ) -> Result<(), PersistError> {
        let compressed = encode_cbor_zst(value)?;
        let sha256 = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());
        std::fs::write(dir.join(filename), &compressed)?;
        self.manifest.entries.push(ManifestEntry {
            filename: filename.to_owned(),
            sha256,
            prev_hash,
        });
        self.save_manifest()
    }

    fn read_verified<T: DeserializeOwned>(
        &self,
        dir: &Path,
        filename: &str,
    ) -> Result<T, PersistError> {
        let compressed = std::fs::read(dir.join(filename))?;
        let actual = sha256_hex(&compressed);
        match self.manifest.entry(filename) {
            Some(entry) if entry.sha256 == actual => decode_cbor_zst(&compressed),
            Some(entry) => Err(PersistError::IntegrityMismatch {
                file: filename.to_owned(),
                expected: entry.sha256.clone(),
                actual,
            }),
            None => Err(PersistError::IntegrityMismatch {
                file: filename.to_owned(),
                expected: "manifest entry".into(),
                actual,
            }),
        }
    }

    fn path_of(&self, filename: &str) -> PathBuf {
        if filename.contains(".snapshot.") {
            self.root.join("snapshots").join(filename)
        } else {
            self.root.join("events").join(filename)
        }
    }

    fn save_meta(&self) -> Result<(), PersistError> {
        let path = self.root.join(META_FILE);
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), PersistError> {
        let path = self.root.join("integrity").join(MANIFEST_FILE);
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn snapshot_filename(index: u32) -> String {
    format!("{index:06}.snapshot.cbor.zst")
}

fn segment_filename(index: u32) -> String {
    format!("{index:06}.log.cbor.zst")
}
