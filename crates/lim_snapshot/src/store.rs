//! Stage-keyed snapshot files.
//!
//! Each snapshot is stored at `<dir>/<stage>.snap` with a binary header
//! carrying magic bytes, format version, the stage it was written for, the
//! tool version and a checksum of the payload.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use lim_common::ContentHash;
use lim_place::AreaGroup;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Magic bytes identifying a snapshot file.
const SNAPSHOT_MAGIC: [u8; 4] = *b"LIMS";

/// Current snapshot format version. Increment on breaking changes to the
/// header or payload layout.
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Extension used for snapshot files.
const SNAPSHOT_EXT: &str = "snap";

/// The payload of a snapshot: area groups keyed by name.
pub type Snapshot = BTreeMap<String, AreaGroup>;

/// The stage of a link run a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Groups after constraint parsing and area elaboration.
    Elaborated,
    /// Groups after the placement solve.
    Placed,
    /// Placed groups annotated with their merge-tree instance paths.
    Final,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 3] = [Stage::Elaborated, Stage::Placed, Stage::Final];

    /// The file stem used for this stage.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Elaborated => "elaborated",
            Stage::Placed => "placed",
            Stage::Final => "final",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header prepended to every snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Magic bytes: must be `b"LIMS"`.
    pub magic: [u8; 4],
    /// Snapshot format version.
    pub format_version: u32,
    /// Stage the payload was written for.
    pub stage: Stage,
    /// Version of the tool that wrote the file.
    pub tool_version: String,
    /// Content hash of the payload bytes.
    pub checksum: ContentHash,
}

/// Reads and writes stage snapshots under one directory.
pub struct SnapshotStore {
    dir: PathBuf,
    tool_version: String,
}

impl SnapshotStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Returns the root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path for a stage.
    pub fn path(&self, stage: Stage) -> PathBuf {
        self.dir.join(format!("{stage}.{SNAPSHOT_EXT}"))
    }

    /// Returns `true` if a file exists for the stage.
    pub fn exists(&self, stage: Stage) -> bool {
        self.path(stage).is_file()
    }

    /// Writes `groups` as the snapshot for `stage`, replacing any previous
    /// file atomically. Returns the written path.
    pub fn write(&self, stage: Stage, groups: &Snapshot) -> Result<PathBuf, SnapshotError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SnapshotError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let payload = bincode::serde::encode_to_vec(groups, bincode::config::standard())
            .map_err(|e| SnapshotError::Serialization {
                reason: e.to_string(),
            })?;

        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            format_version: SNAPSHOT_FORMAT_VERSION,
            stage,
            tool_version: self.tool_version.clone(),
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| SnapshotError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        let path = self.path(stage);
        let staging = self.dir.join(format!(".{stage}.{SNAPSHOT_EXT}.tmp"));
        std::fs::write(&staging, &output).map_err(|e| SnapshotError::Io {
            path: staging.clone(),
            source: e,
        })?;
        std::fs::rename(&staging, &path).map_err(|e| SnapshotError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(
            stage = %stage,
            groups = groups.len(),
            path = %path.display(),
            "wrote snapshot"
        );
        Ok(path)
    }

    /// Deletes the snapshot for `stage`. Returns `false` if there was none.
    pub fn remove(&self, stage: Stage) -> Result<bool, SnapshotError> {
        let path = self.path(stage);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(stage = %stage, path = %path.display(), "removed snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SnapshotError::Io { path, source }),
        }
    }

    /// Reads the snapshot for `stage`, validating its header and checksum.
    pub fn read(&self, stage: Stage) -> Result<Snapshot, SnapshotError> {
        let path = self.path(stage);
        let raw = std::fs::read(&path).map_err(|e| SnapshotError::Io {
            path: path.clone(),
            source: e,
        })?;
        let (header, payload) = split_header(&path, &raw)?;

        if header.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidHeader {
                path,
                reason: "bad magic bytes".to_string(),
            });
        }
        if header.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                path,
                expected: SNAPSHOT_FORMAT_VERSION,
                actual: header.format_version,
            });
        }
        if header.stage != stage {
            return Err(SnapshotError::StageMismatch {
                path,
                expected: stage.to_string(),
                actual: header.stage.to_string(),
            });
        }
        let actual = ContentHash::from_bytes(payload);
        if actual != header.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                path,
                expected: header.checksum.to_string(),
                actual: actual.to_string(),
            });
        }

        let (groups, _): (Snapshot, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(
                |e| SnapshotError::Serialization {
                    reason: e.to_string(),
                },
            )?;
        Ok(groups)
    }

    /// Reads the snapshot for `stage`, treating a missing or invalid file as
    /// absent. Used for optional seeding from a previous run.
    pub fn try_read(&self, stage: Stage) -> Option<Snapshot> {
        if !self.exists(stage) {
            return None;
        }
        match self.read(stage) {
            Ok(groups) => Some(groups),
            Err(err) => {
                tracing::warn!(stage = %stage, "ignoring unreadable snapshot: {err}");
                None
            }
        }
    }
}

fn split_header<'a>(
    path: &Path,
    raw: &'a [u8],
) -> Result<(SnapshotHeader, &'a [u8]), SnapshotError> {
    let invalid = |reason: &str| SnapshotError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let len_bytes: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid("file shorter than header length"))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_bytes = raw
        .get(4..4 + header_len)
        .ok_or_else(|| invalid("truncated header"))?;
    let (header, _): (SnapshotHeader, usize) =
        bincode::serde::decode_from_slice(header_bytes, bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;
    Ok((header, &raw[4 + header_len..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lim_place::Dimension;

    fn sample() -> Snapshot {
        let mut groups = Snapshot::new();
        let mut alu = AreaGroup::new("alu");
        alu.area = 400.0;
        alu.source_path = Some("top/core/alu".to_string());
        alu.dimension = Dimension::Fixed {
            width: 20.0,
            height: 20.0,
        };
        alu.place(10.0, 10.0, 20.0, 20.0);
        groups.insert(alu.name.clone(), alu);
        let mut mem = AreaGroup::new("mem");
        mem.area = 100.0;
        mem.attributes
            .insert("kind".to_string(), "bram".to_string());
        groups.insert(mem.name.clone(), mem);
        groups
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let path = store.write(Stage::Placed, &sample()).unwrap();
        assert_eq!(path, dir.path().join("placed.snap"));
        assert_eq!(store.read(Stage::Placed).unwrap(), sample());
    }

    #[test]
    fn remove_deletes_only_that_stage() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write(Stage::Elaborated, &sample()).unwrap();
        store.write(Stage::Placed, &sample()).unwrap();
        assert!(store.remove(Stage::Placed).unwrap());
        assert!(!store.exists(Stage::Placed));
        assert!(store.try_read(Stage::Placed).is_none());
        assert!(store.exists(Stage::Elaborated));
        assert!(!store.remove(Stage::Placed).unwrap());
    }

    #[test]
    fn write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&dir.path().join("nested").join("snaps"));
        store.write(Stage::Elaborated, &sample()).unwrap();
        assert!(store.exists(Stage::Elaborated));
        assert!(!store.exists(Stage::Final));
    }

    #[test]
    fn rewrite_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write(Stage::Final, &sample()).unwrap();
        store.write(Stage::Final, &Snapshot::new()).unwrap();
        assert!(store.read(Stage::Final).unwrap().is_empty());
        assert!(!dir.path().join(".final.snap.tmp").exists());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(matches!(
            store.read(Stage::Placed),
            Err(SnapshotError::Io { .. })
        ));
        assert!(store.try_read(Stage::Placed).is_none());
    }

    #[test]
    fn corrupt_payload_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let path = store.write(Stage::Placed, &sample()).unwrap();
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        std::fs::write(&path, &raw).unwrap();
        assert!(matches!(
            store.read(Stage::Placed),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
        assert!(store.try_read(Stage::Placed).is_none());
    }

    #[test]
    fn truncated_file_is_invalid_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        std::fs::write(store.path(Stage::Placed), [1u8, 0]).unwrap();
        assert!(matches!(
            store.read(Stage::Placed),
            Err(SnapshotError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn stage_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write(Stage::Placed, &sample()).unwrap();
        std::fs::copy(store.path(Stage::Placed), store.path(Stage::Final)).unwrap();
        assert!(matches!(
            store.read(Stage::Final),
            Err(SnapshotError::StageMismatch { .. })
        ));
    }

    #[test]
    fn stage_names() {
        let names: Vec<_> = Stage::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["elaborated", "placed", "final"]);
    }
}
