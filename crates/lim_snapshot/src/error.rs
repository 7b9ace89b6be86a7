//! Error types for snapshot reads and writes.

use std::path::PathBuf;

/// Errors that can occur while reading or writing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// An I/O error occurred while reading or writing a snapshot file.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is too short or its header does not decode.
    #[error("invalid snapshot header in {path}: {reason}")]
    InvalidHeader {
        /// The snapshot file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The header was written for a different stage than the one requested.
    #[error("stage mismatch in {path}: expected {expected}, got {actual}")]
    StageMismatch {
        /// The snapshot file path.
        path: PathBuf,
        /// The stage the caller asked for.
        expected: String,
        /// The stage recorded in the header.
        actual: String,
    },

    /// The stored checksum does not match the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The snapshot file path.
        path: PathBuf,
        /// The checksum recorded in the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// The snapshot format version is not the one this build writes.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The snapshot file path.
        path: PathBuf,
        /// The format version this build understands.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// Encoding or decoding the payload failed.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = SnapshotError::Io {
            path: PathBuf::from("/tmp/snap/placed.snap"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("snapshot I/O error"));
        assert!(msg.contains("placed.snap"));
    }

    #[test]
    fn stage_mismatch_display() {
        let err = SnapshotError::StageMismatch {
            path: PathBuf::from("final.snap"),
            expected: "final".to_string(),
            actual: "placed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected final"));
        assert!(msg.contains("got placed"));
    }

    #[test]
    fn version_mismatch_display() {
        let err = SnapshotError::VersionMismatch {
            path: PathBuf::from("old.snap"),
            expected: 2,
            actual: 1,
        };
        assert!(err.to_string().contains("expected 2"));
    }
}
