//! Payload fingerprints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// XXH3-128 digest of a byte payload, stored little-endian.
///
/// Snapshot headers record the digest of the bytes that follow them; a
/// mismatch on read means the file was cut short or edited by hand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Digest of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Lowercase hex, two characters per byte.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "ContentHash({}..)", &hex[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_payload_same_digest() {
        let groups = br#"{"a":{"area":4.0}}"#;
        assert_eq!(ContentHash::from_bytes(groups), ContentHash::from_bytes(groups));
    }

    #[test]
    fn one_byte_changes_digest() {
        assert_ne!(
            ContentHash::from_bytes(b"x_loc=10"),
            ContentHash::from_bytes(b"x_loc=11")
        );
    }

    #[test]
    fn hex_is_thirty_two_chars() {
        let hex = ContentHash::from_bytes(b"").to_hex();
        assert_eq!(hex.len(), 32);
        assert!(hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn debug_shows_prefix() {
        let h = ContentHash::from_bytes(b"final");
        let debug = format!("{h:?}");
        assert!(debug.starts_with("ContentHash("));
        assert!(h.to_string().starts_with(&debug["ContentHash(".len().."ContentHash(".len() + 8]));
    }
}
