//! Strong type definitions for the custody ledger.
//!
//! Hashes are newtypes so a link can never be confused with a self hash
//! or with arbitrary bytes.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A 32-byte record hash, computed as Blake3(domain || canonical_record_bytes).
///
/// Serialized as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordHash(pub [u8; 32]);

impl RecordHash {
    /// Create a new RecordHash from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RecordHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).map_err(|e| CoreError::InvalidHash(format!("{s:?}: {e}")))
    }
}

impl AsRef<[u8]> for RecordHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for RecordHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for RecordHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

impl Serialize for RecordHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecordHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The link from a record to its predecessor.
///
/// The genesis record links to nothing and renders as the sentinel `"0"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkHash {
    /// Sentinel link of the record at position 0.
    Genesis,
    /// Self hash of the record at `position - 1`.
    Record(RecordHash),
}

impl LinkHash {
    /// Textual form of the genesis sentinel.
    pub const GENESIS_SENTINEL: &'static str = "0";

    /// Check if this is the genesis sentinel.
    pub fn is_genesis(&self) -> bool {
        matches!(self, LinkHash::Genesis)
    }

    /// The predecessor hash, if any.
    pub fn record_hash(&self) -> Option<&RecordHash> {
        match self {
            LinkHash::Genesis => None,
            LinkHash::Record(hash) => Some(hash),
        }
    }
}

impl From<RecordHash> for LinkHash {
    fn from(hash: RecordHash) -> Self {
        LinkHash::Record(hash)
    }
}

impl From<Option<RecordHash>> for LinkHash {
    fn from(hash: Option<RecordHash>) -> Self {
        hash.map_or(LinkHash::Genesis, LinkHash::Record)
    }
}

impl fmt::Debug for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkHash::Genesis => write!(f, "LinkHash(genesis)"),
            LinkHash::Record(hash) => write!(f, "LinkHash({})", &hash.to_hex()[..16]),
        }
    }
}

impl fmt::Display for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkHash::Genesis => f.write_str(Self::GENESIS_SENTINEL),
            LinkHash::Record(hash) => fmt::Display::fmt(hash, f),
        }
    }
}

impl FromStr for LinkHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::GENESIS_SENTINEL {
            Ok(LinkHash::Genesis)
        } else {
            s.parse().map(LinkHash::Record)
        }
    }
}

impl Serialize for LinkHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LinkHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_hash_hex_roundtrip() {
        let hash = RecordHash::from_bytes([0x42; 32]);
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        let recovered = RecordHash::from_hex(&hex).unwrap();
        assert_eq!(hash, recovered);
    }

    #[test]
    fn test_record_hash_rejects_short_hex() {
        assert!(RecordHash::from_hex("abcd").is_err());
        assert!("abcd".parse::<RecordHash>().is_err());
    }

    #[test]
    fn test_record_hash_debug() {
        let hash = RecordHash::from_bytes([0xcd; 32]);
        assert_eq!(format!("{:?}", hash), "RecordHash(cdcdcdcdcdcdcdcd)");
    }

    #[test]
    fn test_link_hash_genesis_sentinel() {
        assert_eq!(LinkHash::Genesis.to_string(), "0");
        assert_eq!("0".parse::<LinkHash>().unwrap(), LinkHash::Genesis);
    }

    #[test]
    fn test_link_hash_json() {
        let hash = RecordHash::from_bytes([0xab; 32]);
        let link = LinkHash::Record(hash);

        let json = serde_json::to_string(&link).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<LinkHash>(&json).unwrap(), link);

        let genesis: LinkHash = serde_json::from_str("\"0\"").unwrap();
        assert!(genesis.is_genesis());
    }

    #[test]
    fn test_link_hash_from_option() {
        let hash = RecordHash::from_bytes([1; 32]);
        assert_eq!(LinkHash::from(None::<RecordHash>), LinkHash::Genesis);
        assert_eq!(LinkHash::from(Some(hash)).record_hash(), Some(&hash));
    }
}
