//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical record encoding byte for byte, so any
//! change to it shows up as a failed vector rather than as silently
//! different hashes.

use custody_ledger_core::{canonical_record_bytes, record_hash, LinkHash, Payload, RecordHash};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Position of the record.
    pub position: u64,
    /// Link hash bytes, `None` for genesis.
    pub link: Option<[u8; 32]>,
    /// Timestamp (Unix ms).
    pub timestamp: i64,
    /// Payload as JSON.
    pub payload_json: &'static str,
    /// Expected canonical record bytes (hex).
    pub expected_canonical: &'static str,
}

impl GoldenVector {
    pub fn link_hash(&self) -> LinkHash {
        LinkHash::from(self.link.map(RecordHash::from_bytes))
    }

    pub fn payload(&self) -> Result<Payload, serde_json::Error> {
        serde_json::from_str(self.payload_json)
    }

    /// Canonical bytes of the vector's record.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        Ok(canonical_record_bytes(
            self.position,
            &self.link_hash(),
            self.timestamp,
            &self.payload()?,
        ))
    }

    /// Self hash of the vector's record.
    pub fn hash(&self) -> Result<RecordHash, serde_json::Error> {
        Ok(record_hash(
            self.position,
            &self.link_hash(),
            self.timestamp,
            &self.payload()?,
        ))
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "genesis custody event",
            position: 0,
            link: None,
            timestamp: 1736870400000, // 2025-01-14T16:00:00Z
            payload_json: r#"{"status":"MANUFACTURED","product_id":"LOT-1"}"#,
            expected_canonical: "a50001010002f6031b00000194658b100004a2667374617475736c4d414e5546414354555245446a70726f647563745f6964654c4f542d31",
        },
        GoldenVector {
            name: "successor with nested location",
            position: 1,
            link: Some([0x11; 32]),
            timestamp: 1736870401000,
            payload_json: r#"{"product_id":"LOT-1","status":"SHIPPED","location":{"lng":100.5018,"lat":13.7563}}"#,
            expected_canonical: "a5000101010258201111111111111111111111111111111111111111111111111111111111111111031b00000194658b13e804a3667374617475736753484950504544686c6f636174696f6ea2636c6174fb402b8339c0ebedfa636c6e67fb4059201d7dbf48806a70726f647563745f6964654c4f542d31",
        },
        GoldenVector {
            name: "empty payload at epoch",
            position: 0,
            link: None,
            timestamp: 0,
            payload_json: "{}",
            expected_canonical: "a50001010002f6030004a0",
        },
        GoldenVector {
            name: "negative numbers, nulls and lists",
            position: 24,
            link: Some([0xab; 32]),
            timestamp: -1,
            payload_json: r#"{"tags":["a",null,true],"qty":-25,"note":null}"#,
            expected_canonical: "a50001011818025820abababababababababababababababababababababababababababababababab032004a3637174793818646e6f7465f66474616773836161f6f5",
        },
    ]
}

/// Verify all golden vectors.
///
/// Returns `(name, passed, detail)` for each vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .into_iter()
        .map(|vector| {
            let name = vector.name.to_string();
            match vector.canonical_bytes() {
                Err(e) => (name, false, format!("bad payload json: {e}")),
                Ok(bytes) => {
                    let actual = hex::encode(bytes);
                    if actual == vector.expected_canonical {
                        (name, true, String::new())
                    } else {
                        (
                            name,
                            false,
                            format!("expected {}, got {}", vector.expected_canonical, actual),
                        )
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_vectors_pass() {
        for (name, passed, detail) in verify_all_vectors() {
            assert!(passed, "vector {name:?} failed: {detail}");
        }
    }

    #[test]
    fn test_vector_hashes_distinct() {
        let hashes: HashSet<RecordHash> = all_vectors()
            .iter()
            .map(|v| v.hash().unwrap())
            .collect();
        assert_eq!(hashes.len(), all_vectors().len());
    }

    #[test]
    fn test_vector_hash_is_domain_separated_blake3() {
        let vector = &all_vectors()[0];
        let bytes = hex::decode(vector.expected_canonical).unwrap();

        let mut hasher = blake3::Hasher::new();
        hasher.update(custody_ledger_core::HASH_DOMAIN);
        hasher.update(&bytes);
        assert_eq!(vector.hash().unwrap().as_bytes(), hasher.finalize().as_bytes());
    }
}
