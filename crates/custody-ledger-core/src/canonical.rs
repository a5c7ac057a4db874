//! Canonical CBOR encoding for deterministic hashing.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - Floats always use the 64-bit form (`0xfb`), and must be finite
//!
//! The canonical encoding is critical: a record's self hash is only
//! reproducible if the same fields produce identical bytes on every read,
//! on every platform, forever. The encoding is versioned through
//! [`ENCODING_VERSION`], which is itself part of the hashed bytes.

use ciborium::value::Value;

use crate::error::CoreError;
use crate::payload::{FieldValue, Payload};
use crate::types::LinkHash;

/// Version of the record encoding. Bump only together with a migration.
pub const ENCODING_VERSION: u64 = 1;

/// Record field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const POSITION: u64 = 1;
    pub const LINK_HASH: u64 = 2;
    pub const TIMESTAMP: u64 = 3;
    pub const PAYLOAD: u64 = 4;
}

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

const SIMPLE_FALSE: u8 = 0xf4;
const SIMPLE_TRUE: u8 = 0xf5;
const SIMPLE_NULL: u8 = 0xf6;
const FLOAT64: u8 = 0xfb;

/// Encode the hashed fields of a record to canonical CBOR bytes.
///
/// Layout: `{0: version, 1: position, 2: link_hash | null, 3: timestamp, 4: payload}`.
pub fn canonical_record_bytes(
    position: u64,
    link_hash: &LinkHash,
    timestamp: i64,
    payload: &Payload,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);

    // Keys are written in ascending order, which is already canonical.
    encode_uint(&mut buf, MAJOR_MAP, 5);

    encode_uint(&mut buf, MAJOR_UINT, keys::VERSION);
    encode_uint(&mut buf, MAJOR_UINT, ENCODING_VERSION);

    encode_uint(&mut buf, MAJOR_UINT, keys::POSITION);
    encode_uint(&mut buf, MAJOR_UINT, position);

    encode_uint(&mut buf, MAJOR_UINT, keys::LINK_HASH);
    match link_hash {
        LinkHash::Genesis => buf.push(SIMPLE_NULL),
        LinkHash::Record(hash) => encode_bytes(&mut buf, hash.as_bytes()),
    }

    encode_uint(&mut buf, MAJOR_UINT, keys::TIMESTAMP);
    encode_int(&mut buf, timestamp);

    encode_uint(&mut buf, MAJOR_UINT, keys::PAYLOAD);
    encode_payload(&mut buf, payload);

    buf
}

/// Encode a payload on its own (a canonical CBOR map with text keys).
///
/// Stores persist these bytes so that what is read back is exactly what was hashed.
pub fn payload_bytes(payload: &Payload) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_payload(&mut buf, payload);
    buf
}

fn encode_payload(buf: &mut Vec<u8>, payload: &Payload) {
    encode_map_canonical(buf, payload.iter());
}

/// Recursively encode a payload value.
fn encode_field(buf: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::Null => buf.push(SIMPLE_NULL),
        FieldValue::Bool(b) => buf.push(if *b { SIMPLE_TRUE } else { SIMPLE_FALSE }),
        FieldValue::Integer(i) => encode_int(buf, *i),
        FieldValue::Float(f) => {
            buf.push(FLOAT64);
            buf.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        FieldValue::Text(s) => encode_text(buf, s),
        FieldValue::List(items) => {
            encode_uint(buf, MAJOR_ARRAY, items.len() as u64);
            for item in items {
                encode_field(buf, item);
            }
        }
        FieldValue::Map(entries) => encode_map_canonical(buf, entries.iter()),
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_int(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, MAJOR_UINT, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, MAJOR_NINT, !(n as u64));
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, MAJOR_BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, MAJOR_TEXT, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a text-keyed map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison, so shorter keys sort
/// first regardless of the caller's map ordering.
fn encode_map_canonical<'a>(
    buf: &mut Vec<u8>,
    entries: impl Iterator<Item = (&'a String, &'a FieldValue)>,
) {
    let mut pairs: Vec<(Vec<u8>, &FieldValue)> = entries
        .map(|(k, v)| {
            let mut key_buf = Vec::with_capacity(k.len() + 1);
            encode_text(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, MAJOR_MAP, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_field(buf, value);
    }
}

/// Decode payload bytes produced by [`payload_bytes`].
///
/// Bytes that parse but are not in canonical form are rejected, since
/// re-hashing them would not reproduce the stored self hash.
pub fn decode_payload(bytes: &[u8]) -> Result<Payload, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))?;

    let payload = match value_to_field(value)? {
        FieldValue::Map(entries) => Payload::from(entries),
        _ => return Err(CoreError::MalformedRecord("payload is not a map".into())),
    };

    if payload_bytes(&payload) != bytes {
        return Err(CoreError::Decoding("payload bytes are not canonical".into()));
    }

    Ok(payload)
}

/// Convert a decoded CBOR value into a payload value.
fn value_to_field(value: Value) -> Result<FieldValue, CoreError> {
    match value {
        Value::Null => Ok(FieldValue::Null),
        Value::Bool(b) => Ok(FieldValue::Bool(b)),
        Value::Integer(i) => {
            let n: i128 = i.into();
            i64::try_from(n)
                .map(FieldValue::Integer)
                .map_err(|_| CoreError::Decoding(format!("integer out of range: {n}")))
        }
        Value::Float(f) => Ok(FieldValue::Float(f)),
        Value::Text(s) => Ok(FieldValue::Text(s)),
        Value::Array(items) => items
            .into_iter()
            .map(value_to_field)
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::List),
        Value::Map(entries) => {
            let mut map = std::collections::BTreeMap::new();
            for (k, v) in entries {
                let key = match k {
                    Value::Text(s) => s,
                    _ => return Err(CoreError::MalformedRecord("map key is not text".into())),
                };
                if map.insert(key.clone(), value_to_field(v)?).is_some() {
                    return Err(CoreError::MalformedRecord(format!("duplicate key: {key}")));
                }
            }
            Ok(FieldValue::Map(map))
        }
        other => Err(CoreError::Decoding(format!(
            "unsupported CBOR value in payload: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordHash;

    fn shipped() -> Payload {
        Payload::new()
            .with("product_id", "LOT-1")
            .with("status", "SHIPPED")
    }

    #[test]
    fn test_integer_encoding() {
        // Test smallest encoding for various integer sizes
        let mut buf = Vec::new();

        // 0-23: single byte
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        // 24-255: two bytes
        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        // 256-65535: three bytes
        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 65535);
        assert_eq!(buf, vec![0x19, 0xff, 0xff]);
    }

    #[test]
    fn test_negative_integer_encoding() {
        let mut buf = Vec::new();
        encode_int(&mut buf, -1);
        assert_eq!(buf, vec![0x20]);

        buf.clear();
        encode_int(&mut buf, -25);
        assert_eq!(buf, vec![0x38, 24]);

        buf.clear();
        encode_int(&mut buf, i64::MIN);
        assert_eq!(buf[0], 0x3b);
        assert_eq!(&buf[1..], &(i64::MAX as u64).to_be_bytes());
    }

    #[test]
    fn test_float_always_64_bit() {
        let mut buf = Vec::new();
        encode_field(&mut buf, &FieldValue::Float(1.5));
        assert_eq!(buf, vec![0xfb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_map_key_ordering() {
        // "id" (0x62...) sorts before "status" (0x66...) by encoded length prefix
        let payload = Payload::new().with("status", "A").with("id", "B");
        let bytes = payload_bytes(&payload);

        assert_eq!(bytes[0], 0xa2);
        assert_eq!(&bytes[1..4], &[0x62, b'i', b'd']);
    }

    #[test]
    fn test_genesis_record_layout() {
        let payload = Payload::new().with("status", "MANUFACTURED");
        let bytes = canonical_record_bytes(0, &LinkHash::Genesis, 1736870400000, &payload);

        let mut expected = vec![
            0xa5, // map(5)
            0x00, 0x01, // version: 1
            0x01, 0x00, // position: 0
            0x02, 0xf6, // link_hash: null
            0x03, 0x1b, 0x00, 0x00, 0x01, 0x94, 0x65, 0x8b, 0x10, 0x00, // timestamp
            0x04, 0xa1, // payload: map(1)
            0x66, // text(6)
        ];
        expected.extend_from_slice(b"status");
        expected.push(0x6c); // text(12)
        expected.extend_from_slice(b"MANUFACTURED");

        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_link_hash_encoded_as_bytes() {
        let link = LinkHash::Record(RecordHash::from_bytes([0xab; 32]));
        let bytes = canonical_record_bytes(1, &link, 0, &Payload::new());

        // map(5), 0:1, 1:1, then key 2 followed by bytes(32)
        assert_eq!(&bytes[..7], &[0xa5, 0x00, 0x01, 0x01, 0x01, 0x02, 0x58]);
        assert_eq!(bytes[7], 32);
        assert_eq!(&bytes[8..40], &[0xab; 32]);
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let b1 = canonical_record_bytes(3, &LinkHash::Genesis, 1000, &shipped());
        let b2 = canonical_record_bytes(3, &LinkHash::Genesis, 1000, &shipped());
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_every_field_changes_bytes() {
        let link = LinkHash::Record(RecordHash::from_bytes([1; 32]));
        let base = canonical_record_bytes(1, &link, 1000, &shipped());

        let other_link = LinkHash::Record(RecordHash::from_bytes([2; 32]));
        assert_ne!(base, canonical_record_bytes(2, &link, 1000, &shipped()));
        assert_ne!(base, canonical_record_bytes(1, &other_link, 1000, &shipped()));
        assert_ne!(base, canonical_record_bytes(1, &link, 1001, &shipped()));
        assert_ne!(
            base,
            canonical_record_bytes(1, &link, 1000, &shipped().with("status", "STOLEN"))
        );
    }

    #[test]
    fn test_payload_decode_roundtrip() {
        let mut location = std::collections::BTreeMap::new();
        location.insert("lat".to_string(), FieldValue::Float(13.75));
        location.insert("lng".to_string(), FieldValue::Float(100.5));

        let payload = shipped()
            .with("qty", -4i64)
            .with("tags", FieldValue::List(vec!["a".into(), FieldValue::Null]))
            .with("location", FieldValue::Map(location));

        let bytes = payload_bytes(&payload);
        assert_eq!(decode_payload(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        // map(1) {"a": 1} with the integer in a needlessly long form
        let bytes = vec![0xa1, 0x61, b'a', 0x18, 0x01];
        assert!(matches!(decode_payload(&bytes), Err(CoreError::Decoding(_))));
    }

    #[test]
    fn test_decode_rejects_non_map() {
        let bytes = vec![0x01];
        assert!(matches!(
            decode_payload(&bytes),
            Err(CoreError::MalformedRecord(_))
        ));
    }
}
