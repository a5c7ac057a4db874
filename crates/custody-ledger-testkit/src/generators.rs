//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use custody_ledger_core::{FieldValue, LinkHash, Payload, Record, RecordHash};

use crate::fixtures::build_chain_from;

/// Generate a payload field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}".prop_map(String::from)
}

/// Generate a non-container payload value. Floats are always finite.
pub fn scalar_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Integer),
        (-1.0e9f64..1.0e9f64).prop_map(FieldValue::Float),
        "[ -~]{0,24}".prop_map(FieldValue::Text),
    ]
}

/// Generate a payload value, nesting lists and maps a few levels deep.
pub fn field_value() -> impl Strategy<Value = FieldValue> {
    scalar_value().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(FieldValue::List),
            prop::collection::btree_map(field_name(), inner, 0..4).prop_map(FieldValue::Map),
        ]
    })
}

/// Generate an arbitrary payload.
pub fn payload() -> impl Strategy<Value = Payload> {
    prop::collection::btree_map(field_name(), field_value(), 0..6)
        .prop_map(|fields: BTreeMap<String, FieldValue>| Payload::from(fields))
}

/// Generate a lot identifier.
pub fn product_id() -> impl Strategy<Value = String> {
    "LOT-[0-9]{1,4}".prop_map(String::from)
}

/// Generate a custody status.
pub fn status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("MANUFACTURED"),
        Just("SHIPPED"),
        Just("IN_TRANSIT"),
        Just("DELIVERED"),
    ]
    .prop_map(String::from)
}

/// Generate a payload that satisfies the custody schema.
pub fn custody_payload() -> impl Strategy<Value = Payload> {
    (product_id(), status(), payload())
        .prop_map(|(id, status, extra)| extra.with("product_id", id).with("status", status))
}

/// Generate a reasonable timestamp (1970 to 2100).
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000i64
}

/// Generate a valid chain of 1 to `max_len` custody records.
pub fn chain(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    (
        prop::collection::vec(custody_payload(), 1..=max_len.max(1)),
        timestamp(),
    )
        .prop_map(|(payloads, start)| build_chain_from(start, payloads))
}

/// A way of editing a stored record in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Add a field to the payload.
    Payload,
    /// Move the timestamp by one millisecond.
    Timestamp,
    /// Point the link hash somewhere else.
    Link,
}

impl Mutation {
    /// Apply the edit. The stored self hash is left as it was.
    pub fn apply(self, record: &mut Record) {
        match self {
            Mutation::Payload => {
                // Generated field names never start with an underscore.
                record.payload.insert("_tampered", true);
            }
            Mutation::Timestamp => {
                record.timestamp = record.timestamp.wrapping_add(1);
            }
            Mutation::Link => {
                record.link_hash = match record.link_hash {
                    LinkHash::Genesis => LinkHash::Record(RecordHash::from_bytes([0xff; 32])),
                    LinkHash::Record(hash) => {
                        let mut bytes = *hash.as_bytes();
                        bytes[0] ^= 0x01;
                        LinkHash::Record(RecordHash::from_bytes(bytes))
                    }
                };
            }
        }
    }
}

/// Generate a mutation.
pub fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        Just(Mutation::Payload),
        Just(Mutation::Timestamp),
        Just(Mutation::Link),
    ]
}

/// A valid chain plus an edit to apply at one position.
#[derive(Debug, Clone)]
pub struct TamperCase {
    pub chain: Vec<Record>,
    pub position: usize,
    pub mutation: Mutation,
    /// Whether the editor also recomputed the edited record's self hash.
    pub rehash: bool,
}

impl TamperCase {
    /// The chain with the edit applied.
    pub fn tampered(&self) -> Vec<Record> {
        let mut chain = self.chain.clone();
        let record = &mut chain[self.position];
        self.mutation.apply(record);
        if self.rehash {
            record.self_hash = record.compute_hash();
        }
        chain
    }
}

/// Generate a tamper case over a chain of up to `max_len` records.
pub fn tamper_case(max_len: usize) -> impl Strategy<Value = TamperCase> {
    chain(max_len).prop_flat_map(|chain| {
        let len = chain.len();
        (Just(chain), 0..len, mutation(), any::<bool>()).prop_map(
            |(chain, position, mutation, rehash)| TamperCase {
                chain,
                position,
                mutation,
                rehash,
            },
        )
    })
}
