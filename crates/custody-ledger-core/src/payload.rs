//! Payload: the caller-defined content of a record.
//!
//! The core treats a payload as an ordered mapping of named fields. Field
//! order never influences hashing; see [`crate::canonical`] for the encoding.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PayloadError;

/// A single payload value.
///
/// Maps directly onto JSON. Integers must fit in `i64`; a larger one is a
/// deserialization error rather than a silently rounded float.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Get the text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the float value, accepting integers as well.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Check if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Find the first non-finite float, returning its path.
    fn find_non_finite(&self, path: &str) -> Option<String> {
        match self {
            FieldValue::Float(f) if !f.is_finite() => Some(path.to_string()),
            FieldValue::List(items) => items
                .iter()
                .enumerate()
                .find_map(|(i, item)| item.find_non_finite(&format!("{path}[{i}]"))),
            FieldValue::Map(entries) => entries
                .iter()
                .find_map(|(key, value)| value.find_non_finite(&format!("{path}.{key}"))),
            _ => None,
        }
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value with integers in the i64 range")
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FieldValue, D::Error> {
        FieldValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Integer(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<FieldValue, E> {
        i64::try_from(u)
            .map(FieldValue::Integer)
            .map_err(|_| E::custom(format!("integer {u} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FieldValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(FieldValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FieldValue, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, FieldValue>()? {
            entries.insert(key, value);
        }
        Ok(FieldValue::Map(entries))
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl From<Payload> for FieldValue {
    fn from(payload: Payload) -> Self {
        FieldValue::Map(payload.0)
    }
}

/// The payload of a record: named fields, kept sorted by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, FieldValue>);

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    /// Get a field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Get a field as text.
    pub fn get_text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// Check whether a top-level text field equals `value`.
    pub fn field_equals(&self, field: &str, value: &str) -> bool {
        self.get_text(field) == Some(value)
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject floats that cannot be encoded deterministically (NaN, ±inf).
    pub fn check_finite(&self) -> Result<(), PayloadError> {
        match self
            .0
            .iter()
            .find_map(|(key, value)| value.find_non_finite(key))
        {
            Some(path) => Err(PayloadError::NonFiniteNumber(path)),
            None => Ok(()),
        }
    }
}

impl From<BTreeMap<String, FieldValue>> for Payload {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Fields a payload must carry before it may be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSchema {
    /// Top-level fields that must be present and non-null.
    #[serde(default)]
    pub required: Vec<String>,
}

impl PayloadSchema {
    /// Schema requiring the given fields.
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Schema that accepts any encodable payload.
    pub fn permissive() -> Self {
        Self {
            required: Vec::new(),
        }
    }

    /// Schema of custody events: a subject and a status.
    pub fn custody() -> Self {
        Self::new(["product_id", "status"])
    }

    /// Check a payload against this schema.
    pub fn check(&self, payload: &Payload) -> Result<(), PayloadError> {
        for field in &self.required {
            match payload.get(field) {
                None => return Err(PayloadError::MissingField(field.clone())),
                Some(FieldValue::Null) => return Err(PayloadError::NullField(field.clone())),
                Some(_) => {}
            }
        }
        payload.check_finite()
    }
}

impl Default for PayloadSchema {
    fn default() -> Self {
        Self::custody()
    }
}
