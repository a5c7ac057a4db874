//! Typed custody events.
//!
//! The ledger itself only sees [`Payload`]s. A [`CustodyEvent`] is the
//! application schema most callers append: one hand-over of a product lot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PayloadError;
use crate::payload::{FieldValue, Payload};

/// Where a custody event happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<Location> for FieldValue {
    fn from(location: Location) -> Self {
        let mut map = BTreeMap::new();
        map.insert("lat".to_string(), FieldValue::Float(location.lat));
        map.insert("lng".to_string(), FieldValue::Float(location.lng));
        if let Some(address) = location.address {
            map.insert("address".to_string(), FieldValue::Text(address));
        }
        FieldValue::Map(map)
    }
}

/// One custody hand-over of a product lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyEvent {
    /// Subject identifier (lot or serial number).
    pub product_id: String,

    /// Lifecycle status, e.g. `MANUFACTURED`, `SHIPPED`, `DELIVERED`.
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,

    /// Opaque proof-of-delivery blob (typically a base64 image).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl CustodyEvent {
    /// Create an event with only the required fields set.
    pub fn new(product_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            status: status.into(),
            item: None,
            location: None,
            factory: None,
            dealer: None,
            sender: None,
            receiver: None,
            signature: None,
        }
    }

    /// Set the hand-over parties.
    pub fn between(mut self, sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self.receiver = Some(receiver.into());
        self
    }

    /// Set the location.
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Convert into a ledger payload. Unset optional fields are omitted.
    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new()
            .with("product_id", self.product_id)
            .with("status", self.status);

        let optional = [
            ("item", self.item),
            ("factory", self.factory),
            ("dealer", self.dealer),
            ("sender", self.sender),
            ("receiver", self.receiver),
            ("signature", self.signature),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                payload.insert(field, value);
            }
        }
        if let Some(location) = self.location {
            payload.insert("location", location);
        }

        payload
    }
}

impl From<CustodyEvent> for Payload {
    fn from(event: CustodyEvent) -> Self {
        event.into_payload()
    }
}

impl TryFrom<&Payload> for CustodyEvent {
    type Error = PayloadError;

    /// Read an event back out of a payload. Unknown fields are ignored and
    /// optional fields of the wrong type read as unset. The subject and
    /// status must be text.
    fn try_from(payload: &Payload) -> Result<Self, Self::Error> {
        let required = |field: &str| match payload.get(field) {
            None => Err(PayloadError::MissingField(field.to_string())),
            Some(FieldValue::Null) => Err(PayloadError::NullField(field.to_string())),
            Some(value) => value
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| PayloadError::NotText(field.to_string())),
        };
        let optional = |field: &str| payload.get_text(field).map(str::to_string);

        let location = match payload.get("location") {
            Some(FieldValue::Map(map)) => {
                let coord = |key: &str| map.get(key).and_then(FieldValue::as_f64);
                match (coord("lat"), coord("lng")) {
                    (Some(lat), Some(lng)) => Some(Location {
                        lat,
                        lng,
                        address: map
                            .get("address")
                            .and_then(FieldValue::as_text)
                            .map(str::to_string),
                    }),
                    _ => None,
                }
            }
            _ => None,
        };

        Ok(Self {
            product_id: required("product_id")?,
            status: required("status")?,
            item: optional("item"),
            location,
            factory: optional("factory"),
            dealer: optional("dealer"),
            sender: optional("sender"),
            receiver: optional("receiver"),
            signature: optional("signature"),
        })
    }
}
