//! Directory data models
//!
//! This module defines:
//! - Host addresses and the directory kind tags
//! - The payload envelope exchanged with the transport layer
//! - Typed request/response bodies for each directory operation

use std::fmt;

use serde::{Deserialize, Serialize};

// Request type constants
pub const OBJECT_ADD_REQUEST: &str = "ObjectAddRequest";
pub const OBJECT_REMOVE_REQUEST: &str = "ObjectRemoveRequest";
pub const OBJECT_LOCK_REQUEST: &str = "ObjectLockRequest";
pub const OBJECT_UNLOCK_REQUEST: &str = "ObjectUnlockRequest";
pub const OBJECT_GET_REQUEST: &str = "ObjectGetRequest";

// Response type constants
pub const OBJECT_ADD_RESPONSE: &str = "ObjectAddResponse";
pub const OBJECT_REMOVE_RESPONSE: &str = "ObjectRemoveResponse";
pub const OBJECT_LOCK_RESPONSE: &str = "ObjectLockResponse";
pub const OBJECT_UNLOCK_RESPONSE: &str = "ObjectUnlockResponse";
pub const OBJECT_GET_RESPONSE: &str = "ObjectGetResponse";

/// Address of one process instance hosting an entity.
///
/// Opaque to the directory: it is stored, compared and handed back, never
/// interpreted. The all-zero value is the wire sentinel for "unknown".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub process: u32,
    pub instance: u64,
}

impl Address {
    /// Wire sentinel for an unknown location.
    pub const ZERO: Address = Address {
        process: 0,
        instance: 0,
    };

    pub fn new(process: u32, instance: u64) -> Self {
        Self { process, instance }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.process, self.instance)
    }
}

/// Tag naming one directory instance.
///
/// Each kind is fully independent; there are no cross-kind invariants, so a
/// kind could be sharded to a different hosting fiber without change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationKind {
    Unit,
    Session,
    Account,
    Chat,
}

impl LocationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationKind::Unit => "unit",
            LocationKind::Session => "session",
            LocationKind::Account => "account",
            LocationKind::Chat => "chat",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope delivered by the transport layer.
///
/// Frames are already decoded when they reach the directory; handlers bind
/// `body` to the typed request for their message type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub r#type: String,
    pub body: serde_json::Value,
}

impl Payload {
    pub fn new(r#type: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            r#type: r#type.into(),
            body,
        }
    }

    /// Build a payload from a serializable body.
    ///
    /// # Panics
    ///
    /// Panics if `body` does not serialize to JSON. The bodies crossing this
    /// boundary are plain data structs (no non-string map keys, no custom
    /// `Serialize` impls), for which `to_value` cannot fail.
    pub fn of<T: Serialize>(r#type: impl Into<String>, body: &T) -> Self {
        Self::new(
            r#type,
            serde_json::to_value(body).expect("payload body serializes to JSON"),
        )
    }

    /// Empty-bodied acknowledgment.
    pub fn ack(r#type: impl Into<String>) -> Self {
        Self::new(r#type, serde_json::Value::Null)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectAddRequest {
    pub kind: LocationKind,
    pub key: u64,
    pub address: Address,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRemoveRequest {
    pub kind: LocationKind,
    pub key: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectLockRequest {
    pub kind: LocationKind,
    pub key: u64,
    pub holder: Address,
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUnlockRequest {
    pub kind: LocationKind,
    pub key: u64,
    pub expected_holder: Address,
    pub new_address: Address,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectGetRequest {
    pub kind: LocationKind,
    pub key: u64,
}

/// Reply to [`ObjectGetRequest`]; `address` is [`Address::ZERO`] when the
/// key is unknown.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectGetResponse {
    pub address: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        assert_eq!(Address::new(3, 17).to_string(), "3:17");
    }

    #[test]
    fn test_address_zero_sentinel() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::new(1, 0).is_zero());
    }

    #[test]
    fn test_payload_round_trip() {
        let request = ObjectLockRequest {
            kind: LocationKind::Unit,
            key: 100,
            holder: Address::new(2, 5),
            timeout_ms: 5000,
        };
        let payload = Payload::of(OBJECT_LOCK_REQUEST, &request);
        assert_eq!(payload.r#type, OBJECT_LOCK_REQUEST);

        let bound: ObjectLockRequest = serde_json::from_value(payload.body).unwrap();
        assert_eq!(bound.key, 100);
        assert_eq!(bound.holder, Address::new(2, 5));
        assert_eq!(bound.timeout_ms, 5000);
    }

    #[test]
    fn test_payload_of_never_ships_a_null_body() {
        let payload = Payload::of(
            OBJECT_GET_RESPONSE,
            &ObjectGetResponse {
                address: Address::ZERO,
            },
        );
        assert!(!payload.body.is_null());
        assert_eq!(payload.body, serde_json::json!({ "address": { "process": 0, "instance": 0 } }));
    }

    #[test]
    fn test_lock_request_timeout_defaults_to_zero() {
        let body = serde_json::json!({
            "kind": "unit",
            "key": 1,
            "holder": { "process": 1, "instance": 2 },
        });
        let request: ObjectLockRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.timeout_ms, 0);
    }

    #[test]
    fn test_location_kind_wire_name() {
        let value = serde_json::to_value(LocationKind::Session).unwrap();
        assert_eq!(value, serde_json::json!("session"));
    }
}
