//! Error types for Locus
//!
//! Directory operations themselves log and degrade rather than fail (a
//! crashed directory would strand every key it owns), so errors here surface
//! only from the payload handler boundary.

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum LocusError {
    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    #[error("malformed body for message type '{message_type}': {source}")]
    MalformedPayload {
        message_type: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_message_type_display() {
        let err = LocusError::UnknownMessageType("FooRequest".to_string());
        assert_eq!(err.to_string(), "unknown message type 'FooRequest'");
    }

    #[test]
    fn test_malformed_payload_carries_source() {
        let source = serde_json::from_str::<u64>("not a number").unwrap_err();
        let err = LocusError::MalformedPayload {
            message_type: "ObjectAddRequest".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("malformed body for message type 'ObjectAddRequest'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
