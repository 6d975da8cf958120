//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is one packet's shape or
//! serialization, never the network or the game rules. These errors are
//! fatal to the offending packet only.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A packet is missing a required field, carries a field its type does
    /// not declare, or a field holds the wrong kind of value.
    ///
    /// Zero-length payloads and relays nested in relays also land here.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// The `type` code is not part of the packet registry.
    #[error("unknown packet type {0}")]
    UnknownPacketType(i64),

    /// Serialization failed (turning a packet into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The payload is not a JSON object at all.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
