//! Codec trait and the JSON implementation.
//!
//! A "codec" (coder/decoder) converts between [`Packet`]s and frame
//! payloads. The session layer only sees the [`Codec`] trait, so the
//! representation can be swapped without touching anything above it.
//!
//! The trait is object-safe: every connection holds an `Arc<dyn Codec>`
//! shared with the rest of the server.

use serde_json::{Map, Value};

use crate::types::{Endpoint, FieldValue, Packet, PacketKind};
use crate::ProtocolError;

/// Converts packets to payload bytes and back.
///
/// `decode` must be the exact inverse of `encode` for every packet type
/// except the raw relay, which decodes to the packet it carries.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a validated packet.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a payload into a validated packet.
    ///
    /// # Errors
    /// - `SchemaViolation` for empty payloads and anything that does not
    ///   match the registry schema of its `type`
    /// - `UnknownPacketType` for a `type` outside the registry
    /// - `Decode` when the payload is not JSON
    fn decode(&self, data: &[u8]) -> Result<Packet, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

const TYPE: &str = "type";
const SRC_ADDR: &str = "srcAddr";
const SRC_PORT: &str = "srcPort";
const DEST_ADDR: &str = "destAddr";
const DEST_PORT: &str = "destPort";

/// A [`Codec`] that writes each packet as one flat JSON object.
///
/// ```json
/// {"type": 4, "srcAddr": "10.0.0.1", "srcPort": 21567,
///  "destAddr": "10.0.0.2", "destPort": 50001, "content": "Night falls."}
/// ```
///
/// Bytes fields travel as arrays of integers.
///
/// ## Example
///
/// ```rust
/// use werewolf_protocol::{Codec, Endpoint, JsonCodec, Packet, PacketKind};
///
/// let codec = JsonCodec;
/// let endpoint = Endpoint {
///     src_addr: "127.0.0.1".into(),
///     src_port: 21567,
///     dest_addr: "127.0.0.1".into(),
///     dest_port: 40000,
/// };
/// let packet = Packet::builder(PacketKind::GameResult, endpoint)
///     .field("result", true)
///     .build()
///     .unwrap();
///
/// let bytes = codec.encode(&packet).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), packet);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Wraps an already-built packet in a raw relay envelope.
    ///
    /// The envelope reuses the inner packet's endpoint pair.
    ///
    /// # Errors
    /// `SchemaViolation` if `inner` is itself a relay.
    pub fn wrap(&self, inner: &Packet) -> Result<Packet, ProtocolError> {
        if inner.kind() == PacketKind::RawRelay {
            return Err(ProtocolError::SchemaViolation(
                "a raw relay cannot carry another raw relay".into(),
            ));
        }
        let raw = self.encode(inner)?;
        Packet::builder(PacketKind::RawRelay, inner.endpoint().clone())
            .field("rawData", raw)
            .build()
    }

    fn decode_value(&self, value: Value, nested: bool) -> Result<Packet, ProtocolError> {
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::SchemaViolation(
                "payload is not a JSON object".into(),
            ));
        };

        let code = object
            .remove(TYPE)
            .and_then(|t| t.as_i64())
            .ok_or_else(|| ProtocolError::SchemaViolation("missing integer 'type'".into()))?;
        let kind = PacketKind::from_code(code)?;
        let endpoint = take_endpoint(&mut object)?;

        let mut fields = std::collections::BTreeMap::new();
        for (name, expected) in kind.schema() {
            let raw = object.remove(*name).ok_or_else(|| {
                ProtocolError::SchemaViolation(format!("{kind} requires field '{name}'"))
            })?;
            let value = FieldValue::from_json(*expected, &raw).ok_or_else(|| {
                ProtocolError::SchemaViolation(format!(
                    "field '{name}' of {kind} must be {expected}"
                ))
            })?;
            fields.insert((*name).to_string(), value);
        }
        if let Some(extra) = object.keys().next() {
            return Err(ProtocolError::SchemaViolation(format!(
                "{kind} does not declare field '{extra}'"
            )));
        }

        let packet = Packet::new(kind, endpoint, fields)?;
        if kind != PacketKind::RawRelay {
            return Ok(packet);
        }

        if nested {
            return Err(ProtocolError::SchemaViolation(
                "a raw relay cannot carry another raw relay".into(),
            ));
        }
        let raw = packet.bytes("rawData").unwrap_or_default();
        if raw.is_empty() {
            return Err(ProtocolError::SchemaViolation("empty relay payload".into()));
        }
        let inner = serde_json::from_slice(raw).map_err(ProtocolError::Decode)?;
        self.decode_value(inner, true)
    }
}

impl Codec for JsonCodec {
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        let endpoint = packet.endpoint();
        let mut object = Map::new();
        object.insert(TYPE.into(), Value::from(packet.kind().code()));
        object.insert(SRC_ADDR.into(), Value::from(endpoint.src_addr.as_str()));
        object.insert(SRC_PORT.into(), Value::from(endpoint.src_port));
        object.insert(DEST_ADDR.into(), Value::from(endpoint.dest_addr.as_str()));
        object.insert(DEST_PORT.into(), Value::from(endpoint.dest_port));
        for (name, value) in packet.fields() {
            object.insert(name.clone(), value.to_json());
        }
        serde_json::to_vec(&Value::Object(object)).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<Packet, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::SchemaViolation("zero-length payload".into()));
        }
        let value: Value = serde_json::from_slice(data).map_err(ProtocolError::Decode)?;
        self.decode_value(value, false)
    }
}

/// Pulls the four endpoint keys out of a decoded object.
fn take_endpoint(object: &mut Map<String, Value>) -> Result<Endpoint, ProtocolError> {
    let mut addr = |key: &str| -> Result<String, ProtocolError> {
        match object.remove(key) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(ProtocolError::SchemaViolation(format!(
                "missing string endpoint field '{key}'"
            ))),
        }
    };
    let src_addr = addr(SRC_ADDR)?;
    let dest_addr = addr(DEST_ADDR)?;

    let mut port = |key: &str| -> Result<u16, ProtocolError> {
        object
            .remove(key)
            .and_then(|v| v.as_u64())
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| {
                ProtocolError::SchemaViolation(format!("missing port endpoint field '{key}'"))
            })
    };
    let src_port = port(SRC_PORT)?;
    let dest_port = port(DEST_PORT)?;

    Ok(Endpoint {
        src_addr,
        src_port,
        dest_addr,
        dest_port,
    })
}

// =========================================================================
// Tests
// =========================================================================
