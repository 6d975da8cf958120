//! Core protocol types for the werewolf wire format.
//!
//! Every packet is a tagged record: a [`PacketKind`] (the numeric `type`
//! on the wire) plus a map of named fields. The kind selects a fixed
//! schema from a closed registry, and a [`Packet`] can only be built when
//! its fields satisfy that schema exactly. Invalid packets are therefore
//! unrepresentable past construction or decoding.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// A player's stable numeric identifier for the duration of one game.
///
/// Seats start at 1. On the wire they travel as plain integers inside
/// fields such as `target` or `candidate`, where `0` and negative values
/// carry special meanings ("no one", "use the antidote", …).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Seat(pub u32);

impl Seat {
    /// Interprets a wire integer as a seat. Zero and negatives are not seats.
    pub fn from_wire(value: i64) -> Option<Self> {
        u32::try_from(value).ok().filter(|v| *v > 0).map(Seat)
    }

    /// The seat as a wire integer.
    pub fn to_wire(self) -> i64 {
        i64::from(self.0)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// The logical endpoint pair carried by every packet
/// (`srcAddr/srcPort/destAddr/destPort`).
///
/// Used for routing and validation; it is not tied to the physical socket
/// a packet actually arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub src_addr: String,
    pub src_port: u16,
    pub dest_addr: String,
    pub dest_port: u16,
}

impl Endpoint {
    /// Builds an endpoint from two socket addresses.
    pub fn between(src: std::net::SocketAddr, dest: std::net::SocketAddr) -> Self {
        Self {
            src_addr: src.ip().to_string(),
            src_port: src.port(),
            dest_addr: dest.ip().to_string(),
            dest_port: dest.port(),
        }
    }

    /// The same pair seen from the other side.
    pub fn reversed(&self) -> Self {
        Self {
            src_addr: self.dest_addr.clone(),
            src_port: self.dest_port,
            dest_addr: self.src_addr.clone(),
            dest_port: self.src_port,
        }
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// The kind of value a schema expects for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Str,
    Bytes,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// The kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::Int(_) => FieldKind::Int,
            Self::Float(_) => FieldKind::Float,
            Self::Str(_) => FieldKind::Str,
            Self::Bytes(_) => FieldKind::Bytes,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::from(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Str(s) => serde_json::Value::from(s.as_str()),
            Self::Bytes(b) => serde_json::Value::from(b.clone()),
        }
    }

    /// Reads a JSON value as the expected kind. `None` on a kind mismatch.
    ///
    /// Integers are not silently widened to floats (or the reverse): a
    /// client sending `5` where `5.0` is expected violates the schema.
    pub(crate) fn from_json(kind: FieldKind, value: &serde_json::Value) -> Option<Self> {
        match kind {
            FieldKind::Bool => value.as_bool().map(Self::Bool),
            FieldKind::Int => value.as_i64().map(Self::Int),
            FieldKind::Float => {
                if value.is_f64() {
                    value.as_f64().map(Self::Float)
                } else {
                    None
                }
            }
            FieldKind::Str => value.as_str().map(|s| Self::Str(s.to_string())),
            FieldKind::Bytes => value
                .as_array()?
                .iter()
                .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Self::Bytes),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Seat> for FieldValue {
    fn from(v: Seat) -> Self {
        Self::Int(v.to_wire())
    }
}

// ---------------------------------------------------------------------------
// PacketKind: the closed registry
// ---------------------------------------------------------------------------

/// Every packet type the server and clients understand.
///
/// Positive codes are (mostly) server → client requests and notices;
/// the matching negative code is the client's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Envelope around another encoded packet (`rawData`).
    RawRelay,
    /// Client → server: "let me in".
    Establish,
    /// Server → client: assigned seat and identity code.
    EstablishResponse,
    /// Server → client: choose something (vote target, skill target, yes/no).
    ActionPrompt,
    /// Client → server: the choice.
    ActionResponse,
    /// Server → client: plain announcement.
    Announcement,
    /// Free chat, relayed between wolves at night.
    FreeDiscussion,
    /// Server → client: "you have the floor for N seconds".
    TimedDiscussionPrompt,
    /// Client → server: what the player said.
    TimedDiscussionResponse,
    /// Server → client: cast a vote.
    VotePrompt,
    /// Client → server: the ballot.
    VoteResponse,
    /// Server → client: "you are dead".
    DeathNotice,
    /// Server → client: whether the recipient's side won.
    GameResult,
    /// Either direction: a wolf blows up during the day.
    SelfDestruct,
}

impl PacketKind {
    /// Every registered kind, in wire-code order of the registry table.
    pub const ALL: [PacketKind; 14] = [
        Self::RawRelay,
        Self::Establish,
        Self::EstablishResponse,
        Self::ActionPrompt,
        Self::ActionResponse,
        Self::Announcement,
        Self::FreeDiscussion,
        Self::TimedDiscussionPrompt,
        Self::TimedDiscussionResponse,
        Self::VotePrompt,
        Self::VoteResponse,
        Self::DeathNotice,
        Self::GameResult,
        Self::SelfDestruct,
    ];

    /// The numeric `type` used on the wire.
    pub fn code(self) -> i64 {
        match self {
            Self::RawRelay => 0,
            Self::Establish => 1,
            Self::EstablishResponse => -1,
            Self::ActionPrompt => 3,
            Self::ActionResponse => -3,
            Self::Announcement => 4,
            Self::FreeDiscussion => 5,
            Self::TimedDiscussionPrompt => 6,
            Self::TimedDiscussionResponse => -6,
            Self::VotePrompt => 7,
            Self::VoteResponse => -7,
            Self::DeathNotice => 8,
            Self::GameResult => -8,
            Self::SelfDestruct => 9,
        }
    }

    /// Looks up a wire code in the registry.
    pub fn from_code(code: i64) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or(ProtocolError::UnknownPacketType(code))
    }

    /// Required fields (beyond the endpoint pair) and their kinds.
    pub fn schema(self) -> &'static [(&'static str, FieldKind)] {
        use FieldKind::*;
        match self {
            Self::RawRelay => &[("rawData", Bytes)],
            Self::Establish => &[],
            Self::EstablishResponse => &[("seat", Int), ("identity", Int)],
            Self::ActionPrompt => &[
                ("iskill", Bool),
                ("format", Str),
                ("prompt", Str),
                ("timeLimit", Float),
            ],
            Self::ActionResponse => &[("action", Bool), ("target", Int)],
            Self::Announcement => &[("content", Str)],
            Self::FreeDiscussion => &[("content", Str)],
            Self::TimedDiscussionPrompt => &[("timeLimit", Int)],
            Self::TimedDiscussionResponse => &[("content", Str)],
            Self::VotePrompt => &[("prompt", Str)],
            Self::VoteResponse => &[("vote", Bool), ("candidate", Int)],
            Self::DeathNotice => &[],
            Self::GameResult => &[("result", Bool)],
            Self::SelfDestruct => &[("id", Int)],
        }
    }

    /// The kind a client answers this request with, if it is a request.
    pub fn reply_kind(self) -> Option<PacketKind> {
        match self {
            Self::Establish => Some(Self::EstablishResponse),
            Self::ActionPrompt => Some(Self::ActionResponse),
            Self::TimedDiscussionPrompt => Some(Self::TimedDiscussionResponse),
            Self::VotePrompt => Some(Self::VoteResponse),
            _ => None,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RawRelay => "raw-relay",
            Self::Establish => "establish",
            Self::EstablishResponse => "establish-response",
            Self::ActionPrompt => "action-prompt",
            Self::ActionResponse => "action-response",
            Self::Announcement => "announcement",
            Self::FreeDiscussion => "free-discussion",
            Self::TimedDiscussionPrompt => "timed-discussion-prompt",
            Self::TimedDiscussionResponse => "timed-discussion-response",
            Self::VotePrompt => "vote-prompt",
            Self::VoteResponse => "vote-response",
            Self::DeathNotice => "death-notice",
            Self::GameResult => "game-result",
            Self::SelfDestruct => "self-destruct-notice",
        };
        write!(f, "{name}({})", self.code())
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A validated packet.
///
/// ```
/// use werewolf_protocol::{Endpoint, Packet, PacketKind};
///
/// let endpoint = Endpoint {
///     src_addr: "127.0.0.1".into(),
///     src_port: 21567,
///     dest_addr: "127.0.0.1".into(),
///     dest_port: 40000,
/// };
///
/// let packet = Packet::builder(PacketKind::Announcement, endpoint.clone())
///     .field("content", "Night falls.")
///     .build()
///     .unwrap();
/// assert_eq!(packet.str("content"), Some("Night falls."));
///
/// // Missing `content` → rejected.
/// assert!(Packet::builder(PacketKind::Announcement, endpoint).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    kind: PacketKind,
    endpoint: Endpoint,
    fields: BTreeMap<String, FieldValue>,
}

impl Packet {
    /// Validates `fields` against the schema of `kind` and builds a packet.
    ///
    /// # Errors
    /// [`ProtocolError::SchemaViolation`] when a required field is missing,
    /// holds the wrong kind, or an undeclared field is present.
    pub fn new(
        kind: PacketKind,
        endpoint: Endpoint,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Self, ProtocolError> {
        let schema = kind.schema();
        for (name, expected) in schema {
            match fields.get(*name) {
                None => {
                    return Err(ProtocolError::SchemaViolation(format!(
                        "{kind} requires field '{name}'"
                    )));
                }
                Some(value) if value.kind() != *expected => {
                    return Err(ProtocolError::SchemaViolation(format!(
                        "field '{name}' of {kind} must be {expected}, got {}",
                        value.kind()
                    )));
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = fields
            .keys()
            .find(|name| !schema.iter().any(|(n, _)| n == name))
        {
            return Err(ProtocolError::SchemaViolation(format!(
                "{kind} does not declare field '{extra}'"
            )));
        }
        Ok(Self {
            kind,
            endpoint,
            fields,
        })
    }

    /// Starts building a packet of the given kind.
    pub fn builder(kind: PacketKind, endpoint: Endpoint) -> PacketBuilder {
        PacketBuilder {
            kind,
            endpoint,
            fields: BTreeMap::new(),
        }
    }

    /// The packet's registered kind.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// The logical endpoint pair.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// All schema fields.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Raw access to one field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name) {
            Some(FieldValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(FieldValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.fields.get(name) {
            Some(FieldValue::Bytes(v)) => Some(v.as_slice()),
            _ => None,
        }
    }
}

/// Incremental construction of a [`Packet`]; validated in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    kind: PacketKind,
    endpoint: Endpoint,
    fields: BTreeMap<String, FieldValue>,
}

impl PacketBuilder {
    /// Sets a field, replacing any previous value.
    pub fn field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Validates against the schema and produces the packet.
    pub fn build(self) -> Result<Packet, ProtocolError> {
        Packet::new(self.kind, self.endpoint, self.fields)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            src_addr: "10.0.0.1".into(),
            src_port: 21567,
            dest_addr: "10.0.0.2".into(),
            dest_port: 50001,
        }
    }

    #[test]
    fn test_seat_from_wire_rejects_zero_and_negatives() {
        assert_eq!(Seat::from_wire(3), Some(Seat(3)));
        assert_eq!(Seat::from_wire(0), None);
        assert_eq!(Seat::from_wire(-1), None);
        assert_eq!(Seat::from_wire(i64::MAX), None);
    }

    #[test]
    fn test_seat_display() {
        assert_eq!(Seat(7).to_string(), "seat 7");
    }

    #[test]
    fn test_seat_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Seat(4)).unwrap(), "4");
    }

    #[test]
    fn test_endpoint_reversed_swaps_sides() {
        let reversed = endpoint().reversed();
        assert_eq!(reversed.src_port, 50001);
        assert_eq!(reversed.dest_addr, "10.0.0.1");
        assert_eq!(reversed.reversed(), endpoint());
    }

    #[test]
    fn test_packet_kind_codes_are_unique_and_resolvable() {
        for kind in PacketKind::ALL {
            assert_eq!(PacketKind::from_code(kind.code()).unwrap(), kind);
        }
    }

    #[test]
    fn test_packet_kind_from_code_unknown_type() {
        for code in [2, -2, -4, 10, 100] {
            assert!(matches!(
                PacketKind::from_code(code),
                Err(ProtocolError::UnknownPacketType(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_packet_kind_reply_kind() {
        assert_eq!(
            PacketKind::VotePrompt.reply_kind(),
            Some(PacketKind::VoteResponse)
        );
        assert_eq!(
            PacketKind::ActionPrompt.reply_kind(),
            Some(PacketKind::ActionResponse)
        );
        assert_eq!(PacketKind::Announcement.reply_kind(), None);
    }

    #[test]
    fn test_packet_build_valid_action_prompt() {
        let packet = Packet::builder(PacketKind::ActionPrompt, endpoint())
            .field("iskill", true)
            .field("format", "int")
            .field("prompt", "Choose a victim")
            .field("timeLimit", 30.0)
            .build()
            .unwrap();
        assert_eq!(packet.kind(), PacketKind::ActionPrompt);
        assert_eq!(packet.bool("iskill"), Some(true));
        assert_eq!(packet.float("timeLimit"), Some(30.0));
        assert_eq!(packet.int("timeLimit"), None);
    }

    #[test]
    fn test_packet_build_missing_field_is_schema_violation() {
        let err = Packet::builder(PacketKind::VoteResponse, endpoint())
            .field("vote", true)
            .build()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::SchemaViolation(ref m) if m.contains("candidate")));
    }

    #[test]
    fn test_packet_build_wrong_kind_is_schema_violation() {
        // timeLimit of an action prompt is a float, not an int.
        let err = Packet::builder(PacketKind::ActionPrompt, endpoint())
            .field("iskill", false)
            .field("format", "bool")
            .field("prompt", "Run for police?")
            .field("timeLimit", 30)
            .build()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::SchemaViolation(_)));
    }

    #[test]
    fn test_packet_build_extra_field_is_schema_violation() {
        let err = Packet::builder(PacketKind::DeathNotice, endpoint())
            .field("content", "you died")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::SchemaViolation(_)));
    }

    #[test]
    fn test_packet_build_empty_schema() {
        let packet = Packet::builder(PacketKind::Establish, endpoint())
            .build()
            .unwrap();
        assert!(packet.fields().is_empty());
        assert_eq!(packet.endpoint(), &endpoint());
    }

    #[test]
    fn test_field_value_from_json_is_strict_about_numbers() {
        let five = serde_json::json!(5);
        let five_f = serde_json::json!(5.0);
        assert_eq!(
            FieldValue::from_json(FieldKind::Int, &five),
            Some(FieldValue::Int(5))
        );
        assert_eq!(FieldValue::from_json(FieldKind::Float, &five), None);
        assert_eq!(
            FieldValue::from_json(FieldKind::Float, &five_f),
            Some(FieldValue::Float(5.0))
        );
        assert_eq!(FieldValue::from_json(FieldKind::Int, &five_f), None);
    }

    #[test]
    fn test_field_value_bytes_reject_out_of_range() {
        let ok = serde_json::json!([0, 127, 255]);
        let bad = serde_json::json!([0, 256]);
        assert_eq!(
            FieldValue::from_json(FieldKind::Bytes, &ok),
            Some(FieldValue::Bytes(vec![0, 127, 255]))
        );
        assert_eq!(FieldValue::from_json(FieldKind::Bytes, &bad), None);
    }
}
