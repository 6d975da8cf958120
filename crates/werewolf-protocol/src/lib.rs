//! Wire protocol for the werewolf server.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Packet`], [`PacketKind`], [`FieldValue`], [`Seat`], …):
//!   the records that travel on the wire, and the closed registry of
//!   packet types with their required fields.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how packets are
//!   converted to/from frame payloads.
//! - **Errors** ([`ProtocolError`]): what can go wrong while building,
//!   encoding or decoding a packet.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and session
//! (player identity). It doesn't know about connections or games.
//!
//! ```text
//! Transport (frames) → Protocol (Packet) → Session (player context)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Endpoint, FieldKind, FieldValue, Packet, PacketBuilder, PacketKind, Seat,
};
