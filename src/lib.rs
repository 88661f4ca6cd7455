//! A bit-level codec for a channel-multiplexed, replicated-object game
//! network protocol: packets carry data and ack parts, data parts carry
//! channel frames, and channel frames carry object payloads whose property
//! streams are keyed against a per-class schema.
//!
//! [`Parser`] is the entry point: it owns the session state (schema
//! registry, instance counters, open channels) that decoding and encoding
//! both read and update.

pub mod bits;
pub mod channel;
pub mod error;
pub mod object;
pub mod packet;
pub mod payload;
pub mod schema;
pub mod state;
pub mod value;

pub use error::DecodeError;
pub use packet::{Flag1a, Packet, Part};
pub use schema::ClassKey;
pub use state::ParserState;
pub use value::PropertyValue;

use packet::{decode_packet, encode_packet};

/// Owns a [`ParserState`] across a sequence of packets from the same
/// session, so channel bindings and instance counters carry forward the
/// way they do across a real connection's lifetime.
pub struct Parser {
    state: ParserState,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: ParserState::new(),
        }
    }

    pub fn with_debug_roundtrip(debug_roundtrip: bool) -> Self {
        Self {
            state: ParserState::new().with_debug_roundtrip(debug_roundtrip),
        }
    }

    /// Decodes one packet, advancing session state (new channel bindings,
    /// destroyed channels) as a side effect. Framing errors (short reads,
    /// malformed flags, misalignment) are packet-fatal and propagate here;
    /// errors within a payload's property stream are instead captured on
    /// that `Payload` and do not fail the whole packet.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Packet, DecodeError> {
        decode_packet(bytes, &mut self.state)
    }

    /// Re-serializes a previously decoded packet using the session state
    /// as it stands now. For a packet that was just produced by `decode`,
    /// calling this immediately reproduces the original bytes exactly.
    pub fn encode(&self, packet: &Packet) -> Vec<u8> {
        encode_packet(packet, &self.state)
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
