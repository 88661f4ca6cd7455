//! Packet codec: a 14-bit sequence number, a run of parts (each a data
//! frame or an ack), a terminating tag bit, and byte-alignment padding.
//! Errors here are packet-fatal: they abort the current packet but never
//! touch parser state in a way that would corrupt the next one.

use crate::bits::{bytes_to_bits, BitCursor, BitWriter};
use crate::channel::{decode_channel_frame, encode_channel_frame, ChannelFrame};
use crate::error::DecodeError;
use crate::state::ParserState;

/// The exact on-wire shape of the 2-bit `flag1a` field, kept distinct
/// (rather than collapsed to a plain `reliable: bool`) so re-encoding
/// reproduces the original bits: `01` and `10`+`11` both mean "reliable"
/// but are not interchangeable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag1a {
    NotReliable,
    Reliable,
    /// The `10` shape, whose required literal `11` tail was verified.
    ReliableViaTenEleven,
}

impl Flag1a {
    pub fn is_reliable(self) -> bool {
        !matches!(self, Flag1a::NotReliable)
    }
}

#[derive(Debug, Clone)]
pub enum Part {
    Data {
        /// True if flag1a arrived via the `11` escape (re-read two more bits).
        escaped: bool,
        flag1a: Flag1a,
        frame: ChannelFrame,
    },
    Ack {
        acknr: u16,
    },
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub seqnr: u16,
    pub parts: Vec<Part>,
    pub padding: Vec<bool>,
}

impl Packet {
    pub fn describe(&self, verbose: bool) -> String {
        let mut lines = vec![format!("seqnr={}", self.seqnr)];
        for part in &self.parts {
            match part {
                Part::Data { flag1a, frame, .. } => {
                    lines.push(format!("- data ({flag1a:?}) {}", frame.describe(verbose)));
                }
                Part::Ack { acknr } => lines.push(format!("- ack {acknr}")),
            }
        }
        lines.join("\n")
    }
}

pub fn decode_packet(bytes: &[u8], state: &mut ParserState) -> Result<Packet, DecodeError> {
    let bits = bytes_to_bits(bytes);
    let mut cursor = BitCursor::new(&bits);
    let span = tracing::debug_span!("decode_packet");
    let _enter = span.enter();

    let seqnr = cursor.take_uint(14)? as u16;
    tracing::trace!(seqnr, "packet sequence number");
    let mut parts = Vec::new();

    loop {
        let tag = cursor.take_bool()?;
        if !tag {
            let (escaped, flag1a) = decode_flag1a(&mut cursor)?;
            let frame = decode_channel_frame(&mut cursor, flag1a.is_reliable(), state)?;
            parts.push(Part::Data {
                escaped,
                flag1a,
                frame,
            });
        } else if cursor.remaining() >= 14 {
            let acknr = cursor.take_uint(14)? as u16;
            parts.push(Part::Ack { acknr });
        } else {
            break;
        }
    }

    // Bits consumed so far already covers seqnr, every part, and the
    // terminator tag bit read by the loop's final iteration.
    let consumed = bits.len() - cursor.remaining();
    let padding_len = (8 - consumed % 8) % 8;
    if cursor.remaining() != padding_len {
        return Err(DecodeError::AlignmentError {
            bitsleft: cursor.remaining(),
        });
    }
    let padding = cursor.take(padding_len)?.to_vec();

    Ok(Packet {
        seqnr,
        parts,
        padding,
    })
}

/// Reads the 2-bit `flag1a`, following its `11` escape (re-read two more
/// bits) and validating the `10` case's required literal `11` tail.
fn decode_flag1a(cursor: &mut BitCursor) -> Result<(bool, Flag1a), DecodeError> {
    let mut escaped = false;
    let mut flag1a = cursor.take_uint(2)?;
    if flag1a == 0b11 {
        escaped = true;
        flag1a = cursor.take_uint(2)?;
    }
    match flag1a {
        0b00 => Ok((escaped, Flag1a::NotReliable)),
        0b01 => Ok((escaped, Flag1a::Reliable)),
        0b10 => {
            let extra = cursor.take_uint(2)?;
            if extra != 0b11 {
                return Err(DecodeError::MalformedFlag {
                    context: "flag1a_10_extra",
                    bits: format!("{extra:02b}"),
                });
            }
            Ok((escaped, Flag1a::ReliableViaTenEleven))
        }
        _ => Err(DecodeError::MalformedFlag {
            context: "flag1a",
            bits: format!("{flag1a:02b}"),
        }),
    }
}

pub fn encode_packet(packet: &Packet, state: &ParserState) -> Vec<u8> {
    let mut out = BitWriter::new();
    out.push_uint(packet.seqnr as u32, 14);
    for part in &packet.parts {
        match part {
            Part::Data {
                escaped,
                flag1a,
                frame,
            } => {
                out.push_bool(false);
                encode_flag1a(*escaped, *flag1a, &mut out);
                encode_channel_frame(frame, state, &mut out);
            }
            Part::Ack { acknr } => {
                out.push_bool(true);
                out.push_uint(*acknr as u32, 14);
            }
        }
    }
    out.push_bool(true); // terminator
    out.push_bits(&packet.padding);
    out.into_bytes()
}

fn encode_flag1a(escaped: bool, flag1a: Flag1a, out: &mut BitWriter) {
    if escaped {
        out.push_uint(0b11, 2);
    }
    match flag1a {
        Flag1a::NotReliable => out.push_uint(0b00, 2),
        Flag1a::Reliable => out.push_uint(0b01, 2),
        Flag1a::ReliableViaTenEleven => {
            out.push_uint(0b10, 2);
            out.push_uint(0b11, 2);
        }
    }
}
