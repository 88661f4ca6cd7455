use thiserror::Error;

use crate::bits::Bits;

/// Every failure mode the bit cursor, value codecs, and framing codecs can
/// raise. Whether a given occurrence is recoverable (captured on a payload)
/// or packet-fatal (propagated with `?`) depends on where it is caught, not
/// on which variant it is — see `payload::decode_payload` vs `packet::decode_packet`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("tried to read {needed} bits with only {available} remaining")]
    ShortRead { needed: usize, available: usize },

    #[error("unknown property {key} for class {class}")]
    UnknownProperty {
        class: String,
        key: String,
        bitsleft: Bits,
    },

    #[error("trailing bits after the last decoded property")]
    TrailingBits { bitsleft: Bits },

    #[error("malformed flag in {context}: {bits}")]
    MalformedFlag { context: &'static str, bits: String },

    #[error("packet did not end on a byte boundary, {bitsleft} bits left over")]
    AlignmentError { bitsleft: usize },

    #[error("string length mismatch: declared {declared}, actual {actual}")]
    StringLengthMismatch { declared: u32, actual: u32 },
}
