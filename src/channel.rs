//! Channel codec: the 10-bit channel number, and — for reliable frames —
//! a 5-bit counter plus 8 opaque bits ahead of the payload.

use crate::bits::{BitCursor, BitWriter};
use crate::error::DecodeError;
use crate::payload::{decode_payload, encode_payload, Payload};
use crate::state::ParserState;

#[derive(Debug, Clone)]
pub struct ChannelFrame {
    pub channel: u16,
    pub counter: Option<u8>,
    pub unknown_bits: Option<Vec<bool>>,
    pub payload: Payload,
}

pub fn decode_channel_frame(
    cursor: &mut BitCursor,
    reliable: bool,
    state: &mut ParserState,
) -> Result<ChannelFrame, DecodeError> {
    let channel = cursor.take_uint(10)? as u16;
    let (counter, unknown_bits) = if reliable {
        let counter = cursor.take_uint(5)? as u8;
        let unknown = cursor.take(8)?.to_vec();
        (Some(counter), Some(unknown))
    } else {
        (None, None)
    };
    let payload = decode_payload(cursor, channel, state)?;
    Ok(ChannelFrame {
        channel,
        counter,
        unknown_bits,
        payload,
    })
}

impl ChannelFrame {
    pub fn describe(&self, verbose: bool) -> String {
        let reliability = match self.counter {
            Some(n) => format!("reliable counter={n}"),
            None => "unreliable".to_string(),
        };
        format!(
            "channel={} {reliability}\n  {}",
            self.channel,
            self.payload.describe(verbose)
        )
    }
}

pub fn encode_channel_frame(frame: &ChannelFrame, state: &ParserState, out: &mut BitWriter) {
    out.push_uint(frame.channel as u32, 10);
    if let Some(counter) = frame.counter {
        out.push_uint(counter as u32, 5);
        out.push_bits(
            frame
                .unknown_bits
                .as_ref()
                .expect("reliable frame always carries its 8 opaque bits"),
        );
    }
    encode_payload(&frame.payload, state, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreliable_frame_has_no_counter() {
        let mut state = ParserState::new();
        let mut w = BitWriter::new();
        w.push_uint(0, 10); // channel 0 (root)
        w.push_uint(0, 14); // size 0 -> destroys immediately, but root was never bound
        let bits = w.into_bits();
        let mut cursor = BitCursor::new(&bits);
        let frame = decode_channel_frame(&mut cursor, false, &mut state).unwrap();
        assert_eq!(frame.channel, 0);
        assert!(frame.counter.is_none());
    }

    #[test]
    fn reliable_frame_round_trips() {
        let mut state = ParserState::new();
        let mut w = BitWriter::new();
        w.push_uint(5, 10);
        w.push_uint(3, 5);
        w.push_bits(&[true, false, true, false, true, false, true, false]);
        w.push_uint(0, 14);
        let bits = w.into_bits();
        let mut cursor = BitCursor::new(&bits);
        let frame = decode_channel_frame(&mut cursor, true, &mut state).unwrap();
        assert_eq!(frame.counter, Some(3));

        let mut out = BitWriter::new();
        encode_channel_frame(&frame, &state, &mut out);
        assert_eq!(out.into_bits(), bits);
    }
}
