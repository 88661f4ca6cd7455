//! Payload codec: the 14-bit size prefix (with its escape case), an
//! optional class introduction on first use of a channel, and the object
//! body. Errors raised while decoding the body never escape this module —
//! they are captured on the returned `Payload` instead, per the
//! recoverable-within-a-payload tier.

use crate::bits::{BitCursor, BitWriter, Bits};
use crate::error::DecodeError;
use crate::object::{decode_property_stream, encode_property_stream};
use crate::schema::ClassKey;
use crate::state::ParserState;
use crate::value::PropertyValue;

#[derive(Debug, Clone)]
pub struct Payload {
    pub size: u32,
    /// 14 normally, 13 when the size escape fired.
    pub size_width: usize,
    /// The class this payload's properties belong to, resolved whether or
    /// not this payload is the one that introduced it.
    pub class_key: Option<ClassKey>,
    /// The raw 32-bit class key, present only when this payload opened the
    /// channel (`class_key` is `Some(ClassKey::Id(..))` in that case too).
    pub class_intro: Option<u32>,
    pub instance_name: Option<String>,
    pub properties: Vec<(String, PropertyValue)>,
    pub object_deleted: bool,
    pub bitsleft_reason: Option<String>,
    pub bitsleft: Option<Bits>,
}

pub fn decode_payload(
    cursor: &mut BitCursor,
    channel: u16,
    state: &mut ParserState,
) -> Result<Payload, DecodeError> {
    let mut size_bits = cursor.take(14)?.to_vec();
    let mut size_width = 14;
    // Size escape: if bits 10 and 13 are both set, only the upper 13 bits
    // are the size; the 14th bit is handed back to the body as its first bit.
    if size_bits[10] && size_bits[13] {
        cursor.rewind(1);
        size_bits.truncate(13);
        size_width = 13;
    }
    let size = crate::bits::bits_to_u32(&size_bits);

    let body_bits = cursor.take(size as usize)?;
    let mut body = BitCursor::new(body_bits);

    let mut payload = Payload {
        size,
        size_width,
        class_key: None,
        class_intro: None,
        instance_name: None,
        properties: Vec::new(),
        object_deleted: false,
        bitsleft_reason: None,
        bitsleft: None,
    };

    let result = decode_body(&mut body, channel, state, &mut payload);
    if let Err(err) = result {
        payload.bitsleft_reason = Some(err.to_string());
        payload.bitsleft = Some(match err {
            DecodeError::UnknownProperty { bitsleft, .. } => bitsleft,
            DecodeError::TrailingBits { bitsleft } => bitsleft,
            DecodeError::ShortRead { .. }
            | DecodeError::StringLengthMismatch { .. }
            | DecodeError::MalformedFlag { .. }
            | DecodeError::AlignmentError { .. } => body.remaining_bits(),
        });
    } else if size == 0 {
        payload.object_deleted = true;
        state.close_channel(channel);
    }

    Ok(payload)
}

fn decode_body(
    body: &mut BitCursor,
    channel: u16,
    state: &mut ParserState,
    payload: &mut Payload,
) -> Result<(), DecodeError> {
    let is_new = !state.channels.contains_key(&channel);

    let class_key = if is_new {
        if channel == 0 {
            ClassKey::Root
        } else {
            let raw = body.take(32)?;
            let normalized = crate::schema::normalize_class_bits(raw);
            payload.class_intro = Some(normalized);
            ClassKey::Id(normalized)
        }
    } else {
        state.channels[&channel].class_key
    };
    payload.class_key = Some(class_key);

    // Resolving through lookup_or_insert (rather than `class()`) means an
    // unrecognized class key gets a synthetic entry before anything below
    // tries to use it.
    if let ClassKey::Id(id) = class_key {
        state.registry.lookup_or_insert(id);
    }
    let class_name = state.registry.class(class_key).name.clone();

    if is_new {
        let instance_name = state.bind_channel(channel, class_key, &class_name);
        payload.instance_name = Some(instance_name);
    } else {
        let instance_name = state.channels[&channel].instance_name.clone();
        tracing::debug!(channel, instance = %instance_name, "channel continuation");
        payload.instance_name = Some(instance_name);
    }

    let debug_roundtrip = state.debug_roundtrip;
    let class = state.registry.class(class_key);
    decode_property_stream(body, class, debug_roundtrip, &mut payload.properties)?;

    if body.remaining() > 0 {
        return Err(DecodeError::TrailingBits {
            bitsleft: body.remaining_bits(),
        });
    }

    Ok(())
}

impl Payload {
    /// Human-readable rendering for the CLI. `verbose` controls whether
    /// individual decoded properties are listed or just the summary line.
    pub fn describe(&self, verbose: bool) -> String {
        let mut line = format!(
            "size={} ({} bits)",
            self.size,
            if self.size_width == 13 { "escaped" } else { "plain" }
        );
        if let Some(name) = &self.instance_name {
            line.push_str(&format!(" instance={name}"));
        }
        if self.object_deleted {
            line.push_str(" [destroyed]");
        }
        if let Some(reason) = &self.bitsleft_reason {
            line.push_str(&format!(" [incomplete: {reason}]"));
        }
        if !verbose || self.properties.is_empty() {
            return line;
        }
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|(name, value)| format!("    {name} = {}", value.describe(4)))
            .collect();
        format!("{line}\n{}", props.join("\n"))
    }
}

pub fn encode_payload(payload: &Payload, state: &ParserState, out: &mut BitWriter) {
    out.push_bits(&crate::bits::u32_to_bits(payload.size, payload.size_width));

    if let Some(class_id) = payload.class_intro {
        out.push_bits(&crate::bits::u32_to_bits(class_id, 32));
    }

    if let Some(class_key) = payload.class_key {
        let class = state.registry.class(class_key);
        encode_property_stream(&payload.properties, out, class);
    }

    if let Some(bitsleft) = &payload.bitsleft {
        out.push_bits(bitsleft);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::bytes_to_bits;

    fn weapon_key_bits() -> Bits {
        crate::bits::u32_to_bits(
            crate::bits::key_str_to_u32("01011000000000000000000000000111"),
            32,
        )
    }

    #[test]
    fn new_channel_reads_class_then_binds_instance() {
        let mut state = ParserState::new();
        let mut w = BitWriter::new();
        w.push_bits(&weapon_key_bits());
        // Weapon's id_size is 6; "000000" is not a registered key there,
        // so this becomes an UnknownProperty captured on the payload.
        w.push_bits(&crate::bits::u32_to_bits(0, 6));
        let body_bits = w.into_bits();

        let mut framed = BitWriter::new();
        framed.push_uint(body_bits.len() as u32, 14);
        framed.push_bits(&body_bits);
        let all = framed.into_bits();
        let mut cursor = BitCursor::new(&all);

        let payload = decode_payload(&mut cursor, 3, &mut state).unwrap();
        assert_eq!(payload.instance_name.as_deref(), Some("Weapon_0"));
        assert!(state.channels.contains_key(&3));
        assert!(payload.bitsleft_reason.is_some());
    }

    #[test]
    fn zero_size_payload_destroys_channel() {
        let mut state = ParserState::new();
        state.bind_channel(7, ClassKey::Id(0), "Weapon");
        let mut w = BitWriter::new();
        w.push_uint(0, 14);
        let bits = w.into_bits();
        let mut cursor = BitCursor::new(&bits);
        let payload = decode_payload(&mut cursor, 7, &mut state).unwrap();
        assert!(payload.object_deleted);
        assert!(!state.channels.contains_key(&7));
    }

    #[test]
    fn size_escape_fires_when_bits_10_and_13_set() {
        // Build a 14-bit size field with bit 10 and bit 13 both set, then
        // arbitrary body content following the pushed-back bit.
        let mut raw = bytes_to_bits(&[0, 0]);
        raw[10] = true;
        raw[13] = true;
        let mut all = raw[..14].to_vec();
        all.extend_from_slice(&[false; 12]);
        let mut cursor = BitCursor::new(&all);
        let size_bits = cursor.take(14).unwrap().to_vec();
        assert!(size_bits[10] && size_bits[13]);
        cursor.rewind(1);
        let declared = crate::bits::bits_to_u32(&size_bits[..13]);
        let body = cursor.take(declared as usize).unwrap();
        assert!(body[0], "pushed-back bit must be the body's first bit");
    }

    #[test]
    fn continuation_payload_reuses_bound_class_without_a_class_prefix() {
        let mut state = ParserState::new();
        state.bind_channel(9, ClassKey::Id(crate::bits::key_str_to_u32("01011000000000000000000000000111")), "Weapon");
        let mut body = BitWriter::new();
        body.push_bits(&"100001".chars().map(|c| c == '1').collect::<Vec<bool>>());
        body.push_bits(&[true; 64]);
        let body_bits = body.into_bits();
        let mut framed = BitWriter::new();
        framed.push_uint(body_bits.len() as u32, 14);
        framed.push_bits(&body_bits);
        let all = framed.into_bits();
        let mut cursor = BitCursor::new(&all);
        let payload = decode_payload(&mut cursor, 9, &mut state).unwrap();
        assert!(payload.class_intro.is_none());
        assert_eq!(payload.properties.len(), 1);
        assert_eq!(payload.properties[0].0, "ammo_count");
    }
}
