//! Object codec: repeatedly decodes a property key + value pair until the
//! payload slice is exhausted.

use crate::bits::{BitCursor, BitWriter};
use crate::error::DecodeError;
use crate::schema::RuntimeClass;
use crate::value::{decode_value, encode_value, PropertyValue};

pub fn decode_property_stream(
    cursor: &mut BitCursor,
    class: &RuntimeClass,
    debug_roundtrip: bool,
    out: &mut Vec<(String, PropertyValue)>,
) -> Result<(), DecodeError> {
    while cursor.remaining() > 0 {
        if cursor.remaining() < class.id_size {
            return Err(DecodeError::TrailingBits {
                bitsleft: cursor.remaining_bits(),
            });
        }
        let key_bits = cursor.take(class.id_size)?;
        let key = key_bits_to_string(key_bits);

        let descriptor = match class.properties.get(&key) {
            Some(d) => d,
            None => {
                // The key itself is unparseable content, not just a lookup
                // failure: it has to stay in `bitsleft` or re-encoding would
                // silently drop it.
                let mut bitsleft = key_bits.to_vec();
                bitsleft.extend(cursor.remaining_bits());
                return Err(DecodeError::UnknownProperty {
                    class: class.name.clone(),
                    key,
                    bitsleft,
                });
            }
        };

        let before_value = *cursor;
        let value = decode_value(cursor, &descriptor.kind)?;
        tracing::trace!(class = class.name.as_str(), property = descriptor.name, "decoded property");
        if debug_roundtrip {
            let consumed_len = before_value.remaining() - cursor.remaining();
            let consumed = before_value.peek(consumed_len).expect("just consumed this many bits");
            let mut w = BitWriter::new();
            encode_value(&value, &mut w);
            assert_eq!(
                consumed,
                w.as_bits(),
                "round-trip mismatch decoding property {} of class {}",
                descriptor.name,
                class.name
            );
        }
        out.push((descriptor.name.to_string(), value));
    }
    Ok(())
}

pub fn encode_property_stream(properties: &[(String, PropertyValue)], out: &mut BitWriter, class: &RuntimeClass) {
    for (name, value) in properties {
        let key = class
            .properties
            .iter()
            .find(|(_, d)| d.name == name)
            .map(|(k, _)| k.clone())
            .unwrap_or_default();
        out.push_bits(&string_to_key_bits(&key));
        encode_value(value, out);
    }
}

fn key_bits_to_string(bits: &[bool]) -> String {
    bits.iter().map(|b| if *b { '1' } else { '0' }).collect()
}

fn string_to_key_bits(key: &str) -> Vec<bool> {
    key.chars().map(|c| c == '1').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Registry;
    use crate::value::PropertyValue;

    #[test]
    fn unknown_property_bitsleft_includes_the_key_itself() {
        let registry = Registry::new();
        let class = registry.class(crate::schema::ClassKey::Id(crate::bits::key_str_to_u32(
            "01011000000000000000000000000111",
        )));
        // Weapon's id_size is 6; "000000" is not a registered key.
        let mut w = BitWriter::new();
        w.push_bits(&[false, false, false, false, false, false]);
        w.push_bool(true);
        w.push_bool(false);
        let bits = w.into_bits();
        let mut cursor = BitCursor::new(&bits);
        let mut out = Vec::new();
        let err = decode_property_stream(&mut cursor, class, false, &mut out).unwrap_err();
        match err {
            // The unrecognized key has to survive in bitsleft too, or
            // re-encoding the payload would silently drop those 6 bits.
            DecodeError::UnknownProperty { bitsleft, .. } => assert_eq!(bitsleft, bits),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn trailing_bits_when_remainder_too_short_for_next_key() {
        let registry = Registry::new();
        let class = registry.class(crate::schema::ClassKey::Id(crate::bits::key_str_to_u32(
            "01011000000000000000000000000110",
        )));
        // FlagCTF id_size is 5; leave 3 stray bits after one valid property.
        let mut w = BitWriter::new();
        w.push_bits(&string_to_key_bits("10000")); // collide_actors
        w.push_bool(true);
        w.push_bits(&[true, false, true]);
        let bits = w.into_bits();
        let mut cursor = BitCursor::new(&bits);
        let mut out = Vec::new();
        let err = decode_property_stream(&mut cursor, class, false, &mut out).unwrap_err();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "collide_actors");
        match err {
            DecodeError::TrailingBits { bitsleft } => assert_eq!(bitsleft, vec![true, false, true]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decodes_and_reencodes_a_full_property_stream() {
        let registry = Registry::new();
        let class = registry.class(crate::schema::ClassKey::Id(crate::bits::key_str_to_u32(
            "01011000000000000000000000000111",
        )));
        let mut w = BitWriter::new();
        w.push_bits(&string_to_key_bits("100001"));
        w.push_bits(&[true; 64]);
        w.push_bits(&string_to_key_bits("010001"));
        w.push_bool(true);
        let bits = w.into_bits();
        let mut cursor = BitCursor::new(&bits);
        let mut out = Vec::new();
        decode_property_stream(&mut cursor, class, true, &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, "ammo_count");
        assert_eq!(out[1].0, "is_reloading");
        assert_eq!(out[1].1, PropertyValue::Bool(true));

        let mut reencoded = BitWriter::new();
        encode_property_stream(&out, &mut reencoded, class);
        assert_eq!(reencoded.into_bits(), bits);
    }
}
