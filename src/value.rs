//! Property-value kinds (the schema side) and decoded property values
//! (the data side), plus their codecs.

use crate::bits::{bits_to_u32, key_str_to_u32, BitCursor, BitWriter, Bits};
use crate::error::DecodeError;

/// A member-list entry has the same shape as a property descriptor minus
/// the id, so `Member` and `PropertyDescriptor` are the same type.
pub type Member = PropertyDescriptor;

#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy)]
pub enum ValueKind {
    Int32,
    Float32,
    Bool,
    /// Zero-width marker property; its presence alone is the signal.
    Flag,
    SizedBits(usize),
    Str,
    /// Bit width, then a table of bitstring-key -> label. Unrecognized
    /// patterns decode to a "Unknown" label rather than failing, matching
    /// how unrecognized classes stay live instead of erroring.
    MultipleChoice(usize, &'static [(&'static str, &'static str)]),
    /// Positional members, no presence bits.
    Struct(&'static [Member]),
    /// Positional members, each preceded by a one-bit presence flag.
    Params(&'static [Member]),
    Mystery1,
    Mystery2,
    Mystery3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int32(u32),
    Float32(f32),
    Bool(bool),
    Flag,
    SizedBits(Bits),
    Str(String),
    MultipleChoice { bits: Bits, label: String },
    Struct(Vec<PropertyValue>),
    Params(Vec<Option<PropertyValue>>),
    Mystery1 {
        i1: u32,
        i2: u32,
        i3: u32,
        i4: u32,
        s1: String,
        s2: String,
        i5: u32,
        i6: u32,
        s3: String,
    },
    Mystery2 {
        s1: String,
        s2: String,
        s3: String,
    },
    Mystery3 {
        s1: String,
        s2: String,
    },
}

pub fn decode_value(cursor: &mut BitCursor, kind: &ValueKind) -> Result<PropertyValue, DecodeError> {
    match kind {
        ValueKind::Int32 => Ok(PropertyValue::Int32(cursor.take_uint(32)?)),
        ValueKind::Float32 => Ok(PropertyValue::Float32(cursor.take_f32()?)),
        ValueKind::Bool => Ok(PropertyValue::Bool(cursor.take_bool()?)),
        ValueKind::Flag => Ok(PropertyValue::Flag),
        ValueKind::SizedBits(n) => Ok(PropertyValue::SizedBits(cursor.take(*n)?.to_vec())),
        ValueKind::Str => Ok(PropertyValue::Str(cursor.take_string()?)),
        ValueKind::MultipleChoice(n, table) => {
            let raw = cursor.take(*n)?.to_vec();
            let value = bits_to_u32(&raw);
            let label = table
                .iter()
                .find(|(key, _)| key_str_to_u32(key) == value)
                .map(|(_, label)| (*label).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            Ok(PropertyValue::MultipleChoice { bits: raw, label })
        }
        ValueKind::Struct(members) => {
            let mut values = Vec::with_capacity(members.len());
            for member in members.iter() {
                values.push(decode_value(cursor, &member.kind)?);
            }
            Ok(PropertyValue::Struct(values))
        }
        ValueKind::Params(members) => {
            let mut values = Vec::with_capacity(members.len());
            for member in members.iter() {
                if cursor.take_bool()? {
                    values.push(Some(decode_value(cursor, &member.kind)?));
                } else {
                    values.push(None);
                }
            }
            Ok(PropertyValue::Params(values))
        }
        ValueKind::Mystery1 => Ok(PropertyValue::Mystery1 {
            i1: cursor.take_uint(32)?,
            i2: cursor.take_uint(32)?,
            i3: cursor.take_uint(32)?,
            i4: cursor.take_uint(32)?,
            s1: cursor.take_string()?,
            s2: cursor.take_string()?,
            i5: cursor.take_uint(32)?,
            i6: cursor.take_uint(32)?,
            s3: cursor.take_string()?,
        }),
        ValueKind::Mystery2 => Ok(PropertyValue::Mystery2 {
            s1: cursor.take_string()?,
            s2: cursor.take_string()?,
            s3: cursor.take_string()?,
        }),
        ValueKind::Mystery3 => Ok(PropertyValue::Mystery3 {
            s1: cursor.take_string()?,
            s2: cursor.take_string()?,
        }),
    }
}

pub fn encode_value(value: &PropertyValue, out: &mut BitWriter) {
    match value {
        PropertyValue::Int32(v) => out.push_uint(*v, 32),
        PropertyValue::Float32(v) => out.push_f32(*v),
        PropertyValue::Bool(v) => out.push_bool(*v),
        PropertyValue::Flag => {}
        PropertyValue::SizedBits(bits) => out.push_bits(bits),
        PropertyValue::Str(s) => out.push_string(s),
        PropertyValue::MultipleChoice { bits, .. } => out.push_bits(bits),
        PropertyValue::Struct(values) => {
            for v in values {
                encode_value(v, out);
            }
        }
        // Tolerates a shorter-than-schema vector: whatever isn't present
        // here simply isn't written, matching the member list only ever
        // growing a trailing absence, never shrinking the wire shape.
        PropertyValue::Params(values) => {
            for v in values {
                match v {
                    Some(value) => {
                        out.push_bool(true);
                        encode_value(value, out);
                    }
                    None => out.push_bool(false),
                }
            }
        }
        PropertyValue::Mystery1 {
            i1,
            i2,
            i3,
            i4,
            s1,
            s2,
            i5,
            i6,
            s3,
        } => {
            out.push_uint(*i1, 32);
            out.push_uint(*i2, 32);
            out.push_uint(*i3, 32);
            out.push_uint(*i4, 32);
            out.push_string(s1);
            out.push_string(s2);
            out.push_uint(*i5, 32);
            out.push_uint(*i6, 32);
            out.push_string(s3);
        }
        PropertyValue::Mystery2 { s1, s2, s3 } => {
            out.push_string(s1);
            out.push_string(s2);
            out.push_string(s3);
        }
        PropertyValue::Mystery3 { s1, s2 } => {
            out.push_string(s1);
            out.push_string(s2);
        }
    }
}

impl PropertyValue {
    /// Human-readable rendering for the CLI and test failure messages.
    pub fn describe(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        match self {
            PropertyValue::Int32(v) => format!("{v}"),
            PropertyValue::Float32(v) => format!("{v}"),
            PropertyValue::Bool(v) => format!("{v}"),
            PropertyValue::Flag => "<flag>".to_string(),
            PropertyValue::SizedBits(bits) => {
                let s: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
                format!("bits({})", s)
            }
            PropertyValue::Str(s) => format!("{s:?}"),
            PropertyValue::MultipleChoice { label, .. } => label.clone(),
            PropertyValue::Struct(values) => {
                let inner: Vec<String> = values
                    .iter()
                    .map(|v| format!("{pad}  {}", v.describe(indent + 2)))
                    .collect();
                format!("struct {{\n{}\n{pad}}}", inner.join(",\n"))
            }
            PropertyValue::Params(values) => {
                let inner: Vec<String> = values
                    .iter()
                    .map(|v| match v {
                        Some(v) => format!("{pad}  {}", v.describe(indent + 2)),
                        None => format!("{pad}  <absent>"),
                    })
                    .collect();
                format!("params(\n{}\n{pad})", inner.join(",\n"))
            }
            PropertyValue::Mystery1 { .. } | PropertyValue::Mystery2 { .. } | PropertyValue::Mystery3 { .. } => {
                format!("{self:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_round_trip() {
        let mut w = BitWriter::new();
        encode_value(&PropertyValue::Int32(0xdead_beef), &mut w);
        let bits = w.into_bits();
        let mut c = BitCursor::new(&bits);
        let v = decode_value(&mut c, &ValueKind::Int32).unwrap();
        assert_eq!(v, PropertyValue::Int32(0xdead_beef));
    }

    #[test]
    fn multiple_choice_unknown_pattern_does_not_fail() {
        let table: &[(&str, &str)] = &[("00", "A"), ("10", "B")];
        let mut w = BitWriter::new();
        w.push_uint(0b01, 2);
        let bits = w.into_bits();
        let mut c = BitCursor::new(&bits);
        let v = decode_value(&mut c, &ValueKind::MultipleChoice(2, table)).unwrap();
        match v {
            PropertyValue::MultipleChoice { label, .. } => assert_eq!(label, "Unknown"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn params_absent_trailing_member_encodes_as_single_bit() {
        static MEMBERS: &[Member] = &[
            Member { name: "a", kind: ValueKind::Int32 },
            Member { name: "b", kind: ValueKind::Int32 },
        ];
        let value = PropertyValue::Params(vec![Some(PropertyValue::Int32(1)), None]);
        let mut w = BitWriter::new();
        encode_value(&value, &mut w);
        let bits = w.into_bits();
        assert_eq!(bits.len(), 1 + 32 + 1);
        let mut c = BitCursor::new(&bits);
        let decoded = decode_value(&mut c, &ValueKind::Params(MEMBERS)).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn mystery2_round_trip() {
        let value = PropertyValue::Mystery2 {
            s1: "a".into(),
            s2: "bb".into(),
            s3: "".into(),
        };
        let mut w = BitWriter::new();
        encode_value(&value, &mut w);
        let bits = w.into_bits();
        let mut c = BitCursor::new(&bits);
        let decoded = decode_value(&mut c, &ValueKind::Mystery2).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(c.remaining(), 0);
    }
}
