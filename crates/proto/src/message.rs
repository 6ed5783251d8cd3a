//! Dynamic protobuf messages.
//!
//! A [`DynamicMessage`] holds field values keyed by field number and
//! encodes them with the standard protobuf binary encoding. Every set field
//! is written, including zero values, so presence survives a round trip:
//! an absent field is distinguishable from a field holding `0` or `""`.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut};
use prost::{
    DecodeError,
    encoding::{self, DecodeContext, WireType},
};
use snafu::ResultExt;

use crate::{
    descriptor::{FieldDescriptor, MessageDescriptor},
    error::{DecodeSnafu, WireError},
    schema::FieldKind,
};

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// `bool`
    Bool(bool),
    /// `int32` or `sint32`
    I32(i32),
    /// `int64` or `sint64`
    I64(i64),
    /// `uint32`
    U32(u32),
    /// `uint64`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Vec<u8>),
    /// Nested message.
    Message(DynamicMessage),
}

impl WireValue {
    /// Short name of the variant.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Message(_) => "message",
        }
    }

    fn fits(&self, field: &FieldDescriptor) -> bool {
        match (field.kind(), self) {
            (FieldKind::Bool, Self::Bool(_))
            | (FieldKind::Int32 | FieldKind::Sint32, Self::I32(_))
            | (FieldKind::Int64 | FieldKind::Sint64, Self::I64(_))
            | (FieldKind::Uint32, Self::U32(_))
            | (FieldKind::Uint64, Self::U64(_))
            | (FieldKind::Float, Self::F32(_))
            | (FieldKind::Double, Self::F64(_))
            | (FieldKind::String, Self::String(_))
            | (FieldKind::Bytes, Self::Bytes(_)) => true,
            (FieldKind::Message, Self::Message(message)) => {
                field.message_type().is_some_and(|expected| *expected == message.descriptor)
            },
            _ => false,
        }
    }
}

/// A message of a compiled type with its populated fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    descriptor: MessageDescriptor,
    fields: BTreeMap<u32, WireValue>,
}

impl DynamicMessage {
    /// Empty message of the given type.
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor, fields: BTreeMap::new() }
    }

    /// Message type.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Sets a field, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownField`] if the type declares no such
    /// field and [`WireError::KindMismatch`] if the value does not fit it.
    pub fn set_field(&mut self, number: u32, value: WireValue) -> Result<(), WireError> {
        let field = self.descriptor.field(number).ok_or_else(|| WireError::UnknownField {
            message_type: self.descriptor.full_name().to_string(),
            number,
        })?;
        if !value.fits(field) {
            return Err(WireError::KindMismatch {
                field: field.name().to_string(),
                expected: field.kind(),
                found: value.kind_name(),
            });
        }
        self.fields.insert(number, value);
        Ok(())
    }

    /// Clears a field.
    pub fn clear_field(&mut self, number: u32) -> Option<WireValue> {
        self.fields.remove(&number)
    }

    /// Value of a populated field.
    pub fn get(&self, number: u32) -> Option<&WireValue> {
        self.fields.get(&number)
    }

    /// Whether a field is populated.
    pub fn has(&self, number: u32) -> bool {
        self.fields.contains_key(&number)
    }

    /// Populated fields in field number order.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &WireValue)> {
        self.fields.iter().map(|(&number, value)| (number, value))
    }

    /// Number of populated fields.
    pub fn populated(&self) -> usize {
        self.fields.len()
    }

    /// Encodes the message into `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        for (&tag, value) in &self.fields {
            match (self.descriptor.field(tag).map(FieldDescriptor::kind), value) {
                (Some(FieldKind::Sint32), WireValue::I32(v)) => encoding::sint32::encode(tag, v, buf),
                (_, WireValue::I32(v)) => encoding::int32::encode(tag, v, buf),
                (Some(FieldKind::Sint64), WireValue::I64(v)) => encoding::sint64::encode(tag, v, buf),
                (_, WireValue::I64(v)) => encoding::int64::encode(tag, v, buf),
                (_, WireValue::Bool(v)) => encoding::bool::encode(tag, v, buf),
                (_, WireValue::U32(v)) => encoding::uint32::encode(tag, v, buf),
                (_, WireValue::U64(v)) => encoding::uint64::encode(tag, v, buf),
                (_, WireValue::F32(v)) => encoding::float::encode(tag, v, buf),
                (_, WireValue::F64(v)) => encoding::double::encode(tag, v, buf),
                (_, WireValue::String(v)) => encoding::string::encode(tag, v, buf),
                (_, WireValue::Bytes(v)) => encoding::bytes::encode(tag, v, buf),
                (_, WireValue::Message(v)) => encoding::bytes::encode(tag, &v.encode_to_vec(), buf),
            }
        }
    }

    /// Encodes the message into a new buffer.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    /// Parses `buf` as a message of type `descriptor`.
    ///
    /// Fields the type does not declare are skipped. When a field occurs
    /// more than once the last occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Decode`] naming the expected message type if
    /// the bytes are not a valid encoding of it.
    pub fn decode(descriptor: &MessageDescriptor, buf: impl Buf) -> Result<Self, WireError> {
        Self::decode_inner(descriptor, buf)
            .context(DecodeSnafu { message_type: descriptor.full_name() })
    }

    fn decode_inner(descriptor: &MessageDescriptor, mut buf: impl Buf) -> Result<Self, DecodeError> {
        let mut message = Self::new(descriptor.clone());
        while buf.has_remaining() {
            let (tag, wire_type) = encoding::decode_key(&mut buf)?;
            let Some(field) = descriptor.field(tag) else {
                encoding::skip_field(wire_type, tag, &mut buf, DecodeContext::default())?;
                continue;
            };
            let value = merge_value(field, wire_type, &mut buf)?;
            message.fields.insert(tag, value);
        }
        Ok(message)
    }
}

fn merge_value(field: &FieldDescriptor, wire_type: WireType, buf: &mut impl Buf) -> Result<WireValue, DecodeError> {
    let ctx = DecodeContext::default();
    let value = match field.kind() {
        FieldKind::Bool => {
            let mut v = false;
            encoding::bool::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::Bool(v)
        },
        FieldKind::Int32 => {
            let mut v = 0i32;
            encoding::int32::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::I32(v)
        },
        FieldKind::Sint32 => {
            let mut v = 0i32;
            encoding::sint32::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::I32(v)
        },
        FieldKind::Uint32 => {
            let mut v = 0u32;
            encoding::uint32::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::U32(v)
        },
        FieldKind::Int64 => {
            let mut v = 0i64;
            encoding::int64::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::I64(v)
        },
        FieldKind::Sint64 => {
            let mut v = 0i64;
            encoding::sint64::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::I64(v)
        },
        FieldKind::Uint64 => {
            let mut v = 0u64;
            encoding::uint64::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::U64(v)
        },
        FieldKind::Float => {
            let mut v = 0f32;
            encoding::float::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::F32(v)
        },
        FieldKind::Double => {
            let mut v = 0f64;
            encoding::double::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::F64(v)
        },
        FieldKind::String => {
            let mut v = String::new();
            encoding::string::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::String(v)
        },
        FieldKind::Bytes => {
            let mut v = Vec::new();
            encoding::bytes::merge(wire_type, &mut v, buf, ctx)?;
            WireValue::Bytes(v)
        },
        FieldKind::Message => {
            let mut raw = Vec::new();
            encoding::bytes::merge(wire_type, &mut raw, buf, ctx)?;
            // Compilation resolves every message field.
            match field.message_type() {
                Some(nested) => WireValue::Message(DynamicMessage::decode_inner(nested, raw.as_slice())?),
                None => WireValue::Bytes(raw),
            }
        },
    };
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use prost::Message;

    use super::*;
    use crate::{
        descriptor::WireSchema,
        schema::{FieldProto, MessageProto, WireSchemaProto},
    };

    /// Statically typed twin of the dynamic `t` message below.
    #[derive(Clone, PartialEq, Message)]
    struct Typed {
        #[prost(sint64, tag = "1")]
        id: i64,
        #[prost(string, tag = "2")]
        name: String,
        #[prost(bool, tag = "3")]
        flag: bool,
        #[prost(uint32, tag = "5")]
        stamp: u32,
    }

    fn compiled() -> WireSchema {
        WireSchema::compile(WireSchemaProto {
            package: "p".to_string(),
            messages: vec![
                MessageProto {
                    name: "t".to_string(),
                    fields: vec![
                        FieldProto::scalar("id", 1, FieldKind::Sint64),
                        FieldProto::scalar("name", 2, FieldKind::String),
                        FieldProto::scalar("flag", 3, FieldKind::Bool),
                        FieldProto::scalar("stamp", 5, FieldKind::Uint32),
                    ],
                    options: None,
                },
                MessageProto {
                    name: "wrap".to_string(),
                    fields: vec![FieldProto::message("t", 4, "t")],
                    options: None,
                },
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_dynamic_encoding_matches_prost() {
        let schema = compiled();
        let mut message = DynamicMessage::new(schema.message("t").unwrap().clone());
        message.set_field(1, WireValue::I64(-5)).unwrap();
        message.set_field(2, WireValue::String("abc".to_string())).unwrap();
        message.set_field(3, WireValue::Bool(true)).unwrap();
        message.set_field(5, WireValue::U32(7)).unwrap();

        let typed = Typed { id: -5, name: "abc".to_string(), flag: true, stamp: 7 };
        assert_eq!(message.encode_to_vec(), typed.encode_to_vec());
    }

    #[test]
    fn test_zero_values_keep_presence() {
        let schema = compiled();
        let t = schema.message("t").unwrap();
        let mut message = DynamicMessage::new(t.clone());
        message.set_field(1, WireValue::I64(0)).unwrap();

        let decoded = DynamicMessage::decode(t, message.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.get(1), Some(&WireValue::I64(0)));
        assert!(!decoded.has(2));
        assert_eq!(decoded.populated(), 1);
    }

    #[test]
    fn test_nested_roundtrip() {
        let schema = compiled();
        let t = schema.message("t").unwrap();
        let wrap = schema.message("wrap").unwrap();
        let mut inner = DynamicMessage::new(t.clone());
        inner.set_field(2, WireValue::String("x".to_string())).unwrap();
        let mut outer = DynamicMessage::new(wrap.clone());
        outer.set_field(4, WireValue::Message(inner.clone())).unwrap();

        let decoded = DynamicMessage::decode(wrap, outer.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.get(4), Some(&WireValue::Message(inner)));
    }

    #[test]
    fn test_set_field_checks_kind_and_number() {
        let schema = compiled();
        let mut message = DynamicMessage::new(schema.message("t").unwrap().clone());
        let err = message.set_field(1, WireValue::String("no".to_string())).unwrap_err();
        assert!(matches!(err, WireError::KindMismatch { .. }));
        let err = message.set_field(9, WireValue::Bool(true)).unwrap_err();
        assert!(matches!(err, WireError::UnknownField { number: 9, .. }));

        let wrong_type = DynamicMessage::new(schema.message("wrap").unwrap().clone());
        let mut wrap = DynamicMessage::new(schema.message("wrap").unwrap().clone());
        assert!(wrap.set_field(4, WireValue::Message(wrong_type)).is_err());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let schema = compiled();
        let t = schema.message("t").unwrap();
        let mut bytes = Vec::new();
        encoding::string::encode(15, &"extra".to_string(), &mut bytes);
        encoding::sint64::encode(1, &9, &mut bytes);
        let decoded = DynamicMessage::decode(t, bytes.as_slice()).unwrap();
        assert_eq!(decoded.populated(), 1);
        assert_eq!(decoded.get(1), Some(&WireValue::I64(9)));
    }

    #[test]
    fn test_garbage_names_expected_type() {
        let schema = compiled();
        let t = schema.message("t").unwrap();
        let err = DynamicMessage::decode(t, &[0x0a, 0xff][..]).unwrap_err();
        match err {
            WireError::Decode { message_type, .. } => assert_eq!(message_type, "p.t"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wire_type_mismatch_is_decode_error() {
        let schema = compiled();
        let t = schema.message("t").unwrap();
        // field 2 is a string but arrives as a varint
        let mut bytes = Vec::new();
        encoding::uint64::encode(2, &1, &mut bytes);
        assert!(DynamicMessage::decode(t, bytes.as_slice()).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_scalar_roundtrip(id in proptest::num::i64::ANY, name in ".{0,24}", stamp in proptest::num::u32::ANY) {
            let schema = compiled();
            let t = schema.message("t").unwrap();
            let mut message = DynamicMessage::new(t.clone());
            message.set_field(1, WireValue::I64(id)).unwrap();
            message.set_field(2, WireValue::String(name)).unwrap();
            message.set_field(5, WireValue::U32(stamp)).unwrap();
            let decoded = DynamicMessage::decode(t, message.encode_to_vec().as_slice()).unwrap();
            proptest::prop_assert_eq!(decoded, message);
        }
    }
}
