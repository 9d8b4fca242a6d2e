//! The decoded field tree model.
//!
//! [`DecodedField`] is the universal output node shared by the schema-less and
//! schema-based decoders. It is a tagged, JSON-serializable tree: visualization
//! layers consume it without knowing which decoder produced it.

use crate::error::Error;
use serde::{Serialize, Serializer};

/// Protobuf wire types.
///
/// The numeric values are fixed by the wire format. `StartGroup` and
/// `EndGroup` are deprecated and permanently unsupported by this decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    Fixed64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    LengthDelimited = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            _ => Err(Error::UnknownWireType { wire_type: value }),
        }
    }
}

impl WireType {
    /// Returns the conventional wire type name, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            WireType::Varint => "VARINT",
            WireType::Fixed64 => "FIXED64",
            WireType::LengthDelimited => "LENGTH_DELIMITED",
            WireType::StartGroup => "START_GROUP",
            WireType::EndGroup => "END_GROUP",
            WireType::Fixed32 => "FIXED32",
        }
    }
}

// Serialized as the raw wire type number, matching the tag encoding.
impl Serialize for WireType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// A single decoded field, possibly carrying nested fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedField {
    /// Field number from the tag. Always present in schema-less output;
    /// absent only on repeated-message wrapper nodes in schema output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_number: Option<u32>,

    /// Declared field name; schema mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Raw wire type; schema-less mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire_type: Option<WireType>,

    /// Type tag: `varint`, `fixed32`, `fixed64`, `string`, `bytes`,
    /// `message`, `repeated_<scalar>`, `repeated_message`, or a declared
    /// scalar proto type such as `int32`.
    #[serde(rename = "type")]
    pub field_type: String,

    /// The decoded value.
    pub value: FieldValue,

    /// Resolved message type simple name; schema mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Half-open `[start, end)` byte interval this field occupies within its
    /// immediate parent buffer; schema-less mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_range: Option<(usize, usize)>,
}

impl DecodedField {
    /// Creates a schema-less field node.
    pub(crate) fn raw(
        field_number: u32,
        wire_type: WireType,
        field_type: impl Into<String>,
        value: FieldValue,
        byte_range: (usize, usize),
    ) -> Self {
        Self {
            field_number: Some(field_number),
            name: None,
            wire_type: Some(wire_type),
            field_type: field_type.into(),
            value,
            message: None,
            byte_range: Some(byte_range),
        }
    }

    /// Creates a schema-mode field node.
    pub(crate) fn typed(
        field_number: u32,
        name: impl Into<String>,
        field_type: impl Into<String>,
        value: FieldValue,
    ) -> Self {
        Self {
            field_number: Some(field_number),
            name: Some(name.into()),
            wire_type: None,
            field_type: field_type.into(),
            value,
            message: None,
            byte_range: None,
        }
    }
}

/// The value carried by a [`DecodedField`].
///
/// 64-bit integers are always represented as decimal strings ([`Text`]) so
/// serialization stays lossless beyond 2^53; [`Int`] and [`UInt`] are only
/// used for values with a declared 32-bit width.
///
/// [`Text`]: FieldValue::Text
/// [`Int`]: FieldValue::Int
/// [`UInt`]: FieldValue::UInt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean scalar
    Bool(bool),
    /// 32-bit signed scalar
    Int(i64),
    /// 32-bit unsigned scalar (including `fixed32`)
    UInt(u64),
    /// Floating-point scalar
    Float(f64),
    /// String scalar, hex-encoded bytes, or a 64-bit integer as a decimal string
    Text(String),
    /// Repeated scalar values
    Scalars(Vec<FieldValue>),
    /// Nested message children, or repeated-message wrapper nodes
    Fields(Vec<DecodedField>),
}

/// Render a byte slice as a lowercase space-separated hex string.
pub(crate) fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
