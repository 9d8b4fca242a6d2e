//! Schema-less protobuf wire format decoding.
//!
//! This module parses raw wire-format bytes into a [`DecodedField`] tree using
//! only the wire format itself, with no knowledge of field names or declared
//! types.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: FIXED64 (fixed64, sfixed64, double)
//! - 2: LENGTH_DELIMITED (string, bytes, embedded messages, packed repeated fields)
//! - 3/4: START_GROUP / END_GROUP (deprecated, rejected)
//! - 5: FIXED32 (fixed32, sfixed32, float)
//!
//! ## Length-delimited classification
//!
//! A length-delimited payload could be a nested message, a string, or opaque
//! bytes; the wire format does not say which. Interpretations are attempted in
//! a fixed priority order, first success wins:
//!
//! 1. **Nested message** — accepted only if the recursive decode produced at
//!    least one field and consumed the entire payload.
//! 2. **Printable UTF-8 string** — accepted only if the text is non-empty,
//!    at most 1000 characters, and composed of printable characters.
//! 3. **Bytes** — the fallback, rendered as a space-separated hex string.
//!
//! Changing this order changes observable output on ambiguous inputs, so it
//! is fixed.

mod cursor;

use crate::error::{Error, Result};
use crate::field::{hex_string, DecodedField, FieldValue, WireType};
use tracing::{debug, trace};

pub use cursor::ByteCursor;

/// Longest payload the string heuristic will accept, in characters.
const MAX_PRINTABLE_LEN: usize = 1000;

/// Decode a buffer schema-lessly into a sequence of fields.
///
/// Decoding is tag-by-tag until the buffer is exhausted. Failures other than
/// group wire types degrade gracefully: decoding stops at the offending tag
/// and the fields parsed so far are returned, so trailing garbage or
/// misaligned data still yields a useful partial view.
///
/// Group wire types ([`WireType::StartGroup`]/[`WireType::EndGroup`]) are the
/// exception: they are structurally ambiguous to parse generically, so they
/// abort the entire call with [`Error::UnsupportedWireType`].
pub fn decode(buffer: &[u8]) -> Result<Vec<DecodedField>> {
    let (fields, leftover) = decode_partial(buffer)?;
    if leftover > 0 {
        debug!(
            "schema-less decode stopped early: {} of {} bytes left undecoded",
            leftover,
            buffer.len()
        );
    }
    Ok(fields)
}

/// Inner decode loop: returns the parsed fields plus the number of bytes left
/// unconsumed. The nested-message heuristic needs the leftover count to judge
/// whether a payload was fully explained by the message interpretation.
fn decode_partial(buffer: &[u8]) -> Result<(Vec<DecodedField>, usize)> {
    let mut cursor = ByteCursor::new(buffer);
    let mut fields = Vec::new();

    while cursor.remaining() > 0 {
        cursor.checkpoint();
        match decode_field(&mut cursor) {
            Ok(field) => fields.push(field),
            Err(err) if err.is_fatal_wire_error() => return Err(err),
            Err(err) => {
                trace!(
                    "stopping at offset {}: {} ({} field(s) decoded)",
                    cursor.position(),
                    err,
                    fields.len()
                );
                cursor.reset_to_checkpoint();
                break;
            }
        }
    }

    Ok((fields, cursor.remaining()))
}

/// Decode a single tag-prefixed field at the cursor's current position.
fn decode_field(cursor: &mut ByteCursor<'_>) -> Result<DecodedField> {
    let start = cursor.position();
    let (tag, _) = cursor.read_varint()?;
    let wire_type = WireType::try_from((tag & 0x07) as u8)?;
    let field_number = (tag >> 3) as u32;

    let (field_type, value) = match wire_type {
        WireType::Varint => {
            let (value, _) = cursor.read_varint()?;
            // Rendered as a decimal string: the declared width is unknown and
            // 64-bit values must survive JSON round-trips.
            ("varint".to_string(), FieldValue::Text(value.to_string()))
        }
        WireType::Fixed64 => {
            let value = cursor.read_fixed64()?;
            ("fixed64".to_string(), FieldValue::Text(value.to_string()))
        }
        WireType::Fixed32 => {
            let value = cursor.read_fixed32()?;
            ("fixed32".to_string(), FieldValue::UInt(u64::from(value)))
        }
        WireType::LengthDelimited => {
            let (len, _) = cursor.read_varint()?;
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            let data = cursor.read_bytes(len)?;
            classify_payload(data)
        }
        WireType::StartGroup | WireType::EndGroup => {
            return Err(Error::UnsupportedWireType {
                wire_type: wire_type as u8,
                name: wire_type.name(),
                field_number,
            });
        }
    };

    Ok(DecodedField::raw(
        field_number,
        wire_type,
        field_type,
        value,
        (start, cursor.position()),
    ))
}

/// Classify a length-delimited payload as message, string, or bytes.
fn classify_payload(data: &[u8]) -> (String, FieldValue) {
    // A group tag inside the payload just means the payload is not a message;
    // the candidate falls through to the string and bytes interpretations.
    if let Ok((nested, leftover)) = decode_partial(data) {
        if !nested.is_empty() && leftover == 0 {
            return ("message".to_string(), FieldValue::Fields(nested));
        }
    }

    if let Ok(text) = std::str::from_utf8(data) {
        if is_printable_text(text) {
            return ("string".to_string(), FieldValue::Text(text.to_string()));
        }
    }

    ("bytes".to_string(), FieldValue::Text(hex_string(data)))
}

/// The string heuristic: printable ASCII, common Latin-extended ranges, and
/// whitespace, non-empty after trimming and capped at 1000 characters.
///
/// Deliberately approximate. Genuinely binary payloads that happen to be
/// printable UTF-8 will be misclassified as strings; the cap and character
/// classes only make that unlikely, not impossible.
fn is_printable_text(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }

    let mut chars = 0usize;
    for c in text.chars() {
        chars += 1;
        if chars > MAX_PRINTABLE_LEN {
            return false;
        }
        let printable = matches!(c, '\u{0020}'..='\u{007e}')
            || c.is_whitespace()
            || matches!(c, '\u{00a0}'..='\u{024f}' | '\u{1e00}'..='\u{1eff}');
        if !printable {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_payload_text;
    use pretty_assertions::assert_eq;

    fn decode_hex(hex: &str) -> Vec<DecodedField> {
        decode(&parse_payload_text(hex).unwrap()).unwrap()
    }

    #[test]
    fn test_decode_varint_field() {
        // Field 1: varint 150
        let fields = decode_hex("08 96 01");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_number, Some(1));
        assert_eq!(fields[0].wire_type, Some(WireType::Varint));
        assert_eq!(fields[0].field_type, "varint");
        assert_eq!(fields[0].value, FieldValue::Text("150".into()));
        assert_eq!(fields[0].byte_range, Some((0, 3)));
    }

    #[test]
    fn test_decode_string_field() {
        // Field 2: "testing"
        let fields = decode_hex("12 07 74 65 73 74 69 6e 67");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_number, Some(2));
        assert_eq!(fields[0].wire_type, Some(WireType::LengthDelimited));
        assert_eq!(fields[0].field_type, "string");
        assert_eq!(fields[0].value, FieldValue::Text("testing".into()));
    }

    #[test]
    fn test_decode_multiple_fields() {
        // Field 1: varint 42; field 2: "hello"
        let fields = decode_hex("08 2a 12 05 68 65 6c 6c 6f");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].value, FieldValue::Text("42".into()));
        assert_eq!(fields[1].field_type, "string");
        assert_eq!(fields[1].value, FieldValue::Text("hello".into()));
    }

    #[test]
    fn test_decode_nested_message() {
        // Field 1: message { field 1: "something" }
        let buffer = parse_payload_text("CgsKCXNvbWV0aGluZw==").unwrap();
        let fields = decode(&buffer).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_number, Some(1));
        assert_eq!(fields[0].field_type, "message");

        let FieldValue::Fields(nested) = &fields[0].value else {
            panic!("expected nested fields, got {:?}", fields[0].value);
        };
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].field_number, Some(1));
        assert_eq!(nested[0].field_type, "string");
        assert_eq!(nested[0].value, FieldValue::Text("something".into()));
        // Byte ranges are relative to the nested payload, not the outer buffer
        assert_eq!(nested[0].byte_range, Some((0, 11)));
    }

    #[test]
    fn test_repeated_fields_stay_separate() {
        // repeated string tags = 1, values ["one", "two", "three"]
        let fields = decode_hex("0a 03 6f 6e 65 0a 03 74 77 6f 0a 05 74 68 72 65 65");
        assert_eq!(fields.len(), 3);
        for (field, expected) in fields.iter().zip(["one", "two", "three"]) {
            assert_eq!(field.field_number, Some(1));
            assert_eq!(field.field_type, "string");
            assert_eq!(field.value, FieldValue::Text(expected.into()));
        }
    }

    #[test]
    fn test_byte_ranges_partition_the_buffer() {
        // Six strings at field 3
        let buffer = parse_payload_text("GgR0aGlzGgJpcxoEanVzdBoHYW5vdGhlchoFMTIzNDUaBXRlc3Qh")
            .unwrap();
        let fields = decode(&buffer).unwrap();
        assert_eq!(fields.len(), 6);

        let expected = ["this", "is", "just", "another", "12345", "test!"];
        for (field, text) in fields.iter().zip(expected) {
            assert_eq!(field.field_number, Some(3));
            assert_eq!(field.value, FieldValue::Text(text.into()));
        }

        // Contiguous, ordered, non-overlapping, covering [0, len)
        assert_eq!(fields[0].byte_range.unwrap().0, 0);
        for pair in fields.windows(2) {
            assert_eq!(pair[0].byte_range.unwrap().1, pair[1].byte_range.unwrap().0);
        }
        assert_eq!(fields.last().unwrap().byte_range.unwrap().1, buffer.len());
    }

    #[test]
    fn test_large_varint() {
        // Field 1: varint 2^32
        let fields = decode_hex("08 80 80 80 80 10");
        assert_eq!(fields[0].value, FieldValue::Text("4294967296".into()));
    }

    #[test]
    fn test_fixed32_field() {
        let fields = decode_hex("1d 2a 00 00 00");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_number, Some(3));
        assert_eq!(fields[0].wire_type, Some(WireType::Fixed32));
        assert_eq!(fields[0].field_type, "fixed32");
        assert_eq!(fields[0].value, FieldValue::UInt(42));
    }

    #[test]
    fn test_fixed32_max() {
        let fields = decode_hex("1d ff ff ff ff");
        assert_eq!(fields[0].value, FieldValue::UInt(u64::from(u32::MAX)));
    }

    #[test]
    fn test_fixed64_field() {
        let fields = decode_hex("21 2a 00 00 00 00 00 00 00");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_number, Some(4));
        assert_eq!(fields[0].wire_type, Some(WireType::Fixed64));
        assert_eq!(fields[0].field_type, "fixed64");
        assert_eq!(fields[0].value, FieldValue::Text("42".into()));
    }

    #[test]
    fn test_fixed64_beyond_float_precision() {
        // 2^53 - 1, then one past it to prove string rendering stays exact
        let fields = decode_hex("21 ff ff ff ff ff ff 1f 00");
        assert_eq!(fields[0].value, FieldValue::Text("9007199254740991".into()));

        let fields = decode_hex("21 ff ff ff ff ff ff ff ff");
        assert_eq!(
            fields[0].value,
            FieldValue::Text(u64::MAX.to_string())
        );
    }

    #[test]
    fn test_mixed_field_types() {
        // varint 42, fixed32 100, fixed64 200, string "test"
        let fields =
            decode_hex("08 2a 15 64 00 00 00 19 c8 00 00 00 00 00 00 00 22 04 74 65 73 74");
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].value, FieldValue::Text("42".into()));
        assert_eq!(fields[1].value, FieldValue::UInt(100));
        assert_eq!(fields[2].value, FieldValue::Text("200".into()));
        assert_eq!(fields[3].value, FieldValue::Text("test".into()));
    }

    #[test]
    fn test_nested_message_with_fixed_fields() {
        // Field 1: message { field 1: fixed32 42, field 2: fixed64 84 }
        let fields = decode_hex("0a 0e 0d 2a 00 00 00 11 54 00 00 00 00 00 00 00");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type, "message");

        let FieldValue::Fields(nested) = &fields[0].value else {
            panic!("expected nested fields");
        };
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].value, FieldValue::UInt(42));
        assert_eq!(nested[1].value, FieldValue::Text("84".into()));
    }

    #[test]
    fn test_group_wire_types_are_fatal() {
        // Tag 0x1b: field 3, wire type 3 (START_GROUP)
        let err = decode(&[0x1b]).unwrap_err();
        match err {
            Error::UnsupportedWireType {
                wire_type,
                name,
                field_number,
            } => {
                assert_eq!(wire_type, 3);
                assert_eq!(name, "START_GROUP");
                assert_eq!(field_number, 3);
            }
            other => panic!("expected UnsupportedWireType, got {other:?}"),
        }
        assert!(err.to_string().contains("START_GROUP"));

        // Tag 0x1c: field 3, wire type 4 (END_GROUP)
        let err = decode(&[0x1c]).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedWireType { wire_type: 4, .. }
        ));
    }

    #[test]
    fn test_group_is_fatal_even_after_valid_fields() {
        // A valid varint field followed by a START_GROUP tag: the whole call
        // fails rather than returning the first field.
        let err = decode(&parse_payload_text("08 2a 1b").unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedWireType { .. }));
    }

    #[test]
    fn test_trailing_garbage_yields_partial_result() {
        // Valid field, then a truncated tag varint
        let fields = decode(&parse_payload_text("08 96 01 ff").unwrap()).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, FieldValue::Text("150".into()));
    }

    #[test]
    fn test_unknown_wire_type_stops_decoding() {
        // Tag 0x0e: field 1, wire type 6 (undefined)
        let fields = decode(&[0x0e]).unwrap();
        assert!(fields.is_empty());

        // ...and after a good field, the good field survives
        let fields = decode(&parse_payload_text("08 2a 0e").unwrap()).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_truncated_length_prefix_yields_partial_result() {
        // Field 1 length-delimited claiming 100 bytes with only 2 present
        let fields = decode(&parse_payload_text("08 2a 0a 64 00 00").unwrap()).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_binary_blob_is_not_misclassified_as_message() {
        // Field 1 length-delimited: [0x08, 0xff] starts like a varint field
        // but truncates mid-value, so the message interpretation produces no
        // complete field and the payload must come out as bytes.
        let fields = decode(&parse_payload_text("0a 02 08 ff").unwrap()).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type, "bytes");
        assert_eq!(fields[0].value, FieldValue::Text("08 ff".into()));
    }

    #[test]
    fn test_non_printable_utf8_falls_back_to_bytes() {
        // Field 1 length-delimited: a control character is valid UTF-8 but
        // not printable
        let fields = decode(&[0x0a, 0x02, 0x01, 0x41]).unwrap();
        assert_eq!(fields[0].field_type, "bytes");
        assert_eq!(fields[0].value, FieldValue::Text("01 41".into()));
    }

    #[test]
    fn test_group_inside_candidate_payload_is_not_fatal() {
        // Field 1 length-delimited with payload [0x1b, 0x41]: the message
        // interpretation hits a group tag and is rejected, but the outer
        // decode survives with a bytes classification.
        let fields = decode(&[0x0a, 0x02, 0x1b, 0x41]).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type, "bytes");
    }

    #[test]
    fn test_empty_payload_is_bytes_not_message() {
        // Zero-length payload: the message interpretation has no fields and
        // the string heuristic rejects empties
        let fields = decode(&[0x0a, 0x00]).unwrap();
        assert_eq!(fields[0].field_type, "bytes");
        assert_eq!(fields[0].value, FieldValue::Text("".into()));
    }

    #[test]
    fn test_empty_buffer() {
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_idempotence() {
        let buffer =
            parse_payload_text("08 2a 15 64 00 00 00 19 c8 00 00 00 00 00 00 00 22 04 74 65 73 74")
                .unwrap();
        assert_eq!(decode(&buffer).unwrap(), decode(&buffer).unwrap());
    }

    #[test]
    fn test_is_printable_text() {
        assert!(is_printable_text("hello world"));
        assert!(is_printable_text("Üñïçôdé")); // Latin extended
        assert!(is_printable_text("line\nbreaks\tallowed"));
        assert!(!is_printable_text(""));
        assert!(!is_printable_text("   \n\t"));
        assert!(!is_printable_text("null\u{0}byte"));
        assert!(!is_printable_text(&"x".repeat(1001)));
        assert!(is_printable_text(&"x".repeat(1000)));
    }
}
