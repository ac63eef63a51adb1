//! Per-field decode and encode rules.
//!
//! A primitive value is checked before anything is written, so a rejected
//! value leaves its slot untouched.

use crate::{
    bits::{fits_signed, fits_unsigned, low_mask, read_uint, sign_extend, write_uint},
    errors::{CodecError, EncodeError},
    field::{FieldType, Kind, TypeTag},
    schema::{CompiledField, Schema},
    value::{Endian, Value},
};

/// Decodes one primitive slot. `data` is exactly `tag.width` bytes.
pub(crate) fn decode_primitive(
    field: &str,
    tag: TypeTag,
    data: &[u8],
    endian: Endian,
) -> Result<Value, CodecError> {
    match tag.kind {
        Kind::Unsigned => Ok(Value::U64(read_uint(data, endian))),
        Kind::Signed => Ok(Value::I64(sign_extend(
            read_uint(data, endian),
            tag.width * 8,
        ))),
        Kind::Text => decode_text(data)
            .map(Value::Text)
            .ok_or_else(|| CodecError::InvalidText {
                field: field.to_string(),
            }),
        Kind::Bytes => Ok(Value::Bytes(data.to_vec())),
    }
}

/// UTF-8 decode with every NUL removed, wherever it sits in the slot.
pub fn decode_text(data: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(data).ok()?;
    Some(text.replace('\0', ""))
}

/// Encodes all `values` of `schema` into `out` (exactly `schema.size()` bytes).
pub(crate) fn encode_fields(
    schema: &Schema,
    values: &[Value],
    endian: Endian,
    out: &mut [u8],
) -> Result<(), CodecError> {
    for (field, value) in schema.fields().iter().zip(values) {
        encode_value(field, value, endian, &mut out[field.range()])?;
    }

    Ok(())
}

/// Encodes one field value into `out` (exactly the field width).
///
/// Nested records are re-encoded from their values in `endian`.
pub(crate) fn encode_value(
    field: &CompiledField,
    value: &Value,
    endian: Endian,
    out: &mut [u8],
) -> Result<(), CodecError> {
    match (&field.ty, value) {
        (FieldType::Primitive(tag), value) => {
            encode_primitive(*tag, value, out, endian).map_err(|e| CodecError::encode(&field.name, e))
        }
        (FieldType::Nested(schema), Value::Record(record)) => {
            if !schema.same_layout(record.schema()) {
                return Err(CodecError::encode(
                    &field.name,
                    EncodeError::SchemaMismatch {
                        expected: schema.name().to_string(),
                        actual: record.schema().name().to_string(),
                    },
                ));
            }

            encode_fields(schema, record.values(), endian, out).map_err(|e| within(&field.name, e))
        }
        (FieldType::Nested(_), other) => Err(CodecError::encode(
            &field.name,
            EncodeError::TypeMismatch {
                expected: "record",
                actual: other.kind_name(),
            },
        )),
    }
}

/// Prefixes the field path of errors raised inside a nested record.
fn within(parent: &str, err: CodecError) -> CodecError {
    match err {
        CodecError::Encode { field, source } => CodecError::Encode {
            field: format!("{parent}.{field}"),
            source,
        },
        other => other,
    }
}

fn encode_primitive(
    tag: TypeTag,
    value: &Value,
    out: &mut [u8],
    endian: Endian,
) -> Result<(), EncodeError> {
    match (tag.kind, value) {
        (Kind::Unsigned, Value::U64(v)) => {
            if !fits_unsigned(*v, tag.width) {
                return Err(EncodeError::ValueOutOfRange {
                    value: *v as i128,
                    width: tag.width,
                });
            }
            write_uint(out, *v, endian);
        }
        (Kind::Signed, Value::I64(v)) => {
            if !fits_signed(*v, tag.width) {
                return Err(EncodeError::ValueOutOfRange {
                    value: *v as i128,
                    width: tag.width,
                });
            }
            write_uint(out, *v as u64 & low_mask(tag.width as u32 * 8), endian);
        }
        (Kind::Text, Value::Text(text)) => {
            let bytes = text.as_bytes();
            if bytes.contains(&0) {
                return Err(EncodeError::EmbeddedNul);
            }
            if bytes.len() > tag.width {
                return Err(EncodeError::TextTooLong {
                    len: bytes.len(),
                    width: tag.width,
                });
            }
            out[..bytes.len()].copy_from_slice(bytes);
            out[bytes.len()..].fill(0);
        }
        (Kind::Bytes, Value::Bytes(bytes)) => {
            if bytes.len() != tag.width {
                return Err(EncodeError::LengthMismatch {
                    expected: tag.width,
                    actual: bytes.len(),
                });
            }
            out.copy_from_slice(bytes);
        }
        (kind, value) => {
            return Err(EncodeError::TypeMismatch {
                expected: kind.name(),
                actual: value.kind_name(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(tag: TypeTag, value: Value, endian: Endian) -> Result<Vec<u8>, EncodeError> {
        let mut out = vec![0u8; tag.width];
        encode_primitive(tag, &value, &mut out, endian)?;
        Ok(out)
    }

    #[test]
    fn test_decode_signed() {
        let decode = |b: u8| decode_primitive("v", TypeTag::I8, &[b], Endian::Little).unwrap();
        assert_eq!(decode(0xff), Value::I64(-1));
        assert_eq!(decode(0x80), Value::I64(-128));
        assert_eq!(decode(0x7f), Value::I64(127));

        let wide = decode_primitive("v", TypeTag::I32, &[0xfe, 0xff, 0xff, 0xff], Endian::Little);
        assert_eq!(wide.unwrap(), Value::I64(-2));
    }

    #[test]
    fn test_decode_unsigned_byte_order() {
        let data = [0x00, 0x00, 0x00, 0x19];
        assert_eq!(
            decode_primitive("cmd", TypeTag::U32, &data, Endian::Big).unwrap(),
            Value::U64(0x19)
        );
        assert_eq!(
            decode_primitive("cmd", TypeTag::U32, &data, Endian::Little).unwrap(),
            Value::U64(0x1900_0000)
        );
    }

    #[test]
    fn test_decode_text() {
        let slot = b"__TEXT\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";
        assert_eq!(
            decode_primitive("segname", TypeTag::text(16), slot, Endian::Little).unwrap(),
            Value::Text("__TEXT".to_string())
        );
        assert_eq!(decode_text(b"ab\0c\0").as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_invalid_text() {
        let err = decode_primitive("segname", TypeTag::text(2), &[0xc3, 0x28], Endian::Little)
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidText {
                field: "segname".to_string()
            }
        );
    }

    #[test]
    fn test_encode_unsigned_range() {
        assert_eq!(
            encode(TypeTag::U32, Value::U64(1 << 32), Endian::Little).unwrap_err(),
            EncodeError::ValueOutOfRange {
                value: 1 << 32,
                width: 4
            }
        );
        assert_eq!(
            encode(TypeTag::U32, Value::U64(u32::MAX as u64), Endian::Big).unwrap(),
            vec![0xff; 4]
        );
    }

    #[test]
    fn test_encode_signed() {
        assert_eq!(encode(TypeTag::I8, Value::I64(-1), Endian::Little).unwrap(), vec![0xff]);
        assert_eq!(
            encode(TypeTag::I16, Value::I64(-2), Endian::Big).unwrap(),
            vec![0xff, 0xfe]
        );
        assert!(encode(TypeTag::I8, Value::I64(128), Endian::Little).is_err());
        assert!(encode(TypeTag::I8, Value::I64(-129), Endian::Little).is_err());
    }

    #[test]
    fn test_encode_text_padding() {
        assert_eq!(
            encode(TypeTag::text(8), Value::from("__DATA"), Endian::Little).unwrap(),
            b"__DATA\0\0".to_vec()
        );
        assert_eq!(
            encode(TypeTag::text(4), Value::from("__TEXT"), Endian::Little).unwrap_err(),
            EncodeError::TextTooLong { len: 6, width: 4 }
        );
        assert_eq!(
            encode(TypeTag::text(4), Value::from("a\0b"), Endian::Little).unwrap_err(),
            EncodeError::EmbeddedNul
        );
    }

    #[test]
    fn test_encode_bytes_length() {
        assert_eq!(
            encode(TypeTag::bytes(2), Value::from([1u8, 2, 3]), Endian::Little).unwrap_err(),
            EncodeError::LengthMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_encode_type_mismatch() {
        assert_eq!(
            encode(TypeTag::U32, Value::I64(1), Endian::Little).unwrap_err(),
            EncodeError::TypeMismatch {
                expected: "unsigned",
                actual: "signed"
            }
        );
    }

    #[test]
    fn test_rejected_value_leaves_slot_untouched() {
        let mut out = vec![0xaa; 4];
        assert!(encode_primitive(TypeTag::U32, &Value::U64(1 << 40), &mut out, Endian::Little).is_err());
        assert_eq!(out, vec![0xaa; 4]);
    }
}
