//! Bitfield overlay: named sub-fields packed LSB-first into one unsigned word.

use std::collections::HashSet;

use crate::{
    bits::extract_bits,
    errors::{CodecError, EncodeError, SchemaError},
    field::{FieldType, Kind},
    record::Record,
};

/// Name of the backing field of a bitfield schema.
pub const BITFIELD_VALUE: &str = "value";

/// A named run of bits inside the backing word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitField {
    pub name: String,
    pub bits: u32,
    /// Bits below this sub-field, counted from the LSB.
    pub offset: u32,
}

/// Ordered sub-fields of a packed word, first entry at the LSB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldLayout {
    fields: Vec<BitField>,
    total_bits: u32,
}

impl BitfieldLayout {
    /// Builds a layout from `(name, bit width)` pairs in LSB-first order.
    pub fn new(fields: &[(&str, u32)]) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(fields.len());
        let mut compiled = Vec::with_capacity(fields.len());
        let mut offset = 0u32;

        for &(name, bits) in fields {
            if name.is_empty() {
                return Err(SchemaError::EmptyName {
                    schema: "bitfield".to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateField {
                    schema: "bitfield".to_string(),
                    field: name.to_string(),
                });
            }
            if bits == 0 || bits > 64 {
                return Err(SchemaError::InvalidBitWidth {
                    field: name.to_string(),
                    bits,
                });
            }

            compiled.push(BitField {
                name: name.to_string(),
                bits,
                offset,
            });
            offset = offset.saturating_add(bits);
        }

        Ok(BitfieldLayout {
            fields: compiled,
            total_bits: offset,
        })
    }

    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }

    /// Sum of the sub-field widths.
    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// Splits `value` into `(name, sub-value)` pairs.
    pub fn split(&self, value: u64) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.fields
            .iter()
            .map(move |f| (f.name.as_str(), extract_bits(value, f.offset, f.bits)))
    }

    /// True if `name` is one of the sub-fields.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Checks the layout covers the backing word of `record`, then derives
    /// every sub-field. Runs before the schema's `pre_materialize` hook.
    pub(crate) fn materialize_into(&self, record: &mut Record) -> Result<(), CodecError> {
        let expected = record.schema().size() as u32 * 8;
        if self.total_bits != expected {
            return Err(CodecError::BitfieldWidthMismatch {
                expected,
                actual: self.total_bits,
            });
        }

        self.derive_into(record)
    }

    /// Re-derives every sub-field of `record` from its backing word.
    pub(crate) fn derive_into(&self, record: &mut Record) -> Result<(), CodecError> {
        let value = backing_value(record)?;
        for (name, sub) in self.split(value) {
            record.store_derived(name, sub);
        }

        Ok(())
    }
}

fn backing_value(record: &Record) -> Result<u64, CodecError> {
    let schema = record.schema();
    let backing = match schema.fields() {
        [field] => field,
        _ => {
            return Err(CodecError::BitfieldWidthMismatch {
                expected: schema.size() as u32 * 8,
                actual: 0,
            });
        }
    };

    if !matches!(&backing.ty, FieldType::Primitive(tag) if tag.kind == Kind::Unsigned) {
        return Err(CodecError::encode(
            &backing.name,
            EncodeError::TypeMismatch {
                expected: Kind::Unsigned.name(),
                actual: backing.ty.kind_name(),
            },
        ));
    }

    record
        .values()
        .first()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| CodecError::MissingField(backing.name.clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        field::{Field, TypeTag},
        schema::Schema,
        value::Endian,
    };

    #[test]
    fn test_layout_offsets() {
        let layout = BitfieldLayout::new(&[("a", 2), ("b", 2), ("c", 28)]).unwrap();
        let offsets: Vec<u32> = layout.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
        assert_eq!(layout.total_bits(), 32);
    }

    #[test]
    fn test_split_lsb_first() {
        let layout = BitfieldLayout::new(&[("a", 2), ("b", 2), ("c", 28)]).unwrap();
        let parts: Vec<u64> = layout.split(0x0000_0005).map(|(_, v)| v).collect();
        assert_eq!(parts, vec![1, 1, 0]);
    }

    #[test]
    fn test_invalid_layouts() {
        assert_eq!(
            BitfieldLayout::new(&[("a", 0)]).unwrap_err(),
            SchemaError::InvalidBitWidth {
                field: "a".to_string(),
                bits: 0
            }
        );
        assert!(matches!(
            BitfieldLayout::new(&[("a", 4), ("a", 4)]).unwrap_err(),
            SchemaError::DuplicateField { .. }
        ));
        assert!(BitfieldLayout::new(&[("", 4)]).is_err());
    }

    #[test]
    fn test_width_mismatch_at_materialize() {
        let layout = BitfieldLayout::new(&[("low", 4), ("high", 8)]).unwrap();
        let schema = Arc::new(
            Schema::compile("word", &[Field::new(BITFIELD_VALUE, TypeTag::U16)]).unwrap(),
        );
        let mut record = Record::from_bytes(&schema, &[0xff, 0xff], Endian::Little).unwrap();

        assert_eq!(
            layout.materialize_into(&mut record).unwrap_err(),
            CodecError::BitfieldWidthMismatch {
                expected: 16,
                actual: 12
            }
        );
        assert!(record.derived_values().is_empty());
    }

    #[test]
    fn test_contains() {
        let layout = BitfieldLayout::new(&[("target", 26), ("next", 6)]).unwrap();
        assert!(layout.contains("next"));
        assert!(!layout.contains(BITFIELD_VALUE));
    }
}
