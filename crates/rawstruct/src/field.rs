//! Definition of logical fields used to build a [crate::schema::Schema].

use std::sync::Arc;

use crate::{errors::SchemaError, schema::Schema};

/// Largest width of a text or bytes slot.
pub const MAX_BLOB_WIDTH: usize = 16;

const PACKED_KIND_SHIFT: u32 = 16;
const PACKED_WIDTH_MASK: u32 = 0xffff;

/// Primitive encoding of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Unsigned integer.
    Unsigned,
    /// Two's-complement signed integer.
    Signed,
    /// NUL-padded UTF-8 text.
    Text,
    /// Opaque bytes, kept verbatim.
    Bytes,
}

impl Kind {
    /// Short name, matching [crate::value::Value::kind_name].
    pub fn name(self) -> &'static str {
        match self {
            Kind::Unsigned => "unsigned",
            Kind::Signed => "signed",
            Kind::Text => "text",
            Kind::Bytes => "bytes",
        }
    }

    fn code(self) -> u32 {
        match self {
            Kind::Unsigned => 0,
            Kind::Signed => 1,
            Kind::Text => 2,
            Kind::Bytes => 3,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Kind::Unsigned),
            1 => Some(Kind::Signed),
            2 => Some(Kind::Text),
            3 => Some(Kind::Bytes),
            _ => None,
        }
    }
}

/// A (kind, byte width) pair. Widths are checked when the schema is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub kind: Kind,
    pub width: usize,
}

impl TypeTag {
    pub const U8: TypeTag = TypeTag::uint(1);
    pub const U16: TypeTag = TypeTag::uint(2);
    pub const U32: TypeTag = TypeTag::uint(4);
    pub const U64: TypeTag = TypeTag::uint(8);
    pub const I8: TypeTag = TypeTag::sint(1);
    pub const I16: TypeTag = TypeTag::sint(2);
    pub const I32: TypeTag = TypeTag::sint(4);
    pub const I64: TypeTag = TypeTag::sint(8);

    pub const fn new(kind: Kind, width: usize) -> Self {
        TypeTag { kind, width }
    }

    pub const fn uint(width: usize) -> Self {
        TypeTag::new(Kind::Unsigned, width)
    }

    pub const fn sint(width: usize) -> Self {
        TypeTag::new(Kind::Signed, width)
    }

    /// Fixed-width text slot, e.g. `char[16]`.
    pub const fn text(width: usize) -> Self {
        TypeTag::new(Kind::Text, width)
    }

    pub const fn bytes(width: usize) -> Self {
        TypeTag::new(Kind::Bytes, width)
    }

    /// Checks the width against the kind.
    pub fn validate(&self, field: &str) -> Result<(), SchemaError> {
        let valid = match self.kind {
            Kind::Unsigned | Kind::Signed => matches!(self.width, 1 | 2 | 4 | 8),
            Kind::Text | Kind::Bytes => (1..=MAX_BLOB_WIDTH).contains(&self.width),
        };

        if !valid {
            return Err(SchemaError::InvalidWidth {
                field: field.to_string(),
                kind: self.kind,
                width: self.width,
            });
        }

        Ok(())
    }

    /// Packs the tag as `kind << 16 | width`.
    pub fn packed(&self) -> u32 {
        (self.kind.code() << PACKED_KIND_SHIFT) | (self.width as u32 & PACKED_WIDTH_MASK)
    }

    /// Inverse of [TypeTag::packed].
    pub fn from_packed(packed: u32) -> Result<Self, SchemaError> {
        let kind = Kind::from_code(packed >> PACKED_KIND_SHIFT).ok_or_else(|| {
            SchemaError::InvalidDefinition(format!("unknown kind in packed tag {packed:#x}"))
        })?;

        Ok(TypeTag::new(kind, (packed & PACKED_WIDTH_MASK) as usize))
    }
}

/// Layout of a field: a primitive slot or a nested record.
#[derive(Debug, Clone)]
pub enum FieldType {
    Primitive(TypeTag),
    Nested(Arc<Schema>),
}

impl FieldType {
    /// Byte width the field occupies.
    pub fn width(&self) -> usize {
        match self {
            FieldType::Primitive(tag) => tag.width,
            FieldType::Nested(schema) => schema.size(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldType::Primitive(tag) => tag.kind.name(),
            FieldType::Nested(_) => "record",
        }
    }
}

impl From<TypeTag> for FieldType {
    fn from(tag: TypeTag) -> Self {
        FieldType::Primitive(tag)
    }
}

impl From<Arc<Schema>> for FieldType {
    fn from(schema: Arc<Schema>) -> Self {
        FieldType::Nested(schema)
    }
}

/// A single named field in a schema definition.
#[derive(Debug, Clone)]
pub struct Field {
    /// Name used for lookups on the decoded record.
    pub name: String,
    pub ty: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        Field {
            name: name.into(),
            ty: ty.into(),
        }
    }

    pub fn nested(name: impl Into<String>, schema: &Arc<Schema>) -> Self {
        Field::new(name, FieldType::Nested(Arc::clone(schema)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths() {
        for width in [1, 2, 4, 8] {
            assert!(TypeTag::uint(width).validate("f").is_ok());
            assert!(TypeTag::sint(width).validate("f").is_ok());
        }

        assert_eq!(
            TypeTag::uint(3).validate("f").unwrap_err(),
            SchemaError::InvalidWidth {
                field: "f".to_string(),
                kind: Kind::Unsigned,
                width: 3
            }
        );
        assert!(TypeTag::sint(16).validate("f").is_err());
    }

    #[test]
    fn test_blob_widths() {
        assert!(TypeTag::text(16).validate("segname").is_ok());
        assert!(TypeTag::bytes(3).validate("pad").is_ok());
        assert!(TypeTag::text(0).validate("segname").is_err());
        assert!(TypeTag::bytes(17).validate("pad").is_err());
    }

    #[test]
    fn test_packed_tags() {
        assert_eq!(TypeTag::U32.packed(), 4);
        assert_eq!(TypeTag::I16.packed(), 0x10002);
        assert_eq!(TypeTag::text(16).packed(), 0x20010);
        assert_eq!(TypeTag::from_packed(0x30010).unwrap(), TypeTag::bytes(16));
        assert_eq!(TypeTag::from_packed(0x10008).unwrap(), TypeTag::I64);
        assert!(TypeTag::from_packed(0x40004).is_err());
    }
}
