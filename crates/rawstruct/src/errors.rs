//! Error types for schema definition, decoding and encoding.

use thiserror::Error;

use crate::field::Kind;

/// Errors produced when compiling [crate::field::Field]s into a [crate::schema::Schema].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A schema, field or bitfield name is empty.
    #[error("empty name in schema `{schema}`")]
    EmptyName { schema: String },
    /// Two fields of the same schema share a name.
    #[error("duplicate field `{field}` in schema `{schema}`")]
    DuplicateField { schema: String, field: String },
    /// Width not allowed for the field kind (integers: 1, 2, 4, 8; text/bytes: 1..=16).
    #[error("field `{field}` has invalid width {width} for {kind:?}")]
    InvalidWidth {
        field: String,
        kind: Kind,
        width: usize,
    },
    /// A bitfield sub-field is zero or wider than 64 bits.
    #[error("bitfield `{field}` has invalid bit width {bits}")]
    InvalidBitWidth { field: String, bits: u32 },
    /// Bitfield widths do not cover the backing word exactly.
    #[error("bitfield widths sum to {actual} bits, backing word has {expected}")]
    BitfieldWidthMismatch { expected: u32, actual: u32 },
    /// A schema with this name is already registered.
    #[error("schema `{0}` is already registered")]
    DuplicateSchema(String),
    /// A nested reference names a schema that is not registered.
    #[error("unknown schema `{0}`")]
    UnknownSchema(String),
    /// A packed type tag or a serialized definition could not be interpreted.
    #[error("invalid schema definition: {0}")]
    InvalidDefinition(String),
}

/// Why a single value cannot be written into its field slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Integer does not fit in the field width.
    #[error("value {value} does not fit in {width} bytes")]
    ValueOutOfRange { value: i128, width: usize },
    /// Value variant does not match the field kind.
    #[error("expected a {expected} value, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// Byte blob length differs from the field width.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    /// Encoded text is longer than the field width.
    #[error("text of {len} bytes does not fit in {width} bytes")]
    TextTooLong { len: usize, width: usize },
    /// Text contains a NUL character, which decoding would strip.
    #[error("text contains an embedded NUL")]
    EmbeddedNul,
    /// Nested record was built from a different schema.
    #[error("expected a `{expected}` record, got `{actual}`")]
    SchemaMismatch { expected: String, actual: String },
}

/// Errors produced while decoding, encoding or materializing a [crate::record::Record].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input is shorter than the schema size.
    #[error("schema `{schema}` needs {expected} bytes, buffer has {actual}")]
    SchemaSizeMismatch {
        schema: String,
        expected: usize,
        actual: usize,
    },
    /// Fewer values than fields were supplied.
    #[error("schema `{schema}` has {expected} fields, got {actual} values")]
    MissingFieldValue {
        schema: String,
        expected: usize,
        actual: usize,
    },
    /// More values than fields were supplied.
    #[error("schema `{schema}` has {expected} fields, got {actual} values")]
    UnexpectedFieldValue {
        schema: String,
        expected: usize,
        actual: usize,
    },
    /// A name-keyed construction is missing this field.
    #[error("missing value for field `{0}`")]
    MissingField(String),
    /// The schema has no field with this name.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// The field is not a nested record.
    #[error("field `{0}` is not a nested record")]
    NotNested(String),
    /// A value cannot be represented in its field.
    #[error("cannot encode field `{field}`: {source}")]
    Encode {
        field: String,
        #[source]
        source: EncodeError,
    },
    /// A text slot is not valid UTF-8.
    #[error("field `{field}` is not valid UTF-8")]
    InvalidText { field: String },
    /// Bitfield widths do not cover the backing word of the record.
    #[error("bitfield widths sum to {actual} bits, backing word has {expected}")]
    BitfieldWidthMismatch { expected: u32, actual: u32 },
    /// The name is a bitfield sub-field, which only changes with its backing word.
    #[error("`{0}` is derived from the bitfield word and cannot be set directly")]
    DerivedField(String),
}

impl CodecError {
    pub(crate) fn encode(field: &str, source: EncodeError) -> Self {
        CodecError::Encode {
            field: field.to_string(),
            source,
        }
    }
}
