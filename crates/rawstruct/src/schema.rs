//! Schema: compiled, immutable record layout shared by every record of that shape.

use std::{collections::HashSet, fmt, ops::Range, sync::Arc};

use crate::{
    bitfield::{BITFIELD_VALUE, BitfieldLayout},
    errors::SchemaError,
    field::{Field, FieldType, Kind, TypeTag},
    hooks::{Materialize, NoHooks},
};

/// A field with its byte offset resolved.
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub ty: FieldType,
    /// Byte offset from the start of the record.
    pub offset: usize,
}

impl CompiledField {
    pub fn width(&self) -> usize {
        self.ty.width()
    }

    /// Byte range the field occupies in the raw buffer.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width()
    }
}

/// A compiled schema: named fields in declaration order and the total byte size.
/// Use [Schema::compile] to build from [Field]s, wrap in an [Arc] and share.
pub struct Schema {
    name: String,
    fields: Vec<CompiledField>,
    size: usize,
    has_text: bool,
    hooks: Arc<dyn Materialize>,
    bitfield: Option<Arc<BitfieldLayout>>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("fields", &self.fields)
            .field("bitfield", &self.bitfield)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Compiles a slice of [Field]s into a schema. Fails if any field is invalid
    /// or two fields share a name.
    pub fn compile(name: impl Into<String>, fields: &[Field]) -> Result<Self, SchemaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName { schema: name });
        }

        let mut compiled_fields = Vec::with_capacity(fields.len());
        let mut seen = HashSet::with_capacity(fields.len());
        let mut offset = 0;
        let mut has_text = false;

        for field in fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName { schema: name });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: name,
                    field: field.name.clone(),
                });
            }

            match &field.ty {
                FieldType::Primitive(tag) => {
                    tag.validate(&field.name)?;
                    has_text |= tag.kind == Kind::Text;
                }
                FieldType::Nested(schema) => has_text |= schema.has_text,
            }

            compiled_fields.push(CompiledField {
                name: field.name.clone(),
                ty: field.ty.clone(),
                offset,
            });
            offset += field.ty.width();
        }

        Ok(Self {
            name,
            fields: compiled_fields,
            size: offset,
            has_text,
            hooks: Arc::new(NoHooks),
            bitfield: None,
        })
    }

    /// Compiles a bitfield schema: one unsigned backing field of `width` bytes
    /// named [BITFIELD_VALUE], split into `(name, bits)` sub-fields LSB-first.
    pub fn bitfield(
        name: impl Into<String>,
        width: usize,
        subfields: &[(&str, u32)],
    ) -> Result<Self, SchemaError> {
        let layout = BitfieldLayout::new(subfields)?;
        Schema::compile(name, &[Field::new(BITFIELD_VALUE, TypeTag::uint(width))])?
            .with_bitfield(layout)
    }

    /// Attaches a bitfield overlay. The schema must consist of a single
    /// unsigned field whose bits the layout covers exactly.
    pub fn with_bitfield(mut self, layout: BitfieldLayout) -> Result<Self, SchemaError> {
        let backs_layout = matches!(
            self.fields.as_slice(),
            [CompiledField { ty: FieldType::Primitive(tag), .. }] if tag.kind == Kind::Unsigned
        );
        if !backs_layout {
            return Err(SchemaError::InvalidDefinition(format!(
                "bitfield schema `{}` needs exactly one unsigned field",
                self.name
            )));
        }

        let expected = self.size as u32 * 8;
        if layout.total_bits() != expected {
            return Err(SchemaError::BitfieldWidthMismatch {
                expected,
                actual: layout.total_bits(),
            });
        }

        self.bitfield = Some(Arc::new(layout));
        Ok(self)
    }

    /// Replaces the materialization hooks. A bitfield overlay is unaffected and
    /// still derives its sub-fields before `pre_materialize` runs.
    pub fn with_hooks(mut self, hooks: impl Materialize + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total byte size; fixed at compile time.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compiled fields in definition order.
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn hooks(&self) -> &Arc<dyn Materialize> {
        &self.hooks
    }

    pub fn bitfield_layout(&self) -> Option<&Arc<BitfieldLayout>> {
        self.bitfield.as_ref()
    }

    /// True if this schema or any nested schema has a text field.
    pub fn has_text(&self) -> bool {
        self.has_text
    }

    /// True if both schemas describe the same record shape, field kinds and
    /// bitfield overlay included.
    pub fn same_layout(&self, other: &Schema) -> bool {
        std::ptr::eq(self, other)
            || (self.name == other.name
                && self.size == other.size
                && self.fields.len() == other.fields.len()
                && self.bitfield.as_deref() == other.bitfield.as_deref()
                && self.fields.iter().zip(&other.fields).all(|(a, b)| {
                    a.name == b.name && a.offset == b.offset && same_type(&a.ty, &b.ty)
                }))
    }
}

fn same_type(a: &FieldType, b: &FieldType) -> bool {
    match (a, b) {
        (FieldType::Primitive(a), FieldType::Primitive(b)) => a == b,
        (FieldType::Nested(a), FieldType::Nested(b)) => a.same_layout(b),
        _ => false,
    }
}
