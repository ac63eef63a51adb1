//! Record instances: decoded field values plus their always-current raw bytes.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, trace};

use crate::{
    codec,
    errors::CodecError,
    field::{FieldType, Kind},
    schema::Schema,
    value::{Endian, Value},
};

/// A concrete value of a [Schema].
///
/// The raw buffer is re-encoded on every successful mutation, so [Record::raw]
/// always returns the exact bytes of the current values.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    endian: Endian,
    values: Vec<Value>,
    raw: Vec<u8>,
    derived: Vec<(String, u64)>,
    materialized: bool,
    /// Set when `set` ran before materialization; `raw` is rebuilt once
    /// `pre_materialize` returns.
    raw_pending: bool,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.same_layout(&other.schema)
            && self.endian == other.endian
            && self.values == other.values
    }
}

impl Eq for Record {}

impl Record {
    /// Decodes a record from the first `schema.size()` bytes of `data`.
    /// Trailing bytes are ignored.
    pub fn from_bytes(schema: &Arc<Schema>, data: &[u8], endian: Endian) -> Result<Self, CodecError> {
        let size = schema.size();
        if data.len() < size {
            debug!(
                schema = schema.name(),
                expected = size,
                actual = data.len(),
                "buffer too short for schema"
            );
            return Err(CodecError::SchemaSizeMismatch {
                schema: schema.name().to_string(),
                expected: size,
                actual: data.len(),
            });
        }

        trace!(schema = schema.name(), size, ?endian, "decoding record");

        let mut values = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let slice = &data[field.range()];
            let value = match &field.ty {
                FieldType::Primitive(tag) => codec::decode_primitive(&field.name, *tag, slice, endian)?,
                FieldType::Nested(sub) => Value::from(Record::from_bytes(sub, slice, endian)?),
            };
            values.push(value);
        }

        let mut raw = data[..size].to_vec();
        if schema.has_text() {
            // Bytes after a NUL in a text slot do not survive decoding.
            let mut canonical = vec![0u8; size];
            codec::encode_fields(schema, &values, endian, &mut canonical)?;
            if canonical != raw {
                debug!(schema = schema.name(), "normalized text padding");
                raw = canonical;
            }
        }

        Record::unmaterialized(schema, endian, values, raw).materialize()
    }

    /// Builds a record from one value per field, in schema order.
    pub fn from_values(
        schema: &Arc<Schema>,
        mut values: Vec<Value>,
        endian: Endian,
    ) -> Result<Self, CodecError> {
        let expected = schema.fields().len();
        if values.len() < expected {
            return Err(CodecError::MissingFieldValue {
                schema: schema.name().to_string(),
                expected,
                actual: values.len(),
            });
        }
        if values.len() > expected {
            return Err(CodecError::UnexpectedFieldValue {
                schema: schema.name().to_string(),
                expected,
                actual: values.len(),
            });
        }

        trace!(schema = schema.name(), size = schema.size(), ?endian, "encoding record");

        for value in &mut values {
            if let Value::Record(child) = value {
                child.adopt_endian(endian)?;
            }
        }

        let mut raw = vec![0u8; schema.size()];
        codec::encode_fields(schema, &values, endian, &mut raw)?;

        Record::unmaterialized(schema, endian, values, raw).materialize()
    }

    /// Builds a record from values keyed by field name.
    pub fn from_map<K: Into<String>>(
        schema: &Arc<Schema>,
        entries: impl IntoIterator<Item = (K, Value)>,
        endian: Endian,
    ) -> Result<Self, CodecError> {
        let mut named: HashMap<String, Value> =
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect();

        let mut values = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let value = named
                .remove(&field.name)
                .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
            values.push(value);
        }

        if let Some(name) = named.into_keys().next() {
            return Err(CodecError::UnknownField(name));
        }

        Record::from_values(schema, values, endian)
    }

    /// A record whose raw form is all zero bytes.
    pub fn zeroed(schema: &Arc<Schema>, endian: Endian) -> Result<Self, CodecError> {
        let values = schema
            .fields()
            .iter()
            .map(|field| match &field.ty {
                FieldType::Primitive(tag) => Ok(match tag.kind {
                    Kind::Unsigned => Value::U64(0),
                    Kind::Signed => Value::I64(0),
                    Kind::Text => Value::Text(String::new()),
                    Kind::Bytes => Value::Bytes(vec![0; tag.width]),
                }),
                FieldType::Nested(sub) => Record::zeroed(sub, endian).map(Value::from),
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        Record::from_values(schema, values, endian)
    }

    fn unmaterialized(schema: &Arc<Schema>, endian: Endian, values: Vec<Value>, raw: Vec<u8>) -> Self {
        Record {
            schema: Arc::clone(schema),
            endian,
            values,
            raw,
            derived: Vec::new(),
            materialized: false,
            raw_pending: false,
        }
    }

    fn materialize(mut self) -> Result<Self, CodecError> {
        if let Some(layout) = self.schema.bitfield_layout().cloned() {
            layout.materialize_into(&mut self)?;
        }

        let hooks = Arc::clone(self.schema.hooks());
        hooks.pre_materialize(&mut self)?;
        if self.raw_pending {
            self.raw = self.rebuild_raw()?;
            self.raw_pending = false;
        }
        self.materialized = true;
        hooks.post_materialize(&mut self)?;

        Ok(self)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// False only while `pre_materialize` runs.
    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// Current encoded form; always `schema.size()` bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    /// Re-encodes every field from its current value. Matches [Record::raw].
    pub fn rebuild_raw(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.schema.size()];
        codec::encode_fields(&self.schema, &self.values, self.endian, &mut out)?;
        Ok(out)
    }

    /// Field values in schema order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(name, value)` pairs in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .zip(&self.values)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(Value::as_bytes)
    }

    pub fn get_record(&self, name: &str) -> Option<&Record> {
        self.get(name).and_then(Value::as_record)
    }

    /// A value derived by a hook, e.g. a bitfield sub-field.
    pub fn derived(&self, name: &str) -> Option<u64> {
        self.derived
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn derived_values(&self) -> &[(String, u64)] {
        &self.derived
    }

    /// Stores a derived value, replacing any previous value of that name.
    ///
    /// Bitfield sub-fields only follow the backing word and are rejected here.
    pub fn set_derived(&mut self, name: &str, value: u64) -> Result<(), CodecError> {
        if let Some(layout) = self.schema.bitfield_layout() {
            if layout.contains(name) {
                return Err(CodecError::DerivedField(name.to_string()));
            }
        }

        self.store_derived(name, value);
        Ok(())
    }

    pub(crate) fn store_derived(&mut self, name: &str, value: u64) {
        match self.derived.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.derived.push((name.to_string(), value)),
        }
    }

    /// Replaces one field value and re-encodes its slot. On error nothing changes.
    ///
    /// Inside `pre_materialize` the value is checked and stored but [Record::raw]
    /// is only rebuilt when the hook returns.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), CodecError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))?;

        self.set_at(index, value.into())
    }

    fn set_at(&mut self, index: usize, mut value: Value) -> Result<(), CodecError> {
        if let Value::Record(child) = &mut value {
            child.adopt_endian(self.endian)?;
        }

        let field = &self.schema.fields()[index];
        let mut slot = vec![0u8; field.width()];
        codec::encode_value(field, &value, self.endian, &mut slot)?;

        if self.materialized {
            self.raw[field.range()].copy_from_slice(&slot);
        } else {
            self.raw_pending = true;
        }
        self.values[index] = value;

        if let Some(layout) = self.schema.bitfield_layout().cloned() {
            layout.derive_into(self)?;
        }

        Ok(())
    }

    /// Mutates a nested record, then re-encodes its slot in this record.
    ///
    /// If `f` fails, or the result cannot be encoded, this record is unchanged.
    pub fn nested_mut<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Record) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))?;

        let mut child = match &self.values[index] {
            Value::Record(child) => child.as_ref().clone(),
            _ => return Err(CodecError::NotNested(name.to_string())),
        };

        let out = f(&mut child)?;
        self.set_at(index, Value::from(child))?;

        Ok(out)
    }

    /// Switches this record and its nested records to `endian`.
    fn adopt_endian(&mut self, endian: Endian) -> Result<(), CodecError> {
        if self.endian == endian {
            return Ok(());
        }

        self.endian = endian;
        for value in &mut self.values {
            if let Value::Record(child) = value {
                child.adopt_endian(endian)?;
            }
        }
        self.raw = self.rebuild_raw()?;

        Ok(())
    }
}
