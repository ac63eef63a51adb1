//! JSON‑deserializable schema definitions and JSON serialization of records.
//!
//! Schema files describe a list of record layouts. A nested field names a
//! schema defined earlier in the same file (or already registered), so the
//! list is loaded in order into a [SchemaRegistry].
//!
//! ```json
//! {
//!   "schemas": [
//!     { "name": "dylib", "fields": [
//!         { "name": "name", "kind": { "type": "UInt", "width": 4 } },
//!         { "name": "timestamp", "kind": { "type": "UInt", "width": 4 } }
//!     ] },
//!     { "name": "dylib_command", "fields": [
//!         { "name": "cmd", "kind": { "type": "UInt", "width": 4 } },
//!         { "name": "dylib", "kind": { "type": "Nested", "schema": "dylib" } }
//!     ] }
//!   ]
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
    errors::SchemaError,
    field::{Field, TypeTag},
    record::Record,
    registry::SchemaRegistry,
    schema::Schema,
    value::Value,
};

/// A set of schemas, loaded in order.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistryDef {
    pub schemas: Vec<SchemaDef>,
}

/// One record layout: either plain fields or a bitfield word.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    /// Record kind; becomes the registry key.
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Set for bitfield schemas, which must not declare `fields`.
    #[serde(default)]
    pub bitfield: Option<BitfieldDef>,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldTypeDef,
}

/// Kind of field in the schema.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum FieldTypeDef {
    UInt { width: usize },
    SInt { width: usize },
    /// NUL‑padded text slot.
    Text { width: usize },
    Bytes { width: usize },
    /// Record of a previously defined schema.
    Nested { schema: String },
}

/// Backing word width in bytes and its sub‑fields, LSB first.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BitfieldDef {
    pub width: usize,
    pub fields: Vec<SubFieldDef>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SubFieldDef {
    pub name: String,
    pub bits: u32,
}

impl SchemaRegistry {
    /// Compiles `def`, resolving nested references against this registry, and registers it.
    pub fn define(&mut self, def: SchemaDef) -> Result<Arc<Schema>, SchemaError> {
        let schema = match def.bitfield {
            Some(bitfield) => {
                if !def.fields.is_empty() {
                    return Err(SchemaError::InvalidDefinition(format!(
                        "schema `{}` declares both fields and a bitfield",
                        def.name
                    )));
                }

                let subfields: Vec<(&str, u32)> = bitfield
                    .fields
                    .iter()
                    .map(|f| (f.name.as_str(), f.bits))
                    .collect();
                Schema::bitfield(def.name, bitfield.width, &subfields)?
            }
            None => {
                let fields = def
                    .fields
                    .into_iter()
                    .map(|f| self.resolve(f))
                    .collect::<Result<Vec<_>, _>>()?;
                Schema::compile(def.name, &fields)?
            }
        };

        self.insert(schema)
    }

    fn resolve(&self, def: FieldDef) -> Result<Field, SchemaError> {
        let field = match def.kind {
            FieldTypeDef::UInt { width } => Field::new(def.name, TypeTag::uint(width)),
            FieldTypeDef::SInt { width } => Field::new(def.name, TypeTag::sint(width)),
            FieldTypeDef::Text { width } => Field::new(def.name, TypeTag::text(width)),
            FieldTypeDef::Bytes { width } => Field::new(def.name, TypeTag::bytes(width)),
            FieldTypeDef::Nested { schema } => Field::nested(def.name, &self.require(&schema)?),
        };

        Ok(field)
    }

    /// Loads every schema of `def` in order into a new registry.
    pub fn load(def: RegistryDef) -> Result<Self, SchemaError> {
        let mut registry = SchemaRegistry::new();
        for schema in def.schemas {
            registry.define(schema)?;
        }

        Ok(registry)
    }

    /// Parses a [RegistryDef] from JSON and loads it.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let def: RegistryDef = serde_json::from_str(json)
            .map_err(|e| SchemaError::InvalidDefinition(e.to_string()))?;
        Self::load(def)
    }
}

/// Integers as numbers, text as strings, bytes as lowercase hex, records as maps.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&hex::encode(b)),
            Value::Record(r) => r.serialize(serializer),
        }
    }
}

/// A map of `"type"` (the schema name) followed by every field.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values().len() + 1))?;
        map.serialize_entry("type", self.schema().name())?;
        for (name, value) in self.fields() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::value::Endian;

    const MACHO_SCHEMAS: &str = r#"{
        "schemas": [
            {
                "name": "dylib",
                "fields": [
                    { "name": "name", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "timestamp", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "current_version", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "compatibility_version", "kind": { "type": "UInt", "width": 4 } }
                ]
            },
            {
                "name": "dylib_command",
                "fields": [
                    { "name": "cmd", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "cmdsize", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "dylib", "kind": { "type": "Nested", "schema": "dylib" } }
                ]
            },
            {
                "name": "nlist",
                "fields": [
                    { "name": "str_index", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "n_type", "kind": { "type": "UInt", "width": 1 } },
                    { "name": "sect_index", "kind": { "type": "UInt", "width": 1 } },
                    { "name": "desc", "kind": { "type": "SInt", "width": 2 } },
                    { "name": "value", "kind": { "type": "UInt", "width": 8 } }
                ]
            },
            {
                "name": "uuid_command",
                "fields": [
                    { "name": "cmd", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "cmdsize", "kind": { "type": "UInt", "width": 4 } },
                    { "name": "uuid", "kind": { "type": "Bytes", "width": 16 } }
                ]
            },
            {
                "name": "chained_ptr",
                "bitfield": {
                    "width": 4,
                    "fields": [
                        { "name": "target", "bits": 26 },
                        { "name": "next", "bits": 5 },
                        { "name": "bind", "bits": 1 }
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn test_load_registry() {
        let registry = SchemaRegistry::from_json(MACHO_SCHEMAS).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("dylib_command").unwrap().size(), 24);
        assert_eq!(registry.get("nlist").unwrap().size(), 16);
        assert_eq!(registry.get("uuid_command").unwrap().size(), 24);
        assert!(registry.get("chained_ptr").unwrap().bitfield_layout().is_some());
    }

    #[test]
    fn test_unknown_nested_schema() {
        let json = r#"{ "schemas": [ { "name": "outer", "fields": [
            { "name": "inner", "kind": { "type": "Nested", "schema": "inner" } }
        ] } ] }"#;
        assert_eq!(
            SchemaRegistry::from_json(json).unwrap_err(),
            SchemaError::UnknownSchema("inner".to_string())
        );
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SchemaRegistry::from_json("{ \"schemas\": 3 }").unwrap_err(),
            SchemaError::InvalidDefinition(_)
        ));
    }

    #[test]
    fn test_fields_and_bitfield_rejected() {
        let json = r#"{ "schemas": [ { "name": "both",
            "fields": [ { "name": "a", "kind": { "type": "UInt", "width": 1 } } ],
            "bitfield": { "width": 1, "fields": [ { "name": "x", "bits": 8 } ] } } ] }"#;
        assert!(matches!(
            SchemaRegistry::from_json(json).unwrap_err(),
            SchemaError::InvalidDefinition(_)
        ));
    }

    #[test]
    fn test_bitfield_from_json() {
        let registry = SchemaRegistry::from_json(MACHO_SCHEMAS).unwrap();
        let schema = registry.require("chained_ptr").unwrap();

        let word: u32 = 0x1234 | (3 << 26) | (1 << 31);
        let record = Record::from_bytes(&schema, &word.to_le_bytes(), Endian::Little).unwrap();
        assert_eq!(record.derived("target"), Some(0x1234));
        assert_eq!(record.derived("next"), Some(3));
        assert_eq!(record.derived("bind"), Some(1));
    }

    #[test]
    fn test_serialize_record() {
        let registry = SchemaRegistry::from_json(MACHO_SCHEMAS).unwrap();
        let schema = registry.require("dylib_command").unwrap();

        let mut data = Vec::new();
        for word in [0x0cu32, 0x38, 0x18, 2, 0x0001_0000, 0x0001_0000] {
            data.extend_from_slice(&word.to_le_bytes());
        }
        let record = Record::from_bytes(&schema, &data, Endian::Little).unwrap();

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "type": "dylib_command",
                "cmd": 12,
                "cmdsize": 56,
                "dylib": {
                    "type": "dylib",
                    "name": 24,
                    "timestamp": 2,
                    "current_version": 65536,
                    "compatibility_version": 65536
                }
            })
        );
    }

    #[test]
    fn test_serialize_bytes_and_signed() {
        let registry = SchemaRegistry::from_json(MACHO_SCHEMAS).unwrap();

        let uuid = registry.require("uuid_command").unwrap();
        let mut data = vec![0x1b, 0, 0, 0, 0x18, 0, 0, 0];
        data.extend(0u8..16);
        let record = Record::from_bytes(&uuid, &data, Endian::Little).unwrap();
        assert_eq!(
            serde_json::to_value(&record).unwrap()["uuid"],
            json!("000102030405060708090a0b0c0d0e0f")
        );

        let nlist = registry.require("nlist").unwrap();
        let mut data = vec![0u8; 16];
        data[6] = 0xfe;
        data[7] = 0xff;
        let record = Record::from_bytes(&nlist, &data, Endian::Little).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap()["desc"], json!(-2));
    }
}
