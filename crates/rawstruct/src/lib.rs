//! # rawstruct
//!
//! A codec for fixed-layout binary records described by declarative schemas.
//!
//! Define a schema as an ordered list of named fields (unsigned or signed
//! integers of 1, 2, 4 or 8 bytes, NUL-padded text, opaque bytes, or nested
//! records), then decode byte slices into [record::Record]s at either byte
//! order. A record keeps its raw bytes in step with its values: every
//! mutation re-encodes the affected slot, so [record::Record::raw] is always
//! the exact on-disk form. Bitfield schemas split one unsigned word into named
//! sub-fields.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use rawstruct::field::{Field, TypeTag};
//! use rawstruct::record::Record;
//! use rawstruct::schema::Schema;
//! use rawstruct::value::{Endian, Value};
//!
//! let schema = Arc::new(
//!     Schema::compile(
//!         "segment",
//!         &[
//!             Field::new("cmd", TypeTag::U32),
//!             Field::new("segname", TypeTag::text(16)),
//!         ],
//!     )
//!     .unwrap(),
//! );
//!
//! let mut data = vec![0x19, 0, 0, 0];
//! data.extend_from_slice(b"__TEXT\0\0\0\0\0\0\0\0\0\0");
//!
//! let mut record = Record::from_bytes(&schema, &data, Endian::Little).unwrap();
//! assert_eq!(record.get("segname"), Some(&Value::Text("__TEXT".to_string())));
//! assert_eq!(record.raw(), &data[..]);
//!
//! record.set("segname", "__DATA").unwrap();
//! assert_eq!(&record.raw()[4..10], b"__DATA");
//! ```

pub mod bitfield;
pub mod bits;
pub mod codec;
pub mod errors;
pub mod field;
pub mod hooks;
pub mod record;
pub mod registry;
mod render;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;
