//! Materialization hooks attached to a [crate::schema::Schema].
//!
//! Every record runs `pre_materialize`, is marked materialized, then runs
//! `post_materialize`, exactly once, right after it is decoded or built from
//! values. Mutations never re-run hooks. Bitfield sub-fields are derived
//! before `pre_materialize` and are not hook state.

use crate::{errors::CodecError, record::Record};

/// Per-schema lifecycle capability. Both methods default to no-ops.
pub trait Materialize: Send + Sync {
    /// Runs before the record is marked materialized. Typically validates.
    ///
    /// Encoding is inert here: [Record::set] checks and stores values, but
    /// [Record::raw] keeps the constructed bytes until this hook returns.
    fn pre_materialize(&self, record: &mut Record) -> Result<(), CodecError> {
        let _ = record;
        Ok(())
    }

    /// Runs after the record is marked materialized. Typically derives
    /// convenience values with [Record::set_derived].
    fn post_materialize(&self, record: &mut Record) -> Result<(), CodecError> {
        let _ = record;
        Ok(())
    }
}

/// Hooks for schemas that need neither phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl Materialize for NoHooks {}
