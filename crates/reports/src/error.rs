use thiserror::Error;

use crate::category::{Category, FieldType};
use crate::normalize::ReportRecord;

/// A report point or filter specification failed validation. These are
/// always local: nothing reaches the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown tag key {key:?} for category {category}")]
    UnknownTag { category: Category, key: String },

    #[error("missing required tag {key:?} for category {category}")]
    MissingTag { category: Category, key: String },

    #[error("tag {key:?} must have a non-empty value")]
    EmptyTag { key: String },

    #[error("unknown field {name:?} for category {category}")]
    UnknownField { category: Category, name: String },

    #[error("missing required field {name:?} for category {category}")]
    MissingField { category: Category, name: String },

    #[error("field {name:?} expects {expected} values, got {actual}")]
    FieldType { name: String, expected: FieldType, actual: &'static str },

    #[error("invalid time range {0:?}")]
    InvalidRange(String),

    #[error("invalid aggregation window {0:?}")]
    InvalidWindow(String),

    #[error("unknown aggregate function {0:?}")]
    UnknownAggregate(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The engine rejected a write or the transport failed. The point was
    /// not persisted.
    #[error("write failed for category {category}")]
    Write {
        category: Category,
        #[source]
        source: fluxline::Error,
    },

    /// Query execution or row iteration failed. `partial` holds every
    /// record decoded before the failure, in engine order.
    #[error("read failed for category {category}")]
    Read {
        category: Category,
        #[source]
        source: fluxline::Error,
        partial: Vec<ReportRecord>,
    },

    /// The store was built from unusable settings.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ReportError {
    /// Records decoded before a read failed, if any.
    pub fn partial_records(&self) -> &[ReportRecord] {
        match self {
            ReportError::Read { partial, .. } => partial,
            _ => &[],
        }
    }
}
