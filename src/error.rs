//! Unified error types for the query engine.
//!
//! Every fallible operation in the crate surfaces one of these variants.
//! Nothing is swallowed: planner, blender and reducer errors all propagate
//! to the caller of `fetch()`.

use thiserror::Error;

use crate::model::DataType;

/// Result type for query-engine operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Unified error type for dataset definition, planning and execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A filter constructor was called on a field whose data type does not
    /// permit it. Carries the permitted type set.
    #[error("filter `{filter}` is not allowed for data type {actual}; allowed types: [{}]", format_types(.allowed))]
    TypeRestriction {
        filter: String,
        actual: DataType,
        allowed: Vec<DataType>,
    },

    /// A builder received fields that do not belong to the dataset.
    #[error("invalid fields for dataset: [{}]", .aliases.join(", "))]
    InvalidFields { aliases: Vec<String> },

    /// Two fields with the same alias were added to one container.
    #[error("duplicate field alias: `{0}`")]
    DuplicateAlias(String),

    /// A dimension, metric or filter references a table with no join.
    #[error("missing join for table `{table}`")]
    MissingJoin { table: String },

    /// The join dependency graph has a cycle.
    #[error("circular join dependency between tables: [{}]", .tables.join(", "))]
    CircularJoin { tables: Vec<String> },

    /// The latest-value builder was invoked without any dimension.
    #[error("query contains no dimensions to fetch")]
    EmptyQuery,

    /// A widget with no items was asked for its metric list.
    #[error("at least one metric is required for a widget")]
    MetricRequired,

    /// A frame operation failed (unknown column, length mismatch).
    #[error(transparent)]
    Frame(#[from] crate::frame::FrameError),

    /// Execution failure surfaced verbatim from the database capability.
    #[error("database error: {0}")]
    Database(String),
}

fn format_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
