//! # fireant
//!
//! A multidimensional analytics query engine that compiles declarative
//! requests to SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Request (widgets, dimensions, filters,            │
//! │         references, operations, orderings)               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [finders]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Joins, reference groups, totals & share dimensions     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner / blender planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Relational queries: base × totals × reference rows     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Tabular frames (database capability)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [reducer + operations + pagination]
//! ┌─────────────────────────────────────────────────────────┐
//! │       One indexed result frame, widget-ready             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod database;
pub mod error;
pub mod frame;
pub mod model;
pub mod queries;
pub mod sql;
pub mod widgets;

// Re-export SQL submodules at crate level for convenient access.
pub use sql::dialect;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::database::Database;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::frame::{alias_selector, DataFrame, Value};
    pub use crate::model::{
        cummean, cumprod, cumsum, datetime_interval, day_over_day, month_over_month,
        numeric_interval, quarter_over_quarter, rolling_mean, rollup, share, week_over_week,
        year_over_year, DataSet, DataSetBlender, DataType, Dimension, Field, Filter, Join,
        Operation, Reference,
    };
    pub use crate::sql::{
        DatePart, Dialect, Expr, ExprExt, JoinType, Query, SortDir, TableRef,
    };
    pub use crate::widgets::Widget;
}
