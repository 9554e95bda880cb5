//! Request planning, execution and reduction.
//!
//! The planner expands one logical request into tagged relational
//! queries, the executor runs them through the database capability, and
//! the reducer merges the returned frames into one indexed result.

pub mod blender;
pub mod builder;
pub mod execution;
pub mod finders;
pub mod makers;
pub mod pagination;
pub mod reducer;

pub use builder::{
    DataSetQueryBuilder, DimensionChoicesQueryBuilder, DimensionLatestQueryBuilder,
};
pub use execution::fetch_data;
pub use makers::{make_slicer_query_with_totals_and_references, PlannedQuery, SlicerRequest};
pub use reducer::{reduce_result_set, scrub_totals_from_share_results};
