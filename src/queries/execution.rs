//! Query execution.
//!
//! Renders planned queries for the database's dialect and dispatches them
//! in one blocking fan-out. Result frames come back in request order; the
//! reducer depends on that.

use tracing::{debug, trace};

use crate::database::Database;
use crate::error::QueryResult;
use crate::frame::{alias_selector, DataFrame};
use crate::model::{DataType, Dimension};

use super::makers::PlannedQuery;

/// Execute the planned queries and return `(max rows returned, frames)`.
///
/// Frames larger than the database's result-set cap are truncated.
pub fn fetch_data(
    database: &dyn Database,
    queries: &[PlannedQuery],
    dimensions: &[Dimension],
) -> QueryResult<(usize, Vec<DataFrame>)> {
    let dialect = database.dialect();
    let query_strings: Vec<String> = queries.iter().map(|q| q.query.to_sql(dialect)).collect();
    for sql in &query_strings {
        debug!(query = %sql, "executing query");
    }

    let parse_dates = date_dimension_selectors(dimensions);
    let mut frames = database.fetch_dataframes(&query_strings, &parse_dates)?;

    let max_rows_returned = frames.iter().map(DataFrame::nrows).max().unwrap_or(0);
    let cap = database.max_result_set_size();
    for frame in &mut frames {
        if frame.nrows() > cap {
            trace!(rows = frame.nrows(), cap, "truncating result set");
            frame.truncate(cap);
        }
    }

    trace!(max_rows_returned, frames = frames.len(), "fetched frames");
    Ok((max_rows_returned, frames))
}

/// Wire aliases of date-typed dimensions, for driver date coercion.
pub fn date_dimension_selectors(dimensions: &[Dimension]) -> Vec<String> {
    let mut selectors = vec![];
    for dim in dimensions {
        if dim.data_type() == DataType::Date {
            let selector = alias_selector(&dim.alias());
            if !selectors.contains(&selector) {
                selectors.push(selector);
            }
        }
    }
    selectors
}
