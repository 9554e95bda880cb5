//! The database capability consumed by the executor.
//!
//! A database exposes its SQL dialect, date-arithmetic shapes, a result
//! size cap, and a single blocking fan-out that runs query strings and
//! returns tabular frames in request order.

pub mod testing;

use chrono::NaiveDateTime;

use crate::error::QueryResult;
use crate::frame::{DataFrame, Value};
use crate::model::DataType;
use crate::sql::{DatePart, Dialect, Expr, SqlDialect};

/// Capability for running queries against a concrete database.
pub trait Database: std::fmt::Debug {
    /// The SQL dialect queries are rendered in.
    fn dialect(&self) -> Dialect;

    /// Hard cap on returned rows per frame; larger results are truncated.
    fn max_result_set_size(&self) -> usize {
        200_000
    }

    /// Truncate a date expression to an interval.
    fn trunc_date(&self, expr: Expr, interval: DatePart) -> Expr {
        self.dialect().trunc_date(expr, interval)
    }

    /// Shift a date expression by `interval` units of `date_part`.
    fn date_add(&self, expr: Expr, date_part: DatePart, interval: i64) -> Expr {
        self.dialect().date_add(expr, date_part, interval)
    }

    /// Render an expression as text.
    fn to_char(&self, expr: Expr) -> Expr {
        self.dialect().to_char(expr)
    }

    /// Column names and types of a physical table.
    fn get_column_definitions(
        &self,
        _schema: &str,
        _table: &str,
    ) -> QueryResult<Vec<(String, DataType)>> {
        Ok(vec![])
    }

    /// Run the query strings and return one frame per query, in order.
    ///
    /// `parse_dates` lists column names the driver coerces to timestamps.
    fn fetch_dataframes(
        &self,
        queries: &[String],
        parse_dates: &[String],
    ) -> QueryResult<Vec<DataFrame>>;
}

/// Coerce the named text columns of a frame to timestamps.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and ISO-8601 `T` forms.
/// Unparseable text (notably the rollup sentinel) is left as text.
pub fn coerce_date_columns(frame: &mut DataFrame, parse_dates: &[String]) {
    for name in parse_dates {
        let Some(column) = frame.column_mut(name) else {
            continue;
        };
        for value in &mut column.values {
            if let Value::Text(s) = value {
                if let Some(ts) = parse_timestamp(s) {
                    *value = Value::Timestamp(ts);
                }
            }
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
