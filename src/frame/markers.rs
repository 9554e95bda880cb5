//! Totals sentinels.
//!
//! Rollup queries select a sentinel string so totals rows are identifiable
//! in raw query output; the reducer replaces it with an out-of-domain value
//! per dtype so totals can never be confused with missing data and sort
//! after real values.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;

use super::value::Value;
use crate::model::DataType;

/// The pre-SQL rollup value selected in totals queries. Round-trips
/// through the driver as text.
pub const ROLLUP_VALUE: &str = "_FIREANT_ROLLUP_VALUE_";

/// Totals marker for text index levels. Tildes sort after alphanumerics.
pub const TEXT_TOTALS: &str = "~~totals";

/// Totals marker for numeric index levels.
pub const NUMBER_TOTALS: i64 = i64::MAX;

/// Totals marker for date index levels: the maximum representable
/// timestamp, truncated to whole seconds so ISO round-trips are lossless.
pub static TIMESTAMP_TOTALS: Lazy<NaiveDateTime> = Lazy::new(|| {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap_or(NaiveDateTime::MAX)
});

/// The totals marker for a field data type.
pub fn totals_marker_for(data_type: DataType) -> Value {
    match data_type {
        DataType::Date => Value::Timestamp(*TIMESTAMP_TOTALS),
        DataType::Number => Value::Int(NUMBER_TOTALS),
        DataType::Text | DataType::Boolean => Value::Text(TEXT_TOTALS.into()),
    }
}

/// Whether a raw frame value is the pre-SQL rollup sentinel.
pub fn is_rollup_value(value: &Value) -> bool {
    matches!(value, Value::Text(s) if s == ROLLUP_VALUE)
}

/// Whether a frame value is any per-dtype totals marker.
pub fn is_totals_marker(value: &Value) -> bool {
    match value {
        Value::Text(s) => s == TEXT_TOTALS,
        Value::Int(n) => *n == NUMBER_TOTALS,
        Value::Timestamp(ts) => *ts == *TIMESTAMP_TOTALS,
        _ => false,
    }
}
