//! The result reducer.
//!
//! Merges the executor's frames back into one indexed table: chunks them
//! into windows of `1 + |reference groups|` (one window per totals row,
//! in the planner's emission order), computes reference deltas, replaces
//! rollup sentinels with per-dtype totals markers, concatenates and sorts.

use crate::error::QueryResult;
use crate::frame::{
    alias_selector, is_rollup_value, is_totals_marker, totals_marker_for, Column, DataFrame,
    Value,
};
use crate::model::{Dimension, ReferenceGroup};

/// Reduce result frames into one indexed frame.
///
/// `frames` must be in the planner's emission order; `dimensions` are the
/// request's dimensions after result-set normalization.
pub fn reduce_result_set(
    frames: Vec<DataFrame>,
    reference_groups: &[ReferenceGroup],
    dimensions: &[Dimension],
) -> QueryResult<DataFrame> {
    let index_names = dimension_selectors(dimensions);
    let window = 1 + reference_groups.len();

    let mut reduced_windows: Vec<DataFrame> = vec![];
    for (window_index, chunk) in frames.chunks(window).enumerate() {
        let mut base = chunk[0].clone();
        base.set_index(&index_names)?;

        for (group, reference_frame) in reference_groups.iter().zip(chunk[1..].iter()) {
            let mut reference_frame = reference_frame.clone();
            reference_frame.set_index(&index_names)?;
            base = merge_reference(base, reference_frame, group)?;
        }

        if window_index > 0 {
            replace_rollup_sentinels(&mut base, dimensions);
        }
        reduced_windows.push(base);
    }

    let mut reduced = DataFrame::concat(&reduced_windows);
    reduced.sort_index();
    Ok(reduced)
}

/// Wire index names for the request dimensions, deduplicated in order.
pub fn dimension_selectors(dimensions: &[Dimension]) -> Vec<String> {
    let mut names = vec![];
    for dim in dimensions {
        let name = alias_selector(&dim.alias());
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Outer-merge one reference frame onto the base and compute the delta
/// and delta-percent columns its references ask for.
fn merge_reference(
    base: DataFrame,
    reference_frame: DataFrame,
    group: &ReferenceGroup,
) -> QueryResult<DataFrame> {
    let group_suffix = format!("_{}", group.alias());
    let reference_columns: Vec<String> = reference_frame
        .column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();

    let mut merged = base.outer_merge(&reference_frame)?;

    for reference in &group.references {
        if !reference.delta && !reference.delta_percent {
            continue;
        }
        for reference_column in &reference_columns {
            let Some(metric_column) = reference_column.strip_suffix(&group_suffix) else {
                continue;
            };
            let base_values = match merged.column(metric_column) {
                Some(col) => col.values.clone(),
                None => continue,
            };
            let reference_values = match merged.column(reference_column) {
                Some(col) => col.values.clone(),
                None => continue,
            };

            let computed: Vec<Value> = base_values
                .iter()
                .zip(reference_values.iter())
                .map(|(b, r)| {
                    if reference.delta_percent {
                        delta_percent(b, r)
                    } else {
                        delta(b, r)
                    }
                })
                .collect();

            let name = format!("{}_{}", metric_column, reference.alias());
            merged.push_column(Column::new(&name, computed))?;
        }
    }

    Ok(merged)
}

/// `base - reference`, missing values filled with zero; Null only when
/// both sides are missing.
fn delta(base: &Value, reference: &Value) -> Value {
    if base.is_null() && reference.is_null() {
        return Value::Null;
    }
    let zero = Value::Int(0);
    base.fill_null(&zero).sub(&reference.fill_null(&zero))
}

/// `100 * (base - reference) / reference`; NaN when the reference value
/// is missing or zero.
fn delta_percent(base: &Value, reference: &Value) -> Value {
    let d = delta(base, reference);
    if d.is_null() {
        return Value::Null;
    }
    match reference.as_f64() {
        Some(r) if r != 0.0 => d.mul(&Value::Float(100.0)).div(reference),
        _ => Value::Float(f64::NAN),
    }
}

/// Replace rollup sentinels in the index with per-dtype totals markers.
///
/// The sentinel round-trips through the driver as text, so it is detected
/// per cell; the replacement dtype comes from the dimension at that level.
fn replace_rollup_sentinels(frame: &mut DataFrame, dimensions: &[Dimension]) {
    let mut level_types = vec![];
    for dim in dimensions {
        let name = alias_selector(&dim.alias());
        if !level_types.iter().any(|(n, _)| *n == name) {
            level_types.push((name, dim.data_type()));
        }
    }

    for row in 0..frame.nrows() {
        for (level, (_, data_type)) in level_types.iter().enumerate() {
            let is_sentinel = frame
                .index()
                .get(row)
                .and_then(|tuple| tuple.get(level))
                .map(is_rollup_value)
                .unwrap_or(false);
            if is_sentinel {
                frame.set_index_value(row, level, totals_marker_for(*data_type));
            }
        }
    }
}

/// Remove totals rows for dimensions that were not requested as rollups.
///
/// Share operations introduce totals queries for their basis dimension;
/// once shares are computed those rows must not surface to the user.
pub fn scrub_totals_from_share_results(frame: &DataFrame, dimensions: &[Dimension]) -> DataFrame {
    let mut rollup_levels = vec![];
    let mut names = vec![];
    for dim in dimensions {
        let name = alias_selector(&dim.alias());
        if !names.contains(&name) {
            names.push(name);
            rollup_levels.push(dim.is_rollup());
        }
    }

    let keep: Vec<usize> = (0..frame.nrows())
        .filter(|&row| {
            frame.index()[row].iter().enumerate().all(|(level, value)| {
                rollup_levels.get(level).copied().unwrap_or(false) || !is_totals_marker(value)
            })
        })
        .collect();
    frame.select_rows(&keep)
}
