//! Client-side pagination over the reduced frame.
//!
//! Simple pagination sorts by the requested orders and slices. When a
//! widget asks for group pagination and the index is multi-level, slicing
//! happens over groups of the inner index levels instead of rows, so a
//! page never splits a group.

use std::sync::Arc;

use crate::error::QueryResult;
use crate::frame::{alias_selector, DataFrame, DType, Value};
use crate::model::Field;
use crate::sql::SortDir;
use crate::widgets::Widget;

/// Apply ordering and the client limit/offset to the reduced frame.
pub fn paginate(
    frame: &DataFrame,
    widgets: &[Widget],
    orders: &[(Arc<Field>, Option<SortDir>)],
    limit: Option<usize>,
    offset: Option<usize>,
) -> QueryResult<DataFrame> {
    let group_pagination =
        widgets.iter().any(|w| w.group_pagination) && frame.index_names().len() > 1;

    if group_pagination {
        Ok(paginate_groups(frame, orders, limit, offset))
    } else {
        let mut sorted = sort_frame(frame, orders);
        sorted = sorted.slice(offset.unwrap_or(0), limit);
        Ok(sorted)
    }
}

/// Stable sort by the order fields; each maps to an index level or a
/// column through its `$`-alias.
fn sort_frame(frame: &DataFrame, orders: &[(Arc<Field>, Option<SortDir>)]) -> DataFrame {
    if orders.is_empty() {
        return frame.clone();
    }

    let keys: Vec<(Vec<Value>, bool)> = orders
        .iter()
        .filter_map(|(field, dir)| {
            let selector = alias_selector(&field.alias);
            let ascending = !matches!(dir, Some(SortDir::Desc));
            if let Some(level) = frame.index_level(&selector) {
                let values = frame.index().iter().map(|t| t[level].clone()).collect();
                Some((values, ascending))
            } else {
                frame
                    .column(&selector)
                    .map(|col| (col.values.clone(), ascending))
            }
        })
        .collect();

    let mut order: Vec<usize> = (0..frame.nrows()).collect();
    order.sort_by(|&a, &b| {
        for (values, ascending) in &keys {
            let ord = values[a].cmp(&values[b]);
            let ord = if *ascending { ord } else { ord.reverse() };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    frame.select_rows(&order)
}

/// Group-aware pagination: aggregate each inner-level group, sort the
/// groups, slice group keys, then reassemble every row of the surviving
/// groups in the frame's original row order. Null group keys go last.
fn paginate_groups(
    frame: &DataFrame,
    orders: &[(Arc<Field>, Option<SortDir>)],
    limit: Option<usize>,
    offset: Option<usize>,
) -> DataFrame {
    let inner_levels: Vec<usize> = (1..frame.index_names().len()).collect();
    let groups = frame.group_rows(&inner_levels);

    // Aggregate the sort keys per group: sum for numbers, max for dates.
    let mut group_order: Vec<usize> = (0..groups.len()).collect();
    if !orders.is_empty() {
        let mut aggregates: Vec<Vec<Value>> = vec![];
        for (_, rows) in &groups {
            let mut row_aggregates = vec![];
            for (field, _) in orders {
                let selector = alias_selector(&field.alias);
                let values: Vec<Value> = if let Some(level) = frame.index_level(&selector) {
                    rows.iter()
                        .map(|&r| frame.index()[r][level].clone())
                        .collect()
                } else {
                    frame
                        .column(&selector)
                        .map(|col| rows.iter().map(|&r| col.values[r].clone()).collect())
                        .unwrap_or_default()
                };
                row_aggregates.push(aggregate(&values));
            }
            aggregates.push(row_aggregates);
        }

        group_order.sort_by(|&a, &b| {
            for (position, (_, dir)) in orders.iter().enumerate() {
                let ord = aggregates[a][position].cmp(&aggregates[b][position]);
                let ord = if matches!(dir, Some(SortDir::Desc)) {
                    ord.reverse()
                } else {
                    ord
                };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    // Null group keys are appended after real groups.
    let (real, null_keys): (Vec<usize>, Vec<usize>) = group_order
        .into_iter()
        .partition(|&g| !groups[g].0.iter().any(Value::is_null));

    let start = offset.unwrap_or(0);
    let mut kept: Vec<usize> = real
        .into_iter()
        .skip(start)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    kept.extend(null_keys);

    let kept_keys: Vec<&Vec<Value>> = kept.iter().map(|&g| &groups[g].0).collect();
    let rows: Vec<usize> = (0..frame.nrows())
        .filter(|&row| {
            let key: Vec<Value> = inner_levels
                .iter()
                .map(|&l| frame.index()[row][l].clone())
                .collect();
            kept_keys.iter().any(|k| **k == key)
        })
        .collect();
    frame.select_rows(&rows)
}

/// Aggregate group values: max for timestamps, sum for everything
/// numeric; first value otherwise.
fn aggregate(values: &[Value]) -> Value {
    let dtype = values.iter().find_map(|v| v.dtype());
    match dtype {
        Some(DType::Timestamp) => values.iter().max().cloned().unwrap_or(Value::Null),
        Some(DType::Int) | Some(DType::Float) => {
            let sum: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
            Value::Float(sum)
        }
        _ => values.first().cloned().unwrap_or(Value::Null),
    }
}
