//! Post-query operations over the reduced frame.
//!
//! Operations never touch SQL: they run over the reduced result, once per
//! operation and once per active reference. Cumulative and rolling
//! variants accumulate over the outermost index level, restarting per
//! combination of the inner levels; share divides by the totals row of
//! its `over` dimension.

use std::sync::Arc;

use crate::error::QueryResult;
use crate::frame::{alias_selector, totals_marker_for, DataFrame, FrameError, Value};

use super::field::Field;
use super::reference::Reference;

/// Argument of an operation: a metric field or another operation.
#[derive(Debug, Clone)]
pub enum OperationArg {
    Field(Arc<Field>),
    Operation(Box<Operation>),
}

impl OperationArg {
    pub fn alias(&self) -> String {
        match self {
            OperationArg::Field(field) => field.alias.clone(),
            OperationArg::Operation(op) => op.alias(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            OperationArg::Field(field) => field.label().to_string(),
            OperationArg::Operation(op) => op.label(),
        }
    }

    fn metrics(&self) -> Vec<Arc<Field>> {
        match self {
            OperationArg::Field(field) => vec![Arc::clone(field)],
            OperationArg::Operation(op) => op.metrics(),
        }
    }

    fn operations(&self) -> Vec<&Operation> {
        match self {
            OperationArg::Field(_) => vec![],
            OperationArg::Operation(op) => {
                let mut ops = op.operations();
                ops.push(op);
                ops
            }
        }
    }
}

impl From<&Arc<Field>> for OperationArg {
    fn from(field: &Arc<Field>) -> Self {
        OperationArg::Field(Arc::clone(field))
    }
}

impl From<Operation> for OperationArg {
    fn from(op: Operation) -> Self {
        OperationArg::Operation(Box::new(op))
    }
}

/// A post-query transformation.
#[derive(Debug, Clone)]
pub enum Operation {
    CumSum {
        arg: OperationArg,
    },
    CumProd {
        arg: OperationArg,
    },
    CumMean {
        arg: OperationArg,
    },
    RollingMean {
        arg: OperationArg,
        window: usize,
        min_periods: usize,
    },
    Share {
        metric: OperationArg,
        over: Option<Arc<Field>>,
        precision: Option<u32>,
    },
}

/// Cumulative sum of the argument.
pub fn cumsum(arg: impl Into<OperationArg>) -> Operation {
    Operation::CumSum { arg: arg.into() }
}

/// Cumulative product of the argument.
pub fn cumprod(arg: impl Into<OperationArg>) -> Operation {
    Operation::CumProd { arg: arg.into() }
}

/// Cumulative mean of the argument.
pub fn cummean(arg: impl Into<OperationArg>) -> Operation {
    Operation::CumMean { arg: arg.into() }
}

/// Rolling mean with `min_periods = window`.
pub fn rolling_mean(arg: impl Into<OperationArg>, window: usize) -> Operation {
    Operation::RollingMean {
        arg: arg.into(),
        window,
        min_periods: window,
    }
}

/// Share of the metric's total across `over`.
pub fn share(metric: impl Into<OperationArg>, over: Option<&Arc<Field>>) -> Operation {
    Operation::Share {
        metric: metric.into(),
        over: over.map(Arc::clone),
        precision: None,
    }
}

impl Operation {
    fn arg(&self) -> &OperationArg {
        match self {
            Operation::CumSum { arg }
            | Operation::CumProd { arg }
            | Operation::CumMean { arg }
            | Operation::RollingMean { arg, .. } => arg,
            Operation::Share { metric, .. } => metric,
        }
    }

    pub fn alias(&self) -> String {
        let name = match self {
            Operation::CumSum { .. } => "cumsum",
            Operation::CumProd { .. } => "cumprod",
            Operation::CumMean { .. } => "cummean",
            Operation::RollingMean { .. } => "rollingmean",
            Operation::Share { .. } => "share",
        };
        format!("{}({})", name, self.arg().alias())
    }

    pub fn label(&self) -> String {
        let name = match self {
            Operation::CumSum { .. } => "CumSum",
            Operation::CumProd { .. } => "CumProd",
            Operation::CumMean { .. } => "CumMean",
            Operation::RollingMean { .. } => "RollingMean",
            Operation::Share { .. } => "Share",
        };
        format!("{}({})", name, self.arg().label())
    }

    /// Leaf metric fields this operation needs queried.
    pub fn metrics(&self) -> Vec<Arc<Field>> {
        self.arg().metrics()
    }

    /// Nested operations, innermost first. They must be applied before
    /// this one so their columns exist in the frame.
    pub fn operations(&self) -> Vec<&Operation> {
        self.arg().operations()
    }

    /// The share basis dimension, if this is a share operation.
    pub fn share_over(&self) -> Option<&Arc<Field>> {
        match self {
            Operation::Share { over, .. } => over.as_ref(),
            _ => None,
        }
    }

    /// Set the rounding precision of a share operation.
    pub fn with_precision(mut self, p: u32) -> Operation {
        if let Operation::Share { precision, .. } = &mut self {
            *precision = Some(p);
        }
        self
    }

    /// Compute this operation's column over the reduced frame.
    ///
    /// `reference` selects the reference-suffixed variant of the argument
    /// column; `None` is the base.
    pub fn apply(
        &self,
        frame: &DataFrame,
        reference: Option<&Reference>,
    ) -> QueryResult<Vec<Value>> {
        let suffix = reference
            .map(|r| format!("_{}", r.alias()))
            .unwrap_or_default();
        let key = alias_selector(&format!("{}{}", self.arg().alias(), suffix));
        let column = frame
            .column(&key)
            .ok_or_else(|| FrameError::UnknownColumn(key.clone()))?;
        let values = &column.values;

        let result = match self {
            Operation::CumSum { .. } => accumulate(frame, values, 0.0, |acc, v| acc + v),
            Operation::CumProd { .. } => accumulate(frame, values, 1.0, |acc, v| acc * v),
            Operation::CumMean { .. } => cumulative_mean(frame, values),
            Operation::RollingMean {
                window,
                min_periods,
                ..
            } => rolling(frame, values, *window, *min_periods),
            Operation::Share {
                over, precision, ..
            } => compute_share(frame, values, over.as_deref(), *precision)?,
        };

        Ok(result)
    }
}

/// Groups over the inner index levels: each series restarts per
/// combination of every level but the outermost.
fn inner_groups(frame: &DataFrame) -> Vec<(Vec<Value>, Vec<usize>)> {
    let levels: Vec<usize> = (1..frame.index_names().len()).collect();
    frame.group_rows(&levels)
}

fn accumulate(
    frame: &DataFrame,
    values: &[Value],
    init: f64,
    op: impl Fn(f64, f64) -> f64,
) -> Vec<Value> {
    let mut out = vec![Value::Null; values.len()];
    for (_, rows) in inner_groups(frame) {
        let mut acc = init;
        for row in rows {
            match values[row].as_f64() {
                Some(v) => {
                    acc = op(acc, v);
                    out[row] = Value::Float(acc);
                }
                None => out[row] = Value::Null,
            }
        }
    }
    out
}

fn cumulative_mean(frame: &DataFrame, values: &[Value]) -> Vec<Value> {
    let mut out = vec![Value::Null; values.len()];
    for (_, rows) in inner_groups(frame) {
        let mut total = 0.0;
        let mut count = 0usize;
        for row in rows {
            match values[row].as_f64() {
                Some(v) => {
                    total += v;
                    count += 1;
                    out[row] = Value::Float(total / count as f64);
                }
                None => out[row] = Value::Null,
            }
        }
    }
    out
}

fn rolling(
    frame: &DataFrame,
    values: &[Value],
    window: usize,
    min_periods: usize,
) -> Vec<Value> {
    let mut out = vec![Value::Null; values.len()];
    for (_, rows) in inner_groups(frame) {
        for (pos, &row) in rows.iter().enumerate() {
            if pos + 1 < min_periods {
                out[row] = Value::Float(f64::NAN);
                continue;
            }
            let start = (pos + 1).saturating_sub(window);
            let window_values: Vec<f64> = rows[start..=pos]
                .iter()
                .filter_map(|&r| values[r].as_f64())
                .collect();
            out[row] = if window_values.is_empty() {
                Value::Float(f64::NAN)
            } else {
                Value::Float(window_values.iter().sum::<f64>() / window_values.len() as f64)
            };
        }
    }
    out
}

fn compute_share(
    frame: &DataFrame,
    values: &[Value],
    over: Option<&Field>,
    precision: Option<u32>,
) -> QueryResult<Vec<Value>> {
    let mut out = vec![Value::Null; values.len()];

    let over = match over {
        // No basis: every row is its own whole.
        None => {
            for (row, value) in values.iter().enumerate() {
                if value.as_f64().is_some() {
                    out[row] = Value::Float(round_to(100.0, precision));
                }
            }
            return Ok(out);
        }
        Some(over) => over,
    };

    let level = frame
        .index_level(&alias_selector(&over.alias))
        .ok_or_else(|| FrameError::UnknownColumn(alias_selector(&over.alias)))?;
    let marker = totals_marker_for(over.data_type);

    // Totals value per combination of the levels outside the share basis.
    let mut totals: std::collections::HashMap<Vec<Value>, f64> = std::collections::HashMap::new();
    for (row, tuple) in frame.index().iter().enumerate() {
        if tuple[level] == marker {
            let outer_key: Vec<Value> = tuple[..level].to_vec();
            if let Some(v) = values[row].as_f64() {
                totals.insert(outer_key, v);
            }
        }
    }

    for (row, tuple) in frame.index().iter().enumerate() {
        let outer_key: Vec<Value> = tuple[..level].to_vec();
        match (values[row].as_f64(), totals.get(&outer_key)) {
            (Some(v), Some(&total)) if total != 0.0 => {
                out[row] = Value::Float(round_to(100.0 * v / total, precision));
            }
            (Some(_), _) => out[row] = Value::Float(f64::NAN),
            _ => out[row] = Value::Null,
        }
    }

    Ok(out)
}

fn round_to(value: f64, precision: Option<u32>) -> f64 {
    match precision {
        Some(p) => {
            let factor = 10f64.powi(p as i32);
            (value * factor).round() / factor
        }
        None => value,
    }
}
