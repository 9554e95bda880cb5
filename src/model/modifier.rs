//! Dimension modifiers.
//!
//! Request dimensions are a tagged modifier chain over an underlying
//! field: rollup participation, server-side date truncation, numeric
//! bucketing, and filter-to-dimension conversion. The chain is walked
//! with [`Dimension::underlying_field`] wherever the raw field is needed.

use std::sync::Arc;

use crate::frame::ROLLUP_VALUE;
use crate::sql::expr::{case, lit_float, lit_str, ExprExt};
use crate::sql::{DatePart, Dialect, Expr, SqlDialect};

use super::field::Field;
use super::filter::Filter;
use super::types::DataType;

/// A filter converted into a synthetic text dimension.
///
/// Rows matching the filter get `set_label`, the rest `complement_label`
/// (or the raw dimension value when the complement is not grouped).
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub field: Arc<Field>,
    pub filter: Filter,
    pub set_label: Option<String>,
    pub complement_label: Option<String>,
    pub will_replace_referenced_dimension: bool,
    pub will_group_complement: bool,
}

impl ResultSet {
    pub fn new(field: Arc<Field>, filter: Filter) -> Self {
        Self {
            field,
            filter,
            set_label: None,
            complement_label: None,
            will_replace_referenced_dimension: true,
            will_group_complement: true,
        }
    }

    pub fn with_set_label(mut self, label: &str) -> Self {
        self.set_label = Some(label.into());
        self
    }

    pub fn with_complement_label(mut self, label: &str) -> Self {
        self.complement_label = Some(label.into());
        self
    }

    pub fn replace_referenced_dimension(mut self, replace: bool) -> Self {
        self.will_replace_referenced_dimension = replace;
        self
    }

    pub fn group_complement(mut self, group: bool) -> Self {
        self.will_group_complement = group;
        self
    }

    fn set_label(&self) -> String {
        self.set_label
            .clone()
            .unwrap_or_else(|| format!("set({})", self.field.alias))
    }

    fn complement_label(&self) -> String {
        self.complement_label
            .clone()
            .unwrap_or_else(|| format!("complement({})", self.field.alias))
    }
}

/// A requested dimension: a field with a chain of modifiers.
#[derive(Debug, Clone)]
pub enum Dimension {
    /// The unmodified field.
    Plain(Arc<Field>),

    /// Participates in a totals-rollup axis. When the planner emits a
    /// totals query, the rollup level selects a sentinel constant.
    Rollup(Box<Dimension>),

    /// Server-side date truncation.
    DatetimeInterval {
        dimension: Box<Dimension>,
        interval: DatePart,
    },

    /// Bucketing by numeric step.
    NumericInterval {
        dimension: Box<Dimension>,
        size: i64,
        offset: i64,
    },

    /// Filter re-dimensioned into set/complement labels.
    ResultSet(ResultSet),
}

impl Dimension {
    /// The field underneath the modifier chain.
    pub fn underlying_field(&self) -> &Arc<Field> {
        match self {
            Dimension::Plain(field) => field,
            Dimension::Rollup(dim) => dim.underlying_field(),
            Dimension::DatetimeInterval { dimension, .. } => dimension.underlying_field(),
            Dimension::NumericInterval { dimension, .. } => dimension.underlying_field(),
            Dimension::ResultSet(rs) => &rs.field,
        }
    }

    /// Wire alias of the dimension.
    pub fn alias(&self) -> String {
        match self {
            Dimension::ResultSet(rs) if !rs.will_replace_referenced_dimension => {
                format!("set({})", rs.field.alias)
            }
            _ => self.underlying_field().alias.clone(),
        }
    }

    /// Data type of the emitted column.
    pub fn data_type(&self) -> DataType {
        match self {
            Dimension::ResultSet(_) => DataType::Text,
            _ => self.underlying_field().data_type,
        }
    }

    /// Whether any layer of the chain is a rollup.
    pub fn is_rollup(&self) -> bool {
        match self {
            Dimension::Rollup(_) => true,
            Dimension::Plain(_) | Dimension::ResultSet(_) => false,
            Dimension::DatetimeInterval { dimension, .. } => dimension.is_rollup(),
            Dimension::NumericInterval { dimension, .. } => dimension.is_rollup(),
        }
    }

    /// Wrap this dimension in a rollup layer.
    pub fn rollup(self) -> Dimension {
        Dimension::Rollup(Box::new(self))
    }

    /// The chain without its rollup layers.
    pub fn strip_rollup(&self) -> Dimension {
        match self {
            Dimension::Rollup(dim) => dim.strip_rollup(),
            Dimension::DatetimeInterval {
                dimension,
                interval,
            } => Dimension::DatetimeInterval {
                dimension: Box::new(dimension.strip_rollup()),
                interval: *interval,
            },
            Dimension::NumericInterval {
                dimension,
                size,
                offset,
            } => Dimension::NumericInterval {
                dimension: Box::new(dimension.strip_rollup()),
                size: *size,
                offset: *offset,
            },
            other => other.clone(),
        }
    }

    /// SQL definition of the dimension for a dialect.
    ///
    /// A rollup layer shadows the definition with the sentinel constant;
    /// the planner only emits it that way inside totals queries.
    pub fn definition(&self, dialect: Dialect) -> Expr {
        match self {
            Dimension::Plain(field) => field.definition.clone(),

            Dimension::Rollup(_) => lit_str(ROLLUP_VALUE),

            Dimension::DatetimeInterval {
                dimension,
                interval,
            } => dialect.trunc_date(dimension.definition(dialect), *interval),

            Dimension::NumericInterval {
                dimension,
                size,
                offset,
            } => {
                // FLOOR((expr - offset) / size) * size + offset
                let inner = dimension.definition(dialect);
                crate::sql::expr::floor(
                    inner.sub(lit_float(*offset as f64)).div(lit_float(*size as f64)),
                )
                .mul(lit_float(*size as f64))
                .add(lit_float(*offset as f64))
            }

            Dimension::ResultSet(rs) => {
                let else_branch = if rs.will_group_complement {
                    lit_str(&rs.complement_label())
                } else {
                    dialect.to_char(rs.field.definition.clone())
                };
                case(
                    vec![(rs.filter.definition.clone(), lit_str(&rs.set_label()))],
                    Some(else_branch),
                )
            }
        }
    }
}

impl From<Arc<Field>> for Dimension {
    fn from(field: Arc<Field>) -> Self {
        Dimension::Plain(field)
    }
}

impl From<&Arc<Field>> for Dimension {
    fn from(field: &Arc<Field>) -> Self {
        Dimension::Plain(Arc::clone(field))
    }
}

/// Wrap a dimension in a rollup layer.
pub fn rollup(dimension: impl Into<Dimension>) -> Dimension {
    dimension.into().rollup()
}

/// Truncate a date dimension server-side.
pub fn datetime_interval(dimension: impl Into<Dimension>, interval: DatePart) -> Dimension {
    Dimension::DatetimeInterval {
        dimension: Box::new(dimension.into()),
        interval,
    }
}

/// Bucket a numeric dimension by step size and offset.
pub fn numeric_interval(dimension: impl Into<Dimension>, size: i64, offset: i64) -> Dimension {
    Dimension::NumericInterval {
        dimension: Box::new(dimension.into()),
        size,
        offset,
    }
}
