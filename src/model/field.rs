//! Fields: logical columns of a dataset.
//!
//! A field pairs a unique alias with an opaque SQL definition and a data
//! type, plus presentational hints consumed by widget rendering. Filter
//! constructors live here so that type restrictions are enforced at the
//! point a filter is built.

use std::sync::Arc;

use crate::error::{QueryError, QueryResult};
use crate::sql::expr::{lit_bool, lit_str, lower, ExprExt};
use crate::sql::Expr;

use super::filter::Filter;
use super::types::{DataType, CONTINUOUS_TYPES};

/// A logical column.
///
/// Fields are shared via [`Arc`] between datasets, builders and plans:
/// builder clones never copy a field, so the alias stays a stable key.
#[derive(Debug, Clone)]
pub struct Field {
    pub alias: String,
    pub definition: Expr,
    pub data_type: DataType,
    pub label: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub thousands: Option<String>,
    pub precision: Option<u32>,
    pub hyperlink_template: Option<String>,
}

impl Field {
    pub fn new(alias: &str, definition: Expr, data_type: DataType) -> Self {
        Self {
            alias: alias.into(),
            definition,
            data_type,
            label: None,
            prefix: None,
            suffix: None,
            thousands: None,
            precision: None,
            hyperlink_template: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_thousands(mut self, thousands: &str) -> Self {
        self.thousands = Some(thousands.into());
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_hyperlink_template(mut self, template: &str) -> Self {
        self.hyperlink_template = Some(template.into());
        self
    }

    /// Shared handle for datasets and requests.
    pub fn shared(self) -> Arc<Field> {
        Arc::new(self)
    }

    /// Display label, falling back to the alias.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.alias)
    }

    /// Whether the definition contains an aggregate function (metric).
    pub fn is_aggregate(&self) -> bool {
        self.definition.is_aggregate()
    }

    /// A copy of the definition for building compound expressions.
    pub fn expr(&self) -> Expr {
        self.definition.clone()
    }

    // =========================================================================
    // Filter constructors
    // =========================================================================

    fn restrict(&self, filter: &str, allowed: &[DataType]) -> QueryResult<()> {
        if allowed.contains(&self.data_type) {
            Ok(())
        } else {
            Err(QueryError::TypeRestriction {
                filter: filter.into(),
                actual: self.data_type,
                allowed: allowed.to_vec(),
            })
        }
    }

    /// `field = value`
    pub fn eq(&self, value: impl Into<Expr>) -> Filter {
        Filter::new(&self.alias, self.expr().eq(value))
    }

    /// `field <> value`
    pub fn ne(&self, value: impl Into<Expr>) -> Filter {
        Filter::new(&self.alias, self.expr().ne(value))
    }

    /// `field IN (values...)`
    pub fn isin(&self, values: Vec<Expr>) -> Filter {
        Filter::new(&self.alias, self.expr().isin(values))
    }

    /// `field NOT IN (values...)`
    pub fn notin(&self, values: Vec<Expr>) -> Filter {
        Filter::new(&self.alias, self.expr().notin(values))
    }

    /// `field > value`; continuous types only.
    pub fn gt(&self, value: impl Into<Expr>) -> QueryResult<Filter> {
        self.restrict("gt", &CONTINUOUS_TYPES)?;
        Ok(Filter::new(&self.alias, self.expr().gt(value)))
    }

    /// `field >= value`; continuous types only.
    pub fn ge(&self, value: impl Into<Expr>) -> QueryResult<Filter> {
        self.restrict("ge", &CONTINUOUS_TYPES)?;
        Ok(Filter::new(&self.alias, self.expr().gte(value)))
    }

    /// `field < value`; continuous types only.
    pub fn lt(&self, value: impl Into<Expr>) -> QueryResult<Filter> {
        self.restrict("lt", &CONTINUOUS_TYPES)?;
        Ok(Filter::new(&self.alias, self.expr().lt(value)))
    }

    /// `field <= value`; continuous types only.
    pub fn le(&self, value: impl Into<Expr>) -> QueryResult<Filter> {
        self.restrict("le", &CONTINUOUS_TYPES)?;
        Ok(Filter::new(&self.alias, self.expr().lte(value)))
    }

    /// `field BETWEEN low AND high`; continuous types only.
    pub fn between(
        &self,
        low: impl Into<Expr>,
        high: impl Into<Expr>,
    ) -> QueryResult<Filter> {
        self.restrict("between", &CONTINUOUS_TYPES)?;
        Ok(Filter::new(&self.alias, self.expr().between(low, high)))
    }

    /// Case-insensitive LIKE, OR-combined across patterns; text only.
    pub fn like(&self, patterns: &[&str]) -> QueryResult<Filter> {
        self.restrict("like", &[DataType::Text])?;
        Ok(Filter::new(&self.alias, self.pattern_criterion(patterns)))
    }

    /// Negated case-insensitive LIKE across patterns; text only.
    pub fn not_like(&self, patterns: &[&str]) -> QueryResult<Filter> {
        self.restrict("not_like", &[DataType::Text])?;
        Ok(Filter::new(
            &self.alias,
            self.pattern_criterion(patterns).not(),
        ))
    }

    fn pattern_criterion(&self, patterns: &[&str]) -> Expr {
        let mut criterion: Option<Expr> = None;
        for pattern in patterns {
            let single = lower(self.expr()).like(lit_str(&pattern.to_lowercase()));
            criterion = Some(match criterion {
                Some(existing) => existing.or(single),
                None => single,
            });
        }
        // An empty pattern list matches nothing.
        criterion.unwrap_or_else(|| lit_bool(false))
    }

    /// `field = TRUE/FALSE`; boolean only.
    pub fn is(&self, value: bool) -> QueryResult<Filter> {
        self.restrict("is", &[DataType::Boolean])?;
        Ok(Filter::new(&self.alias, self.expr().eq(lit_bool(value))))
    }

    /// A no-op filter, skipped at emission.
    pub fn void(&self) -> Filter {
        Filter::void(&self.alias)
    }
}

/// Aliases are unique within a dataset, so alias equality is identity.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
    }
}

impl Eq for Field {}

/// Fields participate in the fluent expression algebra through their
/// definitions: `field_a.expr().div(field_b.expr())` and friends.
impl ExprExt for &Field {
    fn into_expr(self) -> Expr {
        self.definition.clone()
    }
}
