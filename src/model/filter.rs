//! Filters: a field alias paired with a criterion expression.
//!
//! Aggregate filters (criteria over aggregate definitions) are emitted as
//! HAVING; everything else as WHERE. Filter equality is rendered-definition
//! equality, which is what the planner deduplicates on.

use crate::sql::{Dialect, Expr};

/// A filter over one field.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Alias of the field this filter constrains.
    pub field_alias: String,
    /// The criterion expression.
    pub definition: Expr,
    /// Aggregate criteria go to HAVING instead of WHERE.
    pub aggregate: bool,
    /// Void filters are no-ops and are skipped at emission.
    pub void: bool,
}

impl Filter {
    pub fn new(field_alias: &str, definition: Expr) -> Self {
        let aggregate = definition.is_aggregate();
        Self {
            field_alias: field_alias.into(),
            definition,
            aggregate,
            void: false,
        }
    }

    /// A filter that matches everything and is skipped at emission.
    pub fn void(field_alias: &str) -> Self {
        Self {
            field_alias: field_alias.into(),
            definition: crate::sql::expr::lit_bool(true),
            aggregate: false,
            void: true,
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.void == other.void
            && self.definition.to_sql(Dialect::DuckDb) == other.definition.to_sql(Dialect::DuckDb)
    }
}

/// A request-level filter with its totals behavior.
///
/// `apply_to_totals = false` omits the filter from totals queries only
/// (the omit-from-rollup modifier).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFilter {
    pub filter: Filter,
    pub apply_to_totals: bool,
}

impl RequestFilter {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            apply_to_totals: true,
        }
    }

    pub fn omit_from_rollup(filter: Filter) -> Self {
        Self {
            filter,
            apply_to_totals: false,
        }
    }
}

impl From<Filter> for RequestFilter {
    fn from(filter: Filter) -> Self {
        RequestFilter::new(filter)
    }
}
