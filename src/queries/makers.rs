//! The query planner.
//!
//! One logical request expands into the Cartesian product
//! `{None} ∪ reverse(totals dimensions)` × `{None} ∪ reference groups`:
//! the base query first, then per totals dimension (deepest rollup first)
//! a query per reference group in insertion order. The reducer depends on
//! exactly this order to chunk result frames.

use std::sync::Arc;

use tracing::debug;

use crate::database::Database;
use crate::error::{QueryError, QueryResult};
use crate::frame::alias_selector;
use crate::model::{
    Dimension, Field, Filter, Join, Reference, ReferenceGroup, RequestFilter,
};
use crate::sql::expr::{col, max};
use crate::sql::{Expr, OrderByExpr, Query, Relation, SelectExpr, SortDir, TableRef};

use super::finders::{
    find_filters_for_totals, find_joins, find_reference_groups, find_totals_dimensions,
};

/// A relational query tagged with the plan row it belongs to.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub query: Query,
    /// Alias of the totals dimension this query rolls up, if any.
    pub totals_dimension: Option<String>,
    /// The reference group this query offsets, if any.
    pub reference_group: Option<ReferenceGroup>,
}

/// The request inputs a slicer query is planned from.
pub struct SlicerRequest<'a> {
    pub database: &'a dyn Database,
    pub table: &'a TableRef,
    pub joins: &'a [Join],
    pub dimensions: &'a [Dimension],
    pub metrics: &'a [Arc<Field>],
    pub filters: &'a [RequestFilter],
    pub orders: &'a [(Arc<Field>, Option<SortDir>)],
}

/// Expand one request into its full set of relational queries.
pub fn make_slicer_query_with_totals_and_references(
    request: &SlicerRequest,
    references: &[Reference],
    share_dimensions: &[&Dimension],
) -> QueryResult<Vec<PlannedQuery>> {
    let dimensions = apply_result_set_dimensions(request.dimensions);
    let totals_aliases = find_totals_dimensions(&dimensions, share_dimensions);
    let reference_groups = find_reference_groups(references);

    // Base row first, then totals deepest-first.
    let mut totals_rows: Vec<Option<String>> = vec![None];
    totals_rows.extend(totals_aliases.iter().rev().cloned().map(Some));

    let mut planned = vec![];
    for totals in &totals_rows {
        let mut reference_rows: Vec<Option<&ReferenceGroup>> = vec![None];
        reference_rows.extend(reference_groups.iter().map(Some));

        for group in reference_rows {
            let query = make_slicer_query(
                request,
                &dimensions,
                totals.as_deref(),
                group,
                true,
            )?;
            planned.push(PlannedQuery {
                query,
                totals_dimension: totals.clone(),
                reference_group: group.cloned(),
            });
        }
    }

    debug!(
        queries = planned.len(),
        totals = totals_aliases.len(),
        reference_groups = reference_groups.len(),
        "expanded request into relational queries"
    );
    Ok(planned)
}

/// Replace dimensions referenced by a replacing result-set with the
/// result-set, in the referenced dimension's position.
pub fn apply_result_set_dimensions(dimensions: &[Dimension]) -> Vec<Dimension> {
    let replacers: Vec<&Dimension> = dimensions
        .iter()
        .filter(|d| {
            matches!(d, Dimension::ResultSet(rs) if rs.will_replace_referenced_dimension)
        })
        .collect();

    let has_target = |rs_alias: &str| {
        dimensions.iter().any(|d| {
            !matches!(d, Dimension::ResultSet(_)) && d.alias() == rs_alias
        })
    };

    let mut out = vec![];
    for dim in dimensions {
        match dim {
            Dimension::ResultSet(rs)
                if rs.will_replace_referenced_dimension && has_target(&rs.field.alias) =>
            {
                // Will be inserted at the referenced dimension's position.
                continue;
            }
            _ => {
                let replacement = replacers.iter().find(|r| {
                    !matches!(dim, Dimension::ResultSet(_)) && r.alias() == dim.alias()
                });
                match replacement {
                    Some(r) => out.push((*r).clone()),
                    None => out.push(dim.clone()),
                }
            }
        }
    }
    out
}

/// Build one relational query for a `(totals dimension, reference group)`
/// cell of the plan.
pub(crate) fn make_slicer_query(
    request: &SlicerRequest,
    dimensions: &[Dimension],
    totals_alias: Option<&str>,
    group: Option<&ReferenceGroup>,
    include_order: bool,
) -> QueryResult<Query> {
    let dialect = request.database.dialect();

    // Planner-level rollup: strip request rollups, then wrap the totals
    // dimension and everything after it.
    let mut working: Vec<Dimension> =
        dimensions.iter().map(|d| d.strip_rollup()).collect();
    if let Some(alias) = totals_alias {
        if let Some(pos) = working.iter().position(|d| d.alias() == alias) {
            for dim in working.iter_mut().skip(pos) {
                *dim = dim.clone().rollup();
            }
        }
    }

    // Dimension select terms, deduplicated by alias.
    struct DimTerm {
        alias: String,
        definition: Expr,
        rollup: bool,
    }
    let mut dim_terms: Vec<DimTerm> = vec![];
    for dim in &working {
        let alias = dim.alias();
        if dim_terms.iter().any(|t| t.alias == alias) {
            continue;
        }
        let rollup = dim.is_rollup();
        let mut definition = dim.definition(dialect);
        if let Some(group) = group {
            if !rollup && dim.underlying_field().alias == group.field.alias {
                definition =
                    request
                        .database
                        .date_add(definition, group.date_part, group.interval);
            }
        }
        dim_terms.push(DimTerm {
            alias,
            definition,
            rollup,
        });
    }

    // Metric select terms; reference queries suffix the aliases.
    let suffix = group
        .map(|g| format!("_{}", g.alias()))
        .unwrap_or_default();
    let mut metric_terms: Vec<(String, Expr)> = vec![];
    for metric in request.metrics {
        let alias = format!("{}{}", metric.alias, suffix);
        if metric_terms.iter().any(|(a, _)| *a == alias) {
            continue;
        }
        metric_terms.push((alias, metric.definition.clone()));
    }

    // Filters: totals queries drop omitted and aggregate filters.
    let mut filters: Vec<Filter> = if totals_alias.is_some() {
        find_filters_for_totals(request.filters)
    } else {
        request.filters.iter().map(|rf| rf.filter.clone()).collect()
    };
    filters.retain(|f| !f.void);
    let mut deduped: Vec<Filter> = vec![];
    for filter in filters {
        if !deduped.contains(&filter) {
            deduped.push(filter);
        }
    }
    let mut filters = deduped;

    // Reference adaptation: shift filters on the reference dimension so
    // the prior window is selected, and append reference-scoped filters.
    if let Some(group) = group {
        let target = group.field.definition.clone();
        let shifted =
            request
                .database
                .date_add(target.clone(), group.date_part, group.interval);
        for filter in &mut filters {
            if filter.field_alias == group.field.alias {
                filter.definition = filter.definition.substitute(&target, &shifted);
            }
        }
        for reference in &group.references {
            for extra in &reference.filters {
                if !extra.void && !filters.contains(extra) {
                    filters.push(extra.clone());
                }
            }
        }
    }

    // Joins required by everything this query touches.
    let mut exprs: Vec<&Expr> = vec![];
    for term in &dim_terms {
        exprs.push(&term.definition);
    }
    for (_, definition) in &metric_terms {
        exprs.push(definition);
    }
    for filter in &filters {
        exprs.push(&filter.definition);
    }
    let joins = find_joins(request.joins, &request.table.table, &exprs)?;

    let mut query = Query::new().from(request.table.clone());
    for join in &joins {
        query = query.join(
            join.join_type,
            Relation::Table(join.table.clone()),
            join.criterion.clone(),
        );
    }

    // Select: dimensions then metrics, wire-aliased.
    let mut select: Vec<SelectExpr> = vec![];
    for term in &dim_terms {
        select.push(
            SelectExpr::new(term.definition.clone())
                .with_alias(&alias_selector(&term.alias)),
        );
    }
    for (alias, definition) in &metric_terms {
        select.push(SelectExpr::new(definition.clone()).with_alias(&alias_selector(alias)));
    }

    for filter in &filters {
        query = if filter.aggregate {
            query.having(filter.definition.clone())
        } else {
            query.filter(filter.definition.clone())
        };
    }

    // Group by every non-rollup dimension.
    if !dim_terms.is_empty() && !metric_terms.is_empty() {
        let group_exprs: Vec<Expr> = dim_terms
            .iter()
            .filter(|t| !t.rollup)
            .map(|t| t.definition.clone())
            .collect();
        if !group_exprs.is_empty() {
            query = query.group_by(group_exprs);
        }
    }

    if include_order {
        let mut order_exprs: Vec<OrderByExpr> = vec![];
        if request.orders.is_empty() {
            // Default: all dimensions in request order.
            for term in &dim_terms {
                order_exprs.push(OrderByExpr::new(col(&alias_selector(&term.alias))));
            }
        } else {
            for (field, dir) in request.orders {
                let selected = dim_terms.iter().any(|t| t.alias == field.alias)
                    || metric_terms.iter().any(|(a, _)| *a == field.alias);
                if !selected {
                    select.push(
                        SelectExpr::new(field.definition.clone())
                            .with_alias(&alias_selector(&field.alias)),
                    );
                }
                let term = col(&alias_selector(&field.alias));
                order_exprs.push(match dir {
                    Some(SortDir::Asc) => OrderByExpr::asc(term),
                    Some(SortDir::Desc) => OrderByExpr::desc(term),
                    None => OrderByExpr::new(term),
                });
            }
        }
        query = query.order_by(order_exprs);
    }

    Ok(query.select(select))
}

/// `SELECT DISTINCT dimension` with optional filters, for choice lists.
pub fn make_choices_query(
    table: &TableRef,
    joins: &[Join],
    field: &Arc<Field>,
    filters: &[Filter],
) -> QueryResult<Query> {
    let mut exprs: Vec<&Expr> = vec![&field.definition];
    for filter in filters {
        if !filter.void {
            exprs.push(&filter.definition);
        }
    }
    let required_joins = find_joins(joins, &table.table, &exprs)?;

    let mut query = Query::new().from(table.clone()).distinct();
    for join in &required_joins {
        query = query.join(
            join.join_type,
            Relation::Table(join.table.clone()),
            join.criterion.clone(),
        );
    }
    for filter in filters {
        if filter.void {
            continue;
        }
        query = if filter.aggregate {
            query.having(filter.definition.clone())
        } else {
            query.filter(filter.definition.clone())
        };
    }
    Ok(query.select(vec![
        SelectExpr::new(field.definition.clone())
            .with_alias(&alias_selector(&field.alias)),
    ]))
}

/// `SELECT MAX(field)...` per field, for latest-value lookups.
///
/// Fails with *empty-query* when no field is given.
pub fn make_latest_query(
    table: &TableRef,
    joins: &[Join],
    fields: &[Arc<Field>],
) -> QueryResult<Query> {
    if fields.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let exprs: Vec<&Expr> = fields.iter().map(|f| &f.definition).collect();
    let required_joins = find_joins(joins, &table.table, &exprs)?;

    let mut query = Query::new().from(table.clone());
    for join in &required_joins {
        query = query.join(
            join.join_type,
            Relation::Table(join.table.clone()),
            join.criterion.clone(),
        );
    }
    let select: Vec<SelectExpr> = fields
        .iter()
        .map(|f| {
            SelectExpr::new(max(f.definition.clone()))
                .with_alias(&alias_selector(&f.alias))
        })
        .collect();
    Ok(query.select(select))
}
