//! The blender planner.
//!
//! A blended request is translated per leaf dataset through its field
//! map, planned into per-dataset subqueries (one per totals/reference
//! plan row, in the same order as the plain planner), and composed into
//! one query per row: the first contributing subquery anchors the FROM
//! clause, the others left-join on the mapped dimensions both sides
//! project. Blender-level metrics are re-targeted into the subqueries.

use std::sync::Arc;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::frame::alias_selector;
use crate::model::{
    DataSet, DataSetBlender, Dimension, Field, Filter, Reference, ReferenceGroup,
    RequestFilter, ResultSet,
};
use crate::sql::expr::{col, table_col};
use crate::sql::{Expr, ExprExt, OrderByExpr, Query, Relation, SelectExpr, SortDir};

use super::finders::{find_reference_groups, find_totals_dimensions};
use super::makers::{apply_result_set_dimensions, make_slicer_query, PlannedQuery, SlicerRequest};

/// The blender-level request inputs.
pub struct BlenderRequest<'a> {
    pub blender: &'a DataSetBlender,
    pub dimensions: &'a [Dimension],
    pub metrics: &'a [Arc<Field>],
    pub filters: &'a [RequestFilter],
    pub references: &'a [Reference],
    pub orders: &'a [(Arc<Field>, Option<SortDir>)],
}

/// A leaf dataset with the request translated into its own fields.
struct TranslatedLeaf {
    dataset: DataSet,
    /// Subquery alias: `sq<leaf index>`.
    subquery_alias: String,
    field_map: crate::model::FieldMap,
    /// `(blender-level alias, dataset-level dimension)` in request order.
    dimensions: Vec<(String, Dimension)>,
    metrics: Vec<Arc<Field>>,
    filters: Vec<RequestFilter>,
}

impl TranslatedLeaf {
    /// Resolve a blender-level field into this dataset, if present.
    fn resolve(&self, alias: &str) -> Option<&Arc<Field>> {
        self.field_map
            .get(alias)
            .and_then(|a| self.dataset.fields.get(a))
    }
}

/// Expand a blended request into its full set of relational queries.
pub fn make_blended_queries(
    request: &BlenderRequest,
    share_dimensions: &[&Dimension],
) -> QueryResult<Vec<PlannedQuery>> {
    let dimensions = apply_result_set_dimensions(request.dimensions);
    let totals_aliases = find_totals_dimensions(&dimensions, share_dimensions);
    let reference_groups = find_reference_groups(request.references);

    let leaves = translate_leaves(request, &dimensions)?;

    let mut totals_rows: Vec<Option<String>> = vec![None];
    totals_rows.extend(totals_aliases.iter().rev().cloned().map(Some));

    let mut planned = vec![];
    for totals in &totals_rows {
        let mut reference_rows: Vec<Option<&ReferenceGroup>> = vec![None];
        reference_rows.extend(reference_groups.iter().map(Some));

        for group in reference_rows {
            let query = blend_plan_row(request, &dimensions, &leaves, totals.as_deref(), group)?;
            planned.push(PlannedQuery {
                query,
                totals_dimension: totals.clone(),
                reference_group: group.cloned(),
            });
        }
    }

    debug!(
        queries = planned.len(),
        datasets = leaves.len(),
        "expanded blended request into relational queries"
    );
    Ok(planned)
}

/// Translate the request into each leaf dataset's fields.
fn translate_leaves(
    request: &BlenderRequest,
    dimensions: &[Dimension],
) -> QueryResult<Vec<TranslatedLeaf>> {
    let mut leaves = vec![];
    for (leaf_index, (dataset, field_map)) in request.blender.flatten().into_iter().enumerate() {
        let mut translated_dimensions = vec![];
        for dim in dimensions {
            if let Some(translated) = translate_dimension(dim, &field_map, &dataset) {
                translated_dimensions.push((dim.alias(), translated));
            }
        }

        let mut metrics: Vec<Arc<Field>> = vec![];
        for metric in request.metrics {
            if let Some(direct) = field_map
                .get(&metric.alias)
                .and_then(|a| dataset.fields.get(a))
            {
                if !metrics.iter().any(|m| m.alias == direct.alias) {
                    metrics.push(Arc::clone(direct));
                }
                continue;
            }
            // Complex blender metric: pull in the leaf metrics of this
            // dataset that its expression is composed of.
            for leaf_metric in dataset.fields.metrics() {
                if expr_contains(&metric.definition, &leaf_metric.definition)
                    && !metrics.iter().any(|m| m.alias == leaf_metric.alias)
                {
                    metrics.push(Arc::clone(leaf_metric));
                }
            }
        }

        let mut filters = vec![];
        for request_filter in request.filters {
            let Some(blender_field) = request
                .blender
                .fields
                .get(&request_filter.filter.field_alias)
            else {
                continue;
            };
            let Some(dataset_field) = field_map
                .get(&blender_field.alias)
                .and_then(|a| dataset.fields.get(a))
            else {
                continue;
            };
            let criterion = request_filter
                .filter
                .definition
                .substitute(&blender_field.definition, &dataset_field.definition);
            filters.push(RequestFilter {
                filter: Filter {
                    field_alias: dataset_field.alias.clone(),
                    definition: criterion,
                    aggregate: request_filter.filter.aggregate,
                    void: request_filter.filter.void,
                },
                apply_to_totals: request_filter.apply_to_totals,
            });
        }

        leaves.push(TranslatedLeaf {
            dataset,
            subquery_alias: format!("sq{}", leaf_index),
            field_map,
            dimensions: translated_dimensions,
            metrics,
            filters,
        });
    }
    Ok(leaves)
}

/// Rebuild a dimension chain over the dataset's own field, or None when
/// the dataset cannot express it.
fn translate_dimension(
    dim: &Dimension,
    field_map: &crate::model::FieldMap,
    dataset: &DataSet,
) -> Option<Dimension> {
    match dim {
        Dimension::Plain(field) => field_map
            .get(&field.alias)
            .and_then(|a| dataset.fields.get(a))
            .map(Dimension::from),

        Dimension::Rollup(inner) => {
            translate_dimension(inner, field_map, dataset).map(Dimension::rollup)
        }

        Dimension::DatetimeInterval {
            dimension,
            interval,
        } => translate_dimension(dimension, field_map, dataset).map(|d| {
            Dimension::DatetimeInterval {
                dimension: Box::new(d),
                interval: *interval,
            }
        }),

        Dimension::NumericInterval {
            dimension,
            size,
            offset,
        } => translate_dimension(dimension, field_map, dataset).map(|d| {
            Dimension::NumericInterval {
                dimension: Box::new(d),
                size: *size,
                offset: *offset,
            }
        }),

        Dimension::ResultSet(rs) => {
            let dataset_field = field_map
                .get(&rs.field.alias)
                .and_then(|a| dataset.fields.get(a))?;
            let criterion = rs
                .filter
                .definition
                .substitute(&rs.field.definition, &dataset_field.definition);
            Some(Dimension::ResultSet(ResultSet {
                field: Arc::clone(dataset_field),
                filter: Filter {
                    field_alias: dataset_field.alias.clone(),
                    definition: criterion,
                    aggregate: rs.filter.aggregate,
                    void: rs.filter.void,
                },
                set_label: rs.set_label.clone(),
                complement_label: rs.complement_label.clone(),
                will_replace_referenced_dimension: rs.will_replace_referenced_dimension,
                will_group_complement: rs.will_group_complement,
            }))
        }
    }
}

/// Whether `haystack` structurally contains `needle` as a sub-expression.
fn expr_contains(haystack: &Expr, needle: &Expr) -> bool {
    let mut found = false;
    haystack.visit(&mut |e| {
        if e == needle {
            found = true;
        }
    });
    found
}

/// Compose one blended query for a `(totals, reference group)` plan row.
fn blend_plan_row(
    request: &BlenderRequest,
    dimensions: &[Dimension],
    leaves: &[TranslatedLeaf],
    totals_alias: Option<&str>,
    group: Option<&ReferenceGroup>,
) -> QueryResult<Query> {
    // Per-dataset subqueries; None when the dataset contributes nothing.
    let mut subqueries: Vec<Option<Query>> = vec![];
    for leaf in leaves {
        if leaf.metrics.is_empty() && leaf.dimensions.is_empty() {
            subqueries.push(None);
            continue;
        }
        // A dataset without the reference dimension cannot offset.
        let leaf_group = match group {
            Some(g) => match leaf.resolve(&g.field.alias) {
                Some(field) => Some(ReferenceGroup {
                    field: Arc::clone(field),
                    date_part: g.date_part,
                    interval: g.interval,
                    references: g.references.clone(),
                }),
                None => {
                    subqueries.push(None);
                    continue;
                }
            },
            None => None,
        };

        let leaf_dimensions: Vec<Dimension> =
            leaf.dimensions.iter().map(|(_, d)| d.clone()).collect();
        let leaf_totals = totals_alias.and_then(|alias| {
            leaf.dimensions
                .iter()
                .find(|(blender_alias, _)| blender_alias == alias)
                .map(|(_, d)| d.alias())
        });

        let slicer = SlicerRequest {
            database: &*leaf.dataset.database,
            table: &leaf.dataset.table,
            joins: &leaf.dataset.joins,
            dimensions: &leaf_dimensions,
            metrics: &leaf.metrics,
            filters: &leaf.filters,
            orders: &[],
        };
        let query = make_slicer_query(
            &slicer,
            &leaf_dimensions,
            leaf_totals.as_deref(),
            leaf_group.as_ref(),
            false,
        )?;
        subqueries.push(Some(query));
    }

    let base_index = subqueries
        .iter()
        .position(|q| q.is_some())
        .ok_or(QueryError::EmptyQuery)?;

    let mut query = Query::new().from(Relation::subquery(
        subqueries[base_index]
            .clone()
            .unwrap_or_default(),
        &leaves[base_index].subquery_alias,
    ));

    // Join the remaining subqueries on the mapped dimensions both sides
    // project; cross join when none is shared.
    for (leaf_index, subquery) in subqueries.iter().enumerate() {
        if leaf_index == base_index {
            continue;
        }
        let Some(subquery) = subquery else {
            continue;
        };
        let leaf = &leaves[leaf_index];
        let base_leaf = &leaves[base_index];

        let mut criterion: Option<Expr> = None;
        for dim in dimensions {
            let blender_alias = dim.alias();
            let base_dim = base_leaf
                .dimensions
                .iter()
                .find(|(a, _)| *a == blender_alias);
            let join_dim = leaf.dimensions.iter().find(|(a, _)| *a == blender_alias);
            if let (Some((_, base_dim)), Some((_, join_dim))) = (base_dim, join_dim) {
                let equality = table_col(
                    &base_leaf.subquery_alias,
                    &alias_selector(&base_dim.alias()),
                )
                .eq(table_col(
                    &leaf.subquery_alias,
                    &alias_selector(&join_dim.alias()),
                ));
                criterion = Some(match criterion {
                    Some(existing) => existing.and(equality),
                    None => equality,
                });
            }
        }

        query = match criterion {
            Some(on) => query.left_join(
                Relation::subquery(subquery.clone(), &leaf.subquery_alias),
                on,
            ),
            None => query.cross_join(Relation::subquery(subquery.clone(), &leaf.subquery_alias)),
        };
    }

    // Blended projection: dimensions in order, then metrics.
    let suffix = group
        .map(|g| format!("_{}", g.alias()))
        .unwrap_or_default();

    let mut select: Vec<SelectExpr> = vec![];
    let mut selected_aliases: Vec<String> = vec![];
    for dim in dimensions {
        let blender_alias = dim.alias();
        if selected_aliases.contains(&blender_alias) {
            continue;
        }
        let provider = provider_for(&subqueries, leaves, base_index, |leaf| {
            leaf.dimensions
                .iter()
                .find(|(a, _)| *a == blender_alias)
                .map(|(_, d)| alias_selector(&d.alias()))
        });
        if let Some((subquery_alias, column)) = provider {
            select.push(
                SelectExpr::new(table_col(&subquery_alias, &column))
                    .with_alias(&alias_selector(&blender_alias)),
            );
            selected_aliases.push(blender_alias);
        }
    }

    for metric in request.metrics {
        let metric_alias = format!("{}{}", metric.alias, suffix);
        if selected_aliases.contains(&metric_alias) {
            continue;
        }
        let direct = provider_for(&subqueries, leaves, base_index, |leaf| {
            leaf.metrics
                .iter()
                .find(|m| m.alias == metric.alias)
                .filter(|_| {
                    // Only when the blender field wraps this dataset field.
                    leaf.dataset.fields.contains_alias(&metric.alias)
                })
                .map(|m| alias_selector(&format!("{}{}", m.alias, suffix)))
        });

        let expression = match direct {
            Some((subquery_alias, column)) => table_col(&subquery_alias, &column),
            None => retarget_complex_metric(&metric.definition, &subqueries, leaves, &suffix),
        };
        select.push(SelectExpr::new(expression).with_alias(&alias_selector(&metric_alias)));
        selected_aliases.push(metric_alias);
    }

    // Ordering at the outer query: explicit orders on projected aliases,
    // defaulting to the dimensions in request order.
    let mut order_exprs: Vec<OrderByExpr> = vec![];
    if request.orders.is_empty() {
        for dim in dimensions {
            let selector = alias_selector(&dim.alias());
            if selected_aliases.contains(&dim.alias()) {
                order_exprs.push(OrderByExpr::new(col(&selector)));
            }
        }
    } else {
        for (field, dir) in request.orders {
            let term = col(&alias_selector(&field.alias));
            order_exprs.push(match dir {
                Some(SortDir::Asc) => OrderByExpr::asc(term),
                Some(SortDir::Desc) => OrderByExpr::desc(term),
                None => OrderByExpr::new(term),
            });
        }
    }

    Ok(query.select(select).order_by(order_exprs))
}

/// The first subquery (base first) able to provide a column.
fn provider_for(
    subqueries: &[Option<Query>],
    leaves: &[TranslatedLeaf],
    base_index: usize,
    provides: impl Fn(&TranslatedLeaf) -> Option<String>,
) -> Option<(String, String)> {
    let mut order: Vec<usize> = vec![base_index];
    order.extend((0..leaves.len()).filter(|&i| i != base_index));

    for leaf_index in order {
        if subqueries[leaf_index].is_none() {
            continue;
        }
        if let Some(column) = provides(&leaves[leaf_index]) {
            return Some((leaves[leaf_index].subquery_alias.clone(), column));
        }
    }
    None
}

/// Deep-copy a complex metric expression, substituting each leaf dataset
/// field with a reference into the subquery that provides it.
fn retarget_complex_metric(
    definition: &Expr,
    subqueries: &[Option<Query>],
    leaves: &[TranslatedLeaf],
    suffix: &str,
) -> Expr {
    let mut expression = definition.clone();
    for (leaf_index, leaf) in leaves.iter().enumerate() {
        if subqueries[leaf_index].is_none() {
            continue;
        }
        for metric in &leaf.metrics {
            let replacement = table_col(
                &leaf.subquery_alias,
                &alias_selector(&format!("{}{}", metric.alias, suffix)),
            );
            expression = expression.substitute(&metric.definition, &replacement);
        }
    }
    expression
}
