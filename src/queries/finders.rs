//! Finders: pure functions deriving plan inputs from request inputs.
//!
//! Required joins are discovered transitively from the tables referenced
//! by the request's expressions and ordered by dependency; references are
//! grouped by their offset; totals and share dimensions are collected for
//! the planner's rollup axis.

use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{QueryError, QueryResult};
use crate::model::{
    Dimension, Field, Filter, Join, Operation, Reference, ReferenceGroup, RequestFilter,
};
use crate::sql::Expr;

/// Tables referenced by the given expressions, base table excluded,
/// in first-appearance order.
pub fn find_required_tables(exprs: &[&Expr], base_table: &str) -> Vec<String> {
    let mut tables = vec![];
    for expr in exprs {
        for table in expr.referenced_tables() {
            if table != base_table && !tables.contains(&table) {
                tables.push(table);
            }
        }
    }
    tables
}

/// The joins a query needs for the given expressions, ordered so that
/// every join's dependencies are joined before it.
///
/// Fails with *missing-join* when a referenced table has no declared
/// join, and *circular-join* when join dependencies form a cycle.
pub fn find_joins(
    joins: &[Join],
    base_table: &str,
    exprs: &[&Expr],
) -> QueryResult<Vec<Join>> {
    let mut required = find_required_tables(exprs, base_table);

    // Transitive closure: a join's criterion may pull in further tables.
    let mut cursor = 0;
    while cursor < required.len() {
        let table = required[cursor].clone();
        let join = joins
            .iter()
            .find(|j| j.table.table == table)
            .ok_or_else(|| QueryError::MissingJoin {
                table: table.clone(),
            })?;
        for dependency in join.dependencies() {
            if dependency != base_table && !required.contains(&dependency) {
                required.push(dependency);
            }
        }
        cursor += 1;
    }

    if required.is_empty() {
        return Ok(vec![]);
    }

    // Dependency graph: edge dep -> table means dep joins first.
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let node_indices: Vec<(String, NodeIndex)> = required
        .iter()
        .map(|t| (t.clone(), graph.add_node(t.clone())))
        .collect();
    let index_of = |table: &str| {
        node_indices
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, idx)| *idx)
    };

    for table in &required {
        let join = joins
            .iter()
            .find(|j| &j.table.table == table)
            .ok_or_else(|| QueryError::MissingJoin {
                table: table.clone(),
            })?;
        for dependency in join.dependencies() {
            if let (Some(from), Some(to)) = (index_of(&dependency), index_of(table)) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let order = toposort(&graph, None).map_err(|_| QueryError::CircularJoin {
        tables: required.clone(),
    })?;

    let mut result = vec![];
    for node in order {
        let table = &graph[node];
        if let Some(join) = joins.iter().find(|j| &j.table.table == table) {
            result.push(join.clone());
        }
    }
    Ok(result)
}

/// Group references by `(dimension, date part, interval)`, preserving
/// insertion order. One offset query covers every reference in a group.
pub fn find_reference_groups(references: &[Reference]) -> Vec<ReferenceGroup> {
    let mut groups: Vec<ReferenceGroup> = vec![];
    for reference in references {
        let key = reference.group_key();
        match groups.iter_mut().find(|g| {
            (g.field.alias.clone(), g.date_part, g.interval) == key
        }) {
            Some(group) => group.references.push(reference.clone()),
            None => groups.push(ReferenceGroup {
                field: Arc::clone(&reference.field),
                date_part: reference.reference_type.date_part,
                interval: reference.reference_type.interval,
                references: vec![reference.clone()],
            }),
        }
    }
    groups
}

/// Dimensions referenced as the share basis of an operation.
pub fn find_share_dimensions<'a>(
    dimensions: &'a [Dimension],
    operations: &[&Operation],
) -> Vec<&'a Dimension> {
    let over_fields: Vec<&Arc<Field>> = operations
        .iter()
        .filter_map(|op| op.share_over())
        .collect();
    dimensions
        .iter()
        .filter(|dim| {
            over_fields
                .iter()
                .any(|over| over.alias == dim.underlying_field().alias)
        })
        .collect()
}

/// Aliases of the dimensions that span the totals-rollup axis: rollup
/// dimensions plus share bases, in request order.
pub fn find_totals_dimensions(
    dimensions: &[Dimension],
    share_dimensions: &[&Dimension],
) -> Vec<String> {
    let share_aliases: Vec<String> = share_dimensions.iter().map(|d| d.alias()).collect();
    dimensions
        .iter()
        .filter(|dim| dim.is_rollup() || share_aliases.contains(&dim.alias()))
        .map(|dim| dim.alias())
        .collect()
}

/// The filters applied to totals queries: neither omitted from rollup
/// nor aggregate.
pub fn find_filters_for_totals(filters: &[RequestFilter]) -> Vec<Filter> {
    filters
        .iter()
        .filter(|rf| rf.apply_to_totals && !rf.filter.aggregate)
        .map(|rf| rf.filter.clone())
        .collect()
}
