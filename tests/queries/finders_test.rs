//! Tests for the request finders through the public API.

use fireant::error::QueryError;
use fireant::model::{
    day_over_day, rollup, share, week_over_week, DataType, Dimension, Field, Join, Operation,
};
use fireant::queries::finders::{
    find_filters_for_totals, find_joins, find_reference_groups, find_share_dimensions,
    find_totals_dimensions,
};
use fireant::model::RequestFilter;
use fireant::sql::expr::{col, sum, table_col, Expr, ExprExt};
use fireant::sql::{JoinType, TableRef};

fn join(table: &str, criterion: Expr) -> Join {
    Join::new(TableRef::new(table), criterion, JoinType::Inner)
}

#[test]
fn test_joins_resolved_transitively_in_dependency_order() {
    // `district` is only reachable through `politician`.
    let joins = vec![
        join(
            "district",
            table_col("politician", "district_id").eq(table_col("district", "id")),
        ),
        join(
            "politician",
            table_col("politics", "politician_id").eq(table_col("politician", "id")),
        ),
    ];

    let needed = table_col("district", "name");
    let found = find_joins(&joins, "politics", &[&needed]).unwrap();
    let tables: Vec<&str> = found.iter().map(|j| j.table.table.as_str()).collect();
    assert_eq!(tables, vec!["politician", "district"]);
}

#[test]
fn test_missing_join_is_an_error() {
    let needed = table_col("orphan", "x");
    assert_eq!(
        find_joins(&[], "politics", &[&needed]).unwrap_err(),
        QueryError::MissingJoin {
            table: "orphan".into()
        }
    );
}

#[test]
fn test_circular_join_is_an_error() {
    let joins = vec![
        join("a", table_col("b", "k").eq(table_col("a", "k"))),
        join("b", table_col("a", "k").eq(table_col("b", "k"))),
    ];
    let needed = table_col("a", "x");
    assert!(matches!(
        find_joins(&joins, "base", &[&needed]).unwrap_err(),
        QueryError::CircularJoin { .. }
    ));
}

#[test]
fn test_reference_groups_share_offset_queries() {
    let timestamp = Field::new("timestamp", col("timestamp"), DataType::Date).shared();

    // WoW value, WoW delta and WoW delta-percent share one group; DoD
    // gets its own. Insertion order is preserved.
    let references = vec![
        week_over_week(&timestamp),
        day_over_day(&timestamp),
        week_over_week(&timestamp).delta(),
        week_over_week(&timestamp).delta_percent(),
    ];
    let groups = find_reference_groups(&references);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].alias(), "wow");
    assert_eq!(groups[0].references.len(), 3);
    assert_eq!(groups[1].alias(), "dod");
    assert_eq!(groups[1].references.len(), 1);
}

#[test]
fn test_totals_dimensions_from_rollup_and_share() {
    let timestamp = Field::new("timestamp", col("timestamp"), DataType::Date).shared();
    let party = Field::new("political_party", col("political_party"), DataType::Text).shared();
    let votes = Field::new("votes", sum(col("votes")), DataType::Number).shared();

    let dimensions = vec![rollup(&timestamp), Dimension::from(&party)];
    let share_op: Operation = share(&votes, Some(&party));
    let operations = vec![&share_op];

    let share_dims = find_share_dimensions(&dimensions, &operations);
    assert_eq!(share_dims.len(), 1);
    assert_eq!(share_dims[0].alias(), "political_party");

    let totals = find_totals_dimensions(&dimensions, &share_dims);
    assert_eq!(totals, vec!["timestamp", "political_party"]);
}

#[test]
fn test_filters_for_totals() {
    let party = Field::new("political_party", col("political_party"), DataType::Text).shared();
    let votes = Field::new("votes", sum(col("votes")), DataType::Number).shared();

    let filters = vec![
        RequestFilter::new(party.eq("d")),
        RequestFilter::omit_from_rollup(party.ne("i")),
        RequestFilter::new(votes.gt(100).unwrap()),
    ];

    let for_totals = find_filters_for_totals(&filters);
    assert_eq!(for_totals.len(), 1);
    assert_eq!(for_totals[0].field_alias, "political_party");
}
