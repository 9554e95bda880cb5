//! Tests for the SQL query builder and dialect rendering.

use fireant::sql::expr::{col, sum, table_col, ExprExt};
use fireant::sql::test_utils::validate_sql;
use fireant::sql::{Dialect, OrderByExpr, Query, Relation, TableRef};

#[test]
fn test_select_group_order() {
    let query = Query::new()
        .select(vec![
            col("timestamp").as_("$timestamp"),
            sum(col("votes")).as_("$votes"),
        ])
        .from(TableRef::new("politics"))
        .group_by(vec![col("timestamp")])
        .order_by(vec![OrderByExpr::new(col("$timestamp"))]);

    let sql = query.to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "SELECT \"timestamp\" AS \"$timestamp\",SUM(\"votes\") AS \"$votes\" \
         FROM \"politics\" GROUP BY \"timestamp\" ORDER BY \"$timestamp\""
    );
    validate_sql(&sql, Dialect::DuckDb).unwrap();
}

#[test]
fn test_where_accumulates_with_and() {
    let query = Query::new()
        .select(vec![col("candidate")])
        .from(TableRef::new("politics"))
        .filter(col("political_party").eq("d"))
        .filter(col("state").ne("TX"));

    let sql = query.to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "SELECT \"candidate\" FROM \"politics\" \
         WHERE \"political_party\"='d' AND \"state\"<>'TX'"
    );
    validate_sql(&sql, Dialect::DuckDb).unwrap();
}

#[test]
fn test_having_for_aggregate_criteria() {
    let query = Query::new()
        .select(vec![sum(col("votes")).as_("$votes")])
        .from(TableRef::new("politics"))
        .having(sum(col("votes")).gt(100_000));

    let sql = query.to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "SELECT SUM(\"votes\") AS \"$votes\" FROM \"politics\" HAVING SUM(\"votes\")>100000"
    );
    validate_sql(&sql, Dialect::DuckDb).unwrap();
}

#[test]
fn test_subquery_relations_join() {
    let clicks = Query::new()
        .select(vec![col("date").as_("$date")])
        .from(TableRef::new("clicks"));
    let impressions = Query::new()
        .select(vec![col("day").as_("$day")])
        .from(TableRef::new("impressions"));

    let query = Query::new()
        .select(vec![table_col("sq0", "$date").as_("$date")])
        .from(Relation::subquery(clicks, "sq0"))
        .left_join(
            Relation::subquery(impressions, "sq1"),
            table_col("sq0", "$date").eq(table_col("sq1", "$day")),
        );

    let sql = query.to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "SELECT \"sq0\".\"$date\" AS \"$date\" \
         FROM (SELECT \"date\" AS \"$date\" FROM \"clicks\") AS \"sq0\" \
         LEFT JOIN (SELECT \"day\" AS \"$day\" FROM \"impressions\") AS \"sq1\" \
         ON \"sq0\".\"$date\"=\"sq1\".\"$day\""
    );
    validate_sql(&sql, Dialect::DuckDb).unwrap();
}

#[test]
fn test_limit_offset_and_hint() {
    let query = Query::new()
        .select(vec![col("candidate")])
        .from(TableRef::new("politics"))
        .limit(10)
        .offset(20)
        .hint("dashboard");

    assert_eq!(
        query.to_sql(Dialect::DuckDb),
        "SELECT /*+label(dashboard)*/ \"candidate\" FROM \"politics\" LIMIT 10 OFFSET 20"
    );
}

#[test]
fn test_mysql_quoting() {
    let query = Query::new()
        .select(vec![col("votes")])
        .from(TableRef::new("politics"));
    assert_eq!(
        query.to_sql(Dialect::MySql),
        "SELECT `votes` FROM `politics`"
    );
}

#[test]
fn test_emitted_sql_parses_for_shipped_dialects() {
    let query = Query::new()
        .select(vec![
            col("timestamp").as_("$timestamp"),
            sum(col("votes")).as_("$votes"),
        ])
        .from(TableRef::new("politics").with_schema("public"))
        .filter(col("political_party").isin(vec!["d".into(), "r".into()]))
        .group_by(vec![col("timestamp")])
        .limit(50);

    for dialect in [Dialect::DuckDb, Dialect::Postgres, Dialect::MySql] {
        validate_sql(&query.to_sql(dialect), dialect).unwrap();
    }
}
