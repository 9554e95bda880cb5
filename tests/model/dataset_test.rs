//! Tests for dataset construction, request validation and the auxiliary
//! choices/latest builders.

use std::sync::Arc;

use fireant::database::testing::TestDatabase;
use fireant::error::QueryError;
use fireant::model::{DataSet, DataType, Field};
use fireant::sql::expr::{col, sum, table_col, ExprExt};
use fireant::sql::{Dialect, JoinType, TableRef};
use fireant::widgets::Widget;

fn politics(database: Arc<TestDatabase>) -> DataSet {
    DataSet::new(TableRef::new("politics"), database)
        .with_joins(vec![fireant::model::Join::new(
            TableRef::new("state"),
            table_col("politics", "state_id").eq(table_col("state", "id")),
            JoinType::Inner,
        )])
        .with_fields(vec![
            Field::new("timestamp", table_col("politics", "timestamp"), DataType::Date),
            Field::new(
                "political_party",
                table_col("politics", "political_party"),
                DataType::Text,
            ),
            Field::new("state", table_col("state", "name"), DataType::Text),
            Field::new(
                "votes",
                sum(table_col("politics", "votes")),
                DataType::Number,
            ),
            Field::new("wins", sum(table_col("politics", "is_winner")), DataType::Number),
        ])
        .unwrap()
}

#[test]
fn test_invalid_fields_listed() {
    let database = Arc::new(TestDatabase::new());
    let dataset = politics(Arc::clone(&database));

    let foreign = Field::new("intruder", col("intruder"), DataType::Text).shared();
    let result = dataset
        .query()
        .widget(Widget::new().item(&Arc::clone(dataset.fields.get("votes").unwrap())))
        .dimension(&foreign)
        .fetch();

    assert_eq!(
        result.unwrap_err(),
        QueryError::InvalidFields {
            aliases: vec!["intruder".into()]
        }
    );
}

#[test]
fn test_widget_without_items_requires_metric() {
    let database = Arc::new(TestDatabase::new());
    let dataset = politics(database);
    let result = dataset.query().widget(Widget::new()).fetch();
    assert_eq!(result.unwrap_err(), QueryError::MetricRequired);
}

#[test]
fn test_builder_clones_do_not_mutate_origin() {
    let database = Arc::new(TestDatabase::new());
    let dataset = politics(Arc::clone(&database));
    let party = Arc::clone(dataset.fields.get("political_party").unwrap());
    let votes = Arc::clone(dataset.fields.get("votes").unwrap());

    let base = dataset.query().widget(Widget::new().item(&votes));
    let with_dim = base.clone().dimension(&party);
    let without_dim = base;

    let sql_with = with_dim.sql().unwrap();
    let sql_without = without_dim.sql().unwrap();
    assert_ne!(sql_with, sql_without);
    assert!(sql_with[0].contains("$political_party"));
    assert!(!sql_without[0].contains("$political_party"));
}

#[test]
fn test_always_query_all_metrics() {
    let database = Arc::new(TestDatabase::new());
    let dataset = politics(Arc::clone(&database)).with_always_query_all_metrics(true);
    let votes = Arc::clone(dataset.fields.get("votes").unwrap());

    let sql = dataset
        .query()
        .widget(Widget::new().item(&votes))
        .sql()
        .unwrap();
    assert!(sql[0].contains("$votes"));
    assert!(sql[0].contains("$wins"));
}

#[test]
fn test_annotation_is_carried_as_data() {
    let database = Arc::new(TestDatabase::new());
    let dataset = politics(database).with_annotation(fireant::model::Annotation {
        table: TableRef::new("annotations"),
        alignment_field_alias: "timestamp".into(),
        annotation_field_alias: "note".into(),
    });
    assert_eq!(
        dataset.annotation.as_ref().unwrap().alignment_field_alias,
        "timestamp"
    );
}

#[test]
fn test_choices_query_shape() {
    let database = Arc::new(TestDatabase::new());
    let dataset = politics(Arc::clone(&database));
    let state = Arc::clone(dataset.fields.get("state").unwrap());
    let party = Arc::clone(dataset.fields.get("political_party").unwrap());

    let queries = dataset
        .choices(&state)
        .filter(party.eq("d"))
        .queries()
        .unwrap();
    assert_eq!(
        queries[0].to_sql(Dialect::DuckDb),
        "SELECT DISTINCT \"state\".\"name\" AS \"$state\" FROM \"politics\" \
         INNER JOIN \"state\" ON \"politics\".\"state_id\"=\"state\".\"id\" \
         WHERE \"politics\".\"political_party\"='d'"
    );
}

#[test]
fn test_latest_query_shape_and_empty_error() {
    let database = Arc::new(TestDatabase::new());
    let dataset = politics(Arc::clone(&database));
    let timestamp = Arc::clone(dataset.fields.get("timestamp").unwrap());

    let queries = dataset.latest(&[&timestamp]).queries().unwrap();
    assert_eq!(
        queries[0].to_sql(Dialect::DuckDb),
        "SELECT MAX(\"politics\".\"timestamp\") AS \"$timestamp\" FROM \"politics\""
    );

    let err = dataset.latest(&[]).queries().unwrap_err();
    assert_eq!(err, QueryError::EmptyQuery);
}
