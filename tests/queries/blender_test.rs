//! Tests for the blender planner: per-dataset subqueries, dimension-
//! aligned joins and blended projections.

use std::sync::Arc;

use fireant::database::testing::TestDatabase;
use fireant::model::{day_over_day, DataSet, DataSetBlender, DataType, Field};
use fireant::sql::expr::{col, sum, ExprExt};
use fireant::sql::test_utils::validate_sql;
use fireant::sql::Dialect;
use fireant::sql::TableRef;
use fireant::widgets::Widget;

fn clicks_dataset() -> DataSet {
    let database = Arc::new(TestDatabase::new());
    DataSet::new(TableRef::new("clicks"), database)
        .with_fields(vec![
            Field::new("date", col("date"), DataType::Date),
            Field::new("clicks", sum(col("clicks")), DataType::Number),
        ])
        .unwrap()
}

fn impressions_dataset() -> DataSet {
    let database = Arc::new(TestDatabase::new());
    DataSet::new(TableRef::new("impressions"), database)
        .with_fields(vec![
            Field::new("day", col("day"), DataType::Date),
            Field::new("impressions", sum(col("impressions")), DataType::Number),
        ])
        .unwrap()
}

fn blended_with_ctr() -> DataSetBlender {
    let primary = clicks_dataset();
    let secondary = impressions_dataset();
    let date = Arc::clone(primary.fields.get("date").unwrap());
    let day = Arc::clone(secondary.fields.get("day").unwrap());
    let blender = primary.blend(&secondary).on(vec![(&date, &day)]).unwrap();

    let clicks = Arc::clone(blender.fields.get("clicks").unwrap());
    let impressions = Arc::clone(blender.fields.get("impressions").unwrap());
    blender
        .with_field(Field::new(
            "ctr",
            clicks.expr().div(impressions.expr()),
            DataType::Number,
        ))
        .unwrap()
}

#[test]
fn test_blended_query_with_complex_metric() {
    let blender = blended_with_ctr();
    let date = Arc::clone(blender.fields.get("date").unwrap());
    let ctr = Arc::clone(blender.fields.get("ctr").unwrap());

    let sql = blender
        .query()
        .widget(Widget::new().item(&ctr))
        .dimension(&date)
        .sql()
        .unwrap();

    assert_eq!(sql.len(), 1);
    assert_eq!(
        sql[0],
        "SELECT \"sq0\".\"$date\" AS \"$date\",\
         \"sq0\".\"$clicks\"/\"sq1\".\"$impressions\" AS \"$ctr\" \
         FROM (SELECT \"date\" AS \"$date\",SUM(\"clicks\") AS \"$clicks\" \
         FROM \"clicks\" GROUP BY \"date\") AS \"sq0\" \
         LEFT JOIN (SELECT \"day\" AS \"$day\",SUM(\"impressions\") AS \"$impressions\" \
         FROM \"impressions\" GROUP BY \"day\") AS \"sq1\" \
         ON \"sq0\".\"$date\"=\"sq1\".\"$day\" \
         ORDER BY \"$date\""
    );
    validate_sql(&sql[0], Dialect::DuckDb).unwrap();
}

#[test]
fn test_blended_query_with_simple_metrics_from_both_sides() {
    let blender = blended_with_ctr();
    let date = Arc::clone(blender.fields.get("date").unwrap());
    let clicks = Arc::clone(blender.fields.get("clicks").unwrap());
    let impressions = Arc::clone(blender.fields.get("impressions").unwrap());

    let sql = blender
        .query()
        .widget(Widget::new().item(&clicks).item(&impressions))
        .dimension(&date)
        .sql()
        .unwrap();

    assert!(sql[0].contains("\"sq0\".\"$clicks\" AS \"$clicks\""));
    assert!(sql[0].contains("\"sq1\".\"$impressions\" AS \"$impressions\""));
    validate_sql(&sql[0], Dialect::DuckDb).unwrap();
}

#[test]
fn test_blended_filters_are_translated_per_dataset() {
    let blender = blended_with_ctr();
    let date = Arc::clone(blender.fields.get("date").unwrap());
    let ctr = Arc::clone(blender.fields.get("ctr").unwrap());

    let sql = blender
        .query()
        .widget(Widget::new().item(&ctr))
        .dimension(&date)
        .filter(date.ge("2019-01-01").unwrap())
        .sql()
        .unwrap();

    assert!(sql[0].contains("FROM \"clicks\" WHERE \"date\">='2019-01-01'"));
    assert!(sql[0].contains("FROM \"impressions\" WHERE \"day\">='2019-01-01'"));
}

#[test]
fn test_blended_reference_suffixes_metrics_in_all_layers() {
    let blender = blended_with_ctr();
    let date = Arc::clone(blender.fields.get("date").unwrap());
    let ctr = Arc::clone(blender.fields.get("ctr").unwrap());

    let sql = blender
        .query()
        .widget(Widget::new().item(&ctr))
        .dimension(&date)
        .reference(day_over_day(&date))
        .sql()
        .unwrap();

    assert_eq!(sql.len(), 2);
    // The offset query shifts both subqueries' date dimensions and
    // carries the reference alias through to the blended projection.
    assert!(sql[1].contains("\"date\"+INTERVAL '1 day' AS \"$date\""));
    assert!(sql[1].contains("\"day\"+INTERVAL '1 day' AS \"$day\""));
    assert!(sql[1].contains(
        "\"sq0\".\"$clicks_dod\"/\"sq1\".\"$impressions_dod\" AS \"$ctr_dod\""
    ));
    validate_sql(&sql[1], Dialect::DuckDb).unwrap();
}

#[test]
fn test_cross_join_when_no_mapped_dimension_is_shared() {
    let blender = blended_with_ctr();
    let ctr = Arc::clone(blender.fields.get("ctr").unwrap());

    let sql = blender
        .query()
        .widget(Widget::new().item(&ctr))
        .sql()
        .unwrap();

    assert!(sql[0].contains("CROSS JOIN"));
    validate_sql(&sql[0], Dialect::DuckDb).unwrap();
}

#[test]
fn test_chained_blender_flattens_three_datasets() {
    let conversions = {
        let database = Arc::new(TestDatabase::new());
        DataSet::new(TableRef::new("conversions"), database)
            .with_fields(vec![
                Field::new("date", col("date"), DataType::Date),
                Field::new("conversions", sum(col("conversions")), DataType::Number),
            ])
            .unwrap()
    };

    let blender = blended_with_ctr();
    let date = Arc::clone(blender.fields.get("date").unwrap());
    let conv_date = Arc::clone(conversions.fields.get("date").unwrap());
    let chained = blender
        .blend(&conversions)
        .on(vec![(&date, &conv_date)])
        .unwrap();

    let clicks = Arc::clone(chained.fields.get("clicks").unwrap());
    let conversions_metric = Arc::clone(chained.fields.get("conversions").unwrap());

    let sql = chained
        .query()
        .widget(Widget::new().item(&clicks).item(&conversions_metric))
        .dimension(&date)
        .sql()
        .unwrap();

    assert!(sql[0].contains("AS \"sq0\""));
    assert!(sql[0].contains("AS \"sq1\""));
    assert!(sql[0].contains("AS \"sq2\""));
    assert!(sql[0].contains("\"sq0\".\"$date\"=\"sq2\".\"$date\""));
    validate_sql(&sql[0], Dialect::DuckDb).unwrap();
}

#[test]
fn test_dataset_contributing_nothing_is_skipped() {
    let blender = blended_with_ctr();
    let clicks = Arc::clone(blender.fields.get("clicks").unwrap());

    // Only a primary-side metric and no dimensions: the secondary has
    // neither metrics nor dimensions left and is dropped from the plan.
    let sql = blender
        .query()
        .widget(Widget::new().item(&clicks))
        .sql()
        .unwrap();

    assert!(sql[0].contains("\"sq0\""));
    assert!(!sql[0].contains("\"sq1\""));
    assert!(!sql[0].contains("JOIN"));
    validate_sql(&sql[0], Dialect::DuckDb).unwrap();
}
