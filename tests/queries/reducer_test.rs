//! Tests for the result reducer: reference deltas, totals markers,
//! window concatenation and index ordering.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use fireant::database::testing::TestDatabase;
use fireant::frame::{Column, DataFrame, Value, ROLLUP_VALUE, TEXT_TOTALS};
use fireant::model::{day_over_day, rollup, DataSet, DataType, Dimension, Field};
use fireant::queries::reduce_result_set;
use fireant::sql::expr::{col, sum};
use fireant::sql::TableRef;
use fireant::widgets::Widget;

fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 1, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn timestamp_field() -> Arc<Field> {
    Field::new("timestamp", col("timestamp"), DataType::Date).shared()
}

fn party_field() -> Arc<Field> {
    Field::new("political_party", col("political_party"), DataType::Text).shared()
}

fn votes_frame(columns: Vec<Column>) -> DataFrame {
    DataFrame::from_columns(columns).unwrap()
}

#[test]
fn test_base_with_rollup_materializes_totals_rows() {
    let dimensions = vec![
        Dimension::from(&timestamp_field()),
        rollup(&party_field()),
    ];

    let base = votes_frame(vec![
        Column::new(
            "$timestamp",
            vec![ts(1).into(), ts(1).into(), ts(2).into(), ts(2).into()],
        ),
        Column::new(
            "$political_party",
            vec!["d".into(), "r".into(), "d".into(), "r".into()],
        ),
        Column::new("$votes", vec![1.into(), 2.into(), 3.into(), 4.into()]),
    ]);
    let totals = votes_frame(vec![
        Column::new("$timestamp", vec![ts(1).into(), ts(2).into()]),
        Column::new(
            "$political_party",
            vec![ROLLUP_VALUE.into(), ROLLUP_VALUE.into()],
        ),
        Column::new("$votes", vec![3.into(), 7.into()]),
    ]);

    let reduced = reduce_result_set(vec![base, totals], &[], &dimensions).unwrap();

    assert_eq!(reduced.nrows(), 6);
    // Totals rows interleave after their timestamp's party rows.
    assert_eq!(
        reduced.index()[2],
        vec![Value::Timestamp(ts(1)), Value::Text(TEXT_TOTALS.into())]
    );
    assert_eq!(
        reduced.index()[5],
        vec![Value::Timestamp(ts(2)), Value::Text(TEXT_TOTALS.into())]
    );
    let votes: Vec<&Value> = (0..6)
        .map(|row| reduced.get(row, "$votes").unwrap())
        .collect();
    assert_eq!(
        votes,
        vec![
            &Value::Int(1),
            &Value::Int(2),
            &Value::Int(3),
            &Value::Int(3),
            &Value::Int(4),
            &Value::Int(7)
        ]
    );
}

#[test]
fn test_day_over_day_reference_with_delta_percent() {
    let timestamp = timestamp_field();
    let dimensions = vec![Dimension::from(&timestamp)];
    let references = vec![
        day_over_day(&timestamp),
        day_over_day(&timestamp).delta_percent(),
    ];
    let groups = fireant::queries::finders::find_reference_groups(&references);

    let base = votes_frame(vec![
        Column::new("$timestamp", vec![ts(2).into(), ts(3).into()]),
        Column::new("$votes", vec![1.into(), 2.into()]),
    ]);
    let reference = votes_frame(vec![
        Column::new("$timestamp", vec![ts(2).into(), ts(3).into()]),
        Column::new("$votes_dod", vec![2.into(), 0.into()]),
    ]);

    let reduced = reduce_result_set(vec![base, reference], &groups, &dimensions).unwrap();

    assert_eq!(reduced.nrows(), 2);
    assert_eq!(reduced.get(0, "$votes"), Some(&Value::Int(1)));
    assert_eq!(reduced.get(0, "$votes_dod"), Some(&Value::Int(2)));
    assert_eq!(
        reduced.get(0, "$votes_dod_delta_percent"),
        Some(&Value::Float(-50.0))
    );
    assert_eq!(reduced.get(1, "$votes_dod"), Some(&Value::Int(0)));
    assert!(matches!(
        reduced.get(1, "$votes_dod_delta_percent"),
        Some(Value::Float(f)) if f.is_nan()
    ));
}

#[test]
fn test_non_aligned_reference_with_delta_fills_zero() {
    let timestamp = timestamp_field();
    let dimensions = vec![Dimension::from(&timestamp)];
    let references = vec![day_over_day(&timestamp).delta()];
    let groups = fireant::queries::finders::find_reference_groups(&references);

    let base = votes_frame(vec![
        Column::new("$timestamp", vec![ts(2).into(), ts(3).into()]),
        Column::new("$votes", vec![1.into(), 2.into()]),
    ]);
    let reference = votes_frame(vec![
        Column::new("$timestamp", vec![ts(2).into()]),
        Column::new("$votes_dod", vec![2.into()]),
    ]);

    let reduced = reduce_result_set(vec![base, reference], &groups, &dimensions).unwrap();

    // The raw reference column keeps its missing value; the delta fills
    // the missing side with zero.
    assert_eq!(reduced.get(1, "$votes_dod"), Some(&Value::Null));
    assert_eq!(
        reduced.get(0, "$votes_dod_delta"),
        Some(&Value::Float(-1.0))
    );
    assert_eq!(reduced.get(1, "$votes_dod_delta"), Some(&Value::Float(2.0)));
}

#[test]
fn test_one_row_per_dimension_combination() {
    let dimensions = vec![
        Dimension::from(&timestamp_field()),
        rollup(&party_field()),
    ];

    let base = votes_frame(vec![
        Column::new("$timestamp", vec![ts(1).into(), ts(1).into()]),
        Column::new("$political_party", vec!["d".into(), "r".into()]),
        Column::new("$votes", vec![1.into(), 2.into()]),
    ]);
    let totals = votes_frame(vec![
        Column::new("$timestamp", vec![ts(1).into()]),
        Column::new("$political_party", vec![ROLLUP_VALUE.into()]),
        Column::new("$votes", vec![3.into()]),
    ]);

    let reduced = reduce_result_set(vec![base, totals], &[], &dimensions).unwrap();

    let mut seen = std::collections::HashSet::new();
    for tuple in reduced.index() {
        assert!(seen.insert(tuple.clone()), "duplicate index tuple");
    }
}

#[test]
fn test_end_to_end_fetch_reduces_rollup_request() {
    let raw_base = votes_frame(vec![
        Column::new(
            "$timestamp",
            vec!["2019-01-01".into(), "2019-01-01".into()],
        ),
        Column::new("$political_party", vec!["d".into(), "r".into()]),
        Column::new("$votes", vec![1.into(), 2.into()]),
    ]);
    let raw_totals = votes_frame(vec![
        Column::new("$timestamp", vec!["2019-01-01".into()]),
        Column::new("$political_party", vec![ROLLUP_VALUE.into()]),
        Column::new("$votes", vec![3.into()]),
    ]);

    let database = Arc::new(
        TestDatabase::new().with_frames(vec![raw_base, raw_totals]),
    );
    let dataset = DataSet::new(TableRef::new("politics"), database.clone())
        .with_fields(vec![
            Field::new("timestamp", col("timestamp"), DataType::Date),
            Field::new("political_party", col("political_party"), DataType::Text),
            Field::new("votes", sum(col("votes")), DataType::Number),
        ])
        .unwrap();

    let timestamp = Arc::clone(dataset.fields.get("timestamp").unwrap());
    let party = Arc::clone(dataset.fields.get("political_party").unwrap());
    let votes = Arc::clone(dataset.fields.get("votes").unwrap());

    let frame = dataset
        .query()
        .widget(Widget::new().item(&votes))
        .dimension(&timestamp)
        .dimension(rollup(&party))
        .fetch()
        .unwrap();

    assert_eq!(database.captured_queries().len(), 2);
    assert_eq!(frame.nrows(), 3);
    assert_eq!(
        frame.index()[2],
        vec![Value::Timestamp(ts(1)), Value::Text(TEXT_TOTALS.into())]
    );
    assert_eq!(frame.get(2, "$votes"), Some(&Value::Int(3)));
}
