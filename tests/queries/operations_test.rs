//! Tests for post-reduction operations: cumulative, rolling and share.

use std::sync::Arc;

use fireant::database::testing::TestDatabase;
use fireant::frame::{Column, DataFrame, Value, ROLLUP_VALUE, TEXT_TOTALS};
use fireant::model::{cummean, cumsum, rolling_mean, share, DataSet, DataType, Field};
use fireant::sql::expr::{col, sum};
use fireant::sql::TableRef;
use fireant::widgets::Widget;

fn votes_field() -> Arc<Field> {
    Field::new("votes", sum(col("votes")), DataType::Number).shared()
}

fn single_index_frame(values: Vec<i64>) -> DataFrame {
    let n = values.len();
    let mut frame = DataFrame::from_columns(vec![
        Column::new(
            "$timestamp",
            (0..n as i64).map(Value::Int).collect(),
        ),
        Column::new("$votes", values.into_iter().map(Value::Int).collect()),
    ])
    .unwrap();
    frame.set_index(&["$timestamp".into()]).unwrap();
    frame
}

#[test]
fn test_cumsum_equals_prefix_sum() {
    let frame = single_index_frame(vec![1, 2, 3, 4]);
    let out = cumsum(&votes_field()).apply(&frame, None).unwrap();
    assert_eq!(
        out,
        vec![
            Value::Float(1.0),
            Value::Float(3.0),
            Value::Float(6.0),
            Value::Float(10.0)
        ]
    );
}

#[test]
fn test_cumulative_series_restart_per_inner_group() {
    // Index (timestamp, political_party): the series accumulates over
    // timestamps separately per party.
    let mut frame = DataFrame::from_columns(vec![
        Column::new(
            "$timestamp",
            vec![Value::Int(1), Value::Int(1), Value::Int(2), Value::Int(2)],
        ),
        Column::new(
            "$political_party",
            vec!["d".into(), "r".into(), "d".into(), "r".into()],
        ),
        Column::new(
            "$votes",
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
        ),
    ])
    .unwrap();
    frame
        .set_index(&["$timestamp".into(), "$political_party".into()])
        .unwrap();

    let out = cumsum(&votes_field()).apply(&frame, None).unwrap();
    assert_eq!(
        out,
        vec![
            Value::Float(1.0),
            Value::Float(2.0),
            Value::Float(4.0),
            Value::Float(6.0)
        ]
    );
}

#[test]
fn test_cummean() {
    let frame = single_index_frame(vec![2, 4, 6]);
    let out = cummean(&votes_field()).apply(&frame, None).unwrap();
    assert_eq!(
        out,
        vec![Value::Float(2.0), Value::Float(3.0), Value::Float(4.0)]
    );
}

#[test]
fn test_rolling_mean_respects_min_periods() {
    let frame = single_index_frame(vec![1, 2, 3, 4]);
    let out = rolling_mean(&votes_field(), 3).apply(&frame, None).unwrap();
    assert!(matches!(out[0], Value::Float(f) if f.is_nan()));
    assert!(matches!(out[1], Value::Float(f) if f.is_nan()));
    assert_eq!(out[2], Value::Float(2.0));
    assert_eq!(out[3], Value::Float(3.0));
}

#[test]
fn test_share_over_dimension_divides_by_totals_row() {
    // Index (political_party, candidate) with totals rows per party.
    let candidate = Field::new("candidate", col("candidate"), DataType::Text).shared();
    let mut frame = DataFrame::from_columns(vec![
        Column::new(
            "$political_party",
            vec!["d".into(), "d".into(), "d".into(), "r".into(), "r".into()],
        ),
        Column::new(
            "$candidate",
            vec![
                "a".into(),
                "b".into(),
                TEXT_TOTALS.into(),
                "c".into(),
                TEXT_TOTALS.into(),
            ],
        ),
        Column::new(
            "$votes",
            vec![
                Value::Int(1),
                Value::Int(3),
                Value::Int(4),
                Value::Int(6),
                Value::Int(6),
            ],
        ),
    ])
    .unwrap();
    frame
        .set_index(&["$political_party".into(), "$candidate".into()])
        .unwrap();

    let out = share(&votes_field(), Some(&candidate))
        .apply(&frame, None)
        .unwrap();
    assert_eq!(out[0], Value::Float(25.0));
    assert_eq!(out[1], Value::Float(75.0));
    assert_eq!(out[2], Value::Float(100.0));
    assert_eq!(out[3], Value::Float(100.0));

    // Shares sum to 100 within each group.
    let d_sum = out[0].as_f64().unwrap() + out[1].as_f64().unwrap();
    assert_eq!(d_sum, 100.0);
}

#[test]
fn test_share_without_over_is_100_percent() {
    let frame = single_index_frame(vec![5, 10]);
    let out = share(&votes_field(), None).apply(&frame, None).unwrap();
    assert_eq!(out, vec![Value::Float(100.0), Value::Float(100.0)]);
}

#[test]
fn test_share_fetch_scrubs_introduced_totals_rows() {
    let raw_base = DataFrame::from_columns(vec![
        Column::new(
            "$political_party",
            vec!["d".into(), "d".into(), "r".into()],
        ),
        Column::new("$candidate", vec!["a".into(), "b".into(), "c".into()]),
        Column::new(
            "$votes",
            vec![Value::Int(1), Value::Int(3), Value::Int(6)],
        ),
    ])
    .unwrap();
    let raw_totals = DataFrame::from_columns(vec![
        Column::new("$political_party", vec!["d".into(), "r".into()]),
        Column::new(
            "$candidate",
            vec![ROLLUP_VALUE.into(), ROLLUP_VALUE.into()],
        ),
        Column::new("$votes", vec![Value::Int(4), Value::Int(6)]),
    ])
    .unwrap();

    let database = Arc::new(
        TestDatabase::new().with_frames(vec![raw_base, raw_totals]),
    );
    let dataset = DataSet::new(TableRef::new("politics"), database.clone())
        .with_fields(vec![
            Field::new("political_party", col("political_party"), DataType::Text),
            Field::new("candidate", col("candidate"), DataType::Text),
            Field::new("votes", sum(col("votes")), DataType::Number),
        ])
        .unwrap();

    let party = Arc::clone(dataset.fields.get("political_party").unwrap());
    let candidate = Arc::clone(dataset.fields.get("candidate").unwrap());
    let votes = Arc::clone(dataset.fields.get("votes").unwrap());

    let frame = dataset
        .query()
        .widget(Widget::new().item(share(&votes, Some(&candidate))))
        .dimension(&party)
        .dimension(&candidate)
        .fetch()
        .unwrap();

    // Two queries: base plus the share-basis totals rollup.
    assert_eq!(database.captured_queries().len(), 2);

    // Totals rows existed for the share computation but are scrubbed.
    assert_eq!(frame.nrows(), 3);
    let shares: Vec<f64> = (0..3)
        .map(|row| {
            frame
                .get(row, "$share(votes)")
                .and_then(Value::as_f64)
                .unwrap()
        })
        .collect();
    assert_eq!(shares, vec![25.0, 75.0, 100.0]);
}
