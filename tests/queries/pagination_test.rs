//! Tests for client-side pagination: simple sort+slice and group-aware
//! slicing over the inner index levels.

use std::sync::Arc;

use fireant::frame::{Column, DataFrame, Value};
use fireant::model::{DataType, Field};
use fireant::queries::pagination::paginate;
use fireant::sql::expr::{col, sum};
use fireant::sql::SortDir;
use fireant::widgets::Widget;

fn votes_field() -> Arc<Field> {
    Field::new("votes", sum(col("votes")), DataType::Number).shared()
}

fn single_index_frame() -> DataFrame {
    let mut frame = DataFrame::from_columns(vec![
        Column::new(
            "$candidate",
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
        ),
        Column::new(
            "$votes",
            vec![
                Value::Int(4),
                Value::Int(1),
                Value::Int(3),
                Value::Int(2),
            ],
        ),
    ])
    .unwrap();
    frame.set_index(&["$candidate".into()]).unwrap();
    frame
}

/// Index (timestamp, candidate): two timestamps, three candidates.
fn multi_index_frame() -> DataFrame {
    let mut frame = DataFrame::from_columns(vec![
        Column::new(
            "$timestamp",
            vec![
                Value::Int(1),
                Value::Int(1),
                Value::Int(1),
                Value::Int(2),
                Value::Int(2),
                Value::Int(2),
            ],
        ),
        Column::new(
            "$candidate",
            vec![
                "a".into(),
                "b".into(),
                "c".into(),
                "a".into(),
                "b".into(),
                "c".into(),
            ],
        ),
        Column::new(
            "$votes",
            vec![
                Value::Int(1),
                Value::Int(10),
                Value::Int(2),
                Value::Int(3),
                Value::Int(20),
                Value::Int(4),
            ],
        ),
    ])
    .unwrap();
    frame
        .set_index(&["$timestamp".into(), "$candidate".into()])
        .unwrap();
    frame
}

#[test]
fn test_simple_pagination_sorts_and_slices() {
    let frame = single_index_frame();
    let votes = votes_field();

    let page = paginate(
        &frame,
        &[Widget::new()],
        &[(Arc::clone(&votes), Some(SortDir::Desc))],
        Some(2),
        None,
    )
    .unwrap();

    assert_eq!(page.nrows(), 2);
    assert_eq!(page.index()[0], vec![Value::Text("a".into())]);
    assert_eq!(page.index()[1], vec![Value::Text("c".into())]);
}

#[test]
fn test_simple_pagination_offset() {
    let frame = single_index_frame();
    let votes = votes_field();

    let page = paginate(
        &frame,
        &[Widget::new()],
        &[(Arc::clone(&votes), Some(SortDir::Desc))],
        Some(2),
        Some(1),
    )
    .unwrap();

    assert_eq!(page.nrows(), 2);
    assert_eq!(page.index()[0], vec![Value::Text("c".into())]);
    assert_eq!(page.index()[1], vec![Value::Text("d".into())]);
}

#[test]
fn test_group_pagination_keeps_whole_groups() {
    let frame = multi_index_frame();
    let votes = votes_field();

    let page = paginate(
        &frame,
        &[Widget::new().with_group_pagination(true)],
        &[(Arc::clone(&votes), Some(SortDir::Desc))],
        Some(2),
        None,
    )
    .unwrap();

    // Exactly two candidates survive (b: 30, c: 6), every timestamp row
    // of each survives, and the outer row order is preserved.
    assert_eq!(page.nrows(), 4);
    let candidates: Vec<Value> = page.index().iter().map(|t| t[1].clone()).collect();
    assert_eq!(
        candidates,
        vec![
            Value::Text("b".into()),
            Value::Text("c".into()),
            Value::Text("b".into()),
            Value::Text("c".into())
        ]
    );
}

#[test]
fn test_group_pagination_appends_null_keys() {
    let mut frame = multi_index_frame();
    frame.reset_index();
    let mut with_null = frame.clone();
    with_null
        .column_mut("$candidate")
        .unwrap()
        .values
        .push(Value::Null);
    with_null
        .column_mut("$timestamp")
        .unwrap()
        .values
        .push(Value::Int(1));
    with_null
        .column_mut("$votes")
        .unwrap()
        .values
        .push(Value::Int(100));
    let mut with_null = normalize(with_null);
    with_null
        .set_index(&["$timestamp".into(), "$candidate".into()])
        .unwrap();

    let votes = votes_field();
    let page = paginate(
        &with_null,
        &[Widget::new().with_group_pagination(true)],
        &[(Arc::clone(&votes), Some(SortDir::Desc))],
        Some(1),
        None,
    )
    .unwrap();

    // One real group (b) plus the null-key rows at the end.
    let candidates: Vec<Value> = page.index().iter().map(|t| t[1].clone()).collect();
    assert!(candidates.contains(&Value::Text("b".into())));
    assert_eq!(candidates.last(), Some(&Value::Null));
}

/// Rebuild the frame so every column has equal length after pushes.
fn normalize(frame: DataFrame) -> DataFrame {
    let columns: Vec<Column> = frame
        .columns()
        .iter()
        .map(|c| Column::new(&c.name, c.values.clone()))
        .collect();
    DataFrame::from_columns(columns).unwrap()
}

#[test]
fn test_no_orders_preserves_frame_order() {
    let frame = single_index_frame();
    let page = paginate(&frame, &[Widget::new()], &[], Some(3), None).unwrap();
    assert_eq!(page.nrows(), 3);
    assert_eq!(page.index()[0], vec![Value::Text("a".into())]);
}
