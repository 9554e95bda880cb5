//! Tests for field filter constructors and the type restrictions they
//! enforce.

use fireant::error::QueryError;
use fireant::model::{DataType, Field};
use fireant::sql::expr::{col, sum, ExprExt};
use fireant::sql::Dialect;

fn timestamp() -> Field {
    Field::new("timestamp", col("timestamp"), DataType::Date)
}

fn political_party() -> Field {
    Field::new("political_party", col("political_party"), DataType::Text)
}

fn votes() -> Field {
    Field::new("votes", sum(col("votes")), DataType::Number)
}

fn winner() -> Field {
    Field::new("winner", col("is_winner"), DataType::Boolean)
}

#[test]
fn test_eq_ne_unrestricted() {
    assert_eq!(
        political_party()
            .eq("d")
            .definition
            .to_sql(Dialect::DuckDb),
        "\"political_party\"='d'"
    );
    assert_eq!(
        winner().ne(true).definition.to_sql(Dialect::DuckDb),
        "\"is_winner\"<>TRUE"
    );
}

#[test]
fn test_isin_notin() {
    assert_eq!(
        political_party()
            .isin(vec!["d".into(), "r".into()])
            .definition
            .to_sql(Dialect::DuckDb),
        "\"political_party\" IN ('d','r')"
    );
    assert_eq!(
        political_party()
            .notin(vec!["i".into()])
            .definition
            .to_sql(Dialect::DuckDb),
        "\"political_party\" NOT IN ('i')"
    );
}

#[test]
fn test_comparators_allowed_for_number_and_date() {
    assert!(votes().gt(100).is_ok());
    assert!(timestamp().ge("2019-01-01").is_ok());
    assert!(votes().between(1, 10).is_ok());
}

#[test]
fn test_comparators_rejected_for_text_and_boolean() {
    for result in [
        political_party().gt("a"),
        political_party().between("a", "b"),
        winner().lt(true),
    ] {
        match result {
            Err(QueryError::TypeRestriction { allowed, .. }) => {
                assert_eq!(allowed, vec![DataType::Number, DataType::Date]);
            }
            other => panic!("expected type restriction, got {:?}", other),
        }
    }
}

#[test]
fn test_pattern_filters_text_only() {
    let filter = political_party().like(&["Dem%", "Rep%"]).unwrap();
    assert_eq!(
        filter.definition.to_sql(Dialect::DuckDb),
        "LOWER(\"political_party\") LIKE 'dem%' OR LOWER(\"political_party\") LIKE 'rep%'"
    );

    assert!(votes().like(&["%"]).is_err());
    assert!(timestamp().not_like(&["%"]).is_err());
}

#[test]
fn test_is_boolean_only() {
    assert_eq!(
        winner().is(true).unwrap().definition.to_sql(Dialect::DuckDb),
        "\"is_winner\"=TRUE"
    );
    assert!(political_party().is(true).is_err());
}

#[test]
fn test_aggregate_filter_flag() {
    assert!(votes().gt(100).unwrap().aggregate);
    assert!(!political_party().eq("d").aggregate);
}

#[test]
fn test_filter_deduplication_key_is_definition() {
    let a = political_party().eq("d");
    let b = political_party().eq("d");
    assert_eq!(a, b);
}

#[test]
fn test_compound_field_arithmetic() {
    let clicks = Field::new("clicks", sum(col("clicks")), DataType::Number);
    let impressions = Field::new("impressions", sum(col("impressions")), DataType::Number);
    let ctr = clicks.expr().div(impressions.expr()).mul(100);
    assert_eq!(
        ctr.to_sql(Dialect::DuckDb),
        "SUM(\"clicks\")/SUM(\"impressions\")*100"
    );
}
