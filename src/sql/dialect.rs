//! SQL dialect definitions and formatting rules.
//!
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (ANSI/PG/DuckDB), `` ` `` (MySQL)
//! - Boolean literals: true/false vs 1/0
//! - Date truncation and date arithmetic shapes
//!
//! The default implementations follow ANSI SQL where possible.

use serde::{Deserialize, Serialize};

use super::expr::{func, lit_str, DatePart, Expr};
use super::token::{Token, TokenStream};

/// SQL dialect trait - defines how SQL constructs are rendered.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    ///
    /// - ANSI/PostgreSQL/DuckDB/Snowflake: `"identifier"`
    /// - MySQL: `` `identifier` ``
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quote a string literal.
    ///
    /// All shipped dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str {
        if b {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Remap a function name for this dialect, or None to keep it.
    fn remap_function(&self, _name: &str) -> Option<&'static str> {
        None
    }

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        let mut ts = TokenStream::new();

        if let Some(lim) = limit {
            ts.push(Token::Limit)
                .space()
                .push(Token::LitInt(lim as i64));
        }

        if let Some(off) = offset {
            if limit.is_some() {
                ts.space();
            }
            ts.push(Token::Offset)
                .space()
                .push(Token::LitInt(off as i64));
        }

        ts
    }

    /// Truncate a date expression to the given interval.
    ///
    /// ANSI shape: `DATE_TRUNC('<interval>', expr)`.
    fn trunc_date(&self, expr: Expr, interval: DatePart) -> Expr {
        func("DATE_TRUNC", vec![lit_str(interval.unit()), expr])
    }

    /// Shift a date expression by `interval` units of `date_part`.
    ///
    /// ANSI shape: `expr + INTERVAL '<n> <unit>'`. Dialects with a
    /// dedicated function override this.
    fn date_add(&self, expr: Expr, date_part: DatePart, interval: i64) -> Expr {
        Expr::BinaryOp {
            left: Box::new(expr),
            op: super::expr::BinaryOperator::Plus,
            right: Box::new(Expr::Interval {
                value: interval,
                unit: date_part,
            }),
        }
    }

    /// Render an expression as text.
    fn to_char(&self, expr: Expr) -> Expr {
        func("TO_CHAR", vec![expr])
    }
}

// =============================================================================
// Dialect Implementations
// =============================================================================

/// DuckDB dialect (default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }
}

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// MySQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn format_bool(&self, b: bool) -> &'static str {
        if b {
            "1"
        } else {
            "0"
        }
    }

    /// MySQL has no DATE_TRUNC; truncate via DATE_FORMAT masks.
    fn trunc_date(&self, expr: Expr, interval: DatePart) -> Expr {
        let mask = match interval {
            DatePart::Hour => "%Y-%m-%d %H:00:00",
            DatePart::Day => "%Y-%m-%d",
            DatePart::Week => "%Y-%u",
            DatePart::Month => "%Y-%m-01",
            DatePart::Quarter | DatePart::Year => "%Y-01-01",
        };
        func("DATE_FORMAT", vec![expr, lit_str(mask)])
    }

    /// `DATE_ADD(expr, INTERVAL n UNIT)`.
    fn date_add(&self, expr: Expr, date_part: DatePart, interval: i64) -> Expr {
        func(
            "DATE_ADD",
            vec![
                expr,
                Expr::Interval {
                    value: interval,
                    unit: date_part,
                },
            ],
        )
    }

    fn to_char(&self, expr: Expr) -> Expr {
        func("CONVERT", vec![expr, Expr::Raw("CHAR".into())])
    }
}

/// Snowflake dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snowflake;

impl SqlDialect for Snowflake {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    /// `DATEADD(unit, n, expr)`.
    fn date_add(&self, expr: Expr, date_part: DatePart, interval: i64) -> Expr {
        func(
            "DATEADD",
            vec![
                Expr::Raw(date_part.unit().into()),
                Expr::Literal(super::expr::Literal::Int(interval)),
                expr,
            ],
        )
    }
}

// =============================================================================
// Dialect Enum
// =============================================================================

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    DuckDb,
    Postgres,
    MySql,
    Snowflake,
}

impl Dialect {
    fn as_dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::Snowflake => &Snowflake,
        }
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.as_dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.as_dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.as_dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.as_dialect().format_bool(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.as_dialect().remap_function(name)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.as_dialect().emit_limit_offset(limit, offset)
    }

    fn trunc_date(&self, expr: Expr, interval: DatePart) -> Expr {
        self.as_dialect().trunc_date(expr, interval)
    }

    fn date_add(&self, expr: Expr, date_part: DatePart, interval: i64) -> Expr {
        self.as_dialect().date_add(expr, date_part, interval)
    }

    fn to_char(&self, expr: Expr) -> Expr {
        self.as_dialect().to_char(expr)
    }
}
