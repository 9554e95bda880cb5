//! SQL expression and query building.
//!
//! A dialect-agnostic token layer, a typed expression AST with a fluent
//! criterion algebra, and a consuming query builder. The planners in
//! [`crate::queries`] assemble everything here.

pub mod dialect;
pub mod expr;
pub mod query;
pub mod test_utils;
pub mod token;

pub use dialect::{Dialect, SqlDialect};
pub use expr::{col, table_col, DatePart, Expr, ExprExt};
pub use query::{Join, JoinType, OrderByExpr, Query, Relation, SelectExpr, SortDir, TableRef};
pub use token::{Token, TokenStream};
