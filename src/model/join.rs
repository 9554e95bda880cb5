//! Dataset joins.

use crate::sql::{Expr, JoinType, TableRef};

/// A join a dataset can reach: table, ON-criterion and join type.
///
/// Joins are declared up front; the finders discover transitively which
/// ones a request needs and order them by dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableRef,
    pub criterion: Expr,
    pub join_type: JoinType,
}

impl Join {
    pub fn new(table: TableRef, criterion: Expr, join_type: JoinType) -> Self {
        Self {
            table,
            criterion,
            join_type,
        }
    }

    pub fn inner(table: TableRef, criterion: Expr) -> Self {
        Self::new(table, criterion, JoinType::Inner)
    }

    pub fn left(table: TableRef, criterion: Expr) -> Self {
        Self::new(table, criterion, JoinType::Left)
    }

    /// Tables referenced by the ON-criterion, minus the joined table
    /// itself. These must be in place before this join.
    pub fn dependencies(&self) -> Vec<String> {
        self.criterion
            .referenced_tables()
            .into_iter()
            .filter(|t| *t != self.table.table)
            .collect()
    }
}
