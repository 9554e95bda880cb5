//! The widget request surface.
//!
//! Rendering is out of scope for the engine; what the planner and
//! pagination need from a widget is its requested items (metric fields
//! and operations) and whether it paginates by dimension groups.

use std::sync::Arc;

use crate::error::{QueryError, QueryResult};
use crate::model::{Field, Operation};

/// An item requested by a widget.
#[derive(Debug, Clone)]
pub enum WidgetItem {
    Field(Arc<Field>),
    Operation(Operation),
}

impl WidgetItem {
    pub fn alias(&self) -> String {
        match self {
            WidgetItem::Field(field) => field.alias.clone(),
            WidgetItem::Operation(op) => op.alias(),
        }
    }
}

impl From<&Arc<Field>> for WidgetItem {
    fn from(field: &Arc<Field>) -> Self {
        WidgetItem::Field(Arc::clone(field))
    }
}

impl From<Operation> for WidgetItem {
    fn from(op: Operation) -> Self {
        WidgetItem::Operation(op)
    }
}

/// A widget request: items to fetch plus pagination behavior.
#[derive(Debug, Clone, Default)]
pub struct Widget {
    pub items: Vec<WidgetItem>,
    pub group_pagination: bool,
}

impl Widget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, item: impl Into<WidgetItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn with_group_pagination(mut self, group_pagination: bool) -> Self {
        self.group_pagination = group_pagination;
        self
    }

    /// The metric fields this widget needs queried: items that are
    /// fields, plus the leaf metrics of item operations.
    pub fn metrics(&self) -> QueryResult<Vec<Arc<Field>>> {
        if self.items.is_empty() {
            return Err(QueryError::MetricRequired);
        }
        let mut metrics: Vec<Arc<Field>> = vec![];
        for item in &self.items {
            let fields = match item {
                WidgetItem::Field(field) => vec![Arc::clone(field)],
                WidgetItem::Operation(op) => op.metrics(),
            };
            for field in fields {
                if !metrics.iter().any(|m| m.alias == field.alias) {
                    metrics.push(field);
                }
            }
        }
        Ok(metrics)
    }

    /// The operations this widget requests, nested operations first.
    pub fn operations(&self) -> Vec<&Operation> {
        let mut operations: Vec<&Operation> = vec![];
        for item in &self.items {
            if let WidgetItem::Operation(op) = item {
                for nested in op.operations() {
                    if !operations
                        .iter()
                        .any(|existing| existing.alias() == nested.alias())
                    {
                        operations.push(nested);
                    }
                }
                if !operations.iter().any(|existing| existing.alias() == op.alias()) {
                    operations.push(op);
                }
            }
        }
        operations
    }
}
