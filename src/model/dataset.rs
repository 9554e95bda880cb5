//! Datasets: a table, its fields, its joins and a database capability.
//!
//! Datasets are constructed once and treated as immutable afterwards;
//! request builders clone themselves and share the dataset's fields
//! through `Arc`.

use std::sync::Arc;

use crate::database::Database;
use crate::error::{QueryError, QueryResult};
use crate::queries::builder::{
    DataSetQueryBuilder, DimensionChoicesQueryBuilder, DimensionLatestQueryBuilder,
};
use crate::sql::TableRef;

use super::field::Field;
use super::join::Join;

/// Ordered, alias-unique container of shared fields.
#[derive(Debug, Clone, Default)]
pub struct FieldContainer {
    fields: Vec<Arc<Field>>,
}

impl FieldContainer {
    pub fn new(fields: Vec<Field>) -> QueryResult<Self> {
        let mut container = Self::default();
        for field in fields {
            container.push(Arc::new(field))?;
        }
        Ok(container)
    }

    pub fn push(&mut self, field: Arc<Field>) -> QueryResult<()> {
        if self.contains_alias(&field.alias) {
            return Err(QueryError::DuplicateAlias(field.alias.clone()));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Insert a field, keeping an existing field with the same alias.
    pub fn push_if_absent(&mut self, field: Arc<Field>) {
        if !self.contains_alias(&field.alias) {
            self.fields.push(field);
        }
    }

    pub fn get(&self, alias: &str) -> Option<&Arc<Field>> {
        self.fields.iter().find(|f| f.alias == alias)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Field>> {
        self.fields.iter()
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.alias.as_str()).collect()
    }

    /// Fields with aggregate definitions.
    pub fn metrics(&self) -> Vec<&Arc<Field>> {
        self.fields.iter().filter(|f| f.is_aggregate()).collect()
    }

    /// Fields with non-aggregate definitions.
    pub fn dimensions(&self) -> Vec<&Arc<Field>> {
        self.fields.iter().filter(|f| !f.is_aggregate()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An annotation source aligned with the dataset on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub table: TableRef,
    pub alignment_field_alias: String,
    pub annotation_field_alias: String,
}

/// A queryable dataset.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub table: TableRef,
    pub database: Arc<dyn Database>,
    pub joins: Vec<Join>,
    pub fields: FieldContainer,
    pub always_query_all_metrics: bool,
    pub annotation: Option<Annotation>,
}

impl DataSet {
    pub fn new(table: TableRef, database: Arc<dyn Database>) -> Self {
        Self {
            table,
            database,
            joins: vec![],
            fields: FieldContainer::default(),
            always_query_all_metrics: false,
            annotation: None,
        }
    }

    pub fn with_joins(mut self, joins: Vec<Join>) -> Self {
        self.joins = joins;
        self
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> QueryResult<Self> {
        self.fields = FieldContainer::new(fields)?;
        Ok(self)
    }

    pub fn with_always_query_all_metrics(mut self, always: bool) -> Self {
        self.always_query_all_metrics = always;
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Entry point for building a data request against this dataset.
    pub fn query(&self) -> DataSetQueryBuilder {
        DataSetQueryBuilder::for_dataset(self.clone())
    }

    /// Distinct values of a dimension field, with optional filters.
    pub fn choices(&self, field: &Arc<Field>) -> DimensionChoicesQueryBuilder {
        DimensionChoicesQueryBuilder::new(self.clone(), Arc::clone(field))
    }

    /// Latest value per given field (MAX).
    pub fn latest(&self, fields: &[&Arc<Field>]) -> DimensionLatestQueryBuilder {
        DimensionLatestQueryBuilder::new(
            self.clone(),
            fields.iter().map(|f| Arc::clone(f)).collect(),
        )
    }
}

/// Datasets compare by the table they query and their field aliases.
impl PartialEq for DataSet {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.fields.aliases() == other.fields.aliases()
    }
}
