//! Fluent request builders.
//!
//! Builders are immutable in effect: every method consumes and returns
//! the builder, and cloning one for a branch never mutates the original
//! or the dataset. Fields stay `Arc`-shared through every clone.

use std::sync::Arc;

use tracing::debug;

use crate::database::Database;
use crate::error::{QueryError, QueryResult};
use crate::frame::{alias_selector, Column, DataFrame};
use crate::model::{
    DataSet, DataSetBlender, DataType, Dimension, Field, Filter, Operation, Reference,
    RequestFilter,
};
use crate::sql::{Query, SortDir};
use crate::widgets::Widget;

use super::blender::{make_blended_queries, BlenderRequest};
use super::execution::fetch_data;
use super::finders::{find_reference_groups, find_share_dimensions};
use super::makers::{
    apply_result_set_dimensions, make_choices_query, make_latest_query,
    make_slicer_query_with_totals_and_references, PlannedQuery, SlicerRequest,
};
use super::pagination::paginate;
use super::reducer::{reduce_result_set, scrub_totals_from_share_results};

/// What a request is built against.
#[derive(Debug, Clone)]
enum QuerySource {
    DataSet(DataSet),
    Blender(DataSetBlender),
}

impl QuerySource {
    fn database(&self) -> Arc<dyn Database> {
        match self {
            QuerySource::DataSet(ds) => Arc::clone(&ds.database),
            QuerySource::Blender(b) => b.database(),
        }
    }

    fn fields(&self) -> &crate::model::FieldContainer {
        match self {
            QuerySource::DataSet(ds) => &ds.fields,
            QuerySource::Blender(b) => &b.fields,
        }
    }
}

/// Builder for data requests against a dataset or a blender.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until fetch() is called"]
pub struct DataSetQueryBuilder {
    source: QuerySource,
    widgets: Vec<Widget>,
    dimensions: Vec<Dimension>,
    filters: Vec<RequestFilter>,
    references: Vec<Reference>,
    orders: Vec<(Arc<Field>, Option<SortDir>)>,
    query_limit: Option<u64>,
    query_offset: Option<u64>,
    client_limit: Option<usize>,
    client_offset: Option<usize>,
}

impl DataSetQueryBuilder {
    pub(crate) fn for_dataset(dataset: DataSet) -> Self {
        Self::new(QuerySource::DataSet(dataset))
    }

    pub(crate) fn for_blender(blender: DataSetBlender) -> Self {
        Self::new(QuerySource::Blender(blender))
    }

    fn new(source: QuerySource) -> Self {
        Self {
            source,
            widgets: vec![],
            dimensions: vec![],
            filters: vec![],
            references: vec![],
            orders: vec![],
            query_limit: None,
            query_offset: None,
            client_limit: None,
            client_offset: None,
        }
    }

    pub fn widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn dimension(mut self, dimension: impl Into<Dimension>) -> Self {
        self.dimensions.push(dimension.into());
        self
    }

    /// Add a filter that also applies to totals queries.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(RequestFilter::new(filter));
        self
    }

    /// Add a filter omitted from totals queries.
    pub fn filter_excluding_totals(mut self, filter: Filter) -> Self {
        self.filters.push(RequestFilter::omit_from_rollup(filter));
        self
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn orderby(mut self, field: &Arc<Field>, direction: Option<SortDir>) -> Self {
        self.orders.push((Arc::clone(field), direction));
        self
    }

    /// LIMIT applied to every planned relational query.
    pub fn limit_query(mut self, limit: u64) -> Self {
        self.query_limit = Some(limit);
        self
    }

    /// OFFSET applied to every planned relational query.
    pub fn offset_query(mut self, offset: u64) -> Self {
        self.query_offset = Some(offset);
        self
    }

    /// Row limit applied client-side after reduction.
    pub fn limit_client(mut self, limit: usize) -> Self {
        self.client_limit = Some(limit);
        self
    }

    /// Row offset applied client-side after reduction.
    pub fn offset_client(mut self, offset: usize) -> Self {
        self.client_offset = Some(offset);
        self
    }

    // =========================================================================
    // Planning
    // =========================================================================

    /// The metric fields the request queries: widget metrics in request
    /// order, plus every dataset metric when the dataset asks for it.
    fn metrics(&self) -> QueryResult<Vec<Arc<Field>>> {
        let mut metrics: Vec<Arc<Field>> = vec![];
        for widget in &self.widgets {
            for metric in widget.metrics()? {
                if !metrics.iter().any(|m| m.alias == metric.alias) {
                    metrics.push(metric);
                }
            }
        }
        if let QuerySource::DataSet(ds) = &self.source {
            if ds.always_query_all_metrics {
                for metric in ds.fields.metrics() {
                    if !metrics.iter().any(|m| m.alias == metric.alias) {
                        metrics.push(Arc::clone(metric));
                    }
                }
            }
        }
        Ok(metrics)
    }

    /// Operations across widgets, nested operations first.
    fn operations(&self) -> Vec<Operation> {
        let mut operations: Vec<Operation> = vec![];
        for widget in &self.widgets {
            for op in widget.operations() {
                if !operations.iter().any(|o| o.alias() == op.alias()) {
                    operations.push(op.clone());
                }
            }
        }
        operations
    }

    /// Fail with *field-validity* when a request element names a field
    /// outside the source's container.
    fn validate_fields(&self, metrics: &[Arc<Field>]) -> QueryResult<()> {
        let fields = self.source.fields();
        let mut invalid: Vec<String> = vec![];
        let mut check = |alias: &str| {
            if !fields.contains_alias(alias) && !invalid.iter().any(|a| a == alias) {
                invalid.push(alias.to_string());
            }
        };

        for metric in metrics {
            check(&metric.alias);
        }
        for dim in &self.dimensions {
            check(&dim.underlying_field().alias);
        }
        for rf in &self.filters {
            check(&rf.filter.field_alias);
        }
        for reference in &self.references {
            check(&reference.field.alias);
        }
        for (field, _) in &self.orders {
            check(&field.alias);
        }
        for widget in &self.widgets {
            for op in widget.operations() {
                if let Some(over) = op.share_over() {
                    check(&over.alias);
                }
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(QueryError::InvalidFields { aliases: invalid })
        }
    }

    /// Plan the request into tagged relational queries.
    pub fn queries(&self, hint: Option<&str>) -> QueryResult<Vec<PlannedQuery>> {
        let metrics = self.metrics()?;
        self.validate_fields(&metrics)?;

        let operations = self.operations();
        let operation_refs: Vec<&Operation> = operations.iter().collect();
        let share_dimensions = find_share_dimensions(&self.dimensions, &operation_refs);

        let mut planned = match &self.source {
            QuerySource::DataSet(ds) => {
                let request = SlicerRequest {
                    database: &*ds.database,
                    table: &ds.table,
                    joins: &ds.joins,
                    dimensions: &self.dimensions,
                    metrics: &metrics,
                    filters: &self.filters,
                    orders: &self.orders,
                };
                make_slicer_query_with_totals_and_references(
                    &request,
                    &self.references,
                    &share_dimensions,
                )?
            }
            QuerySource::Blender(blender) => {
                let request = BlenderRequest {
                    blender,
                    dimensions: &self.dimensions,
                    metrics: &metrics,
                    filters: &self.filters,
                    references: &self.references,
                    orders: &self.orders,
                };
                make_blended_queries(&request, &share_dimensions)?
            }
        };

        for plan in &mut planned {
            let mut query = plan.query.clone();
            if let Some(hint) = hint {
                query = query.hint(hint);
            }
            if let Some(limit) = self.query_limit {
                query = query.limit(limit);
            }
            if let Some(offset) = self.query_offset {
                query = query.offset(offset);
            }
            plan.query = query;
        }
        Ok(planned)
    }

    /// Rendered SQL for every planned query.
    pub fn sql(&self) -> QueryResult<Vec<String>> {
        let dialect = self.source.database().dialect();
        Ok(self
            .queries(None)?
            .iter()
            .map(|p| p.query.to_sql(dialect))
            .collect())
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Execute the request and reduce the results into one indexed frame.
    pub fn fetch(&self) -> QueryResult<DataFrame> {
        self.fetch_with_hint(None)
    }

    /// Execute with an optimizer hint label attached to every query.
    pub fn fetch_with_hint(&self, hint: Option<&str>) -> QueryResult<DataFrame> {
        let planned = self.queries(hint)?;
        let dimensions = apply_result_set_dimensions(&self.dimensions);
        let reference_groups = find_reference_groups(&self.references);
        let database = self.source.database();

        let (max_rows_returned, frames) = fetch_data(&*database, &planned, &dimensions)?;
        debug!(max_rows_returned, "reducing result set");

        let mut frame = reduce_result_set(frames, &reference_groups, &dimensions)?;

        // Operations, once per operation and once per active reference.
        let operations = self.operations();
        for operation in &operations {
            let mut references: Vec<Option<&Reference>> = vec![None];
            references.extend(self.references.iter().map(Some));
            for reference in references {
                let values = operation.apply(&frame, reference)?;
                let suffix = reference
                    .map(|r| format!("_{}", r.alias()))
                    .unwrap_or_default();
                let name = alias_selector(&format!("{}{}", operation.alias(), suffix));
                frame.push_column(Column::new(&name, values))?;
            }
        }

        // Totals rows introduced only for share denominators are scrubbed.
        frame = scrub_totals_from_share_results(&frame, &dimensions);

        paginate(
            &frame,
            &self.widgets,
            &self.orders,
            self.client_limit,
            self.client_offset,
        )
    }
}

// =============================================================================
// Auxiliary builders
// =============================================================================

/// Distinct values of one dimension field.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until fetch() is called"]
pub struct DimensionChoicesQueryBuilder {
    dataset: DataSet,
    field: Arc<Field>,
    filters: Vec<Filter>,
}

impl DimensionChoicesQueryBuilder {
    pub(crate) fn new(dataset: DataSet, field: Arc<Field>) -> Self {
        Self {
            dataset,
            field,
            filters: vec![],
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn queries(&self) -> QueryResult<Vec<Query>> {
        Ok(vec![make_choices_query(
            &self.dataset.table,
            &self.dataset.joins,
            &self.field,
            &self.filters,
        )?])
    }

    pub fn fetch(&self) -> QueryResult<DataFrame> {
        let query = &self.queries()?[0];
        let sql = query.to_sql(self.dataset.database.dialect());
        debug!(query = %sql, "fetching dimension choices");

        let parse_dates = if self.field.data_type == DataType::Date {
            vec![alias_selector(&self.field.alias)]
        } else {
            vec![]
        };
        let mut frames = self
            .dataset
            .database
            .fetch_dataframes(&[sql], &parse_dates)?;
        Ok(frames.pop().unwrap_or_default())
    }
}

/// Latest (maximum) value per field.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until fetch() is called"]
pub struct DimensionLatestQueryBuilder {
    dataset: DataSet,
    fields: Vec<Arc<Field>>,
}

impl DimensionLatestQueryBuilder {
    pub(crate) fn new(dataset: DataSet, fields: Vec<Arc<Field>>) -> Self {
        Self { dataset, fields }
    }

    pub fn queries(&self) -> QueryResult<Vec<Query>> {
        Ok(vec![make_latest_query(
            &self.dataset.table,
            &self.dataset.joins,
            &self.fields,
        )?])
    }

    pub fn fetch(&self) -> QueryResult<DataFrame> {
        let query = &self.queries()?[0];
        let sql = query.to_sql(self.dataset.database.dialect());
        debug!(query = %sql, "fetching latest values");

        let parse_dates: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.data_type == DataType::Date)
            .map(|f| alias_selector(&f.alias))
            .collect();
        let mut frames = self
            .dataset
            .database
            .fetch_dataframes(&[sql], &parse_dates)?;
        Ok(frames.pop().unwrap_or_default())
    }
}
