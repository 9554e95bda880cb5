//! Dataset blending.
//!
//! A blender composes two datasets by aligning dimensions: requests are
//! translated per dataset through a field map, executed as subqueries and
//! joined on the mapped dimensions. Blenders chain, so the primary side
//! may itself be a blender.

use std::collections::HashMap;
use std::sync::Arc;

use crate::database::Database;
use crate::error::{QueryError, QueryResult};
use crate::queries::builder::DataSetQueryBuilder;

use super::dataset::{DataSet, FieldContainer};
use super::field::Field;

/// Blender-level alias mapped to a dataset-level alias, per leaf dataset.
pub type FieldMap = HashMap<String, String>;

/// The primary side of a blend: a dataset or another blender.
#[derive(Debug, Clone)]
pub enum BlendSource {
    DataSet(DataSet),
    Blender(Box<DataSetBlender>),
}

impl BlendSource {
    fn fields(&self) -> &FieldContainer {
        match self {
            BlendSource::DataSet(ds) => &ds.fields,
            BlendSource::Blender(b) => &b.fields,
        }
    }

    fn database(&self) -> Arc<dyn Database> {
        match self {
            BlendSource::DataSet(ds) => Arc::clone(&ds.database),
            BlendSource::Blender(b) => b.database(),
        }
    }
}

/// A composite dataset formed by joining datasets on mapped dimensions.
#[derive(Debug, Clone)]
pub struct DataSetBlender {
    pub primary: BlendSource,
    pub secondary: DataSet,
    /// Injective mapping: primary-side field alias -> secondary field alias.
    pub dimension_map: Vec<(String, String)>,
    /// Blender-level fields: the primary's fields, the secondary's
    /// unmapped fields, plus explicitly added complex fields.
    pub fields: FieldContainer,
}

/// A blend waiting for its dimension mapping.
#[must_use = "a blend has no effect until mapped with on() or on_dimensions()"]
pub struct PendingBlend {
    primary: BlendSource,
    secondary: DataSet,
}

impl PendingBlend {
    /// Map primary fields to their secondary counterparts.
    pub fn on(self, dimension_map: Vec<(&Arc<Field>, &Arc<Field>)>) -> QueryResult<DataSetBlender> {
        let map: Vec<(String, String)> = dimension_map
            .iter()
            .map(|(p, s)| (p.alias.clone(), s.alias.clone()))
            .collect();
        DataSetBlender::new(self.primary, self.secondary, map)
    }

    /// Auto-map by common alias of non-aggregate fields.
    pub fn on_dimensions(self) -> QueryResult<DataSetBlender> {
        let mut map = vec![];
        for field in self.primary.fields().iter() {
            if field.is_aggregate() {
                continue;
            }
            if let Some(counterpart) = self.secondary.fields.get(&field.alias) {
                if !counterpart.is_aggregate() {
                    map.push((field.alias.clone(), counterpart.alias.clone()));
                }
            }
        }
        DataSetBlender::new(self.primary, self.secondary, map)
    }
}

impl DataSet {
    /// Begin blending this dataset with another.
    pub fn blend(&self, secondary: &DataSet) -> PendingBlend {
        PendingBlend {
            primary: BlendSource::DataSet(self.clone()),
            secondary: secondary.clone(),
        }
    }
}

impl DataSetBlender {
    fn new(
        primary: BlendSource,
        secondary: DataSet,
        dimension_map: Vec<(String, String)>,
    ) -> QueryResult<Self> {
        // The map must be injective: one secondary field per primary field.
        for (i, (_, secondary_alias)) in dimension_map.iter().enumerate() {
            if dimension_map
                .iter()
                .skip(i + 1)
                .any(|(_, s)| s == secondary_alias)
            {
                return Err(QueryError::DuplicateAlias(secondary_alias.clone()));
            }
        }

        let mut fields = primary.fields().clone();
        let mapped_secondary: Vec<&String> =
            dimension_map.iter().map(|(_, s)| s).collect();
        for field in secondary.fields.iter() {
            if mapped_secondary.contains(&&field.alias) {
                continue;
            }
            fields.push_if_absent(Arc::clone(field));
        }

        Ok(Self {
            primary,
            secondary,
            dimension_map,
            fields,
        })
    }

    /// Chain a further blend on top of this one.
    pub fn blend(&self, secondary: &DataSet) -> PendingBlend {
        PendingBlend {
            primary: BlendSource::Blender(Box::new(self.clone())),
            secondary: secondary.clone(),
        }
    }

    /// Add a blender-level field (e.g. a metric composed across datasets).
    pub fn with_field(mut self, field: Field) -> QueryResult<Self> {
        self.fields.push(Arc::new(field))?;
        Ok(self)
    }

    /// The database the blended query runs against (the primary's).
    pub fn database(&self) -> Arc<dyn Database> {
        self.primary.database()
    }

    /// Entry point for building a data request against the blended set.
    pub fn query(&self) -> DataSetQueryBuilder {
        DataSetQueryBuilder::for_blender(self.clone())
    }

    /// Flatten the blend tree into `(dataset, field map)` leaves.
    ///
    /// Leaves come out primary-deepest first, then each level's secondary.
    /// A leaf's field map translates blender-level aliases to that
    /// dataset's aliases: identity for fields the dataset owns, the
    /// dimension map for mapped dimensions (composed through nesting,
    /// since chained blenders preserve primary aliases).
    pub fn flatten(&self) -> Vec<(DataSet, FieldMap)> {
        let mut leaves: Vec<(DataSet, FieldMap)> = match &self.primary {
            BlendSource::DataSet(ds) => {
                let mut field_map = FieldMap::new();
                for field in ds.fields.iter() {
                    field_map.insert(field.alias.clone(), field.alias.clone());
                }
                vec![(ds.clone(), field_map)]
            }
            BlendSource::Blender(b) => b.flatten(),
        };

        let mut secondary_map = FieldMap::new();
        for field in self.secondary.fields.iter() {
            secondary_map.insert(field.alias.clone(), field.alias.clone());
        }
        for (primary_alias, secondary_alias) in &self.dimension_map {
            secondary_map.insert(primary_alias.clone(), secondary_alias.clone());
            // The secondary's own alias resolves through its mapped name,
            // not as a separate dimension.
            if primary_alias != secondary_alias {
                secondary_map.remove(secondary_alias);
            }
        }
        leaves.push((self.secondary.clone(), secondary_map));

        leaves
    }
}
