//! The declarative data model: datasets, fields, filters, modifiers,
//! references and post-query operations.

pub mod blender;
pub mod dataset;
pub mod field;
pub mod filter;
pub mod join;
pub mod modifier;
pub mod operation;
pub mod reference;
pub mod types;

pub use blender::{BlendSource, DataSetBlender, FieldMap, PendingBlend};
pub use dataset::{Annotation, DataSet, FieldContainer};
pub use field::Field;
pub use filter::{Filter, RequestFilter};
pub use join::Join;
pub use modifier::{datetime_interval, numeric_interval, rollup, Dimension, ResultSet};
pub use operation::{
    cummean, cumprod, cumsum, rolling_mean, share, Operation, OperationArg,
};
pub use reference::{
    day_over_day, month_over_month, quarter_over_quarter, week_over_week, year_over_year,
    Reference, ReferenceGroup, ReferenceType, DAY_OVER_DAY, MONTH_OVER_MONTH,
    QUARTER_OVER_QUARTER, WEEK_OVER_WEEK, YEAR_OVER_YEAR,
};
pub use types::{DataType, CONTINUOUS_TYPES};
