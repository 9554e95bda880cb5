//! Time-shifted references (day-over-day and friends).
//!
//! A reference compares each metric against a prior window of a date
//! dimension. References sharing `(dimension, date part, interval)` are
//! grouped into one offset query; delta and delta-percent variants are
//! computed client-side by the reducer.

use std::sync::Arc;

use crate::sql::DatePart;

use super::field::Field;
use super::filter::Filter;

/// A kind of reference: alias, label and the window offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceType {
    pub alias: &'static str,
    pub label: &'static str,
    pub date_part: DatePart,
    pub interval: i64,
}

pub const DAY_OVER_DAY: ReferenceType = ReferenceType {
    alias: "dod",
    label: "DoD",
    date_part: DatePart::Day,
    interval: 1,
};

pub const WEEK_OVER_WEEK: ReferenceType = ReferenceType {
    alias: "wow",
    label: "WoW",
    date_part: DatePart::Week,
    interval: 1,
};

pub const MONTH_OVER_MONTH: ReferenceType = ReferenceType {
    alias: "mom",
    label: "MoM",
    date_part: DatePart::Month,
    interval: 1,
};

pub const QUARTER_OVER_QUARTER: ReferenceType = ReferenceType {
    alias: "qoq",
    label: "QoQ",
    date_part: DatePart::Quarter,
    interval: 1,
};

pub const YEAR_OVER_YEAR: ReferenceType = ReferenceType {
    alias: "yoy",
    label: "YoY",
    date_part: DatePart::Year,
    interval: 1,
};

/// A reference over a date dimension field.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub field: Arc<Field>,
    pub reference_type: ReferenceType,
    pub delta: bool,
    pub delta_percent: bool,
    /// Filters applied to the reference query only.
    pub filters: Vec<Filter>,
}

impl Reference {
    pub fn new(field: &Arc<Field>, reference_type: ReferenceType) -> Self {
        Self {
            field: Arc::clone(field),
            reference_type,
            delta: false,
            delta_percent: false,
            filters: vec![],
        }
    }

    /// Absolute difference against the base value.
    pub fn delta(mut self) -> Self {
        self.delta = true;
        self.delta_percent = false;
        self
    }

    /// Percentage difference against the base value.
    pub fn delta_percent(mut self) -> Self {
        self.delta = false;
        self.delta_percent = true;
        self
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    /// Column alias suffix for this reference variant.
    pub fn alias(&self) -> String {
        if self.delta_percent {
            format!("{}_delta_percent", self.reference_type.alias)
        } else if self.delta {
            format!("{}_delta", self.reference_type.alias)
        } else {
            self.reference_type.alias.to_string()
        }
    }

    pub fn label(&self) -> String {
        if self.delta_percent {
            format!("{} Delta %", self.reference_type.label)
        } else if self.delta {
            format!("{} Delta", self.reference_type.label)
        } else {
            self.reference_type.label.to_string()
        }
    }

    /// Grouping key: references with equal keys share one offset query.
    pub fn group_key(&self) -> (String, DatePart, i64) {
        (
            self.field.alias.clone(),
            self.reference_type.date_part,
            self.reference_type.interval,
        )
    }
}

/// Convenience constructors matching the shipped reference types.
pub fn day_over_day(field: &Arc<Field>) -> Reference {
    Reference::new(field, DAY_OVER_DAY)
}

pub fn week_over_week(field: &Arc<Field>) -> Reference {
    Reference::new(field, WEEK_OVER_WEEK)
}

pub fn month_over_month(field: &Arc<Field>) -> Reference {
    Reference::new(field, MONTH_OVER_MONTH)
}

pub fn quarter_over_quarter(field: &Arc<Field>) -> Reference {
    Reference::new(field, QUARTER_OVER_QUARTER)
}

pub fn year_over_year(field: &Arc<Field>) -> Reference {
    Reference::new(field, YEAR_OVER_YEAR)
}

/// References sharing one `(dimension, date part, interval)` offset query.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceGroup {
    pub field: Arc<Field>,
    pub date_part: DatePart,
    pub interval: i64,
    pub references: Vec<Reference>,
}

impl ReferenceGroup {
    /// Suffix applied to metric aliases in the group's offset query.
    pub fn alias(&self) -> &'static str {
        self.references
            .first()
            .map(|r| r.reference_type.alias)
            .unwrap_or("ref")
    }
}
