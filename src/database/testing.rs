//! An in-memory database for tests.
//!
//! Queues canned frames and records every SQL string it is asked to run,
//! so planner output can be asserted end to end without a live database.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::QueryResult;
use crate::frame::DataFrame;
use crate::sql::Dialect;

use super::{coerce_date_columns, Database};

/// Test double for the database capability.
#[derive(Debug, Default)]
pub struct TestDatabase {
    dialect: Dialect,
    max_result_set_size: Option<usize>,
    frames: Mutex<VecDeque<DataFrame>>,
    queries: Mutex<Vec<String>>,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_max_result_set_size(mut self, max: usize) -> Self {
        self.max_result_set_size = Some(max);
        self
    }

    /// Queue frames to be returned by subsequent fetches, in order.
    pub fn with_frames(self, frames: Vec<DataFrame>) -> Self {
        self.frames
            .lock()
            .expect("test database lock poisoned")
            .extend(frames);
        self
    }

    /// Every SQL string fetched so far.
    pub fn captured_queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .expect("test database lock poisoned")
            .clone()
    }
}

impl Database for TestDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn max_result_set_size(&self) -> usize {
        self.max_result_set_size.unwrap_or(200_000)
    }

    fn fetch_dataframes(
        &self,
        queries: &[String],
        parse_dates: &[String],
    ) -> QueryResult<Vec<DataFrame>> {
        self.queries
            .lock()
            .expect("test database lock poisoned")
            .extend(queries.iter().cloned());

        let mut queued = self.frames.lock().expect("test database lock poisoned");
        let frames = queries
            .iter()
            .map(|_| {
                let mut frame = queued.pop_front().unwrap_or_default();
                coerce_date_columns(&mut frame, parse_dates);
                frame
            })
            .collect();
        Ok(frames)
    }
}
