use crate::builders::{Insert, Select};
use crate::traits::QueryExecutor;

/// Query builder factory.
/// Created from a `Client` or a `Transaction`; queries built here run on it.
pub struct Querier<'a> {
    executor: &'a dyn QueryExecutor,
}

impl<'a> Querier<'a> {
    pub(crate) fn new(executor: &'a dyn QueryExecutor) -> Self {
        Self { executor }
    }

    /// Start building a SELECT query.
    pub fn select(&self) -> Select<'a> {
        Select::new(self.executor)
    }

    /// Start building an INSERT into `table`.
    pub fn insert_into(&self, table: &str) -> Insert<'a> {
        Insert::new(self.executor, table)
    }
}
