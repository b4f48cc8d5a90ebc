use crate::error::{DataApiError, Result};
use crate::traits::QueryExecutor;
use crate::types::{CompiledQuery, ExecutionResult, SqlValue};

/// Entry point for building an INSERT of a single row.
/// Must call `.value()` at least once to proceed.
pub struct Insert<'a> {
    executor: &'a dyn QueryExecutor,
    table: String,
}

impl<'a> Insert<'a> {
    pub(crate) fn new(executor: &'a dyn QueryExecutor, table: &str) -> Self {
        Self {
            executor,
            table: table.to_string(),
        }
    }

    /// Set the first column value.
    pub fn value<V: Into<SqlValue>>(self, column: &str, value: V) -> InsertWithValues<'a> {
        InsertWithValues {
            executor: self.executor,
            table: self.table,
            columns: vec![column.to_string()],
            values: vec![value.into()],
            returning: Vec::new(),
        }
    }
}

/// INSERT builder with at least one column value.
pub struct InsertWithValues<'a> {
    executor: &'a dyn QueryExecutor,
    table: String,
    columns: Vec<String>,
    values: Vec<SqlValue>,
    returning: Vec<String>,
}

impl<'a> InsertWithValues<'a> {
    /// Set another column value.
    pub fn value<V: Into<SqlValue>>(mut self, column: &str, value: V) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    /// Return the given columns of the inserted row.
    pub fn returning(mut self, cols: &[&str]) -> Self {
        self.returning = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Build the SQL query string and parameters.
    ///
    /// Fails with `InvalidState` when RETURNING is requested from an
    /// engine without it.
    pub fn compile(&self) -> Result<CompiledQuery> {
        let compiler = self.executor.compiler();
        if !self.returning.is_empty() && !compiler.supports_returning() {
            return Err(DataApiError::InvalidState(format!(
                "{:?} does not support INSERT ... RETURNING",
                compiler.engine()
            )));
        }

        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| compiler.quote_identifier(c))
            .collect();
        let placeholders: Vec<String> = (0..self.values.len())
            .map(|i| compiler.placeholder(i))
            .collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            compiler.quote_identifier(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );

        if !self.returning.is_empty() {
            let returning: Vec<String> = self
                .returning
                .iter()
                .map(|c| compiler.quote_identifier(c))
                .collect();
            sql.push_str(" RETURNING ");
            sql.push_str(&returning.join(", "));
        }

        Ok(CompiledQuery::new(sql, self.values.clone()))
    }

    /// Execute the insert and return the result.
    pub async fn execute(self) -> Result<ExecutionResult> {
        let query = self.compile()?;
        self.executor.execute_compiled(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MysqlCompiler, PostgresCompiler, QueryCompiler};
    use async_trait::async_trait;

    struct MockExecutor<C>(C);

    #[async_trait]
    impl<C: QueryCompiler + 'static> QueryExecutor for MockExecutor<C> {
        fn compiler(&self) -> &dyn QueryCompiler {
            &self.0
        }

        async fn execute_compiled(&self, _query: &CompiledQuery) -> Result<ExecutionResult> {
            Ok(ExecutionResult::empty())
        }
    }

    #[test]
    fn test_build_insert_returning() {
        let executor = MockExecutor(PostgresCompiler);
        let query = Insert::new(&executor, "person")
            .value("first_name", "Ada")
            .value("last_name", None::<String>)
            .returning(&["id"])
            .compile()
            .unwrap();

        assert_eq!(
            query.sql,
            "INSERT INTO \"person\" (\"first_name\", \"last_name\") VALUES (:0, :1) RETURNING \"id\""
        );
        assert_eq!(query.parameters[1], ("1".to_string(), SqlValue::Null));
    }

    #[test]
    fn test_mysql_insert() {
        let executor = MockExecutor(MysqlCompiler);
        let query = Insert::new(&executor, "pet")
            .value("name", "Rex")
            .compile()
            .unwrap();
        assert_eq!(query.sql, "INSERT INTO `pet` (`name`) VALUES (:0)");
    }

    #[test]
    fn test_mysql_rejects_returning() {
        let executor = MockExecutor(MysqlCompiler);
        let err = Insert::new(&executor, "pet")
            .value("name", "Rex")
            .returning(&["id"])
            .compile()
            .unwrap_err();
        assert!(matches!(err, DataApiError::InvalidState(_)));
    }
}
