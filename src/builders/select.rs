use crate::clauses::WhereClause;
use crate::error::Result;
use crate::traits::QueryExecutor;
use crate::types::{CompiledQuery, ExecutionResult, SqlValue};

#[derive(Debug, Clone)]
enum SelectItem {
    Column(String),
    CountAll(String),
}

/// Entry point for building a SELECT query.
/// Must call `.columns()` or `.count_all()` to proceed.
pub struct Select<'a> {
    executor: &'a dyn QueryExecutor,
}

impl<'a> Select<'a> {
    pub(crate) fn new(executor: &'a dyn QueryExecutor) -> Self {
        Self { executor }
    }

    /// Specify the columns to select (`table.column` or `*` allowed).
    pub fn columns(self, cols: &[&str]) -> SelectWithColumns<'a> {
        let items = cols
            .iter()
            .map(|c| SelectItem::Column(c.to_string()))
            .collect();
        SelectWithColumns {
            executor: self.executor,
            items,
        }
    }

    /// Select `count(*)` under the given alias.
    pub fn count_all(self, alias: &str) -> SelectWithColumns<'a> {
        SelectWithColumns {
            executor: self.executor,
            items: vec![SelectItem::CountAll(alias.to_string())],
        }
    }
}

/// SELECT builder after columns have been specified.
/// Must call `.from()` to proceed.
pub struct SelectWithColumns<'a> {
    executor: &'a dyn QueryExecutor,
    items: Vec<SelectItem>,
}

impl<'a> SelectWithColumns<'a> {
    /// Specify the table to select from.
    pub fn from(self, table: &str) -> SelectWithTable<'a> {
        SelectWithTable {
            executor: self.executor,
            items: self.items,
            table: table.to_string(),
            where_clause: None,
            limit: None,
        }
    }
}

/// SELECT builder after table has been specified.
/// Can optionally add WHERE clause, LIMIT, or execute directly.
pub struct SelectWithTable<'a> {
    executor: &'a dyn QueryExecutor,
    items: Vec<SelectItem>,
    table: String,
    where_clause: Option<WhereClause>,
    limit: Option<u64>,
}

impl<'a> SelectWithTable<'a> {
    /// Add a WHERE clause to the query.
    pub fn where_(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    /// Add a LIMIT to the query.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Build the SQL query string and parameters.
    pub fn compile(&self) -> CompiledQuery {
        let compiler = self.executor.compiler();
        let mut sql = String::with_capacity(256);
        let mut params: Vec<SqlValue> = Vec::new();

        sql.push_str("SELECT ");
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            match item {
                SelectItem::Column(col) => sql.push_str(&compiler.quote_identifier(col)),
                SelectItem::CountAll(alias) => {
                    sql.push_str("count(*) AS ");
                    sql.push_str(&compiler.quote_part(alias));
                }
            }
        }

        sql.push_str(" FROM ");
        sql.push_str(&compiler.quote_identifier(&self.table));

        if let Some(ref where_clause) = self.where_clause {
            sql.push_str(" WHERE ");
            let where_sql = where_clause.build_sql(compiler, &mut params);
            sql.push_str(&where_sql);
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.to_string());
        }

        CompiledQuery::new(sql, params)
    }

    /// Execute the query and return the result.
    pub async fn execute(self) -> Result<ExecutionResult> {
        let query = self.compile();
        self.executor.execute_compiled(&query).await
    }
}
