use crate::dialect::QueryCompiler;
use crate::types::SqlValue;

/// Represents a WHERE clause condition.
/// Supports equality and logical combinations.
#[derive(Debug, Clone)]
pub enum WhereClause {
    /// column = value (`column IS NULL` for a null value)
    Eq(String, SqlValue),
    /// clause AND clause
    And(Box<WhereClause>, Box<WhereClause>),
    /// clause OR clause
    Or(Box<WhereClause>, Box<WhereClause>),
}

impl WhereClause {
    /// Creates an equality condition: column = value
    pub fn eq<V: Into<SqlValue>>(column: &str, value: V) -> Self {
        WhereClause::Eq(column.to_string(), value.into())
    }

    /// Combines this clause with another using AND
    pub fn and(self, other: WhereClause) -> Self {
        WhereClause::And(Box::new(self), Box::new(other))
    }

    /// Combines this clause with another using OR
    pub fn or(self, other: WhereClause) -> Self {
        WhereClause::Or(Box::new(self), Box::new(other))
    }

    /// Builds the SQL string and collects parameters.
    /// Returns the SQL fragment and updates the params vector; placeholders
    /// continue from `params.len()`.
    pub fn build_sql(&self, compiler: &dyn QueryCompiler, params: &mut Vec<SqlValue>) -> String {
        match self {
            WhereClause::Eq(col, SqlValue::Null) => {
                format!("{} IS NULL", compiler.quote_identifier(col))
            }
            WhereClause::Eq(col, value) => {
                let placeholder = compiler.placeholder(params.len());
                params.push(value.clone());
                format!("{} = {}", compiler.quote_identifier(col), placeholder)
            }
            WhereClause::And(left, right) => {
                let left_sql = left.build_sql(compiler, params);
                let right_sql = right.build_sql(compiler, params);
                format!("({}) AND ({})", left_sql, right_sql)
            }
            WhereClause::Or(left, right) => {
                let left_sql = left.build_sql(compiler, params);
                let right_sql = right.build_sql(compiler, params);
                format!("({}) OR ({})", left_sql, right_sql)
            }
        }
    }
}
