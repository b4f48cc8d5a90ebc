//! Schema metadata queries against `information_schema`.

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::QueryExecutor;
use crate::types::{CompiledQuery, Row};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub has_default: bool,
    pub is_auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub schema: String,
    pub name: String,
    pub is_view: bool,
    pub columns: Vec<ColumnInfo>,
}

/// Reads schema metadata through the driver.
#[async_trait]
pub trait Introspector: Send + Sync + std::fmt::Debug {
    async fn get_schemas(&self, db: &dyn QueryExecutor) -> Result<Vec<String>>;

    /// Tables and views with their columns in ordinal order.
    async fn get_tables(&self, db: &dyn QueryExecutor) -> Result<Vec<TableMetadata>>;
}

const POSTGRES_SCHEMAS: &str = "SELECT schema_name FROM information_schema.schemata \
     WHERE schema_name NOT IN ('pg_catalog', 'information_schema') \
     AND schema_name NOT LIKE 'pg_toast%' AND schema_name NOT LIKE 'pg_temp%' \
     ORDER BY schema_name";

const POSTGRES_TABLES: &str = "SELECT c.table_schema, c.table_name, t.table_type, \
     c.column_name, c.data_type, c.is_nullable, \
     c.column_default IS NOT NULL AS has_default, \
     (c.is_identity = 'YES' OR coalesce(c.column_default, '') LIKE 'nextval(%') AS is_auto_increment \
     FROM information_schema.columns c \
     JOIN information_schema.tables t \
     ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
     WHERE c.table_schema NOT IN ('pg_catalog', 'information_schema') \
     ORDER BY c.table_schema, c.table_name, c.ordinal_position";

const MYSQL_SCHEMAS: &str = "SELECT schema_name FROM information_schema.schemata \
     WHERE schema_name NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys') \
     ORDER BY schema_name";

const MYSQL_TABLES: &str = "SELECT c.table_schema, c.table_name, t.table_type, \
     c.column_name, c.data_type, c.is_nullable, \
     c.column_default IS NOT NULL AS has_default, \
     c.extra LIKE '%auto_increment%' AS is_auto_increment \
     FROM information_schema.columns c \
     JOIN information_schema.tables t \
     ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
     WHERE c.table_schema = DATABASE() \
     ORDER BY c.table_schema, c.table_name, c.ordinal_position";

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresIntrospector;

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlIntrospector;

#[async_trait]
impl Introspector for PostgresIntrospector {
    async fn get_schemas(&self, db: &dyn QueryExecutor) -> Result<Vec<String>> {
        fetch_schemas(db, POSTGRES_SCHEMAS).await
    }

    async fn get_tables(&self, db: &dyn QueryExecutor) -> Result<Vec<TableMetadata>> {
        fetch_tables(db, POSTGRES_TABLES).await
    }
}

#[async_trait]
impl Introspector for MysqlIntrospector {
    async fn get_schemas(&self, db: &dyn QueryExecutor) -> Result<Vec<String>> {
        fetch_schemas(db, MYSQL_SCHEMAS).await
    }

    async fn get_tables(&self, db: &dyn QueryExecutor) -> Result<Vec<TableMetadata>> {
        fetch_tables(db, MYSQL_TABLES).await
    }
}

async fn fetch_schemas(db: &dyn QueryExecutor, sql: &str) -> Result<Vec<String>> {
    let result = db.execute_compiled(&CompiledQuery::raw(sql)).await?;
    result
        .rows()
        .iter()
        .map(|row| row.get_as::<String>("schema_name"))
        .collect()
}

async fn fetch_tables(db: &dyn QueryExecutor, sql: &str) -> Result<Vec<TableMetadata>> {
    let result = db.execute_compiled(&CompiledQuery::raw(sql)).await?;
    group_tables(&result.rows())
}

/// Fold column rows (ordered by schema, table, position) into tables.
fn group_tables(rows: &[Row]) -> Result<Vec<TableMetadata>> {
    let mut tables: Vec<TableMetadata> = Vec::new();
    for row in rows {
        let schema = row.get_as::<String>("table_schema")?;
        let name = row.get_as::<String>("table_name")?;
        let column = ColumnInfo {
            name: row.get_as::<String>("column_name")?,
            data_type: row.get_as::<String>("data_type")?,
            is_nullable: row.get_as::<String>("is_nullable")? == "YES",
            has_default: flag(row, "has_default")?,
            is_auto_increment: flag(row, "is_auto_increment")?,
        };

        match tables.last_mut() {
            Some(table) if table.schema == schema && table.name == name => {
                table.columns.push(column)
            }
            _ => {
                let is_view = row.get_as::<String>("table_type")? == "VIEW";
                tables.push(TableMetadata {
                    schema,
                    name,
                    is_view,
                    columns: vec![column],
                });
            }
        }
    }
    Ok(tables)
}

/// Boolean expressions come back as booleans from Postgres and as 0/1 from MySQL.
fn flag(row: &Row, column: &str) -> Result<bool> {
    match row.get_as::<Option<bool>>(column) {
        Ok(b) => Ok(b.unwrap_or(false)),
        Err(_) => Ok(row.get_as::<Option<i64>>(column)?.unwrap_or(0) != 0),
    }
}
