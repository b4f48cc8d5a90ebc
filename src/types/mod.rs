pub mod marshal;
mod query;
mod row;
mod sql_value;

pub use self::query::CompiledQuery;
pub use self::row::{ExecutionResult, FromSqlValue, Row};
pub use self::sql_value::SqlValue;
