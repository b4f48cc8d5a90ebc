mod driver;
mod query_executor;

pub use driver::{Driver, ReleaseOutcome};
pub use query_executor::QueryExecutor;
