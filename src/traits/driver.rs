use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CompiledQuery, ExecutionResult};

/// What is left over after a connection was released.
#[derive(Debug, Default)]
pub struct ReleaseOutcome {
    /// An open transaction was found and a rollback was attempted.
    pub rollback_attempted: bool,
    /// The rollback attempt failed. Release itself still succeeded.
    pub rollback_error: Option<crate::error::DataApiError>,
}

/// Trait for database driver implementations.
///
/// This is the capability set a query-builder framework needs from a
/// backend. Drivers are responsible for:
/// - Handing out connection handles and taking them back
/// - Converting parameters to the backend's value format
/// - Executing compiled queries and decoding their results
/// - Transaction begin/commit/rollback per connection
#[async_trait]
pub trait Driver: Send + Sync {
    type Connection: Send + Sync;

    async fn acquire_connection(&self) -> Result<Self::Connection>;

    async fn begin_transaction(&self, connection: &Self::Connection) -> Result<()>;

    async fn commit_transaction(&self, connection: &Self::Connection) -> Result<()>;

    async fn rollback_transaction(&self, connection: &Self::Connection) -> Result<()>;

    /// Execute a compiled query.
    /// Parameters use the service's named placeholders (`:0`, `:name`).
    async fn execute_query(
        &self,
        connection: &Self::Connection,
        query: &CompiledQuery,
    ) -> Result<ExecutionResult>;

    /// Give a connection back. An open transaction is rolled back first.
    async fn release_connection(&self, connection: Self::Connection) -> Result<ReleaseOutcome>;

    /// Release process-wide resources. Idempotent.
    async fn destroy(&self) -> Result<()>;
}
