use async_trait::async_trait;

use crate::dialect::QueryCompiler;
use crate::error::Result;
use crate::types::{CompiledQuery, ExecutionResult};

/// Something builders can run their compiled queries on: a client in
/// autocommit mode or an open transaction.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// The compiler matching the target SQL grammar.
    fn compiler(&self) -> &dyn QueryCompiler;

    async fn execute_compiled(&self, query: &CompiledQuery) -> Result<ExecutionResult>;
}
