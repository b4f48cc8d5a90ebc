use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::dialect::{DataApiDialect, Dialect, Engine, Introspector, QueryCompiler, TableMetadata};
use crate::drivers::{ConnectionHandle, DataApiDriver};
use crate::error::{DataApiError, Result};
use crate::querier::Querier;
use crate::traits::{Driver, QueryExecutor};
use crate::transaction::TransactionState;
use crate::types::{CompiledQuery, ExecutionResult};

/// Main entry point for data-api.
/// Holds a dialect and provides query building capabilities.
///
/// Statements run outside a transaction are autocommitted by the service.
#[derive(Debug, Clone)]
pub struct Client {
    driver: Arc<DataApiDriver>,
    compiler: Arc<dyn QueryCompiler>,
    introspector: Arc<dyn Introspector>,
}

impl Client {
    /// Create a client for the given dialect.
    pub fn new(dialect: DataApiDialect) -> Self {
        Self {
            driver: dialect.driver(),
            compiler: dialect.compiler(),
            introspector: dialect.introspector(),
        }
    }

    /// Create a client straight from a service configuration.
    ///
    /// # Example
    /// ```ignore
    /// let config = ServiceConfig::from_env(service)?;
    /// let client = Client::from_config(config, Engine::Postgres);
    /// ```
    pub fn from_config(config: ServiceConfig, engine: Engine) -> Self {
        Self::new(DataApiDialect::new(config, engine))
    }

    pub fn driver(&self) -> &Arc<DataApiDriver> {
        &self.driver
    }

    /// Create a Querier for building and executing queries.
    pub fn querier(&self) -> Querier<'_> {
        Querier::new(self)
    }

    /// Run one statement on a short-lived connection.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<ExecutionResult> {
        let connection = self.driver.acquire_connection().await?;
        let result = self.driver.execute_query(&connection, query).await;
        self.driver.release_connection(connection).await?;
        result
    }

    /// Start a transaction on a dedicated connection.
    pub async fn begin(&self) -> Result<Transaction> {
        let connection = self.driver.acquire_connection().await?;
        if let Err(e) = self.driver.begin_transaction(&connection).await {
            self.driver.release_connection(connection).await?;
            return Err(e);
        }
        Ok(Transaction {
            driver: Arc::clone(&self.driver),
            compiler: Arc::clone(&self.compiler),
            connection: Some(connection),
        })
    }

    pub async fn get_schemas(&self) -> Result<Vec<String>> {
        self.introspector.get_schemas(self).await
    }

    pub async fn get_tables(&self) -> Result<Vec<TableMetadata>> {
        self.introspector.get_tables(self).await
    }

    /// Shut the driver down. Further use fails with `InvalidState`.
    pub async fn destroy(&self) -> Result<()> {
        self.driver.destroy().await
    }
}

#[async_trait]
impl QueryExecutor for Client {
    fn compiler(&self) -> &dyn QueryCompiler {
        self.compiler.as_ref()
    }

    async fn execute_compiled(&self, query: &CompiledQuery) -> Result<ExecutionResult> {
        self.execute(query).await
    }
}

/// An open transaction bound to one connection.
///
/// Dropping an unfinished transaction releases its connection in the
/// background, which rolls the transaction back.
#[derive(Debug)]
pub struct Transaction {
    driver: Arc<DataApiDriver>,
    compiler: Arc<dyn QueryCompiler>,
    connection: Option<ConnectionHandle>,
}

impl Transaction {
    fn connection(&self) -> Result<&ConnectionHandle> {
        self.connection
            .as_ref()
            .ok_or_else(|| DataApiError::InvalidState("transaction already finished".to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.connection.is_none()
    }

    /// The service token, while the transaction is bound.
    pub async fn token(&self) -> Option<String> {
        match &self.connection {
            Some(connection) => connection.transaction_token().await,
            None => None,
        }
    }

    pub async fn state(&self) -> Option<TransactionState> {
        match &self.connection {
            Some(connection) => connection.transaction_state().await,
            None => None,
        }
    }

    pub async fn execute(&self, query: &CompiledQuery) -> Result<ExecutionResult> {
        let connection = self.connection()?;
        self.driver.execute_query(connection, query).await
    }

    pub fn querier(&self) -> Querier<'_> {
        Querier::new(self)
    }

    /// Commit and release the connection.
    /// On failure the transaction stays open and may be rolled back.
    pub async fn commit(&mut self) -> Result<()> {
        let connection = self.connection()?.clone();
        self.driver.commit_transaction(&connection).await?;
        self.connection = None;
        self.driver.release_connection(connection).await?;
        Ok(())
    }

    /// Roll back and release the connection.
    pub async fn rollback(&mut self) -> Result<()> {
        let connection = self.connection()?.clone();
        self.driver.rollback_transaction(&connection).await?;
        self.connection = None;
        self.driver.release_connection(connection).await?;
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for Transaction {
    fn compiler(&self) -> &dyn QueryCompiler {
        self.compiler.as_ref()
    }

    async fn execute_compiled(&self, query: &CompiledQuery) -> Result<ExecutionResult> {
        self.execute(query).await
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let driver = Arc::clone(&self.driver);
                runtime.spawn(async move {
                    let id = connection.id();
                    match driver.release_connection(connection).await {
                        Ok(outcome) => {
                            if let Some(e) = outcome.rollback_error {
                                warn!("Dropped transaction on connection {} not rolled back: {}", id, e);
                            }
                        }
                        Err(e) => warn!("Releasing dropped transaction on connection {} failed: {}", id, e),
                    }
                });
            }
            Err(_) => warn!(
                "Transaction on connection {} dropped outside a runtime; left to expire",
                connection.id()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{
        DataApiService, Field, InMemoryDataApiService, InMemoryResponseBuilder, RecordedCall,
        TokenOutcome,
    };
    use crate::WhereClause;

    fn client(service: &Arc<InMemoryDataApiService>, engine: Engine) -> Client {
        let service: Arc<dyn DataApiService> = Arc::clone(service) as Arc<dyn DataApiService>;
        Client::from_config(
            ServiceConfig::builder()
                .client(service)
                .database("scratch")
                .secret_arn("arn:secret")
                .resource_arn("arn:cluster")
                .build()
                .unwrap(),
            engine,
        )
    }

    #[tokio::test]
    async fn test_querier_runs_autocommit() {
        let service = Arc::new(InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .column("count", "int8")
                .row(vec![Field::LongValue(2)])
                .build(),
        ));
        let client = client(&service, Engine::Postgres);

        let row = client
            .querier()
            .select()
            .count_all("count")
            .from("person")
            .where_(WhereClause::eq("last_name", "Lovelace"))
            .execute()
            .await
            .unwrap()
            .single_row()
            .unwrap();

        assert_eq!(row.get_as::<i64>("count").unwrap(), 2);
        let sent = service.last_statement().unwrap();
        assert_eq!(
            sent.sql,
            "SELECT count(*) AS \"count\" FROM \"person\" WHERE \"last_name\" = :0"
        );
        assert!(sent.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_transaction_commit_releases() {
        let service = Arc::new(InMemoryDataApiService::new());
        let client = client(&service, Engine::Postgres);

        let mut tx = client.begin().await.unwrap();
        let token = tx.token().await.unwrap();
        tx.querier()
            .insert_into("person")
            .value("first_name", "Ada")
            .execute()
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(tx.is_finished());
        assert_eq!(service.token_outcome(&token), Some(TokenOutcome::Committed));
        assert_eq!(service.statements_in(&token).len(), 1);

        let err = tx.execute(&CompiledQuery::raw("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, DataApiError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_transaction() {
        let service = Arc::new(InMemoryDataApiService::new());
        let client = client(&service, Engine::Postgres);

        let mut tx = client.begin().await.unwrap();
        let token = tx.token().await.unwrap();
        service.fail_next_commit(DataApiError::Connectivity("reset".into()));

        assert!(tx.commit().await.is_err());
        assert!(!tx.is_finished());
        tx.rollback().await.unwrap();
        assert_eq!(service.token_outcome(&token), Some(TokenOutcome::RolledBack));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let service = Arc::new(InMemoryDataApiService::new());
        let client = client(&service, Engine::Postgres);

        let tx = client.begin().await.unwrap();
        let token = tx.token().await.unwrap();
        drop(tx);

        for _ in 0..50 {
            if service.token_outcome(&token) != Some(TokenOutcome::Open) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(service.token_outcome(&token), Some(TokenOutcome::RolledBack));
    }

    #[tokio::test]
    async fn test_failed_begin_releases_connection() {
        let service = Arc::new(InMemoryDataApiService::new());
        service.fail_next_begin(DataApiError::RemoteRejected("no capacity".into()));
        let client = client(&service, Engine::Postgres);

        let err = client.begin().await.unwrap_err();
        assert!(matches!(err, DataApiError::BeginFailed(_)));
        assert!(service
            .recorded_calls()
            .iter()
            .all(|c| !matches!(c, RecordedCall::Rollback { .. })));
    }

    #[tokio::test]
    async fn test_destroyed_client_rejects_work() {
        let service = Arc::new(InMemoryDataApiService::new());
        let client = client(&service, Engine::Mysql);
        client.destroy().await.unwrap();

        let err = client.execute(&CompiledQuery::raw("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, DataApiError::InvalidState(_)));
        assert!(service.recorded_calls().is_empty());
    }
}
