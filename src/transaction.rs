//! Transaction emulation on top of the service's transaction tokens.
//!
//! A [`TransactionHandle`] moves through `Open -> Committed | RolledBack`.
//! Both end states are terminal: a new transaction needs a new handle.

use tracing::{info, warn};

use crate::error::{DataApiError, Result};
use crate::executor::StatementExecutor;
use crate::service::wire::SqlParameter;
use crate::types::ExecutionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// An open (or finished) server-side transaction.
///
/// Not `Clone`: exactly one owner may issue statements under a token.
#[derive(Debug)]
pub struct TransactionHandle {
    token: String,
    database: String,
    state: TransactionState,
}

impl TransactionHandle {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The database the token was opened against.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TransactionState::Open
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DataApiError::InvalidState(format!(
                "cannot {} transaction {}: it is {:?}",
                operation, self.token, self.state
            )))
        }
    }
}

/// Drives the lifecycle of transactions through a [`StatementExecutor`].
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    executor: StatementExecutor,
}

impl TransactionCoordinator {
    pub fn new(executor: StatementExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    /// Ask the service for a transaction token.
    ///
    /// A refusal is reported as `BeginFailed`; transport failures stay
    /// `Connectivity` so the caller can decide to retry.
    pub async fn begin(&self) -> Result<TransactionHandle> {
        let config = self.executor.config();
        let response = config
            .client()
            .begin_transaction(config.begin_request())
            .await
            .map_err(|e| match e {
                DataApiError::Connectivity(_) => e,
                other => DataApiError::BeginFailed(
                    other
                        .remote_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| other.to_string()),
                ),
            })?;

        if response.transaction_id.is_empty() {
            return Err(DataApiError::BeginFailed(
                "service returned an empty transaction id".to_string(),
            ));
        }

        info!("Began transaction {}", response.transaction_id);
        Ok(TransactionHandle {
            token: response.transaction_id,
            database: config.database().to_string(),
            state: TransactionState::Open,
        })
    }

    /// Execute a statement inside the transaction.
    ///
    /// Fails with `InvalidState`, without contacting the service, unless the
    /// handle is open and belongs to this coordinator's database. If the
    /// service reports the token as expired the transaction is considered
    /// aborted and the handle ends up `RolledBack`.
    pub async fn execute(
        &self,
        handle: &mut TransactionHandle,
        sql: &str,
        params: Vec<SqlParameter>,
    ) -> Result<ExecutionResult> {
        handle.ensure_open("execute in")?;
        let database = self.executor.config().database();
        if handle.database != database {
            return Err(DataApiError::InvalidState(format!(
                "transaction {} was opened against database {}, not {}",
                handle.token, handle.database, database
            )));
        }

        match self
            .executor
            .execute(sql, params, Some(&handle.token))
            .await
        {
            Err(DataApiError::TransactionExpired(msg)) => {
                warn!(
                    "Transaction {} expired on the service; aborting it",
                    handle.token
                );
                handle.state = TransactionState::RolledBack;
                Err(DataApiError::TransactionExpired(msg))
            }
            other => other,
        }
    }

    /// Commit the transaction.
    ///
    /// On failure the handle stays `Open`: the server-side outcome is
    /// ambiguous, so the caller must retry the commit or roll back.
    pub async fn commit(&self, handle: &mut TransactionHandle) -> Result<()> {
        handle.ensure_open("commit")?;
        let config = self.executor.config();
        let response = config
            .client()
            .commit_transaction(config.commit_request(&handle.token))
            .await?;

        handle.state = TransactionState::Committed;
        info!(
            "Committed transaction {}: {}",
            handle.token, response.transaction_status
        );
        Ok(())
    }

    /// Roll back the transaction.
    ///
    /// Idempotent: on a handle that is already committed or rolled back this
    /// succeeds without contacting the service. A token the service no longer
    /// knows counts as rolled back.
    pub async fn rollback(&self, handle: &mut TransactionHandle) -> Result<()> {
        if !handle.is_open() {
            return Ok(());
        }

        let config = self.executor.config();
        match config
            .client()
            .rollback_transaction(config.rollback_request(&handle.token))
            .await
        {
            Ok(response) => {
                info!(
                    "Rolled back transaction {}: {}",
                    handle.token, response.transaction_status
                );
            }
            Err(DataApiError::TransactionExpired(msg)) => {
                warn!(
                    "Transaction {} already gone on the service: {}",
                    handle.token, msg
                );
            }
            Err(e) => return Err(e),
        }

        handle.state = TransactionState::RolledBack;
        Ok(())
    }
}
