use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{DataApiError, Result};
use crate::executor::StatementExecutor;
use crate::logging;
use crate::traits::{Driver, ReleaseOutcome};
use crate::transaction::{TransactionCoordinator, TransactionHandle, TransactionState};
use crate::types::{CompiledQuery, ExecutionResult};

/// A logical connection. It owns no network resource, only the
/// transaction (if any) opened on it.
///
/// Clones share the same state. Statements issued through one handle are
/// serialized in submission order; different handles run concurrently.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    inner: Arc<ConnectionInner>,
}

#[derive(Debug)]
struct ConnectionInner {
    id: u64,
    released: AtomicBool,
    transaction: Mutex<Option<TransactionHandle>>,
}

impl ConnectionHandle {
    fn new(id: u64) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                released: AtomicBool::new(false),
                transaction: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// State of the transaction attached to this connection, if any.
    pub async fn transaction_state(&self) -> Option<TransactionState> {
        self.inner.transaction.lock().await.as_ref().map(|h| h.state())
    }

    /// Token of the transaction attached to this connection, if any.
    pub async fn transaction_token(&self) -> Option<String> {
        self.inner
            .transaction
            .lock()
            .await
            .as_ref()
            .map(|h| h.token().to_string())
    }
}

/// Driver for the stateless SQL execution service.
///
/// Emulates connection-oriented semantics: connections are logical
/// handles, transactions are service tokens attached to a handle.
#[derive(Debug)]
pub struct DataApiDriver {
    config: Arc<ServiceConfig>,
    coordinator: TransactionCoordinator,
    next_connection_id: AtomicU64,
    destroyed: AtomicBool,
}

impl DataApiDriver {
    pub fn new(config: ServiceConfig) -> Self {
        logging::init_from_env();

        let config = Arc::new(config);
        let executor = StatementExecutor::new(Arc::clone(&config));
        Self {
            config,
            coordinator: TransactionCoordinator::new(executor),
            next_connection_id: AtomicU64::new(1),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn executor(&self) -> &StatementExecutor {
        self.coordinator.executor()
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Lock the connection's transaction slot, checking it may still be used.
    ///
    /// The checks run after the lock is taken so that work queued behind a
    /// concurrent release sees the release.
    async fn lock_usable<'a>(
        &self,
        connection: &'a ConnectionHandle,
    ) -> Result<MutexGuard<'a, Option<TransactionHandle>>> {
        let slot = connection.inner.transaction.lock().await;
        if self.is_destroyed() {
            return Err(DataApiError::InvalidState(
                "driver has been destroyed".to_string(),
            ));
        }
        if connection.is_released() {
            return Err(DataApiError::InvalidState(format!(
                "connection {} has been released",
                connection.id()
            )));
        }
        Ok(slot)
    }
}

#[async_trait]
impl Driver for DataApiDriver {
    type Connection = ConnectionHandle;

    async fn acquire_connection(&self) -> Result<ConnectionHandle> {
        if self.is_destroyed() {
            return Err(DataApiError::InvalidState(
                "driver has been destroyed".to_string(),
            ));
        }
        let id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        debug!("Acquired connection {}", id);
        Ok(ConnectionHandle::new(id))
    }

    async fn begin_transaction(&self, connection: &ConnectionHandle) -> Result<()> {
        let mut slot = self.lock_usable(connection).await?;
        if let Some(open) = slot.as_ref().filter(|h| h.is_open()) {
            return Err(DataApiError::InvalidState(format!(
                "connection {} already has open transaction {}",
                connection.id(),
                open.token()
            )));
        }

        let handle = self.coordinator.begin().await?;
        debug!(
            "Connection {} bound to transaction {}",
            connection.id(),
            handle.token()
        );
        *slot = Some(handle);
        Ok(())
    }

    async fn commit_transaction(&self, connection: &ConnectionHandle) -> Result<()> {
        let mut slot = self.lock_usable(connection).await?;
        let handle = slot.as_mut().ok_or_else(|| {
            DataApiError::InvalidState(format!(
                "connection {} has no transaction to commit",
                connection.id()
            ))
        })?;

        self.coordinator.commit(handle).await?;
        *slot = None;
        Ok(())
    }

    async fn rollback_transaction(&self, connection: &ConnectionHandle) -> Result<()> {
        let mut slot = self.lock_usable(connection).await?;
        if let Some(handle) = slot.as_mut() {
            self.coordinator.rollback(handle).await?;
        }
        *slot = None;
        Ok(())
    }

    async fn execute_query(
        &self,
        connection: &ConnectionHandle,
        query: &CompiledQuery,
    ) -> Result<ExecutionResult> {
        let params = query.wire_parameters()?;
        let mut slot = self.lock_usable(connection).await?;
        match slot.as_mut() {
            Some(handle) => self.coordinator.execute(handle, &query.sql, params).await,
            None => {
                self.coordinator
                    .executor()
                    .execute(&query.sql, params, None)
                    .await
            }
        }
    }

    async fn release_connection(&self, connection: ConnectionHandle) -> Result<ReleaseOutcome> {
        let mut slot = connection.inner.transaction.lock().await;
        if connection.inner.released.swap(true, Ordering::SeqCst) {
            return Ok(ReleaseOutcome::default());
        }

        let mut outcome = ReleaseOutcome::default();
        if let Some(mut handle) = slot.take().filter(|h| h.is_open()) {
            outcome.rollback_attempted = true;
            warn!(
                "Connection {} released with open transaction {}; rolling back",
                connection.id(),
                handle.token()
            );
            if let Err(e) = self.coordinator.rollback(&mut handle).await {
                warn!(
                    "Rollback of transaction {} on release failed: {}",
                    handle.token(),
                    e
                );
                outcome.rollback_error = Some(e);
            }
        }

        debug!("Released connection {}", connection.id());
        Ok(outcome)
    }

    async fn destroy(&self) -> Result<()> {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            info!("Driver for database {} destroyed", self.config.database());
        }
        Ok(())
    }
}
