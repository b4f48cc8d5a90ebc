//! The remote SQL execution service the driver talks to.
//!
//! This module provides:
//! - `DataApiService` trait: the request/response calls the service exposes
//! - `HttpDataApiService`: JSON-over-HTTP implementation
//! - `InMemoryDataApiService`: scripted implementation for tests

pub mod http;
pub mod in_memory;
pub mod wire;

use async_trait::async_trait;

use crate::error::Result;

pub use self::http::{HttpDataApiService, HttpServiceConfig};
pub use self::in_memory::{
    InMemoryDataApiService, InMemoryResponseBuilder, RecordedCall, TokenOutcome,
};
pub use self::wire::{
    ArrayValue, BeginTransactionRequest, BeginTransactionResponse, ColumnMetadata,
    CommitTransactionRequest, CommitTransactionResponse, ExecuteStatementRequest,
    ExecuteStatementResponse, Field, RollbackTransactionRequest, RollbackTransactionResponse,
    SqlParameter, TypeHint,
};

/// Abstract interface for the stateless SQL execution service.
///
/// Every call is a single synchronous request/response exchange; no
/// connection state survives between calls apart from transaction tokens.
/// Implementations map failures onto the driver's error taxonomy:
/// `Connectivity` for transport problems, `RemoteRejected` for refused
/// statements, `TransactionExpired` for unknown or timed-out tokens.
/// Implementations must not retry on their own.
#[async_trait]
pub trait DataApiService: Send + Sync + std::fmt::Debug {
    async fn execute_statement(
        &self,
        request: ExecuteStatementRequest,
    ) -> Result<ExecuteStatementResponse>;

    async fn begin_transaction(
        &self,
        request: BeginTransactionRequest,
    ) -> Result<BeginTransactionResponse>;

    async fn commit_transaction(
        &self,
        request: CommitTransactionRequest,
    ) -> Result<CommitTransactionResponse>;

    async fn rollback_transaction(
        &self,
        request: RollbackTransactionRequest,
    ) -> Result<RollbackTransactionResponse>;
}
