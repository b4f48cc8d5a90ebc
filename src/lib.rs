//! data-api - An async driver for a stateless SQL execution service
//!
//! The service accepts one parameterized statement per request and keeps
//! no session between requests. This crate gives it the shape of a
//! connection-oriented driver: logical connections, transactions carried
//! as service tokens, typed values in and out, and a query builder on top.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use data_api::{Client, Engine, ServiceConfig, WhereClause};
//! use data_api::service::{HttpDataApiService, HttpServiceConfig};
//!
//! let service = Arc::new(HttpDataApiService::new(endpoint, HttpServiceConfig::default())?);
//! let client = Client::from_config(ServiceConfig::from_env(service)?, Engine::Postgres);
//!
//! let mut tx = client.begin().await?;
//! tx.querier()
//!     .insert_into("person")
//!     .value("first_name", "Ada")
//!     .value("last_name", "Lovelace")
//!     .execute()
//!     .await?;
//! tx.commit().await?;
//!
//! let row = client
//!     .querier()
//!     .select()
//!     .columns(&["id", "first_name"])
//!     .from("person")
//!     .where_(WhereClause::eq("last_name", "Lovelace"))
//!     .execute()
//!     .await?
//!     .single_row()?;
//!
//! let id: i64 = row.get_as("id")?;
//! ```

pub mod builders;
pub mod clauses;
pub mod config;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod logging;
pub mod querier;
pub mod service;
pub mod traits;
pub mod transaction;
pub mod types;

mod client;

// Re-export main types for convenient access
pub use clauses::WhereClause;
pub use client::{Client, Transaction};
pub use config::ServiceConfig;
pub use dialect::{DataApiDialect, Dialect, Engine};
pub use drivers::{ConnectionHandle, DataApiDriver};
pub use error::{DataApiError, ErrorKind, Result};
pub use querier::Querier;
pub use traits::{Driver, QueryExecutor, ReleaseOutcome};
pub use transaction::{TransactionCoordinator, TransactionHandle, TransactionState};
pub use types::{CompiledQuery, ExecutionResult, Row, SqlValue};
