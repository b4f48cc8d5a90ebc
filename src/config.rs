use std::sync::Arc;

use crate::error::{DataApiError, Result};
use crate::service::wire::{
    BeginTransactionRequest, CommitTransactionRequest, ExecuteStatementRequest,
    RollbackTransactionRequest, SqlParameter,
};
use crate::service::DataApiService;

/// Environment variable holding the secret reference.
pub const SECRET_ENV: &str = "RDS_SECRET";
/// Environment variable holding the resource (cluster) reference.
pub const RESOURCE_ENV: &str = "RDS_ARN";
/// Environment variable holding the logical database name.
pub const DATABASE_ENV: &str = "DATA_API_DATABASE";
/// Optional environment variable holding the schema.
pub const SCHEMA_ENV: &str = "DATA_API_SCHEMA";

/// Immutable driver configuration: the service client plus the identifiers
/// sent with every request.
#[derive(Clone)]
pub struct ServiceConfig {
    client: Arc<dyn DataApiService>,
    database: String,
    schema: Option<String>,
    secret_arn: String,
    resource_arn: String,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("client", &self.client)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("secret_arn", &"<redacted>")
            .field("resource_arn", &self.resource_arn)
            .finish()
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Build a config from `RDS_SECRET`, `RDS_ARN`, `DATA_API_DATABASE` and
    /// the optional `DATA_API_SCHEMA`.
    pub fn from_env(client: Arc<dyn DataApiService>) -> Result<Self> {
        Self::from_lookup(client, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        client: Arc<dyn DataApiService>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| {
                DataApiError::Config(format!("environment variable {} is not set", key))
            })
        };

        let mut builder = ServiceConfig::builder()
            .client(client)
            .secret_arn(require(SECRET_ENV)?)
            .resource_arn(require(RESOURCE_ENV)?)
            .database(require(DATABASE_ENV)?);
        if let Some(schema) = lookup(SCHEMA_ENV) {
            builder = builder.schema(schema);
        }
        builder.build()
    }

    pub fn client(&self) -> &Arc<dyn DataApiService> {
        &self.client
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn secret_arn(&self) -> &str {
        &self.secret_arn
    }

    pub fn resource_arn(&self) -> &str {
        &self.resource_arn
    }

    pub(crate) fn execute_request(
        &self,
        sql: &str,
        parameters: Vec<SqlParameter>,
        transaction_id: Option<&str>,
    ) -> ExecuteStatementRequest {
        ExecuteStatementRequest {
            resource_arn: self.resource_arn.clone(),
            secret_arn: self.secret_arn.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            sql: sql.to_string(),
            parameters,
            transaction_id: transaction_id.map(str::to_string),
            include_result_metadata: true,
        }
    }

    pub(crate) fn begin_request(&self) -> BeginTransactionRequest {
        BeginTransactionRequest {
            resource_arn: self.resource_arn.clone(),
            secret_arn: self.secret_arn.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
        }
    }

    pub(crate) fn commit_request(&self, transaction_id: &str) -> CommitTransactionRequest {
        CommitTransactionRequest {
            resource_arn: self.resource_arn.clone(),
            secret_arn: self.secret_arn.clone(),
            transaction_id: transaction_id.to_string(),
        }
    }

    pub(crate) fn rollback_request(&self, transaction_id: &str) -> RollbackTransactionRequest {
        RollbackTransactionRequest {
            resource_arn: self.resource_arn.clone(),
            secret_arn: self.secret_arn.clone(),
            transaction_id: transaction_id.to_string(),
        }
    }
}

/// Builder for [`ServiceConfig`]. All fields except `schema` are required.
#[derive(Default)]
pub struct ServiceConfigBuilder {
    client: Option<Arc<dyn DataApiService>>,
    database: Option<String>,
    schema: Option<String>,
    secret_arn: Option<String>,
    resource_arn: Option<String>,
}

impl ServiceConfigBuilder {
    pub fn client(mut self, client: Arc<dyn DataApiService>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn secret_arn(mut self, secret_arn: impl Into<String>) -> Self {
        self.secret_arn = Some(secret_arn.into());
        self
    }

    pub fn resource_arn(mut self, resource_arn: impl Into<String>) -> Self {
        self.resource_arn = Some(resource_arn.into());
        self
    }

    pub fn build(self) -> Result<ServiceConfig> {
        let client = self
            .client
            .ok_or_else(|| DataApiError::Config("service client is required".to_string()))?;
        Ok(ServiceConfig {
            client,
            database: non_empty("database", self.database)?,
            schema: self.schema.filter(|s| !s.is_empty()),
            secret_arn: non_empty("secret_arn", self.secret_arn)?,
            resource_arn: non_empty("resource_arn", self.resource_arn)?,
        })
    }
}

fn non_empty(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DataApiError::Config(format!("{} is required", field))),
    }
}
