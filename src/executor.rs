use std::sync::Arc;

use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{DataApiError, Result};
use crate::service::wire::{ExecuteStatementResponse, SqlParameter};
use crate::types::marshal::{column_names, decode_records, from_wire, to_wire_positional};
use crate::types::{ExecutionResult, SqlValue};

/// Issues single statement calls against the service.
///
/// The executor never retries. A `Connectivity` error means the outcome of
/// the statement is unknown; retrying is the caller's decision.
#[derive(Debug, Clone)]
pub struct StatementExecutor {
    config: Arc<ServiceConfig>,
}

impl StatementExecutor {
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Execute `sql` with already-marshalled parameters, optionally inside a transaction.
    pub async fn execute(
        &self,
        sql: &str,
        params: Vec<SqlParameter>,
        transaction_id: Option<&str>,
    ) -> Result<ExecutionResult> {
        if sql.trim().is_empty() {
            return Err(DataApiError::InvalidState(
                "cannot execute an empty SQL statement".to_string(),
            ));
        }

        debug!(
            "Executing statement ({} params, transaction: {}): {}",
            params.len(),
            transaction_id.unwrap_or("none"),
            sql
        );

        let request = self.config.execute_request(sql, params, transaction_id);
        let response = self.config.client().execute_statement(request).await?;
        let result = decode_response(response)?;

        debug!(
            "Statement returned {} rows, {} affected",
            result.len(),
            result.affected_rows()
        );
        Ok(result)
    }

    /// Marshal native values as positional parameters (`:0`, `:1`, ...) and execute.
    pub async fn execute_values(
        &self,
        sql: &str,
        values: &[SqlValue],
        transaction_id: Option<&str>,
    ) -> Result<ExecutionResult> {
        let params = to_wire_positional(values)?;
        self.execute(sql, params, transaction_id).await
    }
}

fn decode_response(response: ExecuteStatementResponse) -> Result<ExecutionResult> {
    let affected_rows = u64::try_from(response.number_of_records_updated).unwrap_or(0);

    let generated_id = match response.generated_fields.and_then(|f| f.into_iter().next()) {
        Some(field) => Some(from_wire(field)?).filter(|v| !v.is_null()),
        None => None,
    };

    // Without metadata, fields are keyed by position.
    let records = response.records.unwrap_or_default();
    let (columns, rows) = match response.column_metadata {
        Some(metadata) => (column_names(&metadata), decode_records(records, &metadata)?),
        None => (Vec::new(), decode_records(records, &[])?),
    };

    Ok(ExecutionResult::new(
        columns,
        rows,
        affected_rows,
        generated_id,
    ))
}
