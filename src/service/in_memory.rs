use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{DataApiError, Result};
use crate::service::wire::{
    BeginTransactionRequest, BeginTransactionResponse, ColumnMetadata, CommitTransactionRequest,
    CommitTransactionResponse, ExecuteStatementRequest, ExecuteStatementResponse, Field,
    RollbackTransactionRequest, RollbackTransactionResponse, SqlParameter,
};
use crate::service::DataApiService;

/// A recorded service call for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Execute(ExecuteStatementRequest),
    Begin(BeginTransactionRequest),
    Commit { transaction_id: String },
    Rollback { transaction_id: String },
}

/// What the in-memory service knows about a transaction token it issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    Open,
    Committed,
    RolledBack,
    Expired,
}

enum Scripted {
    Respond(ExecuteStatementResponse),
    Fail(DataApiError),
}

#[derive(Default)]
struct State {
    scripted: VecDeque<Scripted>,
    default_response: ExecuteStatementResponse,
    calls: Vec<RecordedCall>,
    tokens: HashMap<String, TokenOutcome>,
    issued: u64,
    begin_failures: VecDeque<DataApiError>,
    commit_failures: VecDeque<DataApiError>,
    rollback_failures: VecDeque<DataApiError>,
    /// Rows inserted under a token, per table, pending commit.
    staged: HashMap<String, Vec<(String, i64)>>,
    /// Rows visible outside any transaction, per table.
    committed_rows: HashMap<String, i64>,
}

impl State {
    fn record_insert(&mut self, table: String, rows: i64, transaction_id: Option<String>) {
        match transaction_id {
            Some(id) => self.staged.entry(id).or_default().push((table, rows)),
            None => *self.committed_rows.entry(table).or_insert(0) += rows,
        }
    }

    fn publish(&mut self, transaction_id: &str) {
        for (table, rows) in self.staged.remove(transaction_id).unwrap_or_default() {
            *self.committed_rows.entry(table).or_insert(0) += rows;
        }
    }
}

/// An in-memory SQL execution service for testing.
///
/// Statement outcomes are scripted up front and returned in FIFO order;
/// every call is recorded. Transaction tokens are issued and tracked like
/// the real service does: statements, commits and rollbacks that carry a
/// token the service no longer knows fail with `TransactionExpired`.
///
/// Successful `INSERT INTO <table>` statements count their
/// `numberOfRecordsUpdated` against the table. Under a token the count is
/// staged and only becomes visible through [`committed_rows`] on commit;
/// rollback and expiry discard it.
///
/// [`committed_rows`]: InMemoryDataApiService::committed_rows
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use data_api::service::{Field, InMemoryDataApiService, InMemoryResponseBuilder};
///
/// let service = Arc::new(
///     InMemoryDataApiService::new().with_response(
///         InMemoryResponseBuilder::new()
///             .column("id", "int4")
///             .column("first_name", "varchar")
///             .row(vec![Field::LongValue(1), Field::StringValue("Ada".into())])
///             .build(),
///     ),
/// );
/// ```
#[derive(Default)]
pub struct InMemoryDataApiService {
    state: Mutex<State>,
}

impl std::fmt::Debug for InMemoryDataApiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("InMemoryDataApiService")
            .field("scripted", &state.scripted.len())
            .field("calls", &state.calls.len())
            .field("tokens", &state.tokens.len())
            .finish()
    }
}

impl InMemoryDataApiService {
    /// Create a new in-memory service with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a response to be returned by the next statement.
    pub fn with_response(self, response: ExecuteStatementResponse) -> Self {
        self.push_response(response);
        self
    }

    /// Add multiple responses to be returned by subsequent statements.
    pub fn with_responses(
        self,
        responses: impl IntoIterator<Item = ExecuteStatementResponse>,
    ) -> Self {
        let mut state = self.state();
        for response in responses {
            state.scripted.push_back(Scripted::Respond(response));
        }
        drop(state);
        self
    }

    /// Make the next statement fail with `error` instead of responding.
    pub fn with_error(self, error: DataApiError) -> Self {
        self.push_error(error);
        self
    }

    /// Set a default response to use when no scripted outcomes remain.
    pub fn with_default_response(self, response: ExecuteStatementResponse) -> Self {
        self.state().default_response = response;
        self
    }

    pub fn push_response(&self, response: ExecuteStatementResponse) {
        self.state().scripted.push_back(Scripted::Respond(response));
    }

    pub fn push_error(&self, error: DataApiError) {
        self.state().scripted.push_back(Scripted::Fail(error));
    }

    pub fn fail_next_begin(&self, error: DataApiError) {
        self.state().begin_failures.push_back(error);
    }

    pub fn fail_next_commit(&self, error: DataApiError) {
        self.state().commit_failures.push_back(error);
    }

    pub fn fail_next_rollback(&self, error: DataApiError) {
        self.state().rollback_failures.push_back(error);
    }

    /// Simulate a service-side timeout of an open transaction.
    pub fn expire_transaction(&self, transaction_id: &str) {
        let mut state = self.state();
        if let Some(outcome) = state.tokens.get_mut(transaction_id) {
            *outcome = TokenOutcome::Expired;
            state.staged.remove(transaction_id);
        }
    }

    /// Rows inserted into `table` that are visible outside any transaction.
    pub fn committed_rows(&self, table: &str) -> i64 {
        self.state().committed_rows.get(table).copied().unwrap_or(0)
    }

    pub fn token_outcome(&self, transaction_id: &str) -> Option<TokenOutcome> {
        self.state().tokens.get(transaction_id).copied()
    }

    /// Tokens that were issued and are still open.
    pub fn open_transactions(&self) -> Vec<String> {
        let mut open: Vec<String> = self
            .state()
            .tokens
            .iter()
            .filter(|(_, outcome)| **outcome == TokenOutcome::Open)
            .map(|(id, _)| id.clone())
            .collect();
        open.sort();
        open
    }

    /// Get all recorded calls in the order they were made.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Get all executed statements in the order they were received.
    pub fn executed_statements(&self) -> Vec<ExecuteStatementRequest> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Execute(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Statements that carried the given transaction token, in order.
    pub fn statements_in(&self, transaction_id: &str) -> Vec<ExecuteStatementRequest> {
        self.executed_statements()
            .into_iter()
            .filter(|request| request.transaction_id.as_deref() == Some(transaction_id))
            .collect()
    }

    /// Get the last executed statement, if any.
    pub fn last_statement(&self) -> Option<ExecuteStatementRequest> {
        self.executed_statements().pop()
    }

    pub fn commit_count(&self) -> usize {
        self.count_calls(|call| matches!(call, RecordedCall::Commit { .. }))
    }

    pub fn rollback_count(&self) -> usize {
        self.count_calls(|call| matches!(call, RecordedCall::Rollback { .. }))
    }

    fn count_calls(&self, pred: impl Fn(&RecordedCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| pred(call)).count()
    }

    /// Clear all recorded calls. Issued tokens are kept.
    pub fn clear_recorded_calls(&self) {
        self.state().calls.clear();
    }

    /// Assert that the last statement matches the expected SQL and parameters.
    pub fn assert_last_statement(&self, expected_sql: &str, expected_params: &[SqlParameter]) {
        let last = self.last_statement().expect("No statements were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.parameters, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.parameters
        );
    }

    /// Assert that exactly n statements were executed.
    pub fn assert_statement_count(&self, expected: usize) {
        let actual = self.executed_statements().len();
        assert_eq!(
            actual, expected,
            "Statement count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }
}

/// Table named by an `INSERT INTO <table> ...` statement, unquoted.
fn inserted_table(sql: &str) -> Option<String> {
    let mut words = sql.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("insert") || !words.next()?.eq_ignore_ascii_case("into")
    {
        return None;
    }
    let table = words.next()?.split('(').next()?;
    let table = table.trim_matches(|c| c == '"' || c == '`');
    (!table.is_empty()).then(|| table.to_string())
}

fn check_token(state: &State, transaction_id: &str) -> Result<()> {
    match state.tokens.get(transaction_id) {
        Some(TokenOutcome::Open) => Ok(()),
        _ => Err(DataApiError::TransactionExpired(format!(
            "Transaction {} is not found",
            transaction_id
        ))),
    }
}

#[async_trait]
impl DataApiService for InMemoryDataApiService {
    async fn execute_statement(
        &self,
        request: ExecuteStatementRequest,
    ) -> Result<ExecuteStatementResponse> {
        let mut state = self.state();
        let token = request.transaction_id.clone();
        let table = inserted_table(&request.sql);
        state.calls.push(RecordedCall::Execute(request));

        if let Some(ref id) = token {
            check_token(&state, id)?;
        }

        let response = match state.scripted.pop_front() {
            Some(Scripted::Respond(response)) => response,
            Some(Scripted::Fail(error)) => return Err(error),
            None => state.default_response.clone(),
        };
        if let Some(table) = table {
            state.record_insert(table, response.number_of_records_updated.max(0), token);
        }
        Ok(response)
    }

    async fn begin_transaction(
        &self,
        request: BeginTransactionRequest,
    ) -> Result<BeginTransactionResponse> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Begin(request));

        if let Some(error) = state.begin_failures.pop_front() {
            return Err(error);
        }

        state.issued += 1;
        let transaction_id = format!("tx-{}", state.issued);
        state
            .tokens
            .insert(transaction_id.clone(), TokenOutcome::Open);
        Ok(BeginTransactionResponse { transaction_id })
    }

    async fn commit_transaction(
        &self,
        request: CommitTransactionRequest,
    ) -> Result<CommitTransactionResponse> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Commit {
            transaction_id: request.transaction_id.clone(),
        });

        check_token(&state, &request.transaction_id)?;
        if let Some(error) = state.commit_failures.pop_front() {
            return Err(error);
        }

        state.publish(&request.transaction_id);
        state
            .tokens
            .insert(request.transaction_id, TokenOutcome::Committed);
        Ok(CommitTransactionResponse {
            transaction_status: "Transaction Committed".to_string(),
        })
    }

    async fn rollback_transaction(
        &self,
        request: RollbackTransactionRequest,
    ) -> Result<RollbackTransactionResponse> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Rollback {
            transaction_id: request.transaction_id.clone(),
        });

        check_token(&state, &request.transaction_id)?;
        if let Some(error) = state.rollback_failures.pop_front() {
            return Err(error);
        }

        state.staged.remove(&request.transaction_id);
        state
            .tokens
            .insert(request.transaction_id, TokenOutcome::RolledBack);
        Ok(RollbackTransactionResponse {
            transaction_status: "Rollback Complete".to_string(),
        })
    }
}

/// Builder for creating scripted statement responses easily.
#[derive(Default)]
pub struct InMemoryResponseBuilder {
    columns: Vec<ColumnMetadata>,
    records: Vec<Vec<Field>>,
    updated: i64,
    generated: Vec<Field>,
}

impl InMemoryResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result column with its engine type name.
    pub fn column(mut self, name: &str, type_name: &str) -> Self {
        self.columns.push(ColumnMetadata::named(name, type_name));
        self
    }

    /// Add a record of typed fields in column order.
    pub fn row(mut self, fields: Vec<Field>) -> Self {
        self.records.push(fields);
        self
    }

    /// Set the affected-row count.
    pub fn updated(mut self, count: i64) -> Self {
        self.updated = count;
        self
    }

    /// Add a generated field (e.g. an auto-increment id).
    pub fn generated(mut self, field: Field) -> Self {
        self.generated.push(field);
        self
    }

    /// Build the response. Without columns the response carries no result set.
    pub fn build(self) -> ExecuteStatementResponse {
        let has_result_set = !self.columns.is_empty();
        ExecuteStatementResponse {
            records: has_result_set.then_some(self.records),
            column_metadata: has_result_set.then_some(self.columns),
            number_of_records_updated: self.updated,
            generated_fields: (!self.generated.is_empty()).then_some(self.generated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execute(sql: &str, transaction_id: Option<&str>) -> ExecuteStatementRequest {
        ExecuteStatementRequest {
            resource_arn: "arn:cluster".into(),
            secret_arn: "arn:secret".into(),
            database: "scratch".into(),
            schema: None,
            sql: sql.into(),
            parameters: Vec::new(),
            transaction_id: transaction_id.map(str::to_string),
            include_result_metadata: true,
        }
    }

    fn begin() -> BeginTransactionRequest {
        BeginTransactionRequest {
            resource_arn: "arn:cluster".into(),
            secret_arn: "arn:secret".into(),
            database: "scratch".into(),
            schema: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_responses_in_fifo_order() {
        let service = InMemoryDataApiService::new()
            .with_response(InMemoryResponseBuilder::new().updated(1).build())
            .with_error(DataApiError::RemoteRejected("boom".into()));

        let first = service.execute_statement(execute("A", None)).await.unwrap();
        assert_eq!(first.number_of_records_updated, 1);

        let second = service.execute_statement(execute("B", None)).await;
        assert!(matches!(second, Err(DataApiError::RemoteRejected(_))));

        let third = service.execute_statement(execute("C", None)).await.unwrap();
        assert_eq!(third, ExecuteStatementResponse::default());
        service.assert_statement_count(3);
    }

    #[tokio::test]
    async fn test_tokens_are_tracked() {
        let service = InMemoryDataApiService::new();
        let tx = service.begin_transaction(begin()).await.unwrap().transaction_id;
        assert_eq!(service.token_outcome(&tx), Some(TokenOutcome::Open));

        service.execute_statement(execute("A", Some(&tx))).await.unwrap();
        service
            .commit_transaction(CommitTransactionRequest {
                resource_arn: "arn:cluster".into(),
                secret_arn: "arn:secret".into(),
                transaction_id: tx.clone(),
            })
            .await
            .unwrap();
        assert_eq!(service.token_outcome(&tx), Some(TokenOutcome::Committed));

        let late = service.execute_statement(execute("B", Some(&tx))).await;
        assert!(matches!(late, Err(DataApiError::TransactionExpired(_))));
        assert_eq!(service.statements_in(&tx).len(), 2);
    }

    #[tokio::test]
    async fn test_expired_token_rejects_statements() {
        let service = InMemoryDataApiService::new();
        let tx = service.begin_transaction(begin()).await.unwrap().transaction_id;
        service.expire_transaction(&tx);

        let err = service
            .execute_statement(execute("A", Some(&tx)))
            .await
            .unwrap_err();
        assert!(matches!(err, DataApiError::TransactionExpired(_)));
        assert!(service.open_transactions().is_empty());
    }

    #[test]
    fn test_builder_without_columns_has_no_result_set() {
        let response = InMemoryResponseBuilder::new().updated(3).build();
        assert!(response.records.is_none());
        assert!(response.column_metadata.is_none());
        assert_eq!(response.number_of_records_updated, 3);
    }

    #[tokio::test]
    async fn test_inserts_visible_only_after_commit() {
        let service = InMemoryDataApiService::new()
            .with_default_response(InMemoryResponseBuilder::new().updated(1).build());

        service
            .execute_statement(execute("INSERT INTO person (first_name) VALUES (:0)", None))
            .await
            .unwrap();
        assert_eq!(service.committed_rows("person"), 1);

        let kept = service.begin_transaction(begin()).await.unwrap().transaction_id;
        let dropped = service.begin_transaction(begin()).await.unwrap().transaction_id;
        let quoted = "INSERT INTO \"person\" (\"first_name\") VALUES (:0)";
        for tx in [&kept, &dropped] {
            service
                .execute_statement(execute(quoted, Some(tx.as_str())))
                .await
                .unwrap();
        }
        service
            .execute_statement(execute("SELECT count(*) FROM person", Some(&kept)))
            .await
            .unwrap();
        assert_eq!(service.committed_rows("person"), 1);

        service
            .rollback_transaction(RollbackTransactionRequest {
                resource_arn: "arn:cluster".into(),
                secret_arn: "arn:secret".into(),
                transaction_id: dropped,
            })
            .await
            .unwrap();
        service
            .commit_transaction(CommitTransactionRequest {
                resource_arn: "arn:cluster".into(),
                secret_arn: "arn:secret".into(),
                transaction_id: kept,
            })
            .await
            .unwrap();
        assert_eq!(service.committed_rows("person"), 2);
        assert_eq!(service.committed_rows("pet"), 0);
    }

    #[test]
    fn test_inserted_table() {
        assert_eq!(inserted_table("insert into pet(name) values (:0)"), Some("pet".into()));
        assert_eq!(inserted_table("INSERT INTO `pet` (`name`) VALUES (:0)"), Some("pet".into()));
        assert_eq!(inserted_table("UPDATE pet SET name = :0"), None);
    }
}
