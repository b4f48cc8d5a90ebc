use thiserror::Error;

/// Error type for data-api operations.
///
/// Remote failures keep the service's message verbatim so a query-builder
/// can translate them the same way it translates errors from other backends.
#[derive(Debug, Error)]
pub enum DataApiError {
    /// A native value could not be converted to or from the wire format.
    #[error("Marshal error: {0}")]
    Marshal(String),

    /// The service could not be reached. The statement may or may not have been applied.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The service parsed and refused the statement.
    #[error("Remote rejected statement: {0}")]
    RemoteRejected(String),

    /// The transaction token is unknown to the service or timed out.
    #[error("Transaction expired: {0}")]
    TransactionExpired(String),

    #[error("Begin transaction failed: {0}")]
    BeginFailed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Coarse classification of a [`DataApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Marshal,
    Connectivity,
    RemoteRejected,
    TransactionExpired,
    BeginFailed,
    InvalidState,
    Config,
    ResultAccess,
}

impl DataApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataApiError::Marshal(_) => ErrorKind::Marshal,
            DataApiError::Connectivity(_) => ErrorKind::Connectivity,
            DataApiError::RemoteRejected(_) => ErrorKind::RemoteRejected,
            DataApiError::TransactionExpired(_) => ErrorKind::TransactionExpired,
            DataApiError::BeginFailed(_) => ErrorKind::BeginFailed,
            DataApiError::InvalidState(_) => ErrorKind::InvalidState,
            DataApiError::Config(_) => ErrorKind::Config,
            DataApiError::UnexpectedRowCount { .. }
            | DataApiError::ColumnNotFound(_)
            | DataApiError::TypeMismatch { .. } => ErrorKind::ResultAccess,
        }
    }

    /// The text reported by the remote service, if this error came from it.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            DataApiError::Connectivity(msg)
            | DataApiError::RemoteRejected(msg)
            | DataApiError::TransactionExpired(msg)
            | DataApiError::BeginFailed(msg) => Some(msg),
            _ => None,
        }
    }

    /// Only transport failures may be retried, and only for idempotent statements.
    /// The driver itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataApiError::Connectivity(_))
    }
}

/// Result type alias for data-api operations
pub type Result<T> = std::result::Result<T, DataApiError>;
