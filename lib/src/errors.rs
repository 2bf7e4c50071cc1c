//! Error types for the driver.
//!
//! `GatewayError` describes what went wrong on the wire; `DriverError` is what callers of the
//! session API see. A gateway failure is folded into the driver taxonomy at the operation
//! boundary: a query read becomes `QueryEvaluation`, an update becomes `UpdateExecution`, and a
//! write (flush, remove, clear) becomes `Repository`.

use std::sync::Arc;
use thiserror::Error;

/// Shared, clonable error source.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Failure reported by a [`RemoteStoreGateway`](crate::gateway::RemoteStoreGateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Operation invalid for the current transaction state.
    #[error("{0}")]
    TransactionState(String),
    #[error("query evaluation failed: {message}")]
    QueryEvaluation {
        message: String,
        #[source]
        source: Option<SharedError>,
    },
    #[error("update execution failed: {message}")]
    UpdateExecution {
        message: String,
        #[source]
        source: Option<SharedError>,
    },
    /// An input document could not be decoded.
    #[error("failed to parse RDF input: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<SharedError>,
    },
    /// The session is closed or was never initialized.
    #[error("repository state error: {0}")]
    RepositoryState(String),
    /// A write against the remote store failed.
    #[error("repository operation failed: {message}")]
    Repository {
        message: String,
        #[source]
        source: Option<SharedError>,
    },
    #[error("unsupported query language: {0}")]
    UnsupportedQueryLanguage(String),
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl DriverError {
    pub fn query_evaluation(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DriverError::QueryEvaluation {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn update_execution(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DriverError::UpdateExecution {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn parse(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DriverError::Parse {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn repository(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DriverError::Repository {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Rewraps any error as a query evaluation failure, keeping the original message.
    /// Used at the query-object boundary where every failure collapses into one class.
    pub fn into_query_evaluation(self) -> Self {
        match self {
            e @ DriverError::QueryEvaluation { .. } => e,
            e @ (DriverError::RepositoryState(_) | DriverError::TransactionState(_)) => e,
            other => DriverError::QueryEvaluation {
                message: other.to_string(),
                source: Some(Arc::new(other)),
            },
        }
    }

    pub fn is_transaction_state(&self) -> bool {
        matches!(self, DriverError::TransactionState(_))
    }
}

pub type Result<T, E = DriverError> = std::result::Result<T, E>;
