//! Error taxonomy for catalog operations. Every variant ends the current
//! operation and is shown to the user; none of them are retried.

use std::fmt;

use thiserror::Error;

use crate::access::{Operation, Role};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("access denied: {operation} requires the {required} role or higher")]
    Unauthorized { operation: Operation, required: Role },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A defect in the caller, such as a search field outside the presented set.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used for logging and for colouring the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    Validation,
    Connection,
    Store,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authorization => "authorization",
            ErrorKind::Validation => "validation",
            ErrorKind::Connection => "connection",
            ErrorKind::Store => "store",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Unauthorized { .. } => ErrorKind::Authorization,
            CatalogError::Validation(_) => ErrorKind::Validation,
            CatalogError::Connection(_) => ErrorKind::Connection,
            CatalogError::Store(_) => ErrorKind::Store,
            CatalogError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Rejected user input. Raised before any connection is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("incomplete input: {field} is required")]
    Incomplete { field: &'static str },

    #[error("malformed numeric field: {field} must be an integer, got \"{value}\"")]
    Malformed { field: &'static str, value: String },
}

/// Failure to reach an endpoint as a given principal.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The credential table has no entry for a role. This is a configuration
    /// defect: the role enum and the table must list the same roles.
    #[error("no credentials configured for role {0}")]
    MissingCredential(Role),

    #[error("role \"{0}\" does not exist")]
    UnknownPrincipal(String),

    #[error("password authentication failed for user \"{0}\"")]
    AuthenticationFailed(String),

    #[error("permission denied: \"{0}\" is not a superuser")]
    NotSuperuser(String),

    #[error("database \"{0}\" does not exist")]
    MissingDatabase(String),

    #[error("failed to open {endpoint}: {source}")]
    Engine {
        endpoint: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

/// The store refused or failed a well-formed call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{procedure} failed: {source}")]
    Sql {
        procedure: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{procedure} failed: {source}")]
    Io {
        procedure: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("no book with id {0}")]
    MissingId(i64),

    #[error("no book titled \"{0}\"")]
    MissingTitle(String),
}

impl StoreError {
    /// Adapter for `map_err` on rusqlite calls inside a named procedure.
    pub(crate) fn sql(procedure: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |source| StoreError::Sql { procedure, source }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
