//! Error types for the data-access layer.

/// Errors raised while running a repository operation.
///
/// The repository never returns these directly; they are rendered into the
/// message of an error envelope.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The database could not be opened or configured.
    #[error("failed to open database connection: {0}")]
    Open(rusqlite::Error),

    /// The driver rejected or failed a statement.
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),

    /// The command text holds no SQL statement.
    #[error("query contains no SQL statements")]
    EmptyQuery,

    /// A procedure name was not found in the catalog.
    #[error("procedure '{0}' is not defined")]
    UnknownProcedure(String),

    /// The blocking task running the operation failed to complete.
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
