//! Error types for the data layer.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored enum column carried an unrecognized value.
    #[error("Unrecognized stored value in column {column}: {value}")]
    BadColumn {
        /// The offending column.
        column: &'static str,
        /// The value that failed to parse.
        value: String,
    },

    /// A row expected to exist was absent.
    #[error("Row not found: {0}")]
    RowNotFound(&'static str),

    /// The per-map advisory lock is held by another invocation.
    #[error("Map {0} is locked by another tick invocation")]
    MapLocked(uuid::Uuid),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether the error is a uniqueness violation (duplicate e-mail,
    /// company name, double listing), which callers surface as a
    /// conflict rather than an internal failure.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Postgres(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
