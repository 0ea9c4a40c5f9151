#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Stored record could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("No record for `{link}`.")]
    NotFound { link: String },

    #[error("A record for `{link}` already exists.")]
    AlreadyExists { link: String },
}
