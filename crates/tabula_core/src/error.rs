use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Mutation failed: {0}")]
    Mutation(String),

    /// Staged cell text failed to parse as JSON. The editor stays open
    /// with the staged text intact; the detail is kept for logging.
    #[error("Invalid JSON")]
    InvalidJson(String),

    #[error("Cannot update: No primary key found")]
    MissingPrimaryKey,

    #[error("Failed to save preferences: {0}")]
    PreferenceStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
