/// Why a single save attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The owning add-on is not in the registry.
    #[error("Add-on '{0}' is not installed")]
    UnknownAddon(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
