//! Application-wide error types.

use thiserror::Error;

use crate::chain::ChainError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} {1} not found")]
    NotFound(&'static str, i64),

    /// Actor lacks the role or ownership the operation requires.
    /// Raised before any external call is attempted.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// A state precondition failed (offer no longer active, property already
    /// sold, inspection pending). Also raised before any external call.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The cursor row moved under us mid-batch. The batch rolls back and the
    /// next tick retries from the new cursor.
    #[error("Cursor conflict: expected last_block {expected}")]
    CursorConflict { expected: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
