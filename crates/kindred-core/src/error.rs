use chrono::{DateTime, Utc};
use thiserror::Error;

use kindred_store::StoreError;

/// Structured results every core operation returns to the caller boundary.
///
/// The first group are policy outcomes; [`CoreError::Store`] and
/// [`CoreError::Credential`] are the internal-failure kinds whose effects
/// must be treated as not-applied.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or missing input (including disallowed avatar values).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The username belonged to a deleted account and is reserved forever.
    #[error("username permanently reserved")]
    ReservedUsername,

    /// A pending friend request already exists for this ordered pair.
    #[error("friend request already sent")]
    DuplicateRequest,

    /// The friend request was already accepted or rejected.
    #[error("friend request already handled")]
    RequestClosed,

    /// This origin address has already filed against the target.
    #[error("this address already reported this account")]
    DuplicateOrigin,

    /// This reporter has already filed against the target.
    #[error("you already reported this account")]
    DuplicateReporter,

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown account, username, or request id.
    #[error("not found")]
    NotFound,

    /// No eligible account shares the requested attribute.
    #[error("no match found")]
    NoMatch,

    /// The account is inside an active ban window.
    #[error("account is banned until {until}")]
    Banned { until: DateTime<Utc> },

    /// Uniform authentication failure: never reveals whether the username
    /// exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing failure.
    #[error("credential hashing error: {0}")]
    Credential(String),

    /// Storage failure; the operation must be treated as not applied.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Store(StoreError::from(e))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
