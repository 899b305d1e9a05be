//! Typed failure taxonomy for the core.
//!
//! Every repository and service call returns one of these; the API layer
//! owns the mapping to HTTP statuses. The single place a failure is allowed
//! to vanish is current-user resolution, which degrades to anonymous.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("a user named '{0}' already exists")]
    UserExists(String),

    #[error("no user named '{0}' exists")]
    NoSuchUser(String),

    #[error("no link '{0}' exists")]
    NoSuchLink(i32),

    #[error("no such invite code: {0}")]
    NoSuchInvite(String),

    #[error("invite code {0} already taken")]
    AlreadyUsedInvite(String),

    #[error("wrong password for user {0}")]
    BadPassword(String),

    #[error("invalid or tampered token")]
    InvalidToken,

    #[error("'{0}' is not a valid tag name")]
    InvalidTagName(String),

    #[error("insufficient permissions")]
    BadPermissions,

    #[error("problem with uploaded file: {0}")]
    BadFileUpload(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
