//! Error handler for pixdiario.

use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Enum representing store operation errors.
///
/// Every variant is surfaced verbatim to the caller; storage I/O failures
/// are the only faults that do not reach this enum, they are logged and the
/// store degrades to session-only state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account banned for terms violation")]
    AccountBanned,

    #[error("identity data is blocked for new registrations")]
    BlockedIdentity,

    #[error("email already in use")]
    EmailInUse,

    #[error("financial profile must be completed to participate")]
    IncompleteProfile,

    #[error("event not found")]
    EventNotFound,

    #[error("an active participation already exists for this event")]
    DuplicateActiveRequest,

    #[error("user not found")]
    UserNotFound,

    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),
}
