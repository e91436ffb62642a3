use rust_decimal::Decimal;
use thiserror::Error;

use crate::auth::AuthError;
use crate::calculations::BracketError;
use crate::db::RepositoryError;

/// User-facing failure of a portal action. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    /// Missing or out-of-range user input.
    #[error("{0}")]
    Validation(String),

    #[error("no tax bracket covers net profit {0}")]
    NoBracketForProfit(Decimal),

    #[error("this account is bound to another device; contact {contact_hint} to reset it")]
    DeviceMismatch { contact_hint: String },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account not found")]
    AccountNotFound,

    #[error("administrator role required")]
    Forbidden,

    /// Store failure, message passed through (or replaced by a friendlier one
    /// for known cases).
    #[error("{0}")]
    RemoteOperationFailed(String),
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Maps known store failures to a message a guild member can act on.
/// Unknown failures keep their original text.
pub fn friendly_message(err: &RepositoryError) -> String {
    let raw = err.to_string();
    let lowered = raw.to_lowercase();
    if lowered.contains("unique constraint failed") || lowered.contains("already exists") {
        "this record already exists".to_string()
    } else if lowered.contains("invalid access code") {
        "the access code is invalid or expired".to_string()
    } else if lowered.contains("foreign key constraint failed") {
        "a referenced record does not exist".to_string()
    } else if matches!(err, RepositoryError::NotFound) {
        "the requested record was not found".to_string()
    } else {
        raw
    }
}

impl From<RepositoryError> for PortalError {
    fn from(err: RepositoryError) -> Self {
        Self::RemoteOperationFailed(friendly_message(&err))
    }
}

impl From<BracketError> for PortalError {
    fn from(err: BracketError) -> Self {
        match err {
            BracketError::NoBracketForProfit(profit) => Self::NoBracketForProfit(profit),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<AuthError> for PortalError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::DeviceMismatch { contact_hint } => Self::DeviceMismatch { contact_hint },
            AuthError::AccountNotFound => Self::AccountNotFound,
            AuthError::Forbidden => Self::Forbidden,
            AuthError::Remote(message) => Self::RemoteOperationFailed(message),
        }
    }
}
