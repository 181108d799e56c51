//! Subscription engine error taxonomy.
//!
//! # Mapping to callers
//!
//! | Error | Meaning for the web layer |
//! |-------|---------------------------|
//! | NotFound | 404, never defaulted to another tenant |
//! | InvalidInput | 400, rejected before any mutation |
//! | Conflict | 409, `reason` is safe to show to the user |
//! | SignatureMismatch | 400, payment not applied |
//! | StorageUnavailable | 503, lock retries exhausted |
//! | ExternalService | 502, gateway or mail failure |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced by the subscription engine and its handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{reason}")]
    Conflict { code: ErrorCode, reason: String },

    #[error("Payment signature verification failed")]
    SignatureMismatch,

    #[error("Storage temporarily unavailable: {0}")]
    StorageUnavailable(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SubscriptionError::NotFound(what.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        SubscriptionError::InvalidInput(message.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        SubscriptionError::Conflict {
            code: ErrorCode::SubscriptionConflict,
            reason: reason.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::NotFound(_) => ErrorCode::NotFound,
            SubscriptionError::InvalidInput(_) => ErrorCode::ValidationFailed,
            SubscriptionError::Conflict { code, .. } => *code,
            SubscriptionError::SignatureMismatch => ErrorCode::SignatureMismatch,
            SubscriptionError::StorageUnavailable(_) => ErrorCode::StorageUnavailable,
            SubscriptionError::ExternalService(_) => ErrorCode::ExternalServiceError,
            SubscriptionError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns true if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::StorageUnavailable(_) | SubscriptionError::ExternalService(_)
        )
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::TenantNotFound | ErrorCode::NotFound => {
                SubscriptionError::NotFound(err.message)
            }
            ErrorCode::ValidationFailed | ErrorCode::UnknownPlan => {
                SubscriptionError::InvalidInput(err.message)
            }
            ErrorCode::SubscriptionConflict
            | ErrorCode::InvalidStateTransition
            | ErrorCode::SlugTaken
            | ErrorCode::EmailTaken
            | ErrorCode::DuplicatePayment => SubscriptionError::Conflict {
                code: err.code,
                reason: err.message,
            },
            ErrorCode::SignatureMismatch => SubscriptionError::SignatureMismatch,
            // A busy error reaching this point already ran out of retries.
            ErrorCode::StorageBusy | ErrorCode::StorageUnavailable => {
                SubscriptionError::StorageUnavailable(err.message)
            }
            ErrorCode::ExternalServiceError => SubscriptionError::ExternalService(err.message),
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                SubscriptionError::Infrastructure(err.message)
            }
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::InvalidInput(err.to_string())
    }
}
