use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::cart::CartError;
use common::ledger::LedgerError;
use common::payout::{PayoutValidationError, TransitionError};
use sea_orm::DbErr;
use serde::Serialize;

use crate::services::gateway::GatewayError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `CONFLICT`, `INSUFFICIENT_FUNDS`, `EMAIL_TAKEN`,
    /// `PAYMENT_VERIFICATION_FAILED`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Minimum payout amount is 500")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    /// The operation is not valid in the current state.
    Conflict(String),
    /// A withdrawal exceeds the available balance.
    InsufficientFunds {
        requested: i64,
        available: i64,
    },
    EmailTaken,
    PaymentVerificationFailed,
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid email or password".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::InsufficientFunds {
                requested,
                available,
            } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "INSUFFICIENT_FUNDS",
                    message: format!(
                        "Requested {requested} exceeds available balance {available}"
                    ),
                },
            ),
            AppError::EmailTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "EMAIL_TAKEN",
                    message: "Email is already registered".into(),
                },
            ),
            AppError::PaymentVerificationFailed => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "PAYMENT_VERIFICATION_FAILED",
                    message: "Payment signature could not be verified".into(),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                requested,
                available,
            } => AppError::InsufficientFunds {
                requested,
                available,
            },
            LedgerError::NonPositiveAmount(_) => AppError::Validation(err.to_string()),
            // Pending shortfalls mean a reservation went missing; never a user error.
            LedgerError::InsufficientPending { .. } | LedgerError::Overflow => {
                AppError::Internal(format!("Ledger error: {err}"))
            }
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl From<PayoutValidationError> for AppError {
    fn from(err: PayoutValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotInCart => AppError::NotFound(err.to_string()),
            CartError::FreeItem | CartError::Empty | CartError::TotalTooLarge => {
                AppError::Validation(err.to_string())
            }
            CartError::AlreadyPurchased
            | CartError::AlreadyInCart
            | CartError::OwnItem
            | CartError::Unavailable => AppError::Conflict(err.to_string()),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Internal(format!("Payment gateway error: {err}"))
    }
}
