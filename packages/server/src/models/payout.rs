use chrono::{DateTime, Utc};
use common::payout::PayoutDetails;
use common::{PayoutMethod, PayoutStatus};
use serde::{Deserialize, Serialize};

use crate::entity::payout_request;
use crate::error::AppError;

pub use super::shared::Pagination;
use super::shared::validate_text;

/// Request body for a withdrawal.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreatePayoutRequest {
    /// Whole rupees.
    #[schema(example = 700)]
    pub amount: i64,
    pub method: PayoutMethod,
    /// Fields required by `method`.
    #[serde(flatten)]
    pub details: PayoutDetails,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct ApprovePayoutRequest {
    pub notes: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RejectPayoutRequest {
    #[schema(example = "bank details invalid")]
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct StartProcessingRequest {
    #[schema(example = "TXN123")]
    pub transaction_id: String,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct CompletePayoutRequest {
    /// Required unless recorded when processing started.
    #[schema(example = "TXN123")]
    pub transaction_id: Option<String>,
    /// Amount actually paid out. Defaults to the requested amount less any fee.
    pub final_amount: Option<i64>,
    pub processing_fee: Option<i64>,
    pub notes: Option<String>,
}

fn validate_notes(notes: &Option<String>) -> Result<(), AppError> {
    if let Some(notes) = notes
        && notes.chars().count() > 1000
    {
        return Err(AppError::Validation(
            "Notes must be at most 1000 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_approve(payload: &ApprovePayoutRequest) -> Result<(), AppError> {
    validate_notes(&payload.notes)
}

pub fn validate_reject(payload: &RejectPayoutRequest) -> Result<(), AppError> {
    validate_text(&payload.reason, "Rejection reason", 1000)?;
    validate_notes(&payload.notes)
}

pub fn validate_start_processing(payload: &StartProcessingRequest) -> Result<(), AppError> {
    validate_text(&payload.transaction_id, "transaction_id", 128)?;
    validate_notes(&payload.notes)
}

pub fn validate_complete(payload: &CompletePayoutRequest) -> Result<(), AppError> {
    if let Some(ref id) = payload.transaction_id {
        validate_text(id, "transaction_id", 128)?;
    }
    if payload.final_amount.is_some_and(|amount| amount <= 0) {
        return Err(AppError::Validation("final_amount must be positive".into()));
    }
    if payload.processing_fee.is_some_and(|fee| fee < 0) {
        return Err(AppError::Validation(
            "processing_fee must not be negative".into(),
        ));
    }
    validate_notes(&payload.notes)
}

/// Show only the last four digits of an account number.
fn mask_account(number: &str) -> String {
    let digits: Vec<char> = number.chars().collect();
    let keep = digits.len().min(4);
    let tail: String = digits[digits.len() - keep..].iter().collect();
    format!("{}{tail}", "*".repeat(digits.len() - keep))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PayoutResponse {
    #[schema(example = "PAYOUT_1736937000_9f86d081")]
    pub request_id: String,
    pub developer_id: i32,
    pub amount: i64,
    pub method: PayoutMethod,
    pub account_holder_name: Option<String>,
    /// Masked to the last four digits.
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub upi_id: Option<String>,
    pub paypal_email: Option<String>,
    pub status: PayoutStatus,
    pub reviewed_by: Option<i32>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub transaction_id: Option<String>,
    pub final_amount: Option<i64>,
    pub processing_fee: Option<i64>,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<payout_request::Model> for PayoutResponse {
    fn from(m: payout_request::Model) -> Self {
        Self {
            request_id: m.request_id,
            developer_id: m.developer_id,
            amount: m.amount,
            method: m.method,
            account_holder_name: m.account_holder_name,
            account_number: m.account_number.as_deref().map(mask_account),
            ifsc_code: m.ifsc_code,
            upi_id: m.upi_id,
            paypal_email: m.paypal_email,
            status: m.status,
            reviewed_by: m.reviewed_by,
            admin_notes: m.admin_notes,
            rejection_reason: m.rejection_reason,
            transaction_id: m.transaction_id,
            final_amount: m.final_amount,
            processing_fee: m.processing_fee,
            requested_at: m.requested_at,
            reviewed_at: m.reviewed_at,
            processed_at: m.processed_at,
            completed_at: m.completed_at,
            cancelled_at: m.cancelled_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PayoutListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    pub status: Option<PayoutStatus>,
    /// Reviewer listing only.
    pub developer_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PayoutListResponse {
    pub data: Vec<PayoutResponse>,
    pub pagination: Pagination,
}
