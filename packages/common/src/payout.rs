#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a payout request.
///
/// ```text
/// Pending -> Approved -> Processing -> Completed
/// Pending | Approved -> Rejected
/// Pending | Approved | Processing -> Cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Funds reserved, waiting for review.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "approved"))]
    Approved,
    /// Transfer initiated with the bank or gateway.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "processing"))]
    Processing,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "completed"))]
    Completed,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "rejected"))]
    Rejected,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "cancelled"))]
    Cancelled,
}

/// An action that moves a payout request between states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayoutAction {
    Approve,
    Reject,
    StartProcessing,
    Complete,
    Cancel,
}

/// What the ledger must do when a transition is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerEffect {
    None,
    /// Return the reserved amount to the available balance.
    Release,
    /// Move the reserved amount to the withdrawn total.
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot {action} a payout request that is {from}")]
pub struct TransitionError {
    pub from: PayoutStatus,
    pub action: PayoutAction,
}

impl PayoutStatus {
    /// Open requests hold a reservation; at most one may exist per developer.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub const OPEN: &'static [PayoutStatus] = &[Self::Pending, Self::Approved, Self::Processing];

    pub const ALL: &'static [PayoutStatus] = &[
        Self::Pending,
        Self::Approved,
        Self::Processing,
        Self::Completed,
        Self::Rejected,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Next state after `action`, or an error if the action is not valid here.
    pub fn apply(self, action: PayoutAction) -> Result<(PayoutStatus, LedgerEffect), TransitionError> {
        use PayoutAction::*;
        use PayoutStatus::*;

        let next = match (self, action) {
            (Pending, Approve) => (Approved, LedgerEffect::None),
            (Pending | Approved, Reject) => (Rejected, LedgerEffect::Release),
            (Approved, StartProcessing) => (Processing, LedgerEffect::None),
            (Approved | Processing, Complete) => (Completed, LedgerEffect::Finalize),
            (Pending | Approved | Processing, Cancel) => (Cancelled, LedgerEffect::Release),
            (from, action) => return Err(TransitionError { from, action }),
        };
        Ok(next)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PayoutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::StartProcessing => "start processing",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid payout status '{0}'")]
pub struct ParsePayoutStatusError(String);

impl FromStr for PayoutStatus {
    type Err = ParsePayoutStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParsePayoutStatusError(s.to_string()))
    }
}

/// How a developer wants to be paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "bank_transfer"))]
    BankTransfer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "upi"))]
    Upi,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "paypal"))]
    Paypal,
}

/// Destination details. Which fields are required depends on the method.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PayoutDetails {
    pub account_holder_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub upi_id: Option<String>,
    pub paypal_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayoutValidationError {
    #[error("Minimum payout amount is {min}")]
    BelowMinimum { min: i64 },
    #[error("Maximum payout amount is {max}")]
    AboveMaximum { max: i64 },
    #[error("{0} is required for this payout method")]
    MissingField(&'static str),
    #[error("{0} is not valid")]
    InvalidField(&'static str),
}

fn present<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, PayoutValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(PayoutValidationError::MissingField(name))
}

impl PayoutDetails {
    /// Check that the fields required by `method` are present and well formed.
    pub fn validate_for(&self, method: PayoutMethod) -> Result<(), PayoutValidationError> {
        match method {
            PayoutMethod::BankTransfer => {
                present(&self.account_holder_name, "account_holder_name")?;
                let number = present(&self.account_number, "account_number")?;
                if !number.chars().all(|c| c.is_ascii_digit()) || !(9..=18).contains(&number.len())
                {
                    return Err(PayoutValidationError::InvalidField("account_number"));
                }
                let ifsc = present(&self.ifsc_code, "ifsc_code")?;
                if !is_valid_ifsc(ifsc) {
                    return Err(PayoutValidationError::InvalidField("ifsc_code"));
                }
            }
            PayoutMethod::Upi => {
                let upi = present(&self.upi_id, "upi_id")?;
                if !upi.contains('@') {
                    return Err(PayoutValidationError::InvalidField("upi_id"));
                }
            }
            PayoutMethod::Paypal => {
                let email = present(&self.paypal_email, "paypal_email")?;
                if !email.contains('@') || !email.contains('.') {
                    return Err(PayoutValidationError::InvalidField("paypal_email"));
                }
            }
        }
        Ok(())
    }
}

/// IFSC: 4 letters, a literal `0`, then 6 alphanumerics.
fn is_valid_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4] == b'0'
        && bytes[5..].iter().all(u8::is_ascii_alphanumeric)
}

/// Validate a requested amount against the configured bounds.
pub fn validate_amount(amount: i64, min: i64, max: i64) -> Result<(), PayoutValidationError> {
    if amount < min || amount <= 0 {
        return Err(PayoutValidationError::BelowMinimum { min });
    }
    if amount > max {
        return Err(PayoutValidationError::AboveMaximum { max });
    }
    Ok(())
}

/// Generate a request id of the form `PAYOUT_<unix_timestamp>_<8 hex chars>`.
pub fn generate_request_id(now: DateTime<Utc>) -> String {
    let suffix: [u8; 4] = rand::random();
    format!("PAYOUT_{}_{}", now.timestamp(), hex::encode(suffix))
}

/// Final settlement figures of a completed payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub final_amount: i64,
    pub processing_fee: i64,
}

/// Reconcile the amounts reported on completion with the requested amount.
///
/// `final_amount` defaults to the requested amount and `processing_fee` to
/// the difference; together they must add up to the requested amount.
pub fn settle(
    requested: i64,
    final_amount: Option<i64>,
    processing_fee: Option<i64>,
) -> Result<Settlement, PayoutValidationError> {
    if processing_fee.is_some_and(|fee| fee < 0 || fee > requested) {
        return Err(PayoutValidationError::InvalidField("processing_fee"));
    }
    let final_amount = final_amount.unwrap_or(requested - processing_fee.unwrap_or(0));
    if final_amount <= 0 || final_amount > requested {
        return Err(PayoutValidationError::InvalidField("final_amount"));
    }
    // final_amount and processing_fee are both within 0..=requested.
    let processing_fee = processing_fee.unwrap_or(requested - final_amount);
    if final_amount.checked_add(processing_fee) != Some(requested) {
        return Err(PayoutValidationError::InvalidField("processing_fee"));
    }
    Ok(Settlement {
        final_amount,
        processing_fee,
    })
}
