use chrono::Utc;
use common::payout::{self, PayoutAction, PayoutDetails, LedgerEffect};
use common::{PayoutMethod, PayoutStatus};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::info;

use crate::config::PayoutConfig;
use crate::entity::payout_request;
use crate::error::AppError;
use crate::services::earnings::LedgerService;

/// A validated withdrawal instruction.
pub struct NewPayout {
    pub amount: i64,
    pub method: PayoutMethod,
    pub details: PayoutDetails,
}

/// Who is driving a transition.
#[derive(Debug, Clone, Copy)]
pub enum Actor {
    /// May only touch their own requests.
    Developer(i32),
    Reviewer(i32),
}

#[derive(Debug, Clone)]
pub enum Change {
    Approve {
        notes: Option<String>,
    },
    Reject {
        reason: String,
        notes: Option<String>,
    },
    StartProcessing {
        transaction_id: String,
        notes: Option<String>,
    },
    Complete {
        transaction_id: Option<String>,
        final_amount: Option<i64>,
        processing_fee: Option<i64>,
        notes: Option<String>,
    },
    Cancel,
}

impl Change {
    fn action(&self) -> PayoutAction {
        match self {
            Change::Approve { .. } => PayoutAction::Approve,
            Change::Reject { .. } => PayoutAction::Reject,
            Change::StartProcessing { .. } => PayoutAction::StartProcessing,
            Change::Complete { .. } => PayoutAction::Complete,
            Change::Cancel => PayoutAction::Cancel,
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Payout request not found".into())
}

async fn open_request_exists(txn: &DatabaseTransaction, developer_id: i32) -> Result<bool, AppError> {
    let open = payout_request::Entity::find()
        .filter(payout_request::Column::DeveloperId.eq(developer_id))
        .filter(payout_request::Column::Status.is_in(PayoutStatus::OPEN.iter().copied()))
        .one(txn)
        .await?;
    Ok(open.is_some())
}

/// Open a payout request and reserve its amount from the available balance.
pub async fn create_request(
    db: &DatabaseConnection,
    limits: &PayoutConfig,
    developer_id: i32,
    new: NewPayout,
) -> Result<payout_request::Model, AppError> {
    payout::validate_amount(new.amount, limits.min_amount, limits.max_amount)?;
    new.details.validate_for(new.method)?;

    let txn = db.begin().await?;
    let ledger = LedgerService::new(&txn);
    ledger.lock(developer_id).await?;

    if open_request_exists(&txn, developer_id).await? {
        return Err(AppError::Conflict(
            "An open payout request already exists".into(),
        ));
    }

    ledger.reserve_for_payout(developer_id, new.amount).await?;

    let now = Utc::now();
    let details = new.details;
    let model = payout_request::ActiveModel {
        request_id: Set(payout::generate_request_id(now)),
        developer_id: Set(developer_id),
        amount: Set(new.amount),
        method: Set(new.method),
        account_holder_name: Set(details.account_holder_name),
        account_number: Set(details.account_number),
        ifsc_code: Set(details.ifsc_code),
        upi_id: Set(details.upi_id),
        paypal_email: Set(details.paypal_email),
        status: Set(PayoutStatus::Pending),
        reviewed_by: Set(None),
        admin_notes: Set(None),
        rejection_reason: Set(None),
        transaction_id: Set(None),
        final_amount: Set(None),
        processing_fee: Set(None),
        requested_at: Set(now),
        reviewed_at: Set(None),
        processed_at: Set(None),
        completed_at: Set(None),
        cancelled_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("An open payout request already exists".into())
        }
        _ => AppError::from(e),
    })?;

    txn.commit().await?;

    info!(
        request_id = %model.request_id,
        developer_id,
        amount = model.amount,
        "Payout request created"
    );
    Ok(model)
}

/// Move a request through the review state machine, applying its ledger effect
/// in the same transaction.
pub async fn transition(
    db: &DatabaseConnection,
    request_id: &str,
    actor: Actor,
    change: Change,
) -> Result<payout_request::Model, AppError> {
    let txn = db.begin().await?;

    let developer_id = payout_request::Entity::find_by_id(request_id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(not_found)?
        .developer_id;
    if let Actor::Developer(id) = actor
        && id != developer_id
    {
        return Err(not_found());
    }

    // Ledger first, then the request: the same order as creation.
    let ledger = LedgerService::new(&txn);
    ledger.lock(developer_id).await?;
    let request = payout_request::Entity::find_by_id(request_id.to_string())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(not_found)?;

    let (next, effect) = request.status.apply(change.action())?;
    let now = Utc::now();
    let amount = request.amount;
    let reviewer = match actor {
        Actor::Reviewer(id) => Some(id),
        Actor::Developer(_) => None,
    };

    let mut active: payout_request::ActiveModel = request.clone().into();
    active.status = Set(next);

    match change {
        Change::Approve { notes } => {
            active.reviewed_by = Set(reviewer);
            active.reviewed_at = Set(Some(now));
            active.admin_notes = Set(notes.or(request.admin_notes));
        }
        Change::Reject { reason, notes } => {
            active.reviewed_by = Set(reviewer);
            active.reviewed_at = Set(Some(now));
            active.rejection_reason = Set(Some(reason));
            active.admin_notes = Set(notes.or(request.admin_notes));
        }
        Change::StartProcessing {
            transaction_id,
            notes,
        } => {
            active.transaction_id = Set(Some(transaction_id));
            active.processed_at = Set(Some(now));
            active.admin_notes = Set(notes.or(request.admin_notes));
        }
        Change::Complete {
            transaction_id,
            final_amount,
            processing_fee,
            notes,
        } => {
            let settlement = payout::settle(amount, final_amount, processing_fee)?;
            let transaction_id = transaction_id.or(request.transaction_id).ok_or_else(|| {
                AppError::Validation("transaction_id is required to complete a payout".into())
            })?;
            active.transaction_id = Set(Some(transaction_id));
            active.final_amount = Set(Some(settlement.final_amount));
            active.processing_fee = Set(Some(settlement.processing_fee));
            active.processed_at = Set(Some(request.processed_at.unwrap_or(now)));
            active.completed_at = Set(Some(now));
            active.admin_notes = Set(notes.or(request.admin_notes));
        }
        Change::Cancel => {
            active.cancelled_at = Set(Some(now));
        }
    }

    match effect {
        LedgerEffect::None => {}
        LedgerEffect::Release => ledger.cancel_payout(developer_id, amount).await?,
        // The reservation was for the requested amount; fees do not change what leaves pending.
        LedgerEffect::Finalize => ledger.finalize_payout(developer_id, amount, now).await?,
    }

    let model = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        request_id = %model.request_id,
        developer_id,
        amount,
        status = %model.status,
        "Payout request transitioned"
    );
    Ok(model)
}
