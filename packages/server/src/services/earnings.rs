use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::ItemType;
use common::ledger::{
    Balances, EarningsLedger, LedgerError, MonthlyBucket, SaleCredit, SalesCounters,
};
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait, QuerySelect, Set,
};
use tracing::info;

use crate::entity::developer_earnings;
use crate::error::AppError;

fn empty_row(developer_id: i32, now: DateTime<Utc>) -> developer_earnings::ActiveModel {
    developer_earnings::ActiveModel {
        developer_id: Set(developer_id),
        total_earnings: Set(0),
        available_balance: Set(0),
        pending_balance: Set(0),
        withdrawn_total: Set(0),
        total_sales: Set(0),
        template_sales: Set(0),
        component_sales: Set(0),
        gross_sales: Set(0),
        average_sale_amount: Set(0),
        monthly: Set(serde_json::json!({})),
        last_payout_date: Set(None),
        updated_at: Set(now),
    }
}

/// Create the developer's ledger row if it does not exist yet.
pub async fn ensure_ledger<C: ConnectionTrait>(conn: &C, developer_id: i32) -> Result<(), DbErr> {
    let result = developer_earnings::Entity::insert(empty_row(developer_id, Utc::now()))
        .on_conflict(
            OnConflict::column(developer_earnings::Column::DeveloperId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Read the ledger row, creating an empty one on first access.
pub async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    developer_id: i32,
) -> Result<developer_earnings::Model, AppError> {
    ensure_ledger(conn, developer_id).await?;
    developer_earnings::Entity::find_by_id(developer_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Ledger for developer {developer_id} missing")))
}

fn monthly_history(
    row: &developer_earnings::Model,
) -> Result<BTreeMap<String, MonthlyBucket>, AppError> {
    serde_json::from_value(row.monthly.clone())
        .map_err(|e| AppError::Internal(format!("Corrupt monthly earnings JSON: {e}")))
}

pub fn to_ledger(row: &developer_earnings::Model) -> Result<EarningsLedger, AppError> {
    Ok(EarningsLedger {
        balances: Balances {
            total_earnings: row.total_earnings,
            available_balance: row.available_balance,
            pending_balance: row.pending_balance,
            withdrawn_total: row.withdrawn_total,
        },
        sales: SalesCounters {
            total_sales: row.total_sales,
            template_sales: row.template_sales,
            component_sales: row.component_sales,
            gross_sales: row.gross_sales,
            average_sale_amount: row.average_sale_amount,
        },
        monthly: monthly_history(row)?,
        last_payout_date: row.last_payout_date,
    })
}

fn write_back(
    row: developer_earnings::Model,
    ledger: &EarningsLedger,
) -> Result<developer_earnings::ActiveModel, AppError> {
    let monthly = serde_json::to_value(&ledger.monthly)
        .map_err(|e| AppError::Internal(format!("Failed to encode monthly earnings: {e}")))?;

    let mut active: developer_earnings::ActiveModel = row.into();
    active.total_earnings = Set(ledger.balances.total_earnings);
    active.available_balance = Set(ledger.balances.available_balance);
    active.pending_balance = Set(ledger.balances.pending_balance);
    active.withdrawn_total = Set(ledger.balances.withdrawn_total);
    active.total_sales = Set(ledger.sales.total_sales);
    active.template_sales = Set(ledger.sales.template_sales);
    active.component_sales = Set(ledger.sales.component_sales);
    active.gross_sales = Set(ledger.sales.gross_sales);
    active.average_sale_amount = Set(ledger.sales.average_sale_amount);
    active.monthly = Set(monthly);
    active.last_payout_date = Set(ledger.last_payout_date);
    active.updated_at = Set(Utc::now());
    Ok(active)
}

/// Ledger mutations for one transaction.
///
/// Every operation first takes `SELECT ... FOR UPDATE` on the developer's row,
/// so writers for the same developer queue behind each other until commit.
pub struct LedgerService<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> LedgerService<'a> {
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Lock the developer's ledger row for the rest of the transaction.
    pub async fn lock(&self, developer_id: i32) -> Result<developer_earnings::Model, AppError> {
        ensure_ledger(self.txn, developer_id).await?;
        developer_earnings::Entity::find_by_id(developer_id)
            .lock(LockType::Update)
            .one(self.txn)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Ledger for developer {developer_id} missing"))
            })
    }

    async fn apply<T, F>(&self, developer_id: i32, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut EarningsLedger) -> Result<T, LedgerError>,
    {
        let row = self.lock(developer_id).await?;
        let mut ledger = to_ledger(&row)?;
        let out = op(&mut ledger)?;

        if !ledger.balances.is_consistent() {
            return Err(AppError::Internal(format!(
                "Ledger invariant violated for developer {developer_id}: {:?}",
                ledger.balances
            )));
        }

        write_back(row, &ledger)?.update(self.txn).await?;
        Ok(out)
    }

    pub async fn credit_sale(
        &self,
        developer_id: i32,
        amount: i64,
        item_type: ItemType,
        at: DateTime<Utc>,
    ) -> Result<SaleCredit, AppError> {
        let credit = self
            .apply(developer_id, |l| l.credit_sale(amount, item_type, at))
            .await?;
        info!(
            developer_id,
            amount,
            developer_share = credit.developer_share,
            platform_fee = credit.platform_fee,
            "Credited sale"
        );
        Ok(credit)
    }

    pub async fn reserve_for_payout(&self, developer_id: i32, amount: i64) -> Result<(), AppError> {
        self.apply(developer_id, |l| l.reserve_for_payout(amount))
            .await?;
        info!(developer_id, amount, "Reserved funds for payout");
        Ok(())
    }

    pub async fn finalize_payout(
        &self,
        developer_id: i32,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.apply(developer_id, |l| l.finalize_payout(amount, at))
            .await?;
        info!(developer_id, amount, "Finalized payout");
        Ok(())
    }

    pub async fn cancel_payout(&self, developer_id: i32, amount: i64) -> Result<(), AppError> {
        self.apply(developer_id, |l| l.cancel_payout(amount))
            .await?;
        info!(developer_id, amount, "Released payout reservation");
        Ok(())
    }
}
