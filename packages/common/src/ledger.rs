use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ItemType;

/// Percentage of each sale credited to the developer. The remainder is the
/// platform fee, which is not recorded as a ledger line.
pub const DEVELOPER_SHARE_PERCENT: i64 = 70;

/// Developer share of a sale, rounded down to a whole rupee.
pub fn developer_share(amount: i64) -> Result<i64, LedgerError> {
    amount
        .checked_mul(DEVELOPER_SHARE_PERCENT)
        .map(|scaled| scaled / 100)
        .ok_or(LedgerError::Overflow)
}

/// The part of a sale retained by the platform.
pub fn platform_fee(amount: i64) -> Result<i64, LedgerError> {
    amount
        .checked_sub(developer_share(amount)?)
        .ok_or(LedgerError::Overflow)
}

/// `YYYY-MM` key of the monthly history bucket containing `at`.
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },
    #[error("Pending balance {pending} does not cover {requested}")]
    InsufficientPending { requested: i64, pending: i64 },
    #[error("Ledger amount overflow")]
    Overflow,
}

/// The four balances of a developer.
///
/// `total_earnings == available_balance + pending_balance + withdrawn_total`
/// holds after every successful operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Balances {
    pub total_earnings: i64,
    pub available_balance: i64,
    pub pending_balance: i64,
    pub withdrawn_total: i64,
}

impl Balances {
    pub fn is_consistent(&self) -> bool {
        self.available_balance >= 0
            && self.pending_balance >= 0
            && self.withdrawn_total >= 0
            && self.available_balance
                .checked_add(self.pending_balance)
                .and_then(|sum| sum.checked_add(self.withdrawn_total))
                == Some(self.total_earnings)
    }
}

/// Earnings and sale count for one calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MonthlyBucket {
    pub earnings: i64,
    pub sales: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SalesCounters {
    pub total_sales: i64,
    pub template_sales: i64,
    pub component_sales: i64,
    /// Sum of sale amounts before the split.
    pub gross_sales: i64,
    /// `gross_sales / total_sales`, rounded down.
    pub average_sale_amount: i64,
}

/// Amounts produced by crediting a single sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleCredit {
    pub amount: i64,
    pub developer_share: i64,
    pub platform_fee: i64,
}

/// In-memory view of a developer's ledger. Callers load it, apply exactly one
/// operation while holding the developer's lock, and persist it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EarningsLedger {
    pub balances: Balances,
    pub sales: SalesCounters,
    pub monthly: BTreeMap<String, MonthlyBucket>,
    pub last_payout_date: Option<DateTime<Utc>>,
}

fn positive(amount: i64) -> Result<i64, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    Ok(amount)
}

fn add(a: i64, b: i64) -> Result<i64, LedgerError> {
    a.checked_add(b).ok_or(LedgerError::Overflow)
}

impl EarningsLedger {
    /// Credit the developer share of a completed sale of `amount`.
    pub fn credit_sale(
        &mut self,
        amount: i64,
        item_type: ItemType,
        at: DateTime<Utc>,
    ) -> Result<SaleCredit, LedgerError> {
        let amount = positive(amount)?;
        let share = developer_share(amount)?;

        let mut next = self.clone();
        next.balances.total_earnings = add(next.balances.total_earnings, share)?;
        next.balances.available_balance = add(next.balances.available_balance, share)?;

        next.sales.total_sales = add(next.sales.total_sales, 1)?;
        match item_type {
            ItemType::Template => next.sales.template_sales = add(next.sales.template_sales, 1)?,
            ItemType::Component => {
                next.sales.component_sales = add(next.sales.component_sales, 1)?
            }
        }
        next.sales.gross_sales = add(next.sales.gross_sales, amount)?;
        next.sales.average_sale_amount = next.sales.gross_sales / next.sales.total_sales;

        let bucket = next.monthly.entry(month_key(at)).or_default();
        bucket.earnings = add(bucket.earnings, share)?;
        bucket.sales = add(bucket.sales, 1)?;

        *self = next;
        Ok(SaleCredit {
            amount,
            developer_share: share,
            platform_fee: amount - share,
        })
    }

    /// Move `amount` from available to pending. Fails without mutation when
    /// the available balance does not cover it.
    pub fn reserve_for_payout(&mut self, amount: i64) -> Result<(), LedgerError> {
        let amount = positive(amount)?;
        if amount > self.balances.available_balance {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.balances.available_balance,
            });
        }
        self.balances.available_balance -= amount;
        self.balances.pending_balance += amount;
        Ok(())
    }

    /// Move a previously reserved `amount` from pending to withdrawn.
    pub fn finalize_payout(&mut self, amount: i64, at: DateTime<Utc>) -> Result<(), LedgerError> {
        let amount = self.check_pending(amount)?;
        self.balances.pending_balance -= amount;
        self.balances.withdrawn_total = add(self.balances.withdrawn_total, amount)?;
        self.last_payout_date = Some(at);
        Ok(())
    }

    /// Return a previously reserved `amount` from pending to available.
    pub fn cancel_payout(&mut self, amount: i64) -> Result<(), LedgerError> {
        let amount = self.check_pending(amount)?;
        self.balances.pending_balance -= amount;
        self.balances.available_balance = add(self.balances.available_balance, amount)?;
        Ok(())
    }

    fn check_pending(&self, amount: i64) -> Result<i64, LedgerError> {
        let amount = positive(amount)?;
        if amount > self.balances.pending_balance {
            return Err(LedgerError::InsufficientPending {
                requested: amount,
                pending: self.balances.pending_balance,
            });
        }
        Ok(amount)
    }
}
