use chrono::{DateTime, Utc};
use common::ledger::{Balances, SalesCounters};
use serde::Serialize;

use crate::entity::developer_earnings;
use crate::error::AppError;
use crate::services::earnings::to_ledger;

#[derive(Serialize, utoipa::ToSchema)]
pub struct MonthlyEarnings {
    #[schema(example = "2025-01")]
    pub month: String,
    pub earnings: i64,
    pub sales: i64,
}

/// A developer's earnings dashboard.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EarningsResponse {
    pub developer_id: i32,
    pub balances: Balances,
    pub sales: SalesCounters,
    /// Oldest month first.
    pub monthly: Vec<MonthlyEarnings>,
    pub last_payout_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<developer_earnings::Model> for EarningsResponse {
    type Error = AppError;

    fn try_from(row: developer_earnings::Model) -> Result<Self, Self::Error> {
        let ledger = to_ledger(&row)?;
        let monthly = ledger
            .monthly
            .into_iter()
            .map(|(month, bucket)| MonthlyEarnings {
                month,
                earnings: bucket.earnings,
                sales: bucket.sales,
            })
            .collect();

        Ok(Self {
            developer_id: row.developer_id,
            balances: ledger.balances,
            sales: ledger.sales,
            monthly,
            last_payout_date: row.last_payout_date,
            updated_at: row.updated_at,
        })
    }
}
