use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-developer running balance. Locked `FOR UPDATE` by every mutation.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "developer_earnings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub developer_id: i32,

    pub total_earnings: i64,
    pub available_balance: i64,
    pub pending_balance: i64,
    pub withdrawn_total: i64,

    pub total_sales: i64,
    pub template_sales: i64,
    pub component_sales: i64,
    pub gross_sales: i64,
    pub average_sale_amount: i64,

    /// `{"YYYY-MM": {"earnings": n, "sales": n}}`
    #[sea_orm(column_type = "JsonBinary")]
    pub monthly: serde_json::Value,

    pub last_payout_date: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
