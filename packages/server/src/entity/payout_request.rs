use common::{PayoutMethod, PayoutStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payout_request")]
pub struct Model {
    /// `PAYOUT_<unix>_<8 hex>`
    #[sea_orm(primary_key, auto_increment = false)]
    pub request_id: String,

    #[sea_orm(indexed)]
    pub developer_id: i32,
    #[sea_orm(belongs_to, from = "developer_id", to = "id")]
    pub developer: HasOne<super::user::Entity>,

    pub amount: i64,
    pub method: PayoutMethod,
    pub account_holder_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub upi_id: Option<String>,
    pub paypal_email: Option<String>,

    #[sea_orm(indexed)]
    pub status: PayoutStatus,
    pub reviewed_by: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    pub transaction_id: Option<String>,
    pub final_amount: Option<i64>,
    pub processing_fee: Option<i64>,

    pub requested_at: DateTimeUtc,
    pub reviewed_at: Option<DateTimeUtc>,
    pub processed_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
