use common::{ItemType, PurchaseStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single item sale. Several rows may share one gateway order (cart checkout).
///
/// At most one `completed` row per (buyer, item); backed by a partial unique
/// index created in `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(indexed)]
    pub buyer_id: i32,
    #[sea_orm(belongs_to, from = "buyer_id", to = "id")]
    pub buyer: HasOne<super::user::Entity>,

    pub item_type: ItemType,
    pub item_id: i32,
    #[sea_orm(belongs_to, from = "item_id", to = "id")]
    pub item: HasOne<super::content_item::Entity>,

    #[sea_orm(indexed)]
    pub status: PurchaseStatus,
    pub amount_inr: i64,
    pub developer_share: i64,
    /// Informational only; no platform ledger exists.
    pub platform_fee: i64,

    #[sea_orm(indexed)]
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,

    pub access_granted: bool,
    pub download_count: i64,
    pub last_accessed_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
