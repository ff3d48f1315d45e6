use common::{ApprovalStatus, ItemType, PlanType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A template or component listed in the marketplace.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub item_type: ItemType,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(indexed)]
    pub category: String,
    /// JSON array of strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: serde_json::Value,

    pub plan_type: PlanType,
    /// Whole rupees; 0 for free items.
    pub price_inr: i64,
    pub price_usd_cents: i64,

    #[sea_orm(column_type = "Text")]
    pub code: String,
    #[sea_orm(column_type = "Text")]
    pub readme_content: String,
    pub git_repo_url: Option<String>,
    pub live_demo_url: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub dependencies: serde_json::Value,
    #[sea_orm(column_type = "JsonBinary")]
    pub preview_images: serde_json::Value,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub purchases: HasMany<super::purchase::Entity>,

    #[sea_orm(indexed)]
    pub approval_status: ApprovalStatus,
    pub featured: bool,
    pub popular: bool,
    /// Cleared on soft delete.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub rating: f64,
    pub downloads: i64,
    pub views: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
