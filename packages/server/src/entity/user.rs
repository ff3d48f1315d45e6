use common::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,

    #[sea_orm(has_many)]
    pub content_items: HasMany<super::content_item::Entity>,

    #[sea_orm(has_many)]
    pub purchases: HasMany<super::purchase::Entity>,

    #[sea_orm(has_many)]
    pub payout_requests: HasMany<super::payout_request::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
