use chrono::{DateTime, Utc};
use common::ItemType;
use common::cart::{CheckoutSummary, CheckoutWarning};
use serde::{Deserialize, Serialize};

use crate::entity::cart_item;
use crate::services::gateway::GatewayOrder;

use super::purchase::PurchaseResponse;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddToCartRequest {
    pub item_type: ItemType,
    #[schema(example = 12)]
    pub item_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CartLineResponse {
    pub item_type: ItemType,
    pub item_id: i32,
    /// Price when the line was added.
    pub price_snapshot: i64,
    pub added_at: DateTime<Utc>,
}

impl From<cart_item::Model> for CartLineResponse {
    fn from(m: cart_item::Model) -> Self {
        Self {
            item_type: m.item_type,
            item_id: m.item_id,
            price_snapshot: m.price_snapshot,
            added_at: m.added_at,
        }
    }
}

/// The cart and what it would check out as right now.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub summary: CheckoutSummary,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CheckoutResponse {
    pub order: GatewayOrder,
    pub purchases: Vec<PurchaseResponse>,
    #[schema(example = 1998)]
    pub subtotal: i64,
    /// Lines left out of the order or charged at a changed price.
    pub warnings: Vec<CheckoutWarning>,
}
