use chrono::{DateTime, Utc};
use common::{ItemType, PurchaseStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::purchase;
use crate::error::AppError;
use crate::services::gateway::GatewayOrder;

pub use super::shared::Pagination;
use super::shared::validate_text;

/// Request body for buying a single item.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateOrderRequest {
    pub item_type: ItemType,
    #[schema(example = 12)]
    pub item_id: i32,
}

/// Payment confirmation returned by the gateway checkout.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct VerifyPaymentRequest {
    #[schema(example = "order_01J0ZK8Q3R")]
    pub order_id: String,
    #[schema(example = "pay_29QQoUBi66xm2f")]
    pub payment_id: String,
    /// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`.
    pub signature: String,
}

pub fn validate_verify_payment(payload: &VerifyPaymentRequest) -> Result<(), AppError> {
    validate_text(&payload.order_id, "order_id", 128)?;
    validate_text(&payload.payment_id, "payment_id", 128)?;
    validate_text(&payload.signature, "signature", 256)?;
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub item_type: ItemType,
    pub item_id: i32,
    pub status: PurchaseStatus,
    #[schema(example = 999)]
    pub amount_inr: i64,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub access_granted: bool,
    pub download_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<purchase::Model> for PurchaseResponse {
    fn from(m: purchase::Model) -> Self {
        Self {
            id: m.id,
            item_type: m.item_type,
            item_id: m.item_id,
            status: m.status,
            amount_inr: m.amount_inr,
            gateway_order_id: m.gateway_order_id,
            gateway_payment_id: m.gateway_payment_id,
            access_granted: m.access_granted,
            download_count: m.download_count,
            last_accessed_at: m.last_accessed_at,
            created_at: m.created_at,
            completed_at: m.completed_at,
        }
    }
}

/// A gateway order together with the purchases it pays for.
#[derive(Serialize, utoipa::ToSchema)]
pub struct OrderResponse {
    pub order: GatewayOrder,
    pub purchases: Vec<PurchaseResponse>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PurchaseListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    pub status: Option<PurchaseStatus>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PurchaseListResponse {
    pub data: Vec<PurchaseResponse>,
    pub pagination: Pagination,
}
