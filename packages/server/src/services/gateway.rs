use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::config::PaymentConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Order amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("Gateway key is not usable for signing")]
    InvalidKey,
}

/// An order opened with the payment gateway. The client pays against it and
/// returns `(order_id, payment_id, signature)` for verification.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct GatewayOrder {
    #[schema(example = "order_01J0ZK8Q3R")]
    pub order_id: String,
    /// Amount in the currency's minor unit (paise for INR).
    #[schema(example = 100000)]
    pub amount_minor: i64,
    #[schema(example = "INR")]
    pub currency: String,
    /// Public key id the client checkout needs.
    pub key_id: String,
    pub receipt: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an order for `amount` whole currency units.
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, GatewayError>;

    /// Check the signature the client received after paying.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Issues order ids locally and checks HMAC-SHA256 signatures with the shared key secret.
pub struct LocalGateway {
    key_id: String,
    key_secret: String,
    currency: String,
}

impl LocalGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            currency: config.currency.clone(),
        }
    }
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`, the signature a paying client presents.
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> Result<String, GatewayError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| GatewayError::InvalidKey)?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl PaymentGateway for LocalGateway {
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        if amount <= 0 {
            return Err(GatewayError::InvalidAmount(amount));
        }
        let amount_minor = amount
            .checked_mul(100)
            .ok_or(GatewayError::InvalidAmount(amount))?;

        Ok(GatewayOrder {
            order_id: format!("order_{}", Uuid::now_v7().simple()),
            amount_minor,
            currency: self.currency.clone(),
            key_id: self.key_id.clone(),
            receipt: receipt.to_string(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.as_bytes()) else {
            return false;
        };
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}
