use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{ItemType, PlanType};

/// A paid item waiting in a user's cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CartLine {
    pub item_type: ItemType,
    pub item_id: i32,
    /// Price in INR when the line was added.
    pub price_snapshot: i64,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn key(&self) -> (ItemType, i32) {
        (self.item_type, self.item_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Free items do not need to be purchased")]
    FreeItem,
    #[error("You already own this item")]
    AlreadyPurchased,
    #[error("Item is already in the cart")]
    AlreadyInCart,
    #[error("You cannot buy your own item")]
    OwnItem,
    #[error("Item is not available for purchase")]
    Unavailable,
    #[error("Item is not in the cart")]
    NotInCart,
    #[error("Cart is empty")]
    Empty,
    #[error("Cart total is too large")]
    TotalTooLarge,
}

/// Facts checked before a line is added.
#[derive(Debug, Clone, Copy)]
pub struct AddCheck {
    pub plan_type: PlanType,
    pub available: bool,
    pub is_owner: bool,
    pub already_purchased: bool,
    pub already_in_cart: bool,
}

/// Decide whether an item may be added to the cart.
pub fn check_addable(check: AddCheck) -> Result<(), CartError> {
    if !check.available {
        return Err(CartError::Unavailable);
    }
    if check.plan_type.is_free() {
        return Err(CartError::FreeItem);
    }
    if check.is_owner {
        return Err(CartError::OwnItem);
    }
    if check.already_purchased {
        return Err(CartError::AlreadyPurchased);
    }
    if check.already_in_cart {
        return Err(CartError::AlreadyInCart);
    }
    Ok(())
}

/// State of a cart line at checkout time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Payable { current_price: i64 },
    AlreadyPurchased,
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WarningReason {
    /// Bought through another channel after it was added; left out of the order.
    AlreadyPurchased,
    /// Removed, deactivated or made free since it was added; left out of the order.
    Unavailable,
    /// Still in the order, at the current price.
    PriceChanged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CheckoutWarning {
    pub item_type: ItemType,
    pub item_id: i32,
    pub reason: WarningReason,
}

/// A payable line with the price it will be charged at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PayableLine {
    pub item_type: ItemType,
    pub item_id: i32,
    pub price: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CheckoutSummary {
    pub lines: Vec<PayableLine>,
    pub warnings: Vec<CheckoutWarning>,
    pub subtotal: i64,
}

impl CheckoutSummary {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Split cart lines into payable lines and warnings.
///
/// Lines are charged at their current price; a difference from the snapshot
/// is reported but does not exclude the line.
pub fn summarize<F>(lines: &[CartLine], mut status: F) -> Result<CheckoutSummary, CartError>
where
    F: FnMut(&CartLine) -> LineStatus,
{
    let mut summary = CheckoutSummary::default();

    for line in lines {
        let warn = |reason| CheckoutWarning {
            item_type: line.item_type,
            item_id: line.item_id,
            reason,
        };
        match status(line) {
            LineStatus::AlreadyPurchased => {
                summary.warnings.push(warn(WarningReason::AlreadyPurchased))
            }
            LineStatus::Unavailable => summary.warnings.push(warn(WarningReason::Unavailable)),
            LineStatus::Payable { current_price } => {
                if current_price != line.price_snapshot {
                    summary.warnings.push(warn(WarningReason::PriceChanged));
                }
                summary.subtotal = summary
                    .subtotal
                    .checked_add(current_price)
                    .ok_or(CartError::TotalTooLarge)?;
                summary.lines.push(PayableLine {
                    item_type: line.item_type,
                    item_id: line.item_id,
                    price: current_price,
                });
            }
        }
    }

    Ok(summary)
}
