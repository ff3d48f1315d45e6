use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::access::Viewer;
use common::cart::{AddCheck, PayableLine, check_addable};
use common::{ApprovalStatus, ItemType, PurchaseStatus, ledger};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entity::{content_item, purchase};
use crate::error::AppError;
use crate::services::earnings::LedgerService;
use crate::services::gateway::{GatewayOrder, PaymentGateway};

/// An opened gateway order and the pending purchases it pays for.
pub struct OrderCreated {
    pub order: GatewayOrder,
    pub purchases: Vec<purchase::Model>,
}

/// Listed, approved and not soft-deleted.
pub fn is_available(item: &content_item::Model) -> bool {
    item.is_active && item.approval_status == ApprovalStatus::Approved
}

/// Load an item, treating a type mismatch as not found.
pub async fn load_item<C: ConnectionTrait>(
    conn: &C,
    item_type: ItemType,
    item_id: i32,
) -> Result<content_item::Model, AppError> {
    content_item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .filter(|item| item.item_type == item_type)
        .ok_or_else(|| AppError::NotFound(format!("{item_type} {item_id} not found")))
}

pub async fn completed_purchase_exists<C: ConnectionTrait>(
    conn: &C,
    buyer_id: i32,
    item_type: ItemType,
    item_id: i32,
) -> Result<bool, AppError> {
    let found = purchase::Entity::find()
        .filter(purchase::Column::BuyerId.eq(buyer_id))
        .filter(purchase::Column::ItemType.eq(item_type))
        .filter(purchase::Column::ItemId.eq(item_id))
        .filter(purchase::Column::Status.eq(PurchaseStatus::Completed))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

fn pending_row(
    buyer_id: i32,
    line: &PayableLine,
    order_id: &str,
    now: DateTime<Utc>,
) -> Result<purchase::ActiveModel, AppError> {
    Ok(purchase::ActiveModel {
        id: Set(Uuid::now_v7()),
        buyer_id: Set(buyer_id),
        item_type: Set(line.item_type),
        item_id: Set(line.item_id),
        status: Set(PurchaseStatus::Pending),
        amount_inr: Set(line.price),
        developer_share: Set(ledger::developer_share(line.price)?),
        platform_fee: Set(ledger::platform_fee(line.price)?),
        gateway_order_id: Set(order_id.to_string()),
        gateway_payment_id: Set(None),
        access_granted: Set(false),
        download_count: Set(0),
        last_accessed_at: Set(None),
        created_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    })
}

/// Insert one pending purchase per line, all under `order_id`.
pub async fn insert_pending<C: ConnectionTrait>(
    conn: &C,
    buyer_id: i32,
    lines: &[PayableLine],
    order_id: &str,
) -> Result<Vec<purchase::Model>, AppError> {
    let now = Utc::now();
    let mut purchases = Vec::with_capacity(lines.len());
    for line in lines {
        purchases.push(pending_row(buyer_id, line, order_id, now)?.insert(conn).await?);
    }
    Ok(purchases)
}

/// Open a gateway order for a single item.
pub async fn create_order(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    buyer: &Viewer,
    item_type: ItemType,
    item_id: i32,
) -> Result<OrderCreated, AppError> {
    let item = load_item(db, item_type, item_id).await?;

    check_addable(AddCheck {
        plan_type: item.plan_type,
        available: is_available(&item),
        is_owner: item.owner_id == buyer.user_id,
        already_purchased: completed_purchase_exists(db, buyer.user_id, item_type, item_id)
            .await?,
        already_in_cart: false,
    })?;

    let line = PayableLine {
        item_type,
        item_id,
        price: item.price_inr,
    };
    let receipt = format!("{item_type}_{item_id}_{}", buyer.user_id);
    let order = gateway.create_order(line.price, &receipt).await?;

    let purchases = insert_pending(db, buyer.user_id, &[line], &order.order_id).await?;
    info!(
        order_id = %order.order_id,
        buyer_id = buyer.user_id,
        item_id,
        amount = item.price_inr,
        "Purchase order created"
    );
    Ok(OrderCreated { order, purchases })
}

/// Confirm payment for an order and credit each seller.
///
/// Idempotent: lines that are already completed are returned unchanged. A line
/// whose item the buyer already owns through another order is marked failed and
/// never credited.
pub async fn verify_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    buyer_id: i32,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<Vec<purchase::Model>, AppError> {
    let txn = db.begin().await?;

    let rows = purchase::Entity::find()
        .filter(purchase::Column::GatewayOrderId.eq(order_id))
        .filter(purchase::Column::BuyerId.eq(buyer_id))
        .order_by_asc(purchase::Column::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("Order not found".into()));
    }

    if !gateway.verify_signature(order_id, payment_id, signature) {
        purchase::Entity::update_many()
            .col_expr(purchase::Column::Status, Expr::value(PurchaseStatus::Failed))
            .filter(purchase::Column::GatewayOrderId.eq(order_id))
            .filter(purchase::Column::BuyerId.eq(buyer_id))
            .filter(purchase::Column::Status.eq(PurchaseStatus::Pending))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        warn!(order_id, buyer_id, "Payment signature verification failed");
        return Err(AppError::PaymentVerificationFailed);
    }

    let now = Utc::now();
    let mut credits: BTreeMap<i32, Vec<(i64, ItemType)>> = BTreeMap::new();
    let mut duplicates = 0usize;
    let mut updated = Vec::with_capacity(rows.len());

    for row in rows {
        if row.status != PurchaseStatus::Pending {
            updated.push(row);
            continue;
        }

        let mut active: purchase::ActiveModel = row.clone().into();
        if completed_purchase_exists(&txn, buyer_id, row.item_type, row.item_id).await? {
            duplicates += 1;
            active.status = Set(PurchaseStatus::Failed);
            updated.push(active.update(&txn).await?);
            continue;
        }

        let owner_id = load_item(&txn, row.item_type, row.item_id).await?.owner_id;
        active.status = Set(PurchaseStatus::Completed);
        active.access_granted = Set(true);
        active.gateway_payment_id = Set(Some(payment_id.to_string()));
        active.completed_at = Set(Some(now));
        let model = active.update(&txn).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Item has already been purchased".into())
            }
            _ => AppError::from(e),
        })?;

        credits
            .entry(owner_id)
            .or_default()
            .push((model.amount_inr, model.item_type));
        updated.push(model);
    }

    // BTreeMap order keeps ledger locks in ascending developer id.
    let ledger = LedgerService::new(&txn);
    for (developer_id, sales) in &credits {
        for &(amount, item_type) in sales {
            ledger
                .credit_sale(*developer_id, amount, item_type, now)
                .await?;
        }
    }

    txn.commit().await?;

    if !updated
        .iter()
        .any(|p| p.status == PurchaseStatus::Completed)
    {
        return Err(if duplicates > 0 {
            AppError::Conflict("Item has already been purchased".into())
        } else {
            AppError::Conflict("Payment for this order has already failed".into())
        });
    }

    info!(
        order_id,
        buyer_id,
        sellers = credits.len(),
        duplicates,
        "Payment verified"
    );
    Ok(updated)
}
