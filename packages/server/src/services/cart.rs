use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use common::access::Viewer;
use common::cart::{
    self as cart_rules, AddCheck, CartError, CartLine, CheckoutSummary, LineStatus,
    check_addable,
};
use common::{ItemType, PurchaseStatus};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::info;

use crate::entity::{cart, cart_item, content_item, purchase};
use crate::error::AppError;
use crate::services::gateway::PaymentGateway;
use crate::services::purchase::{self as purchases, OrderCreated};

/// Create the user's cart row if it does not exist yet.
pub async fn ensure_cart<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<(), DbErr> {
    let now = Utc::now();
    let result = cart::Entity::insert(cart::ActiveModel {
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(cart::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn touch<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<(), DbErr> {
    cart::Entity::update_many()
        .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn rows<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<cart_item::Model>, DbErr> {
    cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::AddedAt)
        .order_by_asc(cart_item::Column::Id)
        .all(conn)
        .await
}

fn to_line(row: &cart_item::Model) -> CartLine {
    CartLine {
        item_type: row.item_type,
        item_id: row.item_id,
        price_snapshot: row.price_snapshot,
        added_at: row.added_at,
    }
}

/// Add a paid item to the user's cart.
pub async fn add_item(
    db: &DatabaseConnection,
    viewer: &Viewer,
    item_type: ItemType,
    item_id: i32,
) -> Result<cart_item::Model, AppError> {
    let item = purchases::load_item(db, item_type, item_id).await?;
    let already_in_cart = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(viewer.user_id))
        .filter(cart_item::Column::ItemType.eq(item_type))
        .filter(cart_item::Column::ItemId.eq(item_id))
        .one(db)
        .await?
        .is_some();

    check_addable(AddCheck {
        plan_type: item.plan_type,
        available: purchases::is_available(&item),
        is_owner: item.owner_id == viewer.user_id,
        already_purchased: purchases::completed_purchase_exists(
            db,
            viewer.user_id,
            item_type,
            item_id,
        )
        .await?,
        already_in_cart,
    })?;

    ensure_cart(db, viewer.user_id).await?;
    let row = cart_item::ActiveModel {
        user_id: Set(viewer.user_id),
        item_type: Set(item_type),
        item_id: Set(item_id),
        price_snapshot: Set(item.price_inr),
        added_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::from(CartError::AlreadyInCart),
        _ => AppError::from(e),
    })?;
    touch(db, viewer.user_id).await?;

    Ok(row)
}

pub async fn remove_item(
    db: &DatabaseConnection,
    user_id: i32,
    item_type: ItemType,
    item_id: i32,
) -> Result<(), AppError> {
    let result = cart_item::Entity::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ItemType.eq(item_type))
        .filter(cart_item::Column::ItemId.eq(item_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(CartError::NotInCart.into());
    }
    touch(db, user_id).await?;
    Ok(())
}

/// Remove every line. Returns how many were removed.
pub async fn clear(db: &DatabaseConnection, user_id: i32) -> Result<u64, AppError> {
    let result = cart_item::Entity::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    touch(db, user_id).await?;
    Ok(result.rows_affected)
}

/// Cart lines and the summary they would check out as right now.
pub async fn summary<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<(Vec<cart_item::Model>, CheckoutSummary), AppError> {
    let rows = rows(conn, user_id).await?;
    if rows.is_empty() {
        return Ok((rows, CheckoutSummary::default()));
    }
    let ids: BTreeSet<i32> = rows.iter().map(|r| r.item_id).collect();

    let items: BTreeMap<i32, content_item::Model> = content_item::Entity::find()
        .filter(content_item::Column::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let owned: BTreeSet<(ItemType, i32)> = purchase::Entity::find()
        .filter(purchase::Column::BuyerId.eq(user_id))
        .filter(purchase::Column::Status.eq(PurchaseStatus::Completed))
        .filter(purchase::Column::ItemId.is_in(ids.iter().copied()))
        .select_only()
        .column(purchase::Column::ItemType)
        .column(purchase::Column::ItemId)
        .into_tuple::<(ItemType, i32)>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let lines: Vec<CartLine> = rows.iter().map(to_line).collect();
    let summary = cart_rules::summarize(&lines, |line| {
        match items.get(&line.item_id) {
            Some(item)
                if item.item_type == line.item_type
                    && purchases::is_available(item)
                    && !item.plan_type.is_free() =>
            {
                if owned.contains(&line.key()) {
                    LineStatus::AlreadyPurchased
                } else {
                    LineStatus::Payable {
                        current_price: item.price_inr,
                    }
                }
            }
            _ => LineStatus::Unavailable,
        }
    })?;

    Ok((rows, summary))
}

pub struct CheckoutOutcome {
    pub created: OrderCreated,
    pub summary: CheckoutSummary,
}

/// Validate the cart at commit time, open one order for every payable line and
/// remove exactly those lines.
pub async fn checkout(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    user_id: i32,
) -> Result<CheckoutOutcome, AppError> {
    ensure_cart(db, user_id).await?;
    let txn = db.begin().await?;

    // Serializes concurrent checkouts of the same cart.
    cart::Entity::find_by_id(user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let (rows, summary) = summary(&txn, user_id).await?;
    if summary.is_empty() {
        return Err(CartError::Empty.into());
    }

    let receipt = format!("cart_{user_id}_{}", Utc::now().timestamp());
    let order = gateway.create_order(summary.subtotal, &receipt).await?;
    let purchases =
        purchases::insert_pending(&txn, user_id, &summary.lines, &order.order_id).await?;

    let ordered: BTreeSet<(ItemType, i32)> = summary
        .lines
        .iter()
        .map(|l| (l.item_type, l.item_id))
        .collect();
    let ordered_ids: Vec<i32> = rows
        .iter()
        .filter(|r| ordered.contains(&(r.item_type, r.item_id)))
        .map(|r| r.id)
        .collect();
    cart_item::Entity::delete_many()
        .filter(cart_item::Column::Id.is_in(ordered_ids))
        .exec(&txn)
        .await?;
    touch(&txn, user_id).await?;

    txn.commit().await?;

    info!(
        user_id,
        order_id = %order.order_id,
        lines = summary.lines.len(),
        subtotal = summary.subtotal,
        warnings = summary.warnings.len(),
        "Cart checked out"
    );
    Ok(CheckoutOutcome {
        created: OrderCreated { order, purchases },
        summary,
    })
}
