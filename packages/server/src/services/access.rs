use std::collections::BTreeMap;

use chrono::Utc;
use common::access::{self, AccessDecision, ItemFacts, Precheck, Viewer};
use common::{ItemType, PurchaseStatus};
use sea_orm::prelude::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ExprTrait, QueryFilter, QuerySelect};

use crate::entity::{content_item, purchase};

fn facts(item: &content_item::Model) -> ItemFacts {
    ItemFacts {
        owner_id: item.owner_id,
        plan_type: item.plan_type,
    }
}

fn granted_purchases(
    buyer_id: i32,
    item_type: ItemType,
) -> sea_orm::Select<purchase::Entity> {
    purchase::Entity::find()
        .filter(purchase::Column::BuyerId.eq(buyer_id))
        .filter(purchase::Column::ItemType.eq(item_type))
        .filter(purchase::Column::Status.eq(PurchaseStatus::Completed))
        .filter(purchase::Column::AccessGranted.eq(true))
}

/// True if the buyer holds a completed purchase that grants access to the item.
pub async fn has_access_purchase<C: ConnectionTrait>(
    conn: &C,
    buyer_id: i32,
    item_type: ItemType,
    item_id: i32,
) -> Result<bool, DbErr> {
    let found = granted_purchases(buyer_id, item_type)
        .filter(purchase::Column::ItemId.eq(item_id))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

/// Resolve what `viewer` may do with `item`, querying purchases only when needed.
pub async fn resolve_access<C: ConnectionTrait>(
    conn: &C,
    viewer: Option<&Viewer>,
    item: &content_item::Model,
) -> Result<AccessDecision, DbErr> {
    match access::precheck(viewer, &facts(item)) {
        Precheck::Decided(decision) => Ok(decision),
        Precheck::NeedsPurchaseCheck => {
            let Some(viewer) = viewer else {
                return Ok(AccessDecision::from_purchase(false));
            };
            let purchased =
                has_access_purchase(conn, viewer.user_id, item.item_type, item.id).await?;
            Ok(AccessDecision::from_purchase(purchased))
        }
    }
}

/// Map each requested id to whether the viewer has purchased it, in one query.
pub async fn bulk_check_purchased<C: ConnectionTrait>(
    conn: &C,
    viewer: Option<&Viewer>,
    item_type: ItemType,
    item_ids: &[i32],
) -> Result<BTreeMap<i32, bool>, DbErr> {
    if let Some(all) = access::bulk_shortcut(viewer) {
        return Ok(item_ids.iter().map(|&id| (id, all)).collect());
    }
    let Some(viewer) = viewer else {
        return Ok(item_ids.iter().map(|&id| (id, false)).collect());
    };

    let owned: Vec<i32> = granted_purchases(viewer.user_id, item_type)
        .filter(purchase::Column::ItemId.is_in(item_ids.iter().copied()))
        .select_only()
        .column(purchase::Column::ItemId)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(item_ids
        .iter()
        .map(|&id| (id, owned.contains(&id)))
        .collect())
}

/// Count a download against the viewer's purchase.
///
/// Returns `false` without touching anything when no granting purchase exists.
pub async fn record_download<C: ConnectionTrait>(
    conn: &C,
    viewer: &Viewer,
    item_type: ItemType,
    item_id: i32,
) -> Result<bool, DbErr> {
    let result = purchase::Entity::update_many()
        .col_expr(
            purchase::Column::DownloadCount,
            Expr::col(purchase::Column::DownloadCount).add(1),
        )
        .col_expr(purchase::Column::LastAccessedAt, Expr::value(Utc::now()))
        .filter(purchase::Column::BuyerId.eq(viewer.user_id))
        .filter(purchase::Column::ItemType.eq(item_type))
        .filter(purchase::Column::ItemId.eq(item_id))
        .filter(purchase::Column::Status.eq(PurchaseStatus::Completed))
        .filter(purchase::Column::AccessGranted.eq(true))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(false);
    }

    content_item::Entity::update_many()
        .col_expr(
            content_item::Column::Downloads,
            Expr::col(content_item::Column::Downloads).add(1),
        )
        .filter(content_item::Column::Id.eq(item_id))
        .exec(conn)
        .await?;

    Ok(true)
}
