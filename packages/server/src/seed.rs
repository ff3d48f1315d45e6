use common::Role;
use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{cart_item, content_item, payout_request, purchase, role_permission};

const BUYER: &[&str] = &["purchase:create"];

const SELLER: &[&str] = &[
    "purchase:create",
    "content:create",
    "earnings:view",
    "payout:request",
];

const ADMINISTRATOR: &[&str] = &[
    "purchase:create",
    "content:create",
    "earnings:view",
    "payout:request",
    "content:manage",
    "content:approve",
    "payout:review",
    "user:manage",
];

/// Permissions granted to each role by default.
pub fn default_permissions(role: Role) -> &'static [&'static str] {
    match role {
        Role::User => BUYER,
        Role::Developer => SELLER,
        Role::Admin | Role::SuperAdmin => ADMINISTRATOR,
    }
}

/// Seed the `role_permission` table with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for &role in Role::ALL {
        for &permission in default_permissions(role) {
            let model = role_permission::ActiveModel {
                role: Set(role.as_str().to_string()),
                permission: Set(permission.to_string()),
            };

            let result = role_permission::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        role_permission::Column::Role,
                        role_permission::Column::Permission,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(db)
                .await;

            match result {
                Ok(_) => inserted += 1,
                Err(DbErr::RecordNotInserted) => {}
                Err(e) => return Err(e),
            }
        }
    }

    if inserted > 0 {
        info!("Seeded {} new role-permission mappings", inserted);
    }

    Ok(())
}

/// Unique indexes that hold the marketplace invariants at the storage layer.
/// Schema-sync cannot express partial indexes, so they are created here.
const UNIQUE_INDEXES: &[(&str, &str)] = &[
    (
        "uq_purchase_completed_buyer_item",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_purchase_completed_buyer_item \
         ON purchase (buyer_id, item_type, item_id) WHERE status = 'completed'",
    ),
    (
        "uq_payout_request_open_developer",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_payout_request_open_developer \
         ON payout_request (developer_id) \
         WHERE status IN ('pending', 'approved', 'processing')",
    ),
];

/// Ensure required database indexes exist.
///
/// Failing to create a unique index is fatal; the lookup indexes only warn.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    for &(name, sql) in UNIQUE_INDEXES {
        db.execute_unprepared(sql).await?;
        info!("Ensured index {} exists", name);
    }

    let cart_line = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_cart_item_user_item")
        .table(cart_item::Entity)
        .col(cart_item::Column::UserId)
        .col(cart_item::Column::ItemType)
        .col(cart_item::Column::ItemId)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&cart_line).await?;
    info!("Ensured index uq_cart_item_user_item exists");

    let lookups = [
        // SELECT ... FROM purchase WHERE buyer_id = ? AND status = ?
        Index::create()
            .if_not_exists()
            .name("idx_purchase_buyer_status")
            .table(purchase::Entity)
            .col(purchase::Column::BuyerId)
            .col(purchase::Column::Status)
            .to_string(PostgresQueryBuilder),
        // Public catalogue listing
        Index::create()
            .if_not_exists()
            .name("idx_content_item_listing")
            .table(content_item::Entity)
            .col(content_item::Column::ApprovalStatus)
            .col(content_item::Column::IsActive)
            .col(content_item::Column::CreatedAt)
            .to_string(PostgresQueryBuilder),
        // Reviewer queue
        Index::create()
            .if_not_exists()
            .name("idx_payout_request_status_requested")
            .table(payout_request::Entity)
            .col(payout_request::Column::Status)
            .col(payout_request::Column::RequestedAt)
            .to_string(PostgresQueryBuilder),
    ];

    for stmt in lookups {
        if let Err(e) = db.execute_unprepared(&stmt).await {
            tracing::warn!("Failed to create lookup index: {}", e);
        }
    }

    Ok(())
}
