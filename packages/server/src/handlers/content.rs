use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::filter::filter_fields;
use common::{AccessLevel, ApprovalStatus, PlanType};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::instrument;

use crate::entity::content_item;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::json::AppJson;
use crate::models::content::*;
use crate::models::shared::{page_offset, page_params};
use crate::services::access;
use crate::state::AppState;

fn json_strings(values: Vec<String>) -> serde_json::Value {
    serde_json::Value::from(values)
}

/// Owners and content managers may edit an item.
fn can_manage(auth_user: &AuthUser, item: &content_item::Model) -> bool {
    item.owner_id == auth_user.user_id
        || (auth_user.role.is_privileged() && auth_user.has_permission("content:manage"))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Content",
    operation_id = "createContent",
    summary = "Publish a template or component",
    description = "Requires `content:create`. Items from developers start `pending` review; items created by privileged users are approved immediately. Free items are stored with a zero price.",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Item created", body = ContentItemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, title = %payload.title))]
pub async fn create_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("content:create")?;
    validate_create_content(&payload)?;

    let (price_inr, price_usd_cents) = match payload.plan_type {
        PlanType::Free => (0, 0),
        PlanType::Paid => (payload.price_inr, payload.price_usd_cents),
    };
    let approval_status = if auth_user.role.is_privileged() {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Pending
    };

    let now = chrono::Utc::now();
    let model = content_item::ActiveModel {
        item_type: Set(payload.item_type),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        category: Set(payload.category.trim().to_lowercase()),
        tags: Set(json_strings(payload.tags)),
        plan_type: Set(payload.plan_type),
        price_inr: Set(price_inr),
        price_usd_cents: Set(price_usd_cents),
        code: Set(payload.code),
        readme_content: Set(payload.readme_content),
        git_repo_url: Set(payload.git_repo_url),
        live_demo_url: Set(payload.live_demo_url),
        dependencies: Set(json_strings(payload.dependencies)),
        preview_images: Set(json_strings(payload.preview_images)),
        owner_id: Set(auth_user.user_id),
        approval_status: Set(approval_status),
        featured: Set(false),
        popular: Set(false),
        is_active: Set(true),
        rating: Set(0.0),
        downloads: Set(0),
        views: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(ContentItemResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Content",
    operation_id = "listContent",
    summary = "Browse the catalogue",
    description = "Lists approved, active items. Only public metadata is returned; fetch an item by id for its preview or full content.",
    params(ContentListQuery),
    responses(
        (status = 200, description = "Page of items", body = ContentListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_content(
    State(state): State<AppState>,
    Query(query): Query<ContentListQuery>,
) -> Result<Json<ContentListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = content_item::Entity::find()
        .filter(content_item::Column::IsActive.eq(true))
        .filter(content_item::Column::ApprovalStatus.eq(ApprovalStatus::Approved));

    if let Some(item_type) = query.item_type {
        select = select.filter(content_item::Column::ItemType.eq(item_type));
    }
    if let Some(plan_type) = query.plan_type {
        select = select.filter(content_item::Column::PlanType.eq(plan_type));
    }
    if let Some(ref category) = query.category {
        select = select.filter(content_item::Column::Category.eq(category.trim().to_lowercase()));
    }
    if let Some(featured) = query.featured {
        select = select.filter(content_item::Column::Featured.eq(featured));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(content_item::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => content_item::Column::CreatedAt,
        "price_inr" => content_item::Column::PriceInr,
        "downloads" => content_item::Column::Downloads,
        "rating" => content_item::Column::Rating,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, price_inr, downloads, rating".into(),
            ));
        }
    };

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let models = select
        .order_by(sort_column, sort_order)
        .order_by_asc(content_item::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let data = models
        .into_iter()
        .map(|m| {
            ContentItemResponse::from(m)
                .into_fields()
                .map(|fields| filter_fields(fields, AccessLevel::NoAccess))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ContentListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Content",
    operation_id = "getContent",
    summary = "View an item",
    description = "Anonymous access allowed. Fields are filtered by the viewer's access level: paid items show a preview until purchased. Unapproved or deleted items are visible only to their owner and administrators.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item as seen by the viewer", body = ContentView),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer), fields(id))]
pub async fn get_content(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContentView>, AppError> {
    let item = find_item(&state.db, id).await?;
    let viewer = viewer.viewer();

    let listed = item.is_active && item.approval_status == ApprovalStatus::Approved;
    let insider = viewer
        .as_ref()
        .is_some_and(|v| v.user_id == item.owner_id || v.role.is_privileged());
    if !listed && !insider {
        return Err(AppError::NotFound("Item not found".into()));
    }

    let decision = access::resolve_access(&state.db, viewer.as_ref(), &item).await?;

    content_item::Entity::update_many()
        .col_expr(
            content_item::Column::Views,
            Expr::col(content_item::Column::Views).add(1),
        )
        .filter(content_item::Column::Id.eq(id))
        .exec(&state.db)
        .await?;

    let fields = ContentItemResponse::from(item).into_fields()?;
    Ok(Json(ContentView {
        item: filter_fields(fields, decision.level),
        access: decision,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Content",
    operation_id = "updateContent",
    summary = "Edit an item",
    description = "Owner or content manager. PATCH semantics. `featured` and `popular` may only be set by administrators.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Item updated", body = ContentItemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateContentRequest>,
) -> Result<Json<ContentItemResponse>, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_item_for_update(&txn, id).await?;

    if !can_manage(&auth_user, &existing) {
        return Err(AppError::PermissionDenied);
    }
    if (payload.featured.is_some() || payload.popular.is_some())
        && !auth_user.role.is_privileged()
    {
        return Err(AppError::PermissionDenied);
    }
    validate_update_content(&payload, &existing)?;

    if payload == UpdateContentRequest::default() {
        return Ok(Json(existing.into()));
    }

    let mut active: content_item::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(ref category) = payload.category {
        active.category = Set(category.trim().to_lowercase());
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(json_strings(tags));
    }
    if let Some(plan_type) = payload.plan_type {
        active.plan_type = Set(plan_type);
        if plan_type.is_free() {
            active.price_inr = Set(0);
            active.price_usd_cents = Set(0);
        }
    }
    let paid = payload.plan_type.is_none_or(|p| !p.is_free());
    if paid {
        if let Some(price) = payload.price_inr {
            active.price_inr = Set(price);
        }
        if let Some(price) = payload.price_usd_cents {
            active.price_usd_cents = Set(price);
        }
    }
    if let Some(code) = payload.code {
        active.code = Set(code);
    }
    if let Some(readme) = payload.readme_content {
        active.readme_content = Set(readme);
    }
    if let Some(url) = payload.git_repo_url {
        active.git_repo_url = Set(url);
    }
    if let Some(url) = payload.live_demo_url {
        active.live_demo_url = Set(url);
    }
    if let Some(deps) = payload.dependencies {
        active.dependencies = Set(json_strings(deps));
    }
    if let Some(images) = payload.preview_images {
        active.preview_images = Set(json_strings(images));
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    if let Some(popular) = payload.popular {
        active.popular = Set(popular);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Content",
    operation_id = "deleteContent",
    summary = "Withdraw an item",
    description = "Owner or content manager. Soft delete: the item leaves the catalogue but existing purchases keep their access records.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item withdrawn"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_item(&state.db, id).await?;
    if !can_manage(&auth_user, &existing) {
        return Err(AppError::PermissionDenied);
    }

    let mut active: content_item::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn set_approval(
    state: &AppState,
    auth_user: &AuthUser,
    id: i32,
    status: ApprovalStatus,
) -> Result<content_item::Model, AppError> {
    auth_user.require_permission("content:approve")?;

    let existing = find_item(&state.db, id).await?;
    let mut active: content_item::ActiveModel = existing.into();
    active.approval_status = Set(status);
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    tracing::info!(item_id = id, reviewer = auth_user.user_id, ?status, "Content reviewed");
    Ok(model)
}

#[utoipa::path(
    post,
    path = "/{id}/approve",
    tag = "Content",
    operation_id = "approveContent",
    summary = "Approve an item for sale",
    description = "Requires `content:approve`.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item approved", body = ContentItemResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn approve_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContentItemResponse>, AppError> {
    let model = set_approval(&state, &auth_user, id, ApprovalStatus::Approved).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/reject",
    tag = "Content",
    operation_id = "rejectContent",
    summary = "Reject an item",
    description = "Requires `content:approve`. Rejected items leave the catalogue.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item rejected", body = ContentItemResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn reject_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContentItemResponse>, AppError> {
    let model = set_approval(&state, &auth_user, id, ApprovalStatus::Rejected).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/purchased",
    tag = "Content",
    operation_id = "bulkCheckPurchased",
    summary = "Purchased status for many items",
    description = "Anonymous viewers own nothing; administrators own everything; everyone else is answered from their completed purchases in one query.",
    request_body = BulkCheckRequest,
    responses(
        (status = 200, description = "Purchased status per item id", body = BulkCheckResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer, payload), fields(count = payload.item_ids.len()))]
pub async fn bulk_check_purchased(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkCheckRequest>,
) -> Result<Json<BulkCheckResponse>, AppError> {
    validate_bulk_check(&payload)?;

    let purchased = access::bulk_check_purchased(
        &state.db,
        viewer.viewer().as_ref(),
        payload.item_type,
        &payload.item_ids,
    )
    .await?;

    Ok(Json(BulkCheckResponse { purchased }))
}

#[utoipa::path(
    post,
    path = "/{id}/download",
    tag = "Content",
    operation_id = "recordDownload",
    summary = "Record a download",
    description = "Counts a download against the caller's completed purchase. Without one nothing is recorded and `recorded` is false.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Whether the download was recorded", body = DownloadResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn record_download(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DownloadResponse>, AppError> {
    let item = find_item(&state.db, id).await?;
    let recorded =
        access::record_download(&state.db, &auth_user.viewer(), item.item_type, item.id).await?;
    Ok(Json(DownloadResponse { recorded }))
}

async fn find_item<C: ConnectionTrait>(db: &C, id: i32) -> Result<content_item::Model, AppError> {
    content_item::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))
}

async fn find_item_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<content_item::Model, AppError> {
    content_item::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))
}
