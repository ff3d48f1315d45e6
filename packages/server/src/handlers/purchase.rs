use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::purchase;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::purchase::*;
use crate::models::shared::{page_offset, page_params};
use crate::services::purchase as purchases;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/orders",
    tag = "Purchases",
    operation_id = "createPurchaseOrder",
    summary = "Start buying an item",
    description = "Requires `purchase:create`. Opens a gateway order for a paid, approved item and records a pending purchase. Free items, your own items and items you already own are refused.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Free item (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already owned or unavailable (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, item_id = payload.item_id))]
pub async fn create_order(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("purchase:create")?;

    let created = purchases::create_order(
        &state.db,
        state.gateway.as_ref(),
        &auth_user.viewer(),
        payload.item_type,
        payload.item_id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            order: created.order,
            purchases: created.purchases.into_iter().map(Into::into).collect(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/verify",
    tag = "Purchases",
    operation_id = "verifyPayment",
    summary = "Confirm a payment",
    description = "Checks the gateway signature, completes the order's purchases and credits each seller 70% of the price. Repeating a successful verification returns the completed purchases without crediting again.",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Completed purchases", body = Vec<PurchaseResponse>),
        (status = 400, description = "Bad signature (PAYMENT_VERIFICATION_FAILED) or validation error", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Order not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Nothing left to complete (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, order_id = %payload.order_id))]
pub async fn verify_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyPaymentRequest>,
) -> Result<Json<Vec<PurchaseResponse>>, AppError> {
    validate_verify_payment(&payload)?;

    let completed = purchases::verify_payment(
        &state.db,
        state.gateway.as_ref(),
        auth_user.user_id,
        &payload.order_id,
        &payload.payment_id,
        &payload.signature,
    )
    .await?;

    Ok(Json(completed.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Purchases",
    operation_id = "listMyPurchases",
    summary = "List your purchases",
    description = "Newest first. Filter by `status` to see only completed, pending or failed purchases.",
    params(PurchaseListQuery),
    responses(
        (status = 200, description = "Page of purchases", body = PurchaseListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_my_purchases(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PurchaseListQuery>,
) -> Result<Json<PurchaseListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = purchase::Entity::find()
        .filter(purchase::Column::BuyerId.eq(auth_user.user_id));
    if let Some(status) = query.status {
        select = select.filter(purchase::Column::Status.eq(status));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let rows = select
        .order_by_desc(purchase::Column::CreatedAt)
        .order_by_desc(purchase::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(PurchaseListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}
