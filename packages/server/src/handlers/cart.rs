use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::ItemType;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::cart::*;
use crate::services::cart as carts;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Cart",
    operation_id = "getCart",
    summary = "View your cart",
    description = "Returns the stored lines and what a checkout would charge right now, including warnings for lines that would be skipped or repriced.",
    responses(
        (status = 200, description = "Cart contents", body = CartResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CartResponse>, AppError> {
    let (rows, summary) = carts::summary(&state.db, auth_user.user_id).await?;
    Ok(Json(CartResponse {
        items: rows.into_iter().map(Into::into).collect(),
        summary,
    }))
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "Cart",
    operation_id = "addCartItem",
    summary = "Add an item to your cart",
    description = "Only paid, approved items you do not own yet. The current price is remembered with the line.",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Line added", body = CartLineResponse),
        (status = 400, description = "Free item (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already owned, already in cart or unavailable (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, item_id = payload.item_id))]
pub async fn add_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddToCartRequest>,
) -> Result<impl IntoResponse, AppError> {
    let row = carts::add_item(
        &state.db,
        &auth_user.viewer(),
        payload.item_type,
        payload.item_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(CartLineResponse::from(row))))
}

#[utoipa::path(
    delete,
    path = "/items/{item_type}/{item_id}",
    tag = "Cart",
    operation_id = "removeCartItem",
    summary = "Remove a line from your cart",
    params(
        ("item_type" = ItemType, Path, description = "`template` or `component`"),
        ("item_id" = i32, Path, description = "Item ID"),
    ),
    responses(
        (status = 204, description = "Line removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not in cart (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn remove_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(ItemType, i32)>,
) -> Result<impl IntoResponse, AppError> {
    carts::remove_item(&state.db, auth_user.user_id, item_type, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/",
    tag = "Cart",
    operation_id = "clearCart",
    summary = "Empty your cart",
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn clear_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    carts::clear(&state.db, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/checkout",
    tag = "Cart",
    operation_id = "checkoutCart",
    summary = "Pay for everything in your cart",
    description = "Requires `purchase:create`. Opens one gateway order for all payable lines at their current prices. Lines you already own or that are no longer for sale stay out of the order and are reported as warnings. Ordered lines leave the cart.",
    responses(
        (status = 201, description = "Order created", body = CheckoutResponse),
        (status = 400, description = "Nothing payable (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn checkout(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("purchase:create")?;

    let outcome = carts::checkout(&state.db, state.gateway.as_ref(), auth_user.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: outcome.created.order,
            purchases: outcome.created.purchases.into_iter().map(Into::into).collect(),
            subtotal: outcome.summary.subtotal,
            warnings: outcome.summary.warnings,
        }),
    ))
}
