use axum::Json;
use axum::extract::{Path, State};
use sea_orm::EntityTrait;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::earnings::EarningsResponse;
use crate::services::earnings;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/me",
    tag = "Earnings",
    operation_id = "getMyEarnings",
    summary = "Your earnings dashboard",
    description = "Requires `earnings:view`. Balances, sales counters and monthly history (oldest month first). A developer with no sales yet sees zeroes.",
    responses(
        (status = 200, description = "Earnings", body = EarningsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_my_earnings(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<EarningsResponse>, AppError> {
    auth_user.require_permission("earnings:view")?;
    let row = earnings::find_or_create(&state.db, auth_user.user_id).await?;
    Ok(Json(EarningsResponse::try_from(row)?))
}

#[utoipa::path(
    get,
    path = "/{developer_id}",
    tag = "Earnings",
    operation_id = "getDeveloperEarnings",
    summary = "A developer's earnings",
    description = "Requires `payout:review`.",
    params(("developer_id" = i32, Path, description = "Developer user ID")),
    responses(
        (status = 200, description = "Earnings", body = EarningsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(developer_id))]
pub async fn get_developer_earnings(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(developer_id): Path<i32>,
) -> Result<Json<EarningsResponse>, AppError> {
    auth_user.require_permission("payout:review")?;

    user::Entity::find_by_id(developer_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let row = earnings::find_or_create(&state.db, developer_id).await?;
    Ok(Json(EarningsResponse::try_from(row)?))
}
