use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::payout_request;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::payout::*;
use crate::models::shared::{page_offset, page_params};
use crate::services::payout::{self as payouts, Actor, Change, NewPayout};
use crate::state::AppState;

/// Developers act on their own requests; reviewers on any.
fn actor_for(auth_user: &AuthUser) -> Actor {
    if auth_user.has_permission("payout:review") {
        Actor::Reviewer(auth_user.user_id)
    } else {
        Actor::Developer(auth_user.user_id)
    }
}

async fn list_page(
    db: &DatabaseConnection,
    mut select: Select<payout_request::Entity>,
    query: &PayoutListQuery,
) -> Result<PayoutListResponse, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);
    if let Some(status) = query.status {
        select = select.filter(payout_request::Column::Status.eq(status));
    }

    let total = select.clone().paginate(db, per_page).num_items().await?;
    let rows = select
        .order_by_desc(payout_request::Column::RequestedAt)
        .order_by_desc(payout_request::Column::RequestId)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(db)
        .await?;

    Ok(PayoutListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Payouts",
    operation_id = "requestPayout",
    summary = "Request a withdrawal",
    description = "Requires `payout:request`. The amount moves from the available balance to pending until the request is completed, rejected or cancelled. Only one request may be open at a time.",
    request_body = CreatePayoutRequest,
    responses(
        (status = 201, description = "Request created", body = PayoutResponse),
        (status = 400, description = "Amount out of bounds or method details missing (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Open request exists (CONFLICT) or balance too low (INSUFFICIENT_FUNDS)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, amount = payload.amount))]
pub async fn create_payout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePayoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("payout:request")?;

    let model = payouts::create_request(
        &state.db,
        &state.config.payout,
        auth_user.user_id,
        NewPayout {
            amount: payload.amount,
            method: payload.method,
            details: payload.details,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PayoutResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Payouts",
    operation_id = "listMyPayouts",
    summary = "List your payout requests",
    params(PayoutListQuery),
    responses(
        (status = 200, description = "Page of requests", body = PayoutListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_my_payouts(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PayoutListQuery>,
) -> Result<Json<PayoutListResponse>, AppError> {
    auth_user.require_permission("payout:request")?;
    let select = payout_request::Entity::find()
        .filter(payout_request::Column::DeveloperId.eq(auth_user.user_id));
    Ok(Json(list_page(&state.db, select, &query).await?))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Payouts",
    operation_id = "listPayouts",
    summary = "List all payout requests",
    description = "Requires `payout:review`.",
    params(PayoutListQuery),
    responses(
        (status = 200, description = "Page of requests", body = PayoutListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_payouts(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PayoutListQuery>,
) -> Result<Json<PayoutListResponse>, AppError> {
    auth_user.require_permission("payout:review")?;
    let mut select = payout_request::Entity::find();
    if let Some(developer_id) = query.developer_id {
        select = select.filter(payout_request::Column::DeveloperId.eq(developer_id));
    }
    Ok(Json(list_page(&state.db, select, &query).await?))
}

#[utoipa::path(
    get,
    path = "/{request_id}",
    tag = "Payouts",
    operation_id = "getPayout",
    summary = "Get a payout request",
    description = "Developers see only their own requests; reviewers see all.",
    params(("request_id" = String, Path, description = "Payout request ID")),
    responses(
        (status = 200, description = "Payout request", body = PayoutResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(request_id = %request_id))]
pub async fn get_payout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<PayoutResponse>, AppError> {
    let model = payout_request::Entity::find_by_id(request_id)
        .one(&state.db)
        .await?
        .filter(|m| match actor_for(&auth_user) {
            Actor::Reviewer(_) => true,
            Actor::Developer(id) => m.developer_id == id,
        })
        .ok_or_else(|| AppError::NotFound("Payout request not found".into()))?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{request_id}/cancel",
    tag = "Payouts",
    operation_id = "cancelPayout",
    summary = "Cancel your open payout request",
    description = "Returns the reserved amount to the available balance.",
    params(("request_id" = String, Path, description = "Payout request ID")),
    responses(
        (status = 200, description = "Request cancelled", body = PayoutResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Request is already closed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(request_id = %request_id))]
pub async fn cancel_payout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<PayoutResponse>, AppError> {
    let model = payouts::transition(
        &state.db,
        &request_id,
        Actor::Developer(auth_user.user_id),
        Change::Cancel,
    )
    .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{request_id}/approve",
    tag = "Payouts",
    operation_id = "approvePayout",
    summary = "Approve a pending payout request",
    description = "Requires `payout:review`.",
    params(("request_id" = String, Path, description = "Payout request ID")),
    request_body(content = ApprovePayoutRequest, description = "Optional reviewer notes"),
    responses(
        (status = 200, description = "Request approved", body = PayoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Invalid transition (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(request_id = %request_id, reviewer = auth_user.user_id))]
pub async fn approve_payout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    payload: Option<AppJson<ApprovePayoutRequest>>,
) -> Result<Json<PayoutResponse>, AppError> {
    auth_user.require_permission("payout:review")?;
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();
    validate_approve(&payload)?;

    let model = payouts::transition(
        &state.db,
        &request_id,
        Actor::Reviewer(auth_user.user_id),
        Change::Approve {
            notes: payload.notes,
        },
    )
    .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{request_id}/reject",
    tag = "Payouts",
    operation_id = "rejectPayout",
    summary = "Reject a payout request",
    description = "Requires `payout:review`. Returns the reserved amount to the developer's available balance.",
    params(("request_id" = String, Path, description = "Payout request ID")),
    request_body = RejectPayoutRequest,
    responses(
        (status = 200, description = "Request rejected", body = PayoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Invalid transition (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(request_id = %request_id, reviewer = auth_user.user_id))]
pub async fn reject_payout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    AppJson(payload): AppJson<RejectPayoutRequest>,
) -> Result<Json<PayoutResponse>, AppError> {
    auth_user.require_permission("payout:review")?;
    validate_reject(&payload)?;

    let model = payouts::transition(
        &state.db,
        &request_id,
        Actor::Reviewer(auth_user.user_id),
        Change::Reject {
            reason: payload.reason.trim().to_string(),
            notes: payload.notes,
        },
    )
    .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{request_id}/start-processing",
    tag = "Payouts",
    operation_id = "startPayoutProcessing",
    summary = "Record that the transfer has started",
    description = "Requires `payout:review`. Only approved requests.",
    params(("request_id" = String, Path, description = "Payout request ID")),
    request_body = StartProcessingRequest,
    responses(
        (status = 200, description = "Request processing", body = PayoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Invalid transition (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(request_id = %request_id, reviewer = auth_user.user_id))]
pub async fn start_processing_payout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    AppJson(payload): AppJson<StartProcessingRequest>,
) -> Result<Json<PayoutResponse>, AppError> {
    auth_user.require_permission("payout:review")?;
    validate_start_processing(&payload)?;

    let model = payouts::transition(
        &state.db,
        &request_id,
        Actor::Reviewer(auth_user.user_id),
        Change::StartProcessing {
            transaction_id: payload.transaction_id.trim().to_string(),
            notes: payload.notes,
        },
    )
    .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{request_id}/complete",
    tag = "Payouts",
    operation_id = "completePayout",
    summary = "Mark a payout as paid",
    description = "Requires `payout:review`. Accepted from `approved` or `processing`. The requested amount leaves pending and is added to the withdrawn total.",
    params(("request_id" = String, Path, description = "Payout request ID")),
    request_body = CompletePayoutRequest,
    responses(
        (status = 200, description = "Request completed", body = PayoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Invalid transition (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(request_id = %request_id, reviewer = auth_user.user_id))]
pub async fn complete_payout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    AppJson(payload): AppJson<CompletePayoutRequest>,
) -> Result<Json<PayoutResponse>, AppError> {
    auth_user.require_permission("payout:review")?;
    validate_complete(&payload)?;

    let model = payouts::transition(
        &state.db,
        &request_id,
        Actor::Reviewer(auth_user.user_id),
        Change::Complete {
            transaction_id: payload.transaction_id.map(|t| t.trim().to_string()),
            final_amount: payload.final_amount,
            processing_fee: payload.processing_fee,
            notes: payload.notes,
        },
    )
    .await?;
    Ok(Json(model.into()))
}
