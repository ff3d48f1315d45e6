use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{AccessDecision, ApprovalStatus, ItemType, PlanType};
use serde::{Deserialize, Serialize};

use crate::entity::content_item;
use crate::error::AppError;

pub use super::shared::{Pagination, escape_like};
use super::shared::{double_option, validate_bulk_ids, validate_text, validate_title};

const MAX_LIST_ENTRIES: usize = 50;
/// Upper bound for `price_inr` and `price_usd_cents`.
pub const MAX_PRICE: i64 = 10_000_000;

/// Request body for publishing a template or component.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContentRequest {
    pub item_type: ItemType,
    #[schema(example = "Glassmorphism Pricing Table")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "pricing")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub plan_type: PlanType,
    /// Price in whole rupees. Required and positive for paid items; ignored for free items.
    #[serde(default)]
    #[schema(example = 999)]
    pub price_inr: i64,
    #[serde(default)]
    pub price_usd_cents: i64,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub readme_content: String,
    pub git_repo_url: Option<String>,
    pub live_demo_url: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub preview_images: Vec<String>,
}

fn validate_list(values: &[String], name: &str) -> Result<(), AppError> {
    if values.len() > MAX_LIST_ENTRIES {
        return Err(AppError::Validation(format!(
            "At most {MAX_LIST_ENTRIES} {name} are allowed"
        )));
    }
    Ok(())
}

fn validate_prices(plan_type: PlanType, price_inr: i64, price_usd_cents: i64) -> Result<(), AppError> {
    if !plan_type.is_free() && price_inr <= 0 {
        return Err(AppError::Validation(
            "Paid items need a positive price_inr".into(),
        ));
    }
    if price_inr < 0 || price_usd_cents < 0 {
        return Err(AppError::Validation("Prices must not be negative".into()));
    }
    if price_inr > MAX_PRICE || price_usd_cents > MAX_PRICE {
        return Err(AppError::Validation(format!(
            "Prices must not exceed {MAX_PRICE}"
        )));
    }
    Ok(())
}

pub fn validate_create_content(payload: &CreateContentRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_text(&payload.category, "Category", 64)?;
    validate_prices(payload.plan_type, payload.price_inr, payload.price_usd_cents)?;
    validate_list(&payload.tags, "tags")?;
    validate_list(&payload.dependencies, "dependencies")?;
    validate_list(&payload.preview_images, "preview images")?;
    Ok(())
}

/// PATCH body; absent fields are left unchanged.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub plan_type: Option<PlanType>,
    pub price_inr: Option<i64>,
    pub price_usd_cents: Option<i64>,
    pub code: Option<String>,
    pub readme_content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub git_repo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub live_demo_url: Option<Option<String>>,
    pub dependencies: Option<Vec<String>>,
    pub preview_images: Option<Vec<String>>,
    /// Privileged reviewers only.
    pub featured: Option<bool>,
    /// Privileged reviewers only.
    pub popular: Option<bool>,
}

/// Validate a PATCH against the item it will be applied to.
pub fn validate_update_content(
    payload: &UpdateContentRequest,
    existing: &content_item::Model,
) -> Result<(), AppError> {
    if let Some(ref title) = payload.title {
        validate_title(title)?;
    }
    if let Some(ref category) = payload.category {
        validate_text(category, "Category", 64)?;
    }
    validate_prices(
        payload.plan_type.unwrap_or(existing.plan_type),
        payload.price_inr.unwrap_or(existing.price_inr),
        payload.price_usd_cents.unwrap_or(existing.price_usd_cents),
    )?;
    for (list, name) in [
        (&payload.tags, "tags"),
        (&payload.dependencies, "dependencies"),
        (&payload.preview_images, "preview images"),
    ] {
        if let Some(values) = list {
            validate_list(values, name)?;
        }
    }
    Ok(())
}

fn strings(value: &serde_json::Value) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// Full representation of an item, before access filtering.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContentItemResponse {
    pub id: i32,
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub plan_type: PlanType,
    pub price_inr: i64,
    pub price_usd_cents: i64,
    pub code: String,
    pub readme_content: String,
    pub git_repo_url: Option<String>,
    pub live_demo_url: Option<String>,
    pub dependencies: Vec<String>,
    pub preview_images: Vec<String>,
    pub owner_id: i32,
    pub approval_status: ApprovalStatus,
    pub featured: bool,
    pub popular: bool,
    pub is_active: bool,
    pub rating: f64,
    pub downloads: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<content_item::Model> for ContentItemResponse {
    fn from(m: content_item::Model) -> Self {
        Self {
            tags: strings(&m.tags),
            dependencies: strings(&m.dependencies),
            preview_images: strings(&m.preview_images),
            id: m.id,
            item_type: m.item_type,
            title: m.title,
            description: m.description,
            category: m.category,
            plan_type: m.plan_type,
            price_inr: m.price_inr,
            price_usd_cents: m.price_usd_cents,
            code: m.code,
            readme_content: m.readme_content,
            git_repo_url: m.git_repo_url,
            live_demo_url: m.live_demo_url,
            owner_id: m.owner_id,
            approval_status: m.approval_status,
            featured: m.featured,
            popular: m.popular,
            is_active: m.is_active,
            rating: m.rating,
            downloads: m.downloads,
            views: m.views,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl ContentItemResponse {
    /// Field map suitable for `common::filter::filter_fields`.
    pub fn into_fields(self) -> Result<serde_json::Map<String, serde_json::Value>, AppError> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(AppError::Internal("Content item did not serialize to an object".into())),
            Err(e) => Err(AppError::Internal(format!("Failed to serialize content item: {e}"))),
        }
    }
}

/// An item as seen by the requesting viewer.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContentView {
    /// Item fields, filtered to what the access level allows.
    #[schema(value_type = Object)]
    pub item: serde_json::Map<String, serde_json::Value>,
    pub access: AccessDecision,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ContentListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive title search.
    pub search: Option<String>,
    pub item_type: Option<ItemType>,
    pub category: Option<String>,
    pub plan_type: Option<PlanType>,
    pub featured: Option<bool>,
    /// One of `created_at` (default), `price_inr`, `downloads`, `rating`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContentListResponse {
    /// Public metadata only.
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub pagination: Pagination,
}

/// Request body for a bulk purchased-status check.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct BulkCheckRequest {
    pub item_type: ItemType,
    #[schema(example = json!([1, 2, 3]))]
    pub item_ids: Vec<i32>,
}

pub fn validate_bulk_check(payload: &BulkCheckRequest) -> Result<(), AppError> {
    validate_bulk_ids(&payload.item_ids, "item_ids", 100)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BulkCheckResponse {
    /// Item id to purchased status.
    pub purchased: BTreeMap<i32, bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// False when the viewer holds no purchase granting access.
    pub recorded: bool,
}
