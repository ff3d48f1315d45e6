//! Field-level filtering of serialized content items by access level.
//!
//! The allow-lists below are the only place that decides which fields a
//! viewer may receive. Anything not listed for a level is dropped.

use serde_json::{Map, Value};

use crate::access::AccessLevel;

/// Fields every viewer may see, including those with [`AccessLevel::NoAccess`].
pub const PUBLIC_FIELDS: &[&str] = &[
    "id",
    "item_type",
    "title",
    "description",
    "category",
    "tags",
    "plan_type",
    "price_inr",
    "price_usd_cents",
    "rating",
    "downloads",
    "views",
    "featured",
    "popular",
    "owner_id",
    "created_at",
];

/// Fields added on top of [`PUBLIC_FIELDS`] for [`AccessLevel::LimitedAccess`].
/// Several of them are rewritten into teasers before they are returned.
pub const PREVIEW_FIELDS: &[&str] = &[
    "code",
    "readme_content",
    "git_repo_url",
    "live_demo_url",
    "dependencies",
    "preview_images",
    "approval_status",
    "updated_at",
];

pub const CODE_TEASER: &str = "// Full source code is available after purchase.";
pub const MORE_DEPENDENCIES_MARKER: &str = "...more after purchase";
pub const MAX_PREVIEW_DEPENDENCIES: usize = 3;
pub const MAX_PREVIEW_IMAGES: usize = 2;
pub const MAX_PREVIEW_README_CHARS: usize = 300;
const README_ELLIPSIS: char = '…';

/// Returns true if `field` may appear in output filtered for `level`.
pub fn is_allowed(field: &str, level: AccessLevel) -> bool {
    match level {
        AccessLevel::FullAccess | AccessLevel::OwnerAccess => true,
        AccessLevel::LimitedAccess => {
            PUBLIC_FIELDS.contains(&field) || PREVIEW_FIELDS.contains(&field)
        }
        AccessLevel::NoAccess => PUBLIC_FIELDS.contains(&field),
    }
}

/// Strip or rewrite fields of a serialized item according to `level`.
///
/// Filtering an already filtered map yields the same map.
pub fn filter_fields(item: Map<String, Value>, level: AccessLevel) -> Map<String, Value> {
    if level.is_full() {
        return item;
    }

    let mut out: Map<String, Value> = item
        .into_iter()
        .filter(|(key, _)| is_allowed(key, level))
        .collect();

    if level == AccessLevel::LimitedAccess {
        apply_preview_rewrites(&mut out);
    }

    out
}

fn apply_preview_rewrites(out: &mut Map<String, Value>) {
    if let Some(code) = out.get_mut("code") {
        *code = Value::String(CODE_TEASER.to_string());
    }
    if let Some(url) = out.get_mut("git_repo_url") {
        *url = Value::Null;
    }
    if let Some(Value::Array(deps)) = out.get_mut("dependencies") {
        truncate_dependencies(deps);
    }
    if let Some(Value::Array(images)) = out.get_mut("preview_images") {
        images.truncate(MAX_PREVIEW_IMAGES);
    }
    if let Some(Value::String(readme)) = out.get_mut("readme_content") {
        truncate_readme(readme);
    }
}

fn truncate_dependencies(deps: &mut Vec<Value>) {
    let marker = Value::String(MORE_DEPENDENCIES_MARKER.to_string());
    let had_marker = deps.contains(&marker);
    deps.retain(|d| *d != marker);

    if deps.len() > MAX_PREVIEW_DEPENDENCIES || had_marker {
        deps.truncate(MAX_PREVIEW_DEPENDENCIES);
        deps.push(marker);
    }
}

fn truncate_readme(readme: &mut String) {
    if readme.chars().count() <= MAX_PREVIEW_README_CHARS {
        return;
    }
    let cut: String = readme.chars().take(MAX_PREVIEW_README_CHARS).collect();
    *readme = cut;
    readme.push(README_ELLIPSIS);
}
