use serde::{Deserialize, Serialize};

use crate::content::PlanType;
use crate::role::Role;

/// What a viewer may see or do with a content item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Public metadata only.
    NoAccess,
    /// Preview: source code and repository links are withheld.
    LimitedAccess,
    FullAccess,
    /// Full access plus edit and delete rights.
    OwnerAccess,
}

impl AccessLevel {
    /// Returns true if the level exposes the unfiltered item.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::FullAccess | Self::OwnerAccess)
    }
}

/// Why a level was granted. Reported back to clients next to the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    FreeContent,
    Owner,
    Administrator,
    Purchased,
    PurchaseRequired,
}

/// An authenticated viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i32,
    pub role: Role,
}

/// The facts about an item that access resolution depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemFacts {
    pub owner_id: i32,
    pub plan_type: PlanType,
}

/// Outcome of resolving a viewer against an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AccessDecision {
    pub level: AccessLevel,
    pub reason: AccessReason,
    pub purchase_required: bool,
    pub can_download: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl AccessDecision {
    fn full(reason: AccessReason) -> Self {
        Self {
            level: AccessLevel::FullAccess,
            reason,
            purchase_required: false,
            can_download: true,
            can_edit: false,
            can_delete: false,
        }
    }

    fn limited() -> Self {
        Self {
            level: AccessLevel::LimitedAccess,
            reason: AccessReason::PurchaseRequired,
            purchase_required: true,
            can_download: false,
            can_edit: false,
            can_delete: false,
        }
    }

    fn owner() -> Self {
        Self {
            level: AccessLevel::OwnerAccess,
            reason: AccessReason::Owner,
            purchase_required: false,
            can_download: true,
            can_edit: true,
            can_delete: true,
        }
    }

    fn administrator() -> Self {
        Self {
            can_edit: true,
            can_delete: true,
            ..Self::full(AccessReason::Administrator)
        }
    }

    /// Final step of resolution, once purchase history has been consulted.
    pub fn from_purchase(purchased: bool) -> Self {
        if purchased {
            Self::full(AccessReason::Purchased)
        } else {
            Self::limited()
        }
    }
}

/// Result of the rules that need no purchase lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precheck {
    Decided(AccessDecision),
    /// Authenticated stranger on a paid item: purchase history decides.
    NeedsPurchaseCheck,
}

/// Apply the resolution rules in order, stopping before the purchase lookup.
///
/// Order: anonymous+free, anonymous+paid, owner, privileged role, free item,
/// then purchase history. The first matching rule wins.
pub fn precheck(viewer: Option<&Viewer>, item: &ItemFacts) -> Precheck {
    let Some(viewer) = viewer else {
        return Precheck::Decided(if item.plan_type.is_free() {
            AccessDecision::full(AccessReason::FreeContent)
        } else {
            AccessDecision::limited()
        });
    };

    if viewer.user_id == item.owner_id {
        return Precheck::Decided(AccessDecision::owner());
    }
    if viewer.role.is_privileged() {
        return Precheck::Decided(AccessDecision::administrator());
    }
    if item.plan_type.is_free() {
        return Precheck::Decided(AccessDecision::full(AccessReason::FreeContent));
    }
    Precheck::NeedsPurchaseCheck
}

/// Resolve access when the viewer's purchase status is already known.
pub fn resolve_access(viewer: Option<&Viewer>, item: &ItemFacts, purchased: bool) -> AccessDecision {
    match precheck(viewer, item) {
        Precheck::Decided(decision) => decision,
        Precheck::NeedsPurchaseCheck => AccessDecision::from_purchase(purchased),
    }
}

/// Answer for a bulk purchased-status check that needs no lookup, if any.
///
/// Privileged viewers own everything, anonymous viewers own nothing.
pub fn bulk_shortcut(viewer: Option<&Viewer>) -> Option<bool> {
    match viewer {
        None => Some(false),
        Some(v) if v.role.is_privileged() => Some(true),
        Some(_) => None,
    }
}
