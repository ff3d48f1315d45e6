#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role.
///
/// Administrative checks go through [`Role::is_privileged`], never role names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular buyer account.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "user"))]
    User,
    /// Seller that can publish templates and components.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "developer"))]
    Developer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "admin"))]
    Admin,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "superadmin"))]
    #[serde(rename = "superadmin")]
    SuperAdmin,
}

impl Role {
    /// Returns true for roles with administrative rights over all content.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    /// Returns true if the role may sell content.
    pub fn can_sell(&self) -> bool {
        !matches!(self, Self::User)
    }

    pub const ALL: &'static [Role] = &[Self::User, Self::Developer, Self::Admin, Self::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Developer => "developer",
            Self::Admin => "admin",
            Self::SuperAdmin => "superadmin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role '{0}'. Valid values: user, developer, admin, superadmin")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "developer" => Ok(Self::Developer),
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::SuperAdmin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}
