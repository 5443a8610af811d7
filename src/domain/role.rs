//! Role hierarchy: organization roles and per-project grants

use serde::{Deserialize, Serialize};

/// Organization-level role of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "org_role", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
}

impl OrgRole {
    /// Owner and Admin administer the organization
    pub fn is_admin(&self) -> bool {
        matches!(self, OrgRole::Owner | OrgRole::Admin)
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrgRole::Owner => write!(f, "OWNER"),
            OrgRole::Admin => write!(f, "ADMIN"),
            OrgRole::Member => write!(f, "MEMBER"),
        }
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OWNER" => Ok(OrgRole::Owner),
            "ADMIN" => Ok(OrgRole::Admin),
            "MEMBER" => Ok(OrgRole::Member),
            _ => Err(format!("Unknown organization role: {}", s)),
        }
    }
}

/// Per-project grant layered on top of organization membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectRole {
    Editor,
    Viewer,
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectRole::Editor => write!(f, "EDITOR"),
            ProjectRole::Viewer => write!(f, "VIEWER"),
        }
    }
}

impl std::str::FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EDITOR" => Ok(ProjectRole::Editor),
            "VIEWER" => Ok(ProjectRole::Viewer),
            _ => Err(format!("Unknown project role: {}", s)),
        }
    }
}
