//! Role catalog and role assignments.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    ManageEntity,
    ManageTrainings,
    ManageSessions,
    ManageUsers,
    ViewCatalog,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageEntity => "mentor:manageentity",
            Self::ManageTrainings => "mentor:managetrainings",
            Self::ManageSessions => "mentor:managesessions",
            Self::ManageUsers => "mentor:manageusers",
            Self::ViewCatalog => "mentor:viewcatalog",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role type from the catalog, keyed by shortname.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub shortname: String,
    pub name: String,
    pub capabilities: Vec<String>,
}

impl Role {
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities.iter().any(|c| c == capability.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub shortname: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
}

/// A role granted to a user in an entity context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role: String,
    pub entity_id: Uuid,
    /// Capabilities carried by the role at read time.
    pub capabilities: Vec<String>,
}

impl RoleAssignment {
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities.iter().any(|c| c == capability.as_str())
    }
}

/// The role catalog seeded on first start.
pub fn default_roles() -> Vec<CreateRole> {
    use Capability::*;
    vec![
        CreateRole {
            shortname: "admindedie".into(),
            name: "Dedicated administrator".into(),
            capabilities: vec![
                ManageEntity,
                ManageTrainings,
                ManageSessions,
                ManageUsers,
                ViewCatalog,
            ],
        },
        CreateRole {
            shortname: "respformation".into(),
            name: "Training manager".into(),
            capabilities: vec![ManageTrainings, ManageSessions, ViewCatalog],
        },
        CreateRole {
            shortname: "referentlocal".into(),
            name: "Local referent".into(),
            capabilities: vec![ManageSessions, ViewCatalog],
        },
        CreateRole {
            shortname: "reflocalnonediteur".into(),
            name: "Local referent (non-editor)".into(),
            capabilities: vec![ViewCatalog],
        },
        CreateRole {
            shortname: "participant".into(),
            name: "Participant".into(),
            capabilities: vec![],
        },
    ]
}
