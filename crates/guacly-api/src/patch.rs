// JSON-Patch-like bodies for permission and membership edits.
//
// Guacamole applies `[{op, path, value}, ...]` server-side. Ordering is
// preserved; atomicity across entries is whatever the server provides.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
}

/// One `{op, path, value}` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: String,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn remove(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: value.into(),
        }
    }

    fn with_op(op: PatchOp, path: String, value: String) -> Self {
        Self { op, path, value }
    }

    /// Grant or revoke a system-wide permission.
    pub fn system(op: PatchOp, permission: SystemPermission) -> Self {
        Self::with_op(op, "/systemPermissions".into(), permission.to_string())
    }

    /// Grant or revoke a permission on a connection or connection group.
    pub fn object(
        op: PatchOp,
        target: ObjectTarget,
        identifier: &str,
        permission: ObjectPermission,
    ) -> Self {
        Self::with_op(
            op,
            format!("{}/{identifier}", target.path()),
            permission.to_string(),
        )
    }

    /// Add or remove a membership entry (user ↔ user group).
    pub fn member(op: PatchOp, identifier: impl Into<String>) -> Self {
        Self::with_op(op, "/".into(), identifier.into())
    }
}

/// System-wide permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SystemPermission {
    Administer,
    CreateUser,
    CreateUserGroup,
    CreateConnection,
    CreateConnectionGroup,
    CreateSharingProfile,
}

/// Permissions on a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ObjectPermission {
    #[default]
    Read,
    Update,
    Delete,
    Administer,
}

/// Which kind of object an [`ObjectPermission`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectTarget {
    Connection,
    ConnectionGroup,
    SharingProfile,
    User,
    UserGroup,
}

impl ObjectTarget {
    /// Permission-set path for this target kind.
    pub fn path(self) -> &'static str {
        match self {
            Self::Connection => "/connectionPermissions",
            Self::ConnectionGroup => "/connectionGroupPermissions",
            Self::SharingProfile => "/sharingProfilePermissions",
            Self::User => "/userPermissions",
            Self::UserGroup => "/userGroupPermissions",
        }
    }
}
