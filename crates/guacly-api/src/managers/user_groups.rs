use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

use super::Resource;
use crate::error::Error;
use crate::patch::{ObjectPermission, ObjectTarget, PatchOp, PatchOperation, SystemPermission};
use crate::session::Session;
use crate::templates;

/// User groups: `.../userGroups`.
#[derive(Debug, Clone)]
pub struct UserGroups<'a> {
    resource: Resource<'a>,
}

impl<'a> UserGroups<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str) -> Self {
        Self {
            resource: Resource::new(session, datasource, "userGroups"),
        }
    }

    pub fn datasource(&self) -> &str {
        self.resource.datasource()
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.resource.list().await
    }

    pub async fn details(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.details(identifier).await
    }

    pub async fn permissions(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "permissions").await
    }

    /// Usernames of the group's members.
    pub async fn member_users(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "memberUsers").await
    }

    /// Identifiers of groups nested inside this one.
    pub async fn member_user_groups(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "memberUserGroups").await
    }

    /// Identifiers of groups this one is a member of.
    pub async fn parent_groups(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "userGroups").await
    }

    pub async fn create(&self, payload: &Value) -> Result<Value, Error> {
        self.resource.create(payload, &templates::user_group()).await
    }

    /// Like [`create`](Self::create), but `None` when the group exists.
    pub async fn create_if_absent(&self, payload: &Value) -> Result<Option<Value>, Error> {
        self.resource
            .create_if_absent(payload, &templates::user_group())
            .await
    }

    pub async fn update(&self, identifier: &str, payload: &Value) -> Result<StatusCode, Error> {
        self.resource.update(identifier, payload).await
    }

    /// Delete a group. Guacamole sometimes answers 500 here even though
    /// the group is gone; that case yields `None`.
    pub async fn delete(&self, identifier: &str) -> Result<Option<StatusCode>, Error> {
        match self.resource.delete(identifier).await {
            Ok(status) => Ok(Some(status)),
            Err(Error::Server { status: 500, .. }) => {
                warn!(
                    datasource = self.datasource(),
                    identifier, "server returned 500 deleting user group"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ── Membership ───────────────────────────────────────────────────

    /// Add users to the group, one patch entry per user.
    pub async fn add_members<S: AsRef<str>>(
        &self,
        identifier: &str,
        usernames: &[S],
    ) -> Result<StatusCode, Error> {
        self.patch_members(identifier, PatchOp::Add, usernames).await
    }

    pub async fn remove_members<S: AsRef<str>>(
        &self,
        identifier: &str,
        usernames: &[S],
    ) -> Result<StatusCode, Error> {
        self.patch_members(identifier, PatchOp::Remove, usernames)
            .await
    }

    async fn patch_members<S: AsRef<str>>(
        &self,
        identifier: &str,
        op: PatchOp,
        usernames: &[S],
    ) -> Result<StatusCode, Error> {
        let operations: Vec<PatchOperation> = usernames
            .iter()
            .map(|name| PatchOperation::member(op, name.as_ref()))
            .collect();
        self.resource
            .patch(identifier, "memberUsers", &operations)
            .await
    }

    // ── Permissions ──────────────────────────────────────────────────

    pub async fn patch_permissions(
        &self,
        identifier: &str,
        operations: &[PatchOperation],
    ) -> Result<StatusCode, Error> {
        self.resource
            .patch(identifier, "permissions", operations)
            .await
    }

    pub async fn grant_system_permission(
        &self,
        identifier: &str,
        permission: SystemPermission,
    ) -> Result<StatusCode, Error> {
        self.patch_permissions(
            identifier,
            &[PatchOperation::system(PatchOp::Add, permission)],
        )
        .await
    }

    pub async fn revoke_system_permission(
        &self,
        identifier: &str,
        permission: SystemPermission,
    ) -> Result<StatusCode, Error> {
        self.patch_permissions(
            identifier,
            &[PatchOperation::system(PatchOp::Remove, permission)],
        )
        .await
    }

    pub async fn grant_connection(
        &self,
        identifier: &str,
        target: ObjectTarget,
        object: &str,
        permission: ObjectPermission,
    ) -> Result<StatusCode, Error> {
        let op = PatchOperation::object(PatchOp::Add, target, object, permission);
        self.patch_permissions(identifier, &[op]).await
    }

    pub async fn revoke_connection(
        &self,
        identifier: &str,
        target: ObjectTarget,
        object: &str,
        permission: ObjectPermission,
    ) -> Result<StatusCode, Error> {
        let op = PatchOperation::object(PatchOp::Remove, target, object, permission);
        self.patch_permissions(identifier, &[op]).await
    }
}
