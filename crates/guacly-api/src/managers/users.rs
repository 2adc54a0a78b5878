use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

use super::Resource;
use crate::error::Error;
use crate::patch::{ObjectPermission, ObjectTarget, PatchOp, PatchOperation, SystemPermission};
use crate::session::Session;
use crate::templates;

/// User accounts: `.../users`.
#[derive(Debug, Clone)]
pub struct Users<'a> {
    resource: Resource<'a>,
}

impl<'a> Users<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str) -> Self {
        Self {
            resource: Resource::new(session, datasource, "users"),
        }
    }

    pub fn datasource(&self) -> &str {
        self.resource.datasource()
    }

    /// All users, keyed by username.
    pub async fn list(&self) -> Result<Value, Error> {
        self.resource.list().await
    }

    pub async fn details(&self, username: &str) -> Result<Value, Error> {
        self.resource.details(username).await
    }

    /// Permissions granted directly to the user.
    pub async fn permissions(&self, username: &str) -> Result<Value, Error> {
        self.resource.sub(username, "permissions").await
    }

    /// Permissions including those inherited through user groups.
    pub async fn effective_permissions(&self, username: &str) -> Result<Value, Error> {
        self.resource.sub(username, "effectivePermissions").await
    }

    /// Identifiers of the groups the user belongs to.
    pub async fn user_groups(&self, username: &str) -> Result<Value, Error> {
        self.resource.sub(username, "userGroups").await
    }

    /// Login history of the user.
    pub async fn history(&self, username: &str) -> Result<Value, Error> {
        self.resource.sub(username, "history").await
    }

    /// The authenticated user: `.../self`.
    pub async fn self_details(&self) -> Result<Value, Error> {
        let session = self.resource.session();
        let url = session.data_url(self.datasource(), ["self"])?;
        debug!(datasource = self.datasource(), "fetching own account");
        session.get_json(url).await
    }

    pub async fn create(&self, payload: &Value) -> Result<Value, Error> {
        self.resource.create(payload, &templates::user()).await
    }

    /// Like [`create`](Self::create), but `None` when the user exists.
    pub async fn create_if_absent(&self, payload: &Value) -> Result<Option<Value>, Error> {
        self.resource
            .create_if_absent(payload, &templates::user())
            .await
    }

    pub async fn update(&self, username: &str, payload: &Value) -> Result<StatusCode, Error> {
        self.resource.update(username, payload).await
    }

    pub async fn delete(&self, username: &str) -> Result<StatusCode, Error> {
        self.resource.delete(username).await
    }

    /// `PUT .../users/{username}/password`
    pub async fn update_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<StatusCode, Error> {
        let session = self.resource.session();
        let url = self.resource.url(&[username, "password"])?;
        debug!(datasource = self.datasource(), username, "changing password");
        session
            .put(
                url,
                &json!({ "oldPassword": old_password, "newPassword": new_password }),
            )
            .await
    }

    // ── Group membership ─────────────────────────────────────────────

    pub async fn add_to_group(&self, username: &str, group: &str) -> Result<StatusCode, Error> {
        self.resource
            .patch(username, "userGroups", &[PatchOperation::member(PatchOp::Add, group)])
            .await
    }

    pub async fn remove_from_group(&self, username: &str, group: &str) -> Result<StatusCode, Error> {
        self.resource
            .patch(
                username,
                "userGroups",
                &[PatchOperation::member(PatchOp::Remove, group)],
            )
            .await
    }

    // ── Permissions ──────────────────────────────────────────────────

    /// Apply arbitrary permission patches in order.
    pub async fn patch_permissions(
        &self,
        username: &str,
        operations: &[PatchOperation],
    ) -> Result<StatusCode, Error> {
        self.resource.patch(username, "permissions", operations).await
    }

    /// Grant `permission` on a connection, or on a connection group when
    /// `target` says so.
    pub async fn grant_connection(
        &self,
        username: &str,
        target: ObjectTarget,
        identifier: &str,
        permission: ObjectPermission,
    ) -> Result<StatusCode, Error> {
        let op = PatchOperation::object(PatchOp::Add, target, identifier, permission);
        self.patch_permissions(username, &[op]).await
    }

    pub async fn revoke_connection(
        &self,
        username: &str,
        target: ObjectTarget,
        identifier: &str,
        permission: ObjectPermission,
    ) -> Result<StatusCode, Error> {
        let op = PatchOperation::object(PatchOp::Remove, target, identifier, permission);
        self.patch_permissions(username, &[op]).await
    }

    pub async fn grant_system_permission(
        &self,
        username: &str,
        permission: SystemPermission,
    ) -> Result<StatusCode, Error> {
        self.patch_permissions(username, &[PatchOperation::system(PatchOp::Add, permission)])
            .await
    }

    pub async fn revoke_system_permission(
        &self,
        username: &str,
        permission: SystemPermission,
    ) -> Result<StatusCode, Error> {
        self.patch_permissions(
            username,
            &[PatchOperation::system(PatchOp::Remove, permission)],
        )
        .await
    }
}
