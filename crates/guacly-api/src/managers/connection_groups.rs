use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::Resource;
use crate::error::Error;
use crate::session::Session;
use crate::templates;
use crate::tree::{MatchMode, NameMatcher, TreeNode};

/// Identifier of the implicit top-level group.
pub const ROOT_GROUP: &str = "ROOT";

/// Connection groups: `.../connectionGroups`.
#[derive(Debug, Clone)]
pub struct ConnectionGroups<'a> {
    resource: Resource<'a>,
}

impl<'a> ConnectionGroups<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str) -> Self {
        Self {
            resource: Resource::new(session, datasource, "connectionGroups"),
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

    pub async fn create(&self, payload: &Value) -> Result<Value, Error> {
        self.resource
            .create(payload, &templates::connection_group())
            .await
    }

    /// Like [`create`](Self::create), but `None` when the group exists.
    pub async fn create_if_absent(&self, payload: &Value) -> Result<Option<Value>, Error> {
        self.resource
            .create_if_absent(payload, &templates::connection_group())
            .await
    }

    pub async fn update(&self, identifier: &str, payload: &Value) -> Result<StatusCode, Error> {
        self.resource.update(identifier, payload).await
    }

    pub async fn delete(&self, identifier: &str) -> Result<StatusCode, Error> {
        self.resource.delete(identifier).await
    }

    /// The group with all descendants: `.../connectionGroups/{id}/tree`.
    pub async fn tree(&self, identifier: &str) -> Result<TreeNode, Error> {
        let raw = self.resource.sub(identifier, "tree").await?;
        let body = raw.to_string();
        serde_json::from_value(raw).map_err(|e| Error::Deserialization {
            message: format!("connection group tree: {e}"),
            body,
        })
    }

    pub async fn root_tree(&self) -> Result<TreeNode, Error> {
        self.tree(ROOT_GROUP).await
    }

    /// Find a connection group under ROOT (or ROOT itself) by name.
    pub async fn find_by_name(&self, name: &str, mode: MatchMode) -> Result<Option<TreeNode>, Error> {
        let matcher = NameMatcher::new(name, mode)?;
        let root = self.root_tree().await?;
        let found = root.find_connection_group(&matcher).cloned();
        debug!(
            datasource = self.datasource(),
            name,
            found = found.is_some(),
            "connection group lookup"
        );
        Ok(found)
    }
}
