use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::{ConnectionGroups, Resource};
use crate::error::Error;
use crate::session::Session;
use crate::templates;
use crate::tree::{MatchMode, NameMatcher, TreeNode};

/// Connections: `.../connections`.
#[derive(Debug, Clone)]
pub struct Connections<'a> {
    resource: Resource<'a>,
}

impl<'a> Connections<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str) -> Self {
        Self {
            resource: Resource::new(session, datasource, "connections"),
        }
    }

    pub fn datasource(&self) -> &str {
        self.resource.datasource()
    }

    /// All connections, keyed by identifier.
    pub async fn list(&self) -> Result<Value, Error> {
        self.resource.list().await
    }

    pub async fn details(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.details(identifier).await
    }

    /// Protocol parameters (hostname, port, ...) of a connection.
    pub async fn parameters(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "parameters").await
    }

    pub async fn history(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "history").await
    }

    /// Sharing profiles attached to a connection.
    pub async fn sharing_profiles(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "sharingProfiles").await
    }

    pub async fn create(&self, payload: &Value) -> Result<Value, Error> {
        self.resource.create(payload, &templates::connection()).await
    }

    /// Like [`create`](Self::create), but `None` when the server rejects
    /// the payload as a duplicate.
    pub async fn create_if_absent(&self, payload: &Value) -> Result<Option<Value>, Error> {
        self.resource
            .create_if_absent(payload, &templates::connection())
            .await
    }

    pub async fn update(&self, identifier: &str, payload: &Value) -> Result<StatusCode, Error> {
        self.resource.update(identifier, payload).await
    }

    pub async fn delete(&self, identifier: &str) -> Result<StatusCode, Error> {
        self.resource.delete(identifier).await
    }

    /// Find a connection anywhere under ROOT by name.
    ///
    /// Fetches the whole tree, then searches depth-first; the first match
    /// wins.
    pub async fn find_by_name(&self, name: &str, mode: MatchMode) -> Result<Option<TreeNode>, Error> {
        let matcher = NameMatcher::new(name, mode)?;
        let root = self.groups().root_tree().await?;
        let found = root.find_connection(&matcher).cloned();
        debug!(
            datasource = self.datasource(),
            name,
            found = found.is_some(),
            "connection lookup"
        );
        Ok(found)
    }

    fn groups(&self) -> ConnectionGroups<'a> {
        ConnectionGroups::new(self.resource.session(), self.resource.datasource())
    }
}
