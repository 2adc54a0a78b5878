use reqwest::StatusCode;
use serde_json::Value;

use super::{Resource, absent_on_not_found};
use crate::error::Error;
use crate::session::Session;

/// Connections currently in use: `.../activeConnections`.
///
/// Active connections come and go on their own, so a 404 on a single one
/// is reported as `None` rather than an error.
#[derive(Debug, Clone)]
pub struct ActiveConnections<'a> {
    resource: Resource<'a>,
}

impl<'a> ActiveConnections<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str) -> Self {
        Self {
            resource: Resource::new(session, datasource, "activeConnections"),
        }
    }

    pub fn datasource(&self) -> &str {
        self.resource.datasource()
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.resource.list().await
    }

    /// Details of one active connection, `None` if it already ended.
    pub async fn details(&self, identifier: &str) -> Result<Option<Value>, Error> {
        absent_on_not_found(
            self.resource.details(identifier).await,
            "active connection",
            identifier,
        )
    }

    /// Terminate an active connection, `None` if it already ended.
    pub async fn kill(&self, identifier: &str) -> Result<Option<StatusCode>, Error> {
        absent_on_not_found(
            self.resource.delete(identifier).await,
            "active connection",
            identifier,
        )
    }
}
