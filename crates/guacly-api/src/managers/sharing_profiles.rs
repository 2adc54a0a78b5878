use reqwest::StatusCode;
use serde_json::Value;

use super::Resource;
use crate::error::Error;
use crate::session::Session;
use crate::templates;
use crate::validate::validate_payload;

/// Sharing profiles: `.../sharingProfiles`.
#[derive(Debug, Clone)]
pub struct SharingProfiles<'a> {
    resource: Resource<'a>,
}

impl<'a> SharingProfiles<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str) -> Self {
        Self {
            resource: Resource::new(session, datasource, "sharingProfiles"),
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

    pub async fn parameters(&self, identifier: &str) -> Result<Value, Error> {
        self.resource.sub(identifier, "parameters").await
    }

    pub async fn create(&self, payload: &Value) -> Result<Value, Error> {
        self.resource
            .create(payload, &templates::sharing_profile())
            .await
    }

    /// Like [`create`](Self::create), but `None` when the profile exists.
    pub async fn create_if_absent(&self, payload: &Value) -> Result<Option<Value>, Error> {
        self.resource
            .create_if_absent(payload, &templates::sharing_profile())
            .await
    }

    /// Replace a profile. The payload is checked like a create.
    pub async fn update(&self, identifier: &str, payload: &Value) -> Result<StatusCode, Error> {
        validate_payload(payload, &templates::sharing_profile(), false)?;
        self.resource.update(identifier, payload).await
    }

    pub async fn delete(&self, identifier: &str) -> Result<StatusCode, Error> {
        self.resource.delete(identifier).await
    }
}
