// Resource managers.
//
// Each manager borrows the `Session`, remembers one datasource, and maps its
// methods onto `{base}/session/data/{datasource}/{collection}/...`. The
// shared CRUD plumbing lives in `Resource`; managers add the endpoints that
// are specific to their resource type.

mod active_connections;
mod connection_groups;
mod connections;
mod schema;
mod sharing_profiles;
mod user_groups;
mod users;

pub use active_connections::ActiveConnections;
pub use connection_groups::{ConnectionGroups, ROOT_GROUP};
pub use connections::Connections;
pub use schema::Schema;
pub use sharing_profiles::SharingProfiles;
pub use user_groups::UserGroups;
pub use users::Users;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::patch::PatchOperation;
use crate::session::Session;
use crate::validate::validate_payload;

// ── Factories ───────────────────────────────────────────────────────

impl Session {
    /// Users in the primary datasource.
    pub fn users(&self) -> Users<'_> {
        Users::new(self, self.primary_datasource())
    }

    pub fn users_in<'a>(&'a self, datasource: &str) -> Users<'a> {
        Users::new(self, datasource)
    }

    /// User groups in the primary datasource.
    pub fn user_groups(&self) -> UserGroups<'_> {
        UserGroups::new(self, self.primary_datasource())
    }

    pub fn user_groups_in<'a>(&'a self, datasource: &str) -> UserGroups<'a> {
        UserGroups::new(self, datasource)
    }

    /// Connections in the primary datasource.
    pub fn connections(&self) -> Connections<'_> {
        Connections::new(self, self.primary_datasource())
    }

    pub fn connections_in<'a>(&'a self, datasource: &str) -> Connections<'a> {
        Connections::new(self, datasource)
    }

    /// Connection groups in the primary datasource.
    pub fn connection_groups(&self) -> ConnectionGroups<'_> {
        ConnectionGroups::new(self, self.primary_datasource())
    }

    pub fn connection_groups_in<'a>(&'a self, datasource: &str) -> ConnectionGroups<'a> {
        ConnectionGroups::new(self, datasource)
    }

    /// Sharing profiles in the primary datasource.
    pub fn sharing_profiles(&self) -> SharingProfiles<'_> {
        SharingProfiles::new(self, self.primary_datasource())
    }

    pub fn sharing_profiles_in<'a>(&'a self, datasource: &str) -> SharingProfiles<'a> {
        SharingProfiles::new(self, datasource)
    }

    /// Active connections in the primary datasource.
    pub fn active_connections(&self) -> ActiveConnections<'_> {
        ActiveConnections::new(self, self.primary_datasource())
    }

    pub fn active_connections_in<'a>(&'a self, datasource: &str) -> ActiveConnections<'a> {
        ActiveConnections::new(self, datasource)
    }

    /// Attribute and protocol schema of the primary datasource.
    pub fn schema(&self) -> Schema<'_> {
        Schema::new(self, self.primary_datasource())
    }

    pub fn schema_in<'a>(&'a self, datasource: &str) -> Schema<'a> {
        Schema::new(self, datasource)
    }
}

// ── Shared plumbing ─────────────────────────────────────────────────

/// One resource collection in one datasource.
#[derive(Debug, Clone)]
pub(crate) struct Resource<'a> {
    session: &'a Session,
    datasource: String,
    collection: &'static str,
}

impl<'a> Resource<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str, collection: &'static str) -> Self {
        Self {
            session,
            datasource: datasource.to_owned(),
            collection,
        }
    }

    pub(crate) fn session(&self) -> &'a Session {
        self.session
    }

    pub(crate) fn datasource(&self) -> &str {
        &self.datasource
    }

    /// `{base}/session/data/{datasource}/{collection}/{tail...}`
    pub(crate) fn url(&self, tail: &[&str]) -> Result<Url, Error> {
        self.session.data_url(
            &self.datasource,
            std::iter::once(self.collection).chain(tail.iter().copied()),
        )
    }

    pub(crate) async fn list(&self) -> Result<Value, Error> {
        debug!(datasource = %self.datasource, collection = self.collection, "listing");
        self.session.get_json(self.url(&[])?).await
    }

    pub(crate) async fn details(&self, identifier: &str) -> Result<Value, Error> {
        debug!(
            datasource = %self.datasource,
            collection = self.collection,
            identifier,
            "fetching details"
        );
        self.session.get_json(self.url(&[identifier])?).await
    }

    /// `GET .../{identifier}/{sub}`
    pub(crate) async fn sub(&self, identifier: &str, sub: &str) -> Result<Value, Error> {
        debug!(
            datasource = %self.datasource,
            collection = self.collection,
            identifier,
            sub,
            "fetching"
        );
        self.session.get_json(self.url(&[identifier, sub])?).await
    }

    /// Validate against `template`, then `POST` to the collection.
    pub(crate) async fn create(&self, payload: &Value, template: &Value) -> Result<Value, Error> {
        validate_payload(payload, template, false)?;
        debug!(datasource = %self.datasource, collection = self.collection, "creating");
        self.session.post_json(self.url(&[])?, payload).await
    }

    /// [`create`](Self::create), treating 400 (already exists) as `None`.
    pub(crate) async fn create_if_absent(
        &self,
        payload: &Value,
        template: &Value,
    ) -> Result<Option<Value>, Error> {
        match self.create(payload, template).await {
            Ok(created) => Ok(Some(created)),
            Err(Error::Conflict { message, .. }) => {
                warn!(
                    datasource = %self.datasource,
                    collection = self.collection,
                    %message,
                    "create rejected, resource likely exists"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn update(&self, identifier: &str, payload: &Value) -> Result<StatusCode, Error> {
        debug!(
            datasource = %self.datasource,
            collection = self.collection,
            identifier,
            "updating"
        );
        self.session.put(self.url(&[identifier])?, payload).await
    }

    pub(crate) async fn delete(&self, identifier: &str) -> Result<StatusCode, Error> {
        debug!(
            datasource = %self.datasource,
            collection = self.collection,
            identifier,
            "deleting"
        );
        self.session.delete(self.url(&[identifier])?).await
    }

    /// `PATCH .../{identifier}/{sub}` with a list of patch operations.
    pub(crate) async fn patch(
        &self,
        identifier: &str,
        sub: &str,
        operations: &[PatchOperation],
    ) -> Result<StatusCode, Error> {
        debug!(
            datasource = %self.datasource,
            collection = self.collection,
            identifier,
            sub,
            ops = operations.len(),
            "patching"
        );
        self.session
            .patch(self.url(&[identifier, sub])?, operations)
            .await
    }
}

/// Turn a 404 into `None`, logging it.
pub(crate) fn absent_on_not_found<T>(
    result: Result<T, Error>,
    what: &str,
    identifier: &str,
) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::NotFound { .. }) => {
            warn!(identifier, "{what} not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
