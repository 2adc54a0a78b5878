use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::session::Session;

/// Read-only schema endpoints: `.../schema/...`.
#[derive(Debug, Clone)]
pub struct Schema<'a> {
    session: &'a Session,
    datasource: String,
}

impl<'a> Schema<'a> {
    pub(crate) fn new(session: &'a Session, datasource: &str) -> Self {
        Self {
            session,
            datasource: datasource.to_owned(),
        }
    }

    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    /// Supported protocols with their parameter forms.
    pub async fn protocols(&self) -> Result<Value, Error> {
        self.get("protocols").await
    }

    pub async fn user_attributes(&self) -> Result<Value, Error> {
        self.get("userAttributes").await
    }

    pub async fn user_group_attributes(&self) -> Result<Value, Error> {
        self.get("userGroupAttributes").await
    }

    pub async fn connection_attributes(&self) -> Result<Value, Error> {
        self.get("connectionAttributes").await
    }

    pub async fn connection_group_attributes(&self) -> Result<Value, Error> {
        self.get("connectionGroupAttributes").await
    }

    pub async fn sharing_profile_attributes(&self) -> Result<Value, Error> {
        self.get("sharingProfileAttributes").await
    }

    async fn get(&self, endpoint: &str) -> Result<Value, Error> {
        debug!(datasource = %self.datasource, endpoint, "fetching schema");
        let url = self.session.data_url(&self.datasource, ["schema", endpoint])?;
        self.session.get_json(url).await
    }
}
