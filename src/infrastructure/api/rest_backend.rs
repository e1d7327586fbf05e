use crate::application::ports::{CredentialProvider, ResourceBackend};
use crate::domain::entities::Resource;
use crate::domain::value_objects::{CollectionName, OwnerId, ResourceId};
use crate::shared::config::BackendConfig;
use crate::shared::error::SyncError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// `ResourceBackend` over the per-resource-type REST contract.
///
/// Every request carries a bearer credential from the injected session
/// provider. Timeouts are enforced by the HTTP client itself, so a timed
/// out request is torn down rather than left running in the background.
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDto {
    id: String,
    owner: String,
    #[serde(default)]
    fields: Map<String, Value>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl ResourceDto {
    fn into_domain(self) -> Result<Resource, SyncError> {
        Ok(Resource {
            id: ResourceId::new(self.id).map_err(SyncError::Validation)?,
            owner: OwnerId::new(self.owner).map_err(SyncError::Validation)?,
            fields: self.fields,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ResourceEnvelope {
    success: bool,
    resource: ResourceDto,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    success: bool,
    #[serde(default)]
    resources: Vec<ResourceDto>,
}

#[derive(Debug, Deserialize)]
struct CountEnvelope {
    success: bool,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct AckEnvelope {
    success: bool,
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    owner: &'a str,
    fields: &'a Map<String, Value>,
}

impl RestBackend {
    pub fn new(
        config: &BackendConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn bearer(&self) -> Result<String, SyncError> {
        self.credentials.bearer_token().await.map_err(|err| match err {
            already @ SyncError::Credential(_) => already,
            other => SyncError::credential(other.to_string()),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    fn ensure_ack(success: bool) -> Result<(), SyncError> {
        if success {
            Ok(())
        } else {
            Err(SyncError::internal("Backend reported failure"))
        }
    }
}

#[async_trait]
impl ResourceBackend for RestBackend {
    async fn create(
        &self,
        collection: &CollectionName,
        owner: &OwnerId,
        fields: &Map<String, Value>,
    ) -> Result<Resource, SyncError> {
        let token = self.bearer().await?;
        let body = CreateBody {
            owner: owner.as_str(),
            fields,
        };
        let response = self
            .http
            .post(self.url(collection.as_str()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let envelope: ResourceEnvelope = Self::decode(response).await?;
        Self::ensure_ack(envelope.success)?;
        envelope.resource.into_domain()
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &ResourceId,
        changed_fields: &Map<String, Value>,
    ) -> Result<Resource, SyncError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .patch(self.url(&format!("{}/{}", collection.as_str(), id.as_str())))
            .bearer_auth(token)
            .json(changed_fields)
            .send()
            .await?;
        let envelope: ResourceEnvelope = Self::decode(response).await?;
        Self::ensure_ack(envelope.success)?;
        envelope.resource.into_domain()
    }

    async fn delete(
        &self,
        collection: &CollectionName,
        id: &ResourceId,
    ) -> Result<(), SyncError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .delete(self.url(&format!("{}/{}", collection.as_str(), id.as_str())))
            .bearer_auth(token)
            .send()
            .await?;
        let envelope: AckEnvelope = Self::decode(response).await?;
        Self::ensure_ack(envelope.success)
    }

    async fn list_updated_since(
        &self,
        collection: &CollectionName,
        owner: &OwnerId,
        after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Resource>, SyncError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url(collection.as_str()))
            .bearer_auth(token)
            .query(&[
                ("updatedAfter", after.to_rfc3339()),
                ("limit", limit.to_string()),
                ("owner", owner.as_str().to_string()),
            ])
            .send()
            .await?;
        let envelope: ListEnvelope = Self::decode(response).await?;
        Self::ensure_ack(envelope.success)?;
        envelope
            .resources
            .into_iter()
            .map(ResourceDto::into_domain)
            .collect()
    }

    async fn list_newest(
        &self,
        collection: &CollectionName,
        owner: &OwnerId,
        limit: u32,
    ) -> Result<Vec<Resource>, SyncError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url(collection.as_str()))
            .bearer_auth(token)
            .query(&[
                ("limit", limit.to_string()),
                ("owner", owner.as_str().to_string()),
            ])
            .send()
            .await?;
        let envelope: ListEnvelope = Self::decode(response).await?;
        Self::ensure_ack(envelope.success)?;
        envelope
            .resources
            .into_iter()
            .map(ResourceDto::into_domain)
            .collect()
    }

    async fn count(
        &self,
        collection: &CollectionName,
        owner: &OwnerId,
    ) -> Result<u64, SyncError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url(&format!("{}/count", collection.as_str())))
            .bearer_auth(token)
            .query(&[("owner", owner.as_str())])
            .send()
            .await?;
        let envelope: CountEnvelope = Self::decode(response).await?;
        Self::ensure_ack(envelope.success)?;
        Ok(envelope.count)
    }
}
