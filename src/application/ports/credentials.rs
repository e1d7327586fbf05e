use crate::shared::error::SyncError;
use async_trait::async_trait;

/// Session provider seam. Token retrieval is async and may itself fail;
/// a missing credential surfaces as a validation-class failure.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, SyncError>;
}
