//! Media storage contract for avatars and game images.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::error::DomainResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMedia {
    /// Storage key, stable for identical content
    pub key: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub content_type: String,
    pub size: u64,
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Saves raw bytes and returns where they can be fetched from.
    async fn store(&self, data: Bytes, content_type: mime::Mime) -> DomainResult<StoredMedia>;
    async fn delete(&self, key: &str) -> DomainResult<()>;
    fn url_for(&self, key: &str) -> String;
}
