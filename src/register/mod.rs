//! Creating the backend photo resource for an uploaded file
//!
//! Registration turns a stored file into a durable photo record. A
//! successful registration leaves the cached [`PhotoFeed`] refreshed (or at
//! least invalidated) so later reads see the new photo.

pub mod feed;
pub mod graphql;

pub use feed::PhotoFeed;
pub use graphql::GraphqlRegistrationClient;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::RegistrationError;
use crate::upload::FileId;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StoredFile {
    pub id: FileId,
    #[serde(default)]
    pub url: Option<String>,
}

/// A photo resource as the backend describes it
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    #[serde(default)]
    pub file: Option<StoredFile>,
}

#[async_trait]
pub trait RegistrationClient: Send + Sync {
    /// Create a photo referencing `file_id`, then invalidate cached listings
    async fn register(&self, file_id: &FileId) -> Result<PhotoRecord, RegistrationError>;
}
