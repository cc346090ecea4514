//! GraphQL registration client
//!
//! Sends the `createPhoto` mutation and, once it succeeds, refetches the
//! `allPhotos` listing into the shared [`PhotoFeed`]. A failed refetch does
//! not undo or fail the registration; the feed simply stays invalidated.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{PhotoFeed, PhotoRecord, RegistrationClient};
use crate::error::RegistrationError;
use crate::upload::FileId;

pub const CREATE_PHOTO_MUTATION: &str = "\
mutation createPhoto($fileId: ID!) {
  createPhoto(fileId: $fileId) {
    id
    file {
      id
      url
    }
  }
}";

pub const ALL_PHOTOS_QUERY: &str = "\
query allPhotos {
  allPhotos(orderBy: createdAt_DESC) {
    id
    file {
      id
      url
    }
  }
}";

#[derive(Debug, Deserialize)]
struct GraphQlMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlMessage>,
}

#[derive(Debug, Deserialize)]
struct CreatePhotoData {
    #[serde(rename = "createPhoto")]
    create_photo: Option<PhotoRecord>,
}

#[derive(Debug, Deserialize)]
struct AllPhotosData {
    #[serde(rename = "allPhotos")]
    all_photos: Vec<PhotoRecord>,
}

pub struct GraphqlRegistrationClient {
    client: reqwest::Client,
    endpoint: String,
    feed: Arc<PhotoFeed>,
}

impl GraphqlRegistrationClient {
    pub fn new(
        endpoint: impl Into<String>,
        feed: Arc<PhotoFeed>,
        timeout: Duration,
    ) -> Result<Self, RegistrationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("propcam/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            feed,
        })
    }

    /// Refetch the photo listing into the feed, returning how many came back
    pub async fn refresh(&self) -> Result<usize, RegistrationError> {
        let data: AllPhotosData = self.execute(&all_photos_request()).await?;
        let count = data.all_photos.len();
        self.feed.replace(data.all_photos);
        Ok(count)
    }

    async fn execute<T: DeserializeOwned>(&self, request: &Value) -> Result<T, RegistrationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RegistrationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

#[async_trait]
impl RegistrationClient for GraphqlRegistrationClient {
    async fn register(&self, file_id: &FileId) -> Result<PhotoRecord, RegistrationError> {
        debug!("Registering photo for file {}", file_id);
        let data: CreatePhotoData = self.execute(&create_photo_request(file_id)).await?;
        let photo = data.create_photo.ok_or_else(|| {
            RegistrationError::InvalidResponse("createPhoto returned null".to_string())
        })?;
        info!("Created photo {} for file {}", photo.id, file_id);

        self.feed.invalidate();
        match self.refresh().await {
            Ok(count) => debug!("Photo feed refreshed with {} photos", count),
            Err(e) => warn!("Photo feed left stale, refetch failed: {}", e),
        }

        Ok(photo)
    }
}

pub fn create_photo_request(file_id: &FileId) -> Value {
    json!({
        "query": CREATE_PHOTO_MUTATION,
        "variables": { "fileId": file_id.as_str() },
    })
}

pub fn all_photos_request() -> Value {
    json!({ "query": ALL_PHOTOS_QUERY })
}

fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, RegistrationError> {
    let response: GraphQlResponse<T> = serde_json::from_str(body)
        .map_err(|e| RegistrationError::InvalidResponse(e.to_string()))?;

    if !response.errors.is_empty() {
        return Err(RegistrationError::GraphQl(
            response.errors.into_iter().map(|e| e.message).collect(),
        ));
    }

    response
        .data
        .ok_or_else(|| RegistrationError::InvalidResponse("response had no data".to_string()))
}
