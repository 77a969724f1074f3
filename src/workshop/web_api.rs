//! Metadata client backed by the public `GetPublishedFileDetails` web API

use super::traits::MetadataClient;
use crate::config::{Config, RetryConfig, base_url};
use crate::error::{Error, Result};
use crate::retry::fetch_with_retry;
use crate::types::{AppId, ItemId, LocalStatus, WorkshopItem};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const DETAILS_PATH: &str = "ISteamRemoteStorage/GetPublishedFileDetails/v1/";

// Per-item result code meaning "OK"
const RESULT_OK: i32 = 1;

// Visibility value of publicly listed items
const VISIBILITY_PUBLIC: i32 = 0;

#[derive(Debug, Deserialize)]
struct DetailsEnvelope {
    response: DetailsResponse,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    publishedfiledetails: Vec<FileDetails>,
}

#[derive(Debug, Deserialize)]
struct FileDetails {
    publishedfileid: String,
    result: i32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    consumer_app_id: u32,
    #[serde(default)]
    visibility: i32,
}

/// Looks items up through the web API
///
/// The web API knows nothing about the local content library, so every item
/// it returns carries a default (nothing local) [`LocalStatus`].
#[derive(Clone, Debug)]
pub struct WebApiMetadataClient {
    client: reqwest::Client,
    endpoint: Url,
    retry: RetryConfig,
}

impl WebApiMetadataClient {
    /// Build a client from the HTTP and retry settings in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http.request_timeout)
            .user_agent(config.http.user_agent.clone())
            .build()?;

        Self::with_client(client, config)
    }

    /// Build a client around an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: &Config) -> Result<Self> {
        let endpoint = base_url("http.api_base", &config.http.api_base)?
            .join(DETAILS_PATH)
            .map_err(|e| Error::config("http.api_base", e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            retry: config.retry.clone(),
        })
    }

    async fn post_details(&self, id: ItemId) -> Result<String> {
        let id_field = id.to_string();
        let form = [("itemcount", "1"), ("publishedfileids[0]", id_field.as_str())];

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

fn into_item(id: ItemId, details: FileDetails) -> Option<WorkshopItem> {
    if details.result != RESULT_OK {
        return None;
    }

    Some(WorkshopItem {
        id,
        title: details.title,
        owner_app: AppId(details.consumer_app_id),
        is_public: details.visibility == VISIBILITY_PUBLIC,
        local: LocalStatus::default(),
    })
}

#[async_trait]
impl MetadataClient for WebApiMetadataClient {
    async fn query(&self, id: ItemId) -> Result<Option<WorkshopItem>> {
        let body = fetch_with_retry(&self.retry, || self.post_details(id)).await?;
        let envelope: DetailsEnvelope = serde_json::from_str(&body)?;

        let wanted = id.to_string();
        let item = envelope
            .response
            .publishedfiledetails
            .into_iter()
            .find(|details| details.publishedfileid == wanted)
            .and_then(|details| into_item(id, details));

        tracing::debug!(item_id = %id, found = item.is_some(), "Queried item details");
        Ok(item)
    }

    fn name(&self) -> &'static str {
        "steam-web-api"
    }
}
