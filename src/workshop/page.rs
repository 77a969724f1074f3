//! Detail page fetcher backed by the community website

use super::markup::extract_dependency_ids;
use super::traits::DependencyPageFetcher;
use crate::config::{Config, RetryConfig, base_url};
use crate::error::{Error, Result};
use crate::retry::fetch_with_retry;
use crate::types::ItemId;
use async_trait::async_trait;
use url::Url;

/// Reads dependency ids from `{community_base}/sharedfiles/filedetails/?id={id}`
#[derive(Clone, Debug)]
pub struct SteamPageFetcher {
    client: reqwest::Client,
    base: Url,
    retry: RetryConfig,
}

impl SteamPageFetcher {
    /// Build a fetcher from the HTTP and retry settings in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http.request_timeout)
            .user_agent(config.http.user_agent.clone())
            .build()?;

        Self::with_client(client, config)
    }

    /// Build a fetcher around an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: &Config) -> Result<Self> {
        let base = base_url("http.community_base", &config.http.community_base)?;

        Ok(Self {
            client,
            base,
            retry: config.retry.clone(),
        })
    }

    /// Public detail page URL of an item
    pub fn detail_url(&self, id: ItemId) -> Result<Url> {
        let mut url = self
            .base
            .join("sharedfiles/filedetails/")
            .map_err(|e| Error::config("http.community_base", e.to_string()))?;
        url.query_pairs_mut().append_pair("id", &id.to_string());
        Ok(url)
    }

    async fn fetch_page(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl DependencyPageFetcher for SteamPageFetcher {
    async fn fetch_dependency_ids(&self, id: ItemId) -> Result<Vec<ItemId>> {
        let url = self.detail_url(id)?;
        tracing::debug!(item_id = %id, url = %url, "Fetching detail page");

        let html = fetch_with_retry(&self.retry, || self.fetch_page(&url)).await?;
        let ids = extract_dependency_ids(&html)?;

        tracing::debug!(item_id = %id, dependencies = ids.len(), "Parsed detail page");
        Ok(ids)
    }

    fn name(&self) -> &'static str {
        "steam-community-page"
    }
}
