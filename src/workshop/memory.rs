//! In-memory workshop implementing every collaborator trait
//!
//! Useful for offline dry runs and for exercising the engines without a
//! platform client. Subscribing marks an item as pending; download progress
//! then advances by a fixed step on every status read (zero by default, in
//! which case progress only moves through [`InMemoryWorkshop::set_download_progress`]).

use super::reference::parse_item_reference;
use super::traits::{DependencyPageFetcher, MetadataClient, SubscriptionClient};
use crate::error::{Error, Result};
use crate::types::{AppId, ItemId, LocalStatus, WorkshopItem};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    items: HashMap<ItemId, WorkshopItem>,
    links: HashMap<ItemId, Vec<String>>,
    refused_subscriptions: HashSet<ItemId>,
    failing_subscriptions: HashSet<ItemId>,
    failing_queries: HashSet<ItemId>,
    failing_status_reads: HashSet<ItemId>,
    download_step: f64,
    query_calls: HashMap<ItemId, usize>,
    page_calls: HashMap<ItemId, usize>,
    subscribe_calls: Vec<ItemId>,
}

/// Workshop whose items, dependency links and local state live in memory
#[derive(Default)]
pub struct InMemoryWorkshop {
    state: Mutex<State>,
}

/// Detail page URL an item's dependents link to
pub fn detail_link(id: ItemId) -> String {
    format!("https://steamcommunity.com/workshop/filedetails/?id={id}")
}

impl InMemoryWorkshop {
    /// Create an empty workshop
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every subscribed item's progress by `step` per status read
    pub fn with_download_step(mut self, step: f64) -> Self {
        self.state.get_mut().download_step = step;
        self
    }

    /// Add (or replace) a public item owned by `owner_app`
    pub async fn add_item(&self, id: ItemId, title: &str, owner_app: AppId) {
        self.insert_item(WorkshopItem {
            id,
            title: title.to_string(),
            owner_app,
            is_public: true,
            local: LocalStatus::default(),
        })
        .await;
    }

    /// Add (or replace) an item exactly as given
    pub async fn insert_item(&self, item: WorkshopItem) {
        self.state.lock().await.items.insert(item.id, item);
    }

    /// Declare `dependencies` on `id`'s detail page, in document order
    pub async fn declare_dependencies(&self, id: ItemId, dependencies: &[ItemId]) {
        let links = dependencies.iter().copied().map(detail_link).collect();
        self.state.lock().await.links.insert(id, links);
    }

    /// Declare raw dependency hrefs on `id`'s detail page
    pub async fn declare_links(&self, id: ItemId, links: Vec<String>) {
        self.state.lock().await.links.insert(id, links);
    }

    /// Overwrite an item's local state
    pub async fn set_local_status(&self, id: ItemId, local: LocalStatus) {
        if let Some(item) = self.state.lock().await.items.get_mut(&id) {
            item.local = local;
        }
    }

    /// Set an item's download progress; reaching 1.0 marks it installed
    pub async fn set_download_progress(&self, id: ItemId, progress: f64) {
        if let Some(item) = self.state.lock().await.items.get_mut(&id) {
            apply_progress(&mut item.local, progress);
        }
    }

    /// Make subscribe requests for `id` return `false`
    pub async fn refuse_subscription(&self, id: ItemId) {
        self.state.lock().await.refused_subscriptions.insert(id);
    }

    /// Make subscribe requests for `id` fail with a transient error
    pub async fn fail_subscriptions(&self, id: ItemId) {
        self.state.lock().await.failing_subscriptions.insert(id);
    }

    /// Make local status reads for `id` fail with a transient error
    pub async fn fail_status_reads(&self, id: ItemId) {
        self.state.lock().await.failing_status_reads.insert(id);
    }

    /// Make metadata queries for `id` fail with a transient error
    pub async fn fail_queries(&self, id: ItemId) {
        self.state.lock().await.failing_queries.insert(id);
    }

    /// Number of metadata queries issued for `id`
    pub async fn query_count(&self, id: ItemId) -> usize {
        let state = self.state.lock().await;
        state.query_calls.get(&id).copied().unwrap_or(0)
    }

    /// Number of detail page fetches issued for `id`
    pub async fn page_count(&self, id: ItemId) -> usize {
        let state = self.state.lock().await;
        state.page_calls.get(&id).copied().unwrap_or(0)
    }

    /// Subscribe requests in the order they were issued
    pub async fn subscribe_calls(&self) -> Vec<ItemId> {
        self.state.lock().await.subscribe_calls.clone()
    }
}

fn apply_progress(local: &mut LocalStatus, progress: f64) {
    local.download_progress = progress.min(1.0);
    if local.download_progress >= 1.0 {
        local.is_installed = true;
        local.is_downloading = false;
        local.is_download_pending = false;
    } else if local.download_progress > 0.0 {
        local.is_downloading = true;
        local.is_download_pending = false;
    }
}

#[async_trait]
impl MetadataClient for InMemoryWorkshop {
    async fn query(&self, id: ItemId) -> Result<Option<WorkshopItem>> {
        let mut state = self.state.lock().await;
        *state.query_calls.entry(id).or_default() += 1;

        if state.failing_queries.contains(&id) {
            return Err(Error::TransientFetch {
                id,
                message: "simulated query failure".to_string(),
            });
        }

        Ok(state.items.get(&id).cloned())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[async_trait]
impl DependencyPageFetcher for InMemoryWorkshop {
    async fn fetch_dependency_ids(&self, id: ItemId) -> Result<Vec<ItemId>> {
        let links = {
            let mut state = self.state.lock().await;
            *state.page_calls.entry(id).or_default() += 1;
            state.links.get(&id).cloned().unwrap_or_default()
        };

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(links.len());
        for link in &links {
            let dependency = parse_item_reference(link)?;
            if seen.insert(dependency) {
                ids.push(dependency);
            }
        }
        Ok(ids)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[async_trait]
impl SubscriptionClient for InMemoryWorkshop {
    async fn subscribe(&self, id: ItemId) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.subscribe_calls.push(id);

        if state.failing_subscriptions.contains(&id) {
            return Err(Error::TransientFetch {
                id,
                message: "simulated subscribe failure".to_string(),
            });
        }

        if state.refused_subscriptions.contains(&id) {
            return Ok(false);
        }

        match state.items.get_mut(&id) {
            Some(item) => {
                item.local.is_subscribed = true;
                if !item.local.is_installed {
                    item.local.is_download_pending = true;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn local_status(&self, id: ItemId) -> Result<LocalStatus> {
        let mut state = self.state.lock().await;

        if state.failing_status_reads.contains(&id) {
            return Err(Error::TransientFetch {
                id,
                message: "simulated status read failure".to_string(),
            });
        }

        let step = state.download_step;
        // Items the library has never seen have nothing local
        let Some(item) = state.items.get_mut(&id) else {
            return Ok(LocalStatus::default());
        };

        if step > 0.0 && item.local.is_subscribed && !item.local.is_installed {
            let next = item.local.download_progress + step;
            apply_progress(&mut item.local, next);
        }

        Ok(item.local)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
