//! Collaborator interfaces the engines are written against

use crate::types::{ItemId, LocalStatus, WorkshopItem};
use async_trait::async_trait;

/// Canonical metadata lookup for workshop items
///
/// Implementations may fail transiently; retrying is their own business; the
/// engines treat any error as final for the run.
///
/// # Examples
///
/// ```no_run
/// use workshop_deps::workshop::{MetadataClient, WebApiMetadataClient};
/// use workshop_deps::{Config, ItemId};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WebApiMetadataClient::new(&Config::default())?;
/// match client.query(ItemId(2503622437)).await? {
///     Some(item) => println!("{} (app {})", item.title, item.owner_app),
///     None => println!("not found"),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Look up an item
    ///
    /// Returns `Ok(None)` when the item does not exist. Visibility is reported
    /// through [`WorkshopItem::is_public`], not through the return value.
    async fn query(&self, id: ItemId) -> crate::Result<Option<WorkshopItem>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Extraction of declared dependencies from an item's public detail page
#[async_trait]
pub trait DependencyPageFetcher: Send + Sync {
    /// Dependency ids in document order, without repeats
    ///
    /// An item that declares no dependencies yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::MalformedDependencyLink`] if a dependency reference
    ///   cannot be parsed into an id
    /// - a transient error if the page cannot be fetched
    async fn fetch_dependency_ids(&self, id: ItemId) -> crate::Result<Vec<ItemId>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Subscription requests and local acquisition state
///
/// Backed by the platform client that owns the local content library.
#[async_trait]
pub trait SubscriptionClient: Send + Sync {
    /// Request a subscription. `Ok(false)` means the platform refused it.
    async fn subscribe(&self, id: ItemId) -> crate::Result<bool>;

    /// Fresh local state snapshot for an item
    async fn local_status(&self, id: ItemId) -> crate::Result<LocalStatus>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
