//! Workshop collaborators
//!
//! The engines only talk to the platform through three traits:
//!
//! - [`MetadataClient`]: canonical item metadata
//! - [`DependencyPageFetcher`]: dependency ids declared on an item's detail page
//! - [`SubscriptionClient`]: subscribe requests and local acquisition state
//!
//! Provided implementations:
//!
//! - [`WebApiMetadataClient`]: public web API lookups
//! - [`SteamPageFetcher`]: community detail page scraping
//! - [`InMemoryWorkshop`]: all three traits over in-memory state
//!
//! Subscribing and reading local state require the platform client that owns
//! the content library, so no networked [`SubscriptionClient`] ships here.

mod markup;
mod memory;
mod page;
mod reference;
mod traits;
mod web_api;

pub use markup::{REQUIRED_ITEMS_ID, extract_dependency_ids};
pub use memory::{InMemoryWorkshop, detail_link};
pub use page::SteamPageFetcher;
pub use reference::parse_item_reference;
pub use traits::{DependencyPageFetcher, MetadataClient, SubscriptionClient};
pub use web_api::WebApiMetadataClient;
