//! Core types for workshop-deps

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, hash_map::Entry};

/// Unique identifier for a workshop item
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ItemId> for u64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl PartialEq<u64> for ItemId {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Identifier of the application that owns workshop items (the owning context)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u32);

impl AppId {
    /// Placeholder application used before the real owning context is known
    pub const PLACEHOLDER: AppId = AppId(480);

    /// Get the inner u32 value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for AppId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AppId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Local acquisition state of an item at query time
///
/// The flags are not mutually exclusive. A value is a snapshot; only a fresh
/// query yields current state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalStatus {
    /// The current user is subscribed to the item
    pub is_subscribed: bool,
    /// The item's content is present on disk
    pub is_installed: bool,
    /// A download is in flight
    pub is_downloading: bool,
    /// A download is queued but has not started
    pub is_download_pending: bool,
    /// Download completion in `[0, 1]`
    pub download_progress: f64,
}

impl LocalStatus {
    /// Classify this snapshot
    pub fn status(&self) -> ItemStatus {
        ItemStatus::classify(self)
    }
}

/// A workshop item as returned by a metadata query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkshopItem {
    /// Item ID
    pub id: ItemId,
    /// Display name
    pub title: String,
    /// Application that owns the item
    pub owner_app: AppId,
    /// Whether the item is publicly visible
    pub is_public: bool,
    /// Local state snapshot
    #[serde(default)]
    pub local: LocalStatus,
}

impl WorkshopItem {
    /// Whether the user is already subscribed to this item
    pub fn is_subscribed(&self) -> bool {
        self.local.is_subscribed
    }

    /// Classified local status
    pub fn status(&self) -> ItemStatus {
        self.local.status()
    }
}

/// Installation status derived from a [`LocalStatus`] snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Installed and subscribed
    Installed,
    /// Download in flight
    Downloading,
    /// Download queued
    Pending,
    /// Anything else
    NotInstalled,
}

impl ItemStatus {
    /// Classify a snapshot. Earlier rules win.
    pub fn classify(local: &LocalStatus) -> Self {
        if local.is_installed && local.is_subscribed {
            ItemStatus::Installed
        } else if local.is_downloading {
            ItemStatus::Downloading
        } else if local.is_download_pending {
            ItemStatus::Pending
        } else {
            ItemStatus::NotInstalled
        }
    }

    /// Fixed display label
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Installed => "INSTALLED",
            ItemStatus::Downloading => "DOWNLOADING",
            ItemStatus::Pending => "PENDING",
            ItemStatus::NotInstalled => "NOT INSTALLED",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered, id-keyed accumulator for one resolution run
///
/// Insertion order is preserved and a second insert of the same id is a no-op.
#[derive(Clone, Debug, Default)]
pub struct DependencySet {
    items: Vec<WorkshopItem>,
    index: HashMap<ItemId, usize>,
}

impl DependencySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning `false` if its id was already present
    pub fn insert(&mut self, item: WorkshopItem) -> bool {
        match self.index.entry(item.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(self.items.len());
                self.items.push(item);
                true
            }
        }
    }

    /// Whether an item with this id is present
    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    /// Look up an item by id
    pub fn get(&self, id: ItemId) -> Option<&WorkshopItem> {
        self.index.get(&id).map(|&pos| &self.items[pos])
    }

    /// The first inserted item
    pub fn root(&self) -> Option<&WorkshopItem> {
        self.items.first()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, WorkshopItem> {
        self.items.iter()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// Items the user is already subscribed to
    pub fn subscribed(&self) -> Vec<&WorkshopItem> {
        self.items.iter().filter(|i| i.is_subscribed()).collect()
    }

    /// Items that still need a subscription
    pub fn unsubscribed(&self) -> Vec<&WorkshopItem> {
        self.items.iter().filter(|i| !i.is_subscribed()).collect()
    }

    /// Consume the set, returning items in insertion order
    pub fn into_items(self) -> Vec<WorkshopItem> {
        self.items
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a WorkshopItem;
    type IntoIter = std::slice::Iter<'a, WorkshopItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A resolved set split into what is already subscribed and what still needs acquiring
#[derive(Clone, Debug)]
pub struct AcquisitionPlan {
    /// Every resolved item, root first
    pub resolved: DependencySet,
    /// Items that need a subscription (the acquisition cohort)
    pub required: Vec<WorkshopItem>,
}

impl AcquisitionPlan {
    /// Partition a resolved set
    pub fn from_set(resolved: DependencySet) -> Self {
        let required = resolved.unsubscribed().into_iter().cloned().collect();
        Self { resolved, required }
    }

    /// Number of resolved items
    pub fn total(&self) -> usize {
        self.resolved.len()
    }

    /// Number of resolved items already subscribed
    pub fn already_subscribed(&self) -> usize {
        self.total() - self.required.len()
    }

    /// Whether nothing needs to be acquired
    pub fn is_satisfied(&self) -> bool {
        self.required.is_empty()
    }
}

/// Event emitted by the installer
///
/// Consumers subscribe via [`crate::WorkshopInstaller::subscribe_events`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An item was added to the dependency set
    ItemDiscovered {
        /// Item ID
        id: ItemId,
        /// Item title
        title: String,
        /// Classified local status at discovery time
        status: ItemStatus,
    },

    /// Resolution finished
    ResolutionComplete {
        /// Root item
        root: ItemId,
        /// Number of items found, root included
        total: usize,
        /// Number already subscribed
        subscribed: usize,
        /// Number needing a subscription
        required: usize,
    },

    /// The root belongs to another application; resolution restarts there
    ContextSwitched {
        /// Previous context
        from: AppId,
        /// New context
        to: AppId,
    },

    /// A subscribe request succeeded
    Subscribed {
        /// Item ID
        id: ItemId,
    },

    /// A subscribe request failed
    SubscribeFailed {
        /// Item ID
        id: ItemId,
        /// Error message, if the collaborator returned one
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Aggregate download progress
    Progress {
        /// Progress percentage (not clamped; may slightly exceed 100.0)
        percent: f64,
    },

    /// Every item in the cohort finished downloading
    AcquisitionComplete {
        /// Number of items in the cohort
        cohort: usize,
        /// Number of subscribe requests that failed
        failed: usize,
    },
}
