//! Transitive dependency discovery
//!
//! Starting from a root item, the resolver walks the declared-dependency
//! relation depth-first, left to right, collecting every reachable item once.
//! A dependency already in the set is skipped, which is also what terminates
//! cycles. The walk keeps an explicit stack of sibling cursors instead of
//! recursing, so deep chains cost heap rather than call stack.
//!
//! Resolution is all-or-nothing: any failure aborts the run and no partial set
//! is returned.
//!
//! Metadata sources may not know the local library. When a local status
//! source is attached, every item's [`WorkshopItem::local`] is replaced with a
//! fresh snapshot before it joins the set.

use crate::error::{Error, Result};
use crate::types::{AppId, DependencySet, ItemId, WorkshopItem};
use crate::utils::cancellable;
use crate::workshop::{DependencyPageFetcher, MetadataClient, SubscriptionClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves the full dependency set of an item
#[derive(Clone)]
pub struct DependencyResolver {
    metadata: Arc<dyn MetadataClient>,
    pages: Arc<dyn DependencyPageFetcher>,
    local: Option<Arc<dyn SubscriptionClient>>,
    context: Option<AppId>,
}

impl DependencyResolver {
    /// Create a resolver that accepts roots from any application
    pub fn new(metadata: Arc<dyn MetadataClient>, pages: Arc<dyn DependencyPageFetcher>) -> Self {
        Self {
            metadata,
            pages,
            local: None,
            context: None,
        }
    }

    /// Read each item's local state from `source` instead of trusting the metadata
    pub fn with_local_status(mut self, source: Arc<dyn SubscriptionClient>) -> Self {
        self.local = Some(source);
        self
    }

    /// Require the root to belong to `app`
    ///
    /// Roots owned by another application fail with [`Error::ContextMismatch`].
    pub fn with_context(mut self, app: AppId) -> Self {
        self.context = Some(app);
        self
    }

    /// Application the root must belong to, if any
    pub fn context(&self) -> Option<AppId> {
        self.context
    }

    /// Resolve `root` and everything it transitively depends on
    ///
    /// # Errors
    ///
    /// - [`Error::NotFoundOrPrivate`] if the root or any dependency is missing or private
    /// - [`Error::ContextMismatch`] if the root belongs to another application
    /// - [`Error::MalformedDependencyLink`] if a detail page carries an unparseable link
    /// - [`Error::Cancelled`] if `cancel` fires
    /// - any transient error raised by a collaborator
    pub async fn resolve(&self, root: ItemId, cancel: &CancellationToken) -> Result<DependencySet> {
        self.resolve_with(root, cancel, |_| {}).await
    }

    /// Like [`resolve`](Self::resolve), calling `on_discovered` for each item as it joins the set
    pub async fn resolve_with<F>(
        &self,
        root: ItemId,
        cancel: &CancellationToken,
        mut on_discovered: F,
    ) -> Result<DependencySet>
    where
        F: FnMut(&WorkshopItem),
    {
        tracing::info!(
            root = %root,
            metadata = self.metadata.name(),
            pages = self.pages.name(),
            "Resolving dependencies"
        );

        let mut root_item = self.lookup(root, cancel).await?;

        if let Some(expected) = self.context
            && root_item.owner_app != expected
        {
            return Err(Error::ContextMismatch {
                item: root,
                expected,
                actual: root_item.owner_app,
            });
        }

        self.refresh_local(&mut root_item, cancel).await?;

        let mut set = DependencySet::new();
        on_discovered(&root_item);
        set.insert(root_item);

        let mut stack = vec![self.dependencies_of(root, cancel).await?.into_iter()];

        while let Some(siblings) = stack.last_mut() {
            let Some(id) = siblings.next() else {
                stack.pop();
                continue;
            };

            if set.contains(id) {
                tracing::trace!(item_id = %id, "Already resolved, skipping");
                continue;
            }

            let mut item = self.lookup(id, cancel).await?;
            self.refresh_local(&mut item, cancel).await?;
            tracing::debug!(
                item_id = %id,
                title = %item.title,
                status = %item.status(),
                depth = stack.len(),
                "Discovered dependency"
            );
            on_discovered(&item);
            set.insert(item);

            let children = self.dependencies_of(id, cancel).await?;
            stack.push(children.into_iter());
        }

        tracing::info!(root = %root, items = set.len(), "Resolution complete");
        Ok(set)
    }

    async fn lookup(&self, id: ItemId, cancel: &CancellationToken) -> Result<WorkshopItem> {
        match cancellable(cancel, self.metadata.query(id)).await? {
            Some(item) if item.is_public => Ok(item),
            Some(_) => {
                tracing::warn!(item_id = %id, "Item is not public");
                Err(Error::NotFoundOrPrivate { id })
            }
            None => {
                tracing::warn!(item_id = %id, "Item not found");
                Err(Error::NotFoundOrPrivate { id })
            }
        }
    }

    async fn refresh_local(&self, item: &mut WorkshopItem, cancel: &CancellationToken) -> Result<()> {
        if let Some(source) = &self.local {
            item.local = cancellable(cancel, source.local_status(item.id)).await?;
        }
        Ok(())
    }

    async fn dependencies_of(&self, id: ItemId, cancel: &CancellationToken) -> Result<Vec<ItemId>> {
        cancellable(cancel, self.pages.fetch_dependency_ids(id)).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocalStatus;
    use crate::workshop::InMemoryWorkshop;

    const APP: AppId = AppId(4000);

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId).collect()
    }

    async fn workshop_with(items: &[u64]) -> Arc<InMemoryWorkshop> {
        let workshop = Arc::new(InMemoryWorkshop::new());
        for &id in items {
            workshop.add_item(ItemId(id), &format!("item {id}"), APP).await;
        }
        workshop
    }

    fn resolver(workshop: &Arc<InMemoryWorkshop>) -> DependencyResolver {
        DependencyResolver::new(workshop.clone(), workshop.clone())
    }

    #[tokio::test]
    async fn test_item_without_dependencies_is_singleton() {
        let workshop = workshop_with(&[1]).await;

        let set = resolver(&workshop)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(set.ids(), ids(&[1]));
    }

    #[tokio::test]
    async fn test_preorder_left_to_right() {
        //      1
        //    /   \
        //   2     5
        //  / \     \
        // 3   4     6
        let workshop = workshop_with(&[1, 2, 3, 4, 5, 6]).await;
        workshop.declare_dependencies(ItemId(1), &ids(&[2, 5])).await;
        workshop.declare_dependencies(ItemId(2), &ids(&[3, 4])).await;
        workshop.declare_dependencies(ItemId(5), &ids(&[6])).await;

        let set = resolver(&workshop)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(set.ids(), ids(&[1, 2, 3, 4, 5, 6]));
    }

    #[tokio::test]
    async fn test_cycles_and_diamonds_visit_each_item_once() {
        // 1 -> 2 -> 3 -> 1 (cycle), 1 -> 4 -> 3 (diamond), 3 -> 3 (self loop)
        let workshop = workshop_with(&[1, 2, 3, 4]).await;
        workshop.declare_dependencies(ItemId(1), &ids(&[2, 4])).await;
        workshop.declare_dependencies(ItemId(2), &ids(&[3])).await;
        workshop.declare_dependencies(ItemId(3), &ids(&[1, 3])).await;
        workshop.declare_dependencies(ItemId(4), &ids(&[3])).await;

        let set = resolver(&workshop)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(set.ids(), ids(&[1, 2, 3, 4]));
        for id in 1..=4 {
            assert_eq!(workshop.query_count(ItemId(id)).await, 1, "item {id} queried once");
            assert_eq!(workshop.page_count(ItemId(id)).await, 1, "item {id} fetched once");
        }
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let workshop = workshop_with(&[1, 2, 3]).await;
        workshop.declare_dependencies(ItemId(1), &ids(&[3, 2])).await;
        workshop.declare_dependencies(ItemId(3), &ids(&[2])).await;

        let resolver = resolver(&workshop);
        let token = CancellationToken::new();
        let first = resolver.resolve(ItemId(1), &token).await.unwrap();
        let second = resolver.resolve(ItemId(1), &token).await.unwrap();

        assert_eq!(first.ids(), second.ids());
        assert_eq!(first.ids(), ids(&[1, 3, 2]));
    }

    #[tokio::test]
    async fn test_deep_chain() {
        let depth = 2_000u64;
        let workshop = Arc::new(InMemoryWorkshop::new());
        for id in 1..=depth {
            workshop.add_item(ItemId(id), "link", APP).await;
            if id < depth {
                workshop.declare_dependencies(ItemId(id), &[ItemId(id + 1)]).await;
            }
        }

        let set = resolver(&workshop)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(set.len(), depth as usize);
        assert_eq!(set.ids().last(), Some(&ItemId(depth)));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let workshop = workshop_with(&[]).await;

        let err = resolver(&workshop)
            .resolve(ItemId(77), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFoundOrPrivate { id } if id == ItemId(77)));
        assert_eq!(workshop.page_count(ItemId(77)).await, 0);
    }

    #[tokio::test]
    async fn test_private_root() {
        let workshop = workshop_with(&[]).await;
        workshop
            .insert_item(WorkshopItem {
                id: ItemId(8),
                title: "secret".into(),
                owner_app: APP,
                is_public: false,
                local: LocalStatus::default(),
            })
            .await;

        let err = resolver(&workshop)
            .resolve(ItemId(8), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFoundOrPrivate { .. }));
    }

    #[tokio::test]
    async fn test_missing_dependency_aborts() {
        let workshop = workshop_with(&[1, 2]).await;
        workshop.declare_dependencies(ItemId(1), &ids(&[2, 404])).await;

        let err = resolver(&workshop)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFoundOrPrivate { id } if id == ItemId(404)));
    }

    #[tokio::test]
    async fn test_query_failure_aborts() {
        let workshop = workshop_with(&[1, 2, 3]).await;
        workshop.declare_dependencies(ItemId(1), &ids(&[2, 3])).await;
        workshop.fail_queries(ItemId(2)).await;

        let err = resolver(&workshop)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(workshop.query_count(ItemId(3)).await, 0, "no work after failure");
    }

    #[tokio::test]
    async fn test_malformed_link_is_fatal() {
        let workshop = workshop_with(&[1, 2]).await;
        workshop
            .declare_links(
                ItemId(1),
                vec![
                    crate::workshop::detail_link(ItemId(2)),
                    "https://steamcommunity.com/workshop/filedetails/?id=".to_string(),
                ],
            )
            .await;

        let err = resolver(&workshop)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MalformedDependencyLink { .. }));
    }

    #[tokio::test]
    async fn test_context_mismatch() {
        let workshop = workshop_with(&[]).await;
        workshop.add_item(ItemId(1), "other game", AppId(294100)).await;

        let err = resolver(&workshop)
            .with_context(AppId(480))
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::ContextMismatch {
                item,
                expected,
                actual,
            } => {
                assert_eq!(item, ItemId(1));
                assert_eq!(expected, AppId(480));
                assert_eq!(actual, AppId(294100));
            }
            other => panic!("expected ContextMismatch, got {other:?}"),
        }
        assert_eq!(workshop.page_count(ItemId(1)).await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let workshop = workshop_with(&[1]).await;
        let token = CancellationToken::new();
        token.cancel();

        let err = resolver(&workshop).resolve(ItemId(1), &token).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(workshop.query_count(ItemId(1)).await, 0);
    }

    #[tokio::test]
    async fn test_local_status_source_overrides_metadata() {
        // Metadata knows nothing local; the library knows 2 is installed
        let catalogue = workshop_with(&[1, 2]).await;
        catalogue.declare_dependencies(ItemId(1), &ids(&[2])).await;
        let library = workshop_with(&[2]).await;
        library
            .set_local_status(
                ItemId(2),
                LocalStatus {
                    is_subscribed: true,
                    is_installed: true,
                    download_progress: 1.0,
                    ..Default::default()
                },
            )
            .await;

        let set = resolver(&catalogue)
            .with_local_status(library.clone())
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(set.ids(), ids(&[1, 2]));
        assert!(!set.get(ItemId(1)).unwrap().is_subscribed());
        assert_eq!(
            set.get(ItemId(2)).unwrap().status(),
            crate::types::ItemStatus::Installed
        );
        assert_eq!(set.unsubscribed().len(), 1);
    }

    #[tokio::test]
    async fn test_local_status_failure_aborts() {
        let catalogue = workshop_with(&[1, 2]).await;
        catalogue.declare_dependencies(ItemId(1), &ids(&[2])).await;
        let library = workshop_with(&[]).await;
        library.fail_status_reads(ItemId(2)).await;

        let err = resolver(&catalogue)
            .with_local_status(library)
            .resolve(ItemId(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_discovery_callback_order() {
        let workshop = workshop_with(&[1, 2, 3]).await;
        workshop.declare_dependencies(ItemId(1), &ids(&[2, 3])).await;
        workshop.declare_dependencies(ItemId(2), &ids(&[1])).await;

        let mut seen = Vec::new();
        resolver(&workshop)
            .resolve_with(ItemId(1), &CancellationToken::new(), |item| seen.push(item.id))
            .await
            .unwrap();

        assert_eq!(seen, ids(&[1, 2, 3]));
    }
}
