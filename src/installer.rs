//! High-level installer driving resolution, subscription and monitoring
//!
//! [`WorkshopInstaller`] owns the collaborators and the current owning
//! context, runs the three phases in order, and publishes what happens on a
//! broadcast channel so front-ends can render progress without polling.

use crate::acquisition::{AcquisitionOrchestrator, SubscribeOutcome, SubscribeReport};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::monitor::ProgressMonitor;
use crate::resolver::DependencyResolver;
use crate::types::{AcquisitionPlan, AppId, DependencySet, Event, ItemId, ItemStatus};
use crate::utils::cancellable;
use crate::workshop::{
    DependencyPageFetcher, MetadataClient, SteamPageFetcher, SubscriptionClient,
    WebApiMetadataClient,
};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Outcome of [`WorkshopInstaller::acquire`]
#[derive(Clone, Debug, PartialEq)]
pub struct AcquisitionReport {
    /// Per-item subscribe results
    pub subscribe: SubscribeReport,
    /// Last aggregate percentage observed for the subscribed cohort
    pub final_percent: f64,
}

/// Outcome of a full [`WorkshopInstaller::install`] run
#[derive(Clone, Debug)]
pub struct InstallSummary {
    /// Root item the run started from
    pub root: ItemId,
    /// Owning context resolution finally ran under
    pub context: AppId,
    /// Number of resolved items, root included
    pub total: usize,
    /// Number of items that were already subscribed
    pub already_subscribed: usize,
    /// Subscribe and progress results
    pub acquisition: AcquisitionReport,
    /// Resolved items not installed after the run
    pub not_installed: Vec<ItemId>,
}

impl InstallSummary {
    /// Whether every subscribe request succeeded and every item is installed
    pub fn is_complete(&self) -> bool {
        self.acquisition.subscribe.is_ok() && self.not_installed.is_empty()
    }
}

/// Resolves and acquires workshop items together with their dependencies
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use workshop_deps::workshop::InMemoryWorkshop;
/// use workshop_deps::{Config, ItemId, WorkshopInstaller};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let workshop = Arc::new(InMemoryWorkshop::new());
/// let installer = WorkshopInstaller::new(
///     Config::default(),
///     workshop.clone(),
///     workshop.clone(),
///     workshop,
/// )?;
///
/// let mut events = installer.subscribe_events();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{event:?}");
///     }
/// });
///
/// let summary = installer.install(ItemId(2503622437), &CancellationToken::new()).await?;
/// println!("{} item(s), complete: {}", summary.total, summary.is_complete());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WorkshopInstaller {
    metadata: Arc<dyn MetadataClient>,
    pages: Arc<dyn DependencyPageFetcher>,
    subscriptions: Arc<dyn SubscriptionClient>,
    config: Arc<Config>,
    context: Arc<RwLock<AppId>>,
    event_tx: broadcast::Sender<Event>,
}

impl WorkshopInstaller {
    /// Create an installer over the given collaborators
    ///
    /// The configuration is validated first.
    pub fn new(
        config: Config,
        metadata: Arc<dyn MetadataClient>,
        pages: Arc<dyn DependencyPageFetcher>,
        subscriptions: Arc<dyn SubscriptionClient>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let context = Arc::new(RwLock::new(config.context));

        Ok(Self {
            metadata,
            pages,
            subscriptions,
            config: Arc::new(config),
            context,
            event_tx,
        })
    }

    /// Create an installer that reads metadata and detail pages over HTTP
    pub fn with_web_collaborators(
        config: Config,
        subscriptions: Arc<dyn SubscriptionClient>,
    ) -> Result<Self> {
        config.validate()?;
        let metadata = Arc::new(WebApiMetadataClient::new(&config)?);
        let pages = Arc::new(SteamPageFetcher::new(&config)?);
        Self::new(config, metadata, pages, subscriptions)
    }

    /// Subscribe to installer events
    ///
    /// Events sent before the receiver was created are not delivered.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this installer was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current owning context
    pub async fn context(&self) -> AppId {
        *self.context.read().await
    }

    /// Replace the owning context
    pub async fn set_context(&self, app: AppId) {
        *self.context.write().await = app;
    }

    fn emit_event(&self, event: Event) {
        // No receivers is fine
        self.event_tx.send(event).ok();
    }

    /// Resolve `root` under the current owning context
    ///
    /// Local state comes from the subscription client, so items are
    /// classified by what is actually on this machine.
    ///
    /// Emits [`Event::ItemDiscovered`] per item and [`Event::ResolutionComplete`]
    /// once the set is complete.
    pub async fn resolve(&self, root: ItemId, cancel: &CancellationToken) -> Result<DependencySet> {
        let context = self.context().await;
        let resolver = DependencyResolver::new(self.metadata.clone(), self.pages.clone())
            .with_local_status(self.subscriptions.clone())
            .with_context(context);

        let set = resolver
            .resolve_with(root, cancel, |item| {
                self.emit_event(Event::ItemDiscovered {
                    id: item.id,
                    title: item.title.clone(),
                    status: item.status(),
                });
            })
            .await?;

        let subscribed = set.subscribed().len();
        self.emit_event(Event::ResolutionComplete {
            root,
            total: set.len(),
            subscribed,
            required: set.len() - subscribed,
        });

        Ok(set)
    }

    /// Resolve `root`, switching to its owning context if it belongs elsewhere
    ///
    /// On [`Error::ContextMismatch`] the context is switched to the root's
    /// owner, [`Event::ContextSwitched`] is emitted and resolution runs once
    /// more. A second failure is returned as is.
    pub async fn resolve_following_context(
        &self,
        root: ItemId,
        cancel: &CancellationToken,
    ) -> Result<DependencySet> {
        match self.resolve(root, cancel).await {
            Err(Error::ContextMismatch {
                expected, actual, ..
            }) => {
                tracing::info!(
                    item_id = %root,
                    from = %expected,
                    to = %actual,
                    "Item belongs to another application, switching context"
                );
                self.set_context(actual).await;
                self.emit_event(Event::ContextSwitched {
                    from: expected,
                    to: actual,
                });
                self.resolve(root, cancel).await
            }
            other => other,
        }
    }

    /// Split a resolved set into what is subscribed and what needs acquiring
    pub fn plan(&self, set: DependencySet) -> AcquisitionPlan {
        AcquisitionPlan::from_set(set)
    }

    /// Subscribe to the plan's required items and wait for them to download
    ///
    /// Only items whose subscription succeeded are monitored. Subscribe
    /// failures are reported in the returned [`AcquisitionReport`] rather
    /// than as an error.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`], [`Error::MonitorTimeout`], or a status read error
    /// from the monitor.
    pub async fn acquire(
        &self,
        plan: &AcquisitionPlan,
        cancel: &CancellationToken,
    ) -> Result<AcquisitionReport> {
        let orchestrator = AcquisitionOrchestrator::new(self.subscriptions.clone());
        let subscribe = orchestrator
            .subscribe_with(&plan.required, cancel, |id, outcome| match outcome {
                SubscribeOutcome::Subscribed => self.emit_event(Event::Subscribed { id }),
                SubscribeOutcome::Rejected => {
                    self.emit_event(Event::SubscribeFailed { id, error: None })
                }
                SubscribeOutcome::Failed(e) => self.emit_event(Event::SubscribeFailed {
                    id,
                    error: Some(e.to_string()),
                }),
                SubscribeOutcome::Skipped => {}
            })
            .await?;

        let monitor = ProgressMonitor::new(self.subscriptions.clone(), &self.config.monitor);
        let final_percent = monitor
            .monitor(
                &subscribe.subscribed,
                |percent| self.emit_event(Event::Progress { percent }),
                cancel,
            )
            .await?;

        self.emit_event(Event::AcquisitionComplete {
            cohort: subscribe.subscribed.len(),
            failed: subscribe.failed.len(),
        });

        Ok(AcquisitionReport {
            subscribe,
            final_percent,
        })
    }

    /// Ids of items in `set` that are not installed right now
    pub async fn verify_installed(
        &self,
        set: &DependencySet,
        cancel: &CancellationToken,
    ) -> Result<Vec<ItemId>> {
        let mut missing = Vec::new();
        for item in set {
            let local = cancellable(cancel, self.subscriptions.local_status(item.id)).await?;
            if local.status() != ItemStatus::Installed {
                tracing::debug!(item_id = %item.id, status = %local.status(), "Item not installed");
                missing.push(item.id);
            }
        }
        Ok(missing)
    }

    /// Resolve, acquire and verify `root` and its dependencies
    pub async fn install(&self, root: ItemId, cancel: &CancellationToken) -> Result<InstallSummary> {
        let set = self.resolve_following_context(root, cancel).await?;
        let plan = self.plan(set);

        tracing::info!(
            root = %root,
            total = plan.total(),
            already_subscribed = plan.already_subscribed(),
            required = plan.required.len(),
            "Dependency plan ready"
        );

        let acquisition = self.acquire(&plan, cancel).await?;
        let not_installed = self.verify_installed(&plan.resolved, cancel).await?;

        if !not_installed.is_empty() {
            tracing::warn!(missing = not_installed.len(), "Some items are not installed");
        }

        Ok(InstallSummary {
            root,
            context: self.context().await,
            total: plan.total(),
            already_subscribed: plan.already_subscribed(),
            acquisition,
            not_installed,
        })
    }
}
