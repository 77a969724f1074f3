//! Subscription requests for an acquisition cohort
//!
//! Requests go out one at a time in the order given. A refused or failed
//! request is recorded and the loop moves on, so a single bad item never
//! blocks the rest of the cohort.

use crate::error::{Error, Result};
use crate::types::{ItemId, WorkshopItem};
use crate::workshop::SubscriptionClient;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What happened to one item during [`AcquisitionOrchestrator::subscribe`]
#[derive(Debug)]
pub enum SubscribeOutcome {
    /// The request was accepted
    Subscribed,
    /// The user was already subscribed; no request was issued
    Skipped,
    /// The platform answered the request with a refusal
    Rejected,
    /// The collaborator returned an error
    Failed(Error),
}

impl SubscribeOutcome {
    /// Whether the outcome counts as a subscription failure
    pub fn is_failure(&self) -> bool {
        matches!(self, SubscribeOutcome::Rejected | SubscribeOutcome::Failed(_))
    }
}

/// Aggregate result of a subscribe pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscribeReport {
    /// Items whose request was accepted, in request order
    pub subscribed: Vec<ItemId>,
    /// Items already subscribed before the pass
    pub skipped: Vec<ItemId>,
    /// Items whose request was refused or errored
    pub failed: BTreeSet<ItemId>,
}

impl SubscribeReport {
    /// True only when no request failed
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn a report with failures into [`Error::SubscriptionFailure`]
    pub fn into_result(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(Error::SubscriptionFailure {
                failed: self.failed.into_iter().collect(),
            })
        }
    }
}

/// Issues subscribe requests through a [`SubscriptionClient`]
#[derive(Clone)]
pub struct AcquisitionOrchestrator {
    client: Arc<dyn SubscriptionClient>,
}

impl AcquisitionOrchestrator {
    /// Create an orchestrator over `client`
    pub fn new(client: Arc<dyn SubscriptionClient>) -> Self {
        Self { client }
    }

    /// Subscribe to every item not already subscribed
    ///
    /// # Errors
    ///
    /// Only [`Error::Cancelled`]. Individual failures are reported in the
    /// returned [`SubscribeReport`]; use [`SubscribeReport::into_result`] to
    /// treat them as an error.
    pub async fn subscribe(
        &self,
        items: &[WorkshopItem],
        cancel: &CancellationToken,
    ) -> Result<SubscribeReport> {
        self.subscribe_with(items, cancel, |_, _| {}).await
    }

    /// Like [`subscribe`](Self::subscribe), calling `on_outcome` after each item
    pub async fn subscribe_with<F>(
        &self,
        items: &[WorkshopItem],
        cancel: &CancellationToken,
        mut on_outcome: F,
    ) -> Result<SubscribeReport>
    where
        F: FnMut(ItemId, &SubscribeOutcome),
    {
        tracing::info!(
            items = items.len(),
            client = self.client.name(),
            "Subscribing to cohort"
        );

        let mut report = SubscribeReport::default();

        for item in items {
            if cancel.is_cancelled() {
                tracing::info!(
                    subscribed = report.subscribed.len(),
                    "Subscribe pass cancelled"
                );
                return Err(Error::Cancelled);
            }

            let outcome = if item.is_subscribed() {
                SubscribeOutcome::Skipped
            } else {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    result = self.client.subscribe(item.id) => result,
                };
                match result {
                    Ok(true) => SubscribeOutcome::Subscribed,
                    Ok(false) => SubscribeOutcome::Rejected,
                    Err(e) => SubscribeOutcome::Failed(e),
                }
            };

            match &outcome {
                SubscribeOutcome::Subscribed => {
                    tracing::debug!(item_id = %item.id, title = %item.title, "Subscribed");
                    report.subscribed.push(item.id);
                }
                SubscribeOutcome::Skipped => {
                    tracing::debug!(item_id = %item.id, "Already subscribed, skipping");
                    report.skipped.push(item.id);
                }
                SubscribeOutcome::Rejected => {
                    tracing::warn!(item_id = %item.id, title = %item.title, "Subscription refused");
                    report.failed.insert(item.id);
                }
                SubscribeOutcome::Failed(e) => {
                    tracing::warn!(item_id = %item.id, error = %e, "Subscription request failed");
                    report.failed.insert(item.id);
                }
            }

            on_outcome(item.id, &outcome);
        }

        tracing::info!(
            subscribed = report.subscribed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Subscribe pass complete"
        );

        Ok(report)
    }
}
