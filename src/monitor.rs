//! Aggregate download progress polling
//!
//! On every tick each cohort member's local status is read fresh and the
//! cohort's mean download progress is reported as a percentage. Polling stops
//! once every member is complete.

use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::types::{ItemId, ItemStatus, LocalStatus};
use crate::workshop::SubscriptionClient;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Polls a [`SubscriptionClient`] until a cohort finishes downloading
#[derive(Clone)]
pub struct ProgressMonitor {
    client: Arc<dyn SubscriptionClient>,
    poll_interval: Duration,
    max_duration: Option<Duration>,
}

/// Completion of one item in `[0, 1]`
///
/// Out-of-range and NaN progress values are treated as bounds. An installed
/// item that is no longer downloading counts as complete whatever its
/// progress field says.
fn item_completion(local: &LocalStatus) -> f64 {
    if local.status() == ItemStatus::Installed && !local.is_downloading {
        return 1.0;
    }
    if local.download_progress.is_nan() {
        return 0.0;
    }
    local.download_progress.clamp(0.0, 1.0)
}

impl ProgressMonitor {
    /// Create a monitor using the interval and limit in `config`
    pub fn new(client: Arc<dyn SubscriptionClient>, config: &MonitorConfig) -> Self {
        Self {
            client,
            poll_interval: config.poll_interval,
            max_duration: config.max_duration,
        }
    }

    /// Override the polling interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Give up with [`Error::MonitorTimeout`] after `max_duration`
    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Current aggregate percentage of `cohort`
    ///
    /// Member statuses are read concurrently. An empty cohort is complete.
    pub async fn sample(&self, cohort: &[ItemId]) -> Result<f64> {
        if cohort.is_empty() {
            return Ok(100.0);
        }

        let statuses = try_join_all(cohort.iter().map(|&id| self.client.local_status(id))).await?;
        let current: f64 = statuses.iter().map(item_completion).sum();

        Ok(current / cohort.len() as f64 * 100.0)
    }

    /// Poll until every member of `cohort` is complete, returning the final percentage
    ///
    /// `on_progress` is called once per tick with the aggregate percentage.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancel` fires
    /// - [`Error::MonitorTimeout`] if a maximum duration is set and exceeded
    /// - any error from reading a member's local status
    pub async fn monitor<F>(
        &self,
        cohort: &[ItemId],
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<f64>
    where
        F: FnMut(f64),
    {
        if cohort.is_empty() {
            on_progress(100.0);
            return Ok(100.0);
        }

        tracing::info!(
            cohort = cohort.len(),
            poll_interval_ms = self.poll_interval.as_millis(),
            client = self.client.name(),
            "Monitoring downloads"
        );

        let started = Instant::now();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Download monitoring cancelled");
                    return Err(Error::Cancelled);
                }
                _ = interval.tick() => {}
            }

            let percent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = self.sample(cohort) => result?,
            };

            tracing::trace!(percent, "Download progress");
            on_progress(percent);

            if percent >= 100.0 {
                tracing::info!(
                    cohort = cohort.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Downloads complete"
                );
                return Ok(percent);
            }

            if let Some(limit) = self.max_duration {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    tracing::warn!(
                        percent,
                        elapsed_ms = elapsed.as_millis(),
                        "Download monitoring timed out"
                    );
                    return Err(Error::MonitorTimeout { elapsed, percent });
                }
            }
        }
    }
}
