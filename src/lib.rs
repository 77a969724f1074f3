//! # workshop-deps
//!
//! Dependency-aware installer library for workshop content.
//!
//! Given one workshop item, workshop-deps discovers everything it transitively
//! depends on, subscribes to whatever is missing, and reports aggregate
//! download progress until the whole set is on disk.
//!
//! ## Design Philosophy
//!
//! workshop-deps is designed to be:
//! - **Collaborator-driven** - Metadata, detail pages and subscriptions sit behind traits
//! - **Sensible defaults** - Works out of the box against the public endpoints
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use workshop_deps::workshop::InMemoryWorkshop;
//! use workshop_deps::{Config, ItemId, WorkshopInstaller, cancel_on_signal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Swap in a platform-backed SubscriptionClient in a real application
//!     let subscriptions = Arc::new(InMemoryWorkshop::new());
//!     let installer = WorkshopInstaller::with_web_collaborators(Config::default(), subscriptions)?;
//!
//!     // Subscribe to events
//!     let mut events = installer.subscribe_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let cancel = CancellationToken::new();
//!     cancel_on_signal(cancel.clone());
//!
//!     let summary = installer.install(ItemId(2503622437), &cancel).await?;
//!     println!("installed {} item(s)", summary.total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Subscription requests for a cohort
pub mod acquisition;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Phase-driving facade
pub mod installer;
/// Download progress polling
pub mod monitor;
/// Transitive dependency discovery
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Collaborator traits and implementations
pub mod workshop;

// Re-export commonly used types
pub use acquisition::{AcquisitionOrchestrator, SubscribeOutcome, SubscribeReport};
pub use config::{Config, HttpConfig, MonitorConfig, RetryConfig};
pub use error::{Error, Result};
pub use installer::{AcquisitionReport, InstallSummary, WorkshopInstaller};
pub use monitor::ProgressMonitor;
pub use resolver::DependencyResolver;
pub use types::{
    AcquisitionPlan, AppId, DependencySet, Event, ItemId, ItemStatus, LocalStatus, WorkshopItem,
};
pub use utils::format_percent;

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal
///
/// Spawns a task that waits for a signal and then cancels the token, which
/// stops whichever phase is running at its next await point.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The task also ends, without waiting for a signal, once the token is
/// cancelled by someone else.
///
/// # Example
///
/// ```no_run
/// use tokio_util::sync::CancellationToken;
/// use workshop_deps::cancel_on_signal;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cancel = CancellationToken::new();
/// let watcher = cancel_on_signal(cancel.clone());
///
/// // ... run installer phases with &cancel ...
///
/// cancel.cancel();
/// watcher.await.ok();
/// # }
/// ```
pub fn cancel_on_signal(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = wait_for_signal() => {
                tracing::info!("Cancelling in-flight work");
                token.cancel();
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_watcher_exits_when_token_cancelled() {
        let token = CancellationToken::new();
        let watcher = cancel_on_signal(token.clone());

        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .expect("watcher should stop once the token is cancelled")
            .unwrap();
    }
}
