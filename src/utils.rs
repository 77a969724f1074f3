//! Utility functions shared by the engines

use crate::error::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race a fallible future against a cancellation token
///
/// Cancellation wins ties, so an already-cancelled token never starts
/// observable work.
///
/// # Examples
///
/// ```
/// use tokio_util::sync::CancellationToken;
/// use workshop_deps::utils::cancellable;
/// use workshop_deps::Error;
///
/// # #[tokio::main]
/// # async fn main() {
/// let token = CancellationToken::new();
/// token.cancel();
/// let result = cancellable(&token, async { Ok::<_, Error>(1) }).await;
/// assert!(matches!(result, Err(Error::Cancelled)));
/// # }
/// ```
pub async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}

/// Render a percentage with one decimal place (e.g. `"50.0"`)
///
/// Values slightly above 100 are rendered as-is.
///
/// # Examples
///
/// ```
/// use workshop_deps::utils::format_percent;
///
/// assert_eq!(format_percent(50.0), "50.0");
/// assert_eq!(format_percent(33.333), "33.3");
/// ```
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.1}")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let token = CancellationToken::new();
        let value = cancellable(&token, async { Ok::<_, Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancellable_interrupts_pending_future() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = cancellable(&token, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, Error>(())
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_format_percent_overshoot() {
        assert_eq!(format_percent(100.00000000000001), "100.0");
        assert_eq!(format_percent(100.06), "100.1");
        assert_eq!(format_percent(0.0), "0.0");
    }
}
