//! Event collection helpers for integration tests

use std::time::Duration;
use tokio::sync::broadcast;
use workshop_deps::Event;

/// Collect events until `AcquisitionComplete` arrives or `timeout` elapses
///
/// Returns everything received, the terminal event included when it arrived.
pub async fn collect_until_complete(
    mut events: broadcast::Receiver<Event>,
    timeout: Duration,
) -> Vec<Event> {
    let mut seen = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let done = matches!(event, Event::AcquisitionComplete { .. });
                    seen.push(event);
                    if done {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    eprintln!("event receiver lagged by {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
    .await;

    seen
}

/// Progress percentages in the order they were reported
pub fn progress_values(events: &[Event]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect()
}

/// Assert progress never went backwards and ended at 100%
pub fn assert_progress_completes(events: &[Event]) {
    let values = progress_values(events);
    assert!(!values.is_empty(), "no progress events were emitted");
    assert!(
        values.windows(2).all(|pair| pair[0] <= pair[1]),
        "progress went backwards: {values:?}"
    );
    assert_eq!(values.last().copied(), Some(100.0), "progress: {values:?}");
}
