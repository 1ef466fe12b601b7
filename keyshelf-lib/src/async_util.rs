//! Driving a session while consuming its events.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

/// How long to keep draining events after the task has finished. Guards
/// against a sender that outlives the task.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `task` to completion, handing every event from `events` to
/// `on_event`, then drain what is left in the channel.
pub async fn run_with_events<T, E>(
    task: impl Future<Output = T>,
    mut events: mpsc::UnboundedReceiver<E>,
    mut on_event: impl FnMut(E),
) -> T {
    tokio::pin!(task);
    let mut channel_open = true;

    let output = loop {
        tokio::select! {
            output = &mut task => break output,
            event = events.recv(), if channel_open => match event {
                Some(event) => on_event(event),
                None => channel_open = false,
            },
        }
    };

    if channel_open {
        let drained = timeout(DRAIN_TIMEOUT, async {
            while let Some(event) = events.recv().await {
                on_event(event);
            }
        })
        .await;
        if drained.is_err() {
            log::warn!(
                "Stopped draining events after {}s; a sender is still alive",
                DRAIN_TIMEOUT.as_secs()
            );
        }
    }
    output
}
