//! Helpers for observing view state changes from async tests.

use std::time::Duration;

use roomview_app::ViewState;
use tokio::sync::watch;

/// Why waiting for a state change gave up.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// No change arrived in time.
    #[error("no view state change within {0:?}")]
    Timeout(Duration),

    /// The coordinator was dropped.
    #[error("view state publisher dropped")]
    Closed,
}

/// Wait for the next published state that satisfies `predicate`.
///
/// The current value is checked first, so a change that already happened is
/// not missed.
pub async fn wait_for_state<F>(
    receiver: &mut watch::Receiver<ViewState>,
    timeout: Duration,
    mut predicate: F,
) -> Result<ViewState, WaitError>
where
    F: FnMut(&ViewState) -> bool,
{
    let waited = tokio::time::timeout(timeout, receiver.wait_for(|state| predicate(state))).await;
    match waited {
        Ok(Ok(state)) => Ok(state.clone()),
        Ok(Err(_)) => Err(WaitError::Closed),
        Err(_) => Err(WaitError::Timeout(timeout)),
    }
}

/// Wait until `count` further change notifications have been seen, returning
/// the latest state.
///
/// Notifications that arrive while the receiver is not polled are coalesced,
/// so each observed change may stand for several published ones.
pub async fn wait_for_updates(
    receiver: &mut watch::Receiver<ViewState>,
    count: usize,
    timeout: Duration,
) -> Result<ViewState, WaitError> {
    let waited = tokio::time::timeout(timeout, async {
        for _ in 0..count {
            receiver.changed().await.map_err(|_| WaitError::Closed)?;
        }
        Ok::<_, WaitError>(receiver.borrow_and_update().clone())
    })
    .await;
    waited.unwrap_or(Err(WaitError::Timeout(timeout)))
}

/// Yield to the scheduler until spawned tasks have had a chance to run.
pub async fn flush() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
