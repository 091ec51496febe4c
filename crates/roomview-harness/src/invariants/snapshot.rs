//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the coordinator's observable state at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use roomview_app::{RoomViewCoordinator, ViewState};

/// Snapshot of the coordinator after handling an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    /// View state.
    pub state: ViewState,
    /// Change notifications emitted so far.
    pub revision: u64,
    /// Navigation epoch.
    pub epoch: u64,
}

impl ViewSnapshot {
    /// Capture the coordinator's current state.
    pub fn capture(coordinator: &RoomViewCoordinator) -> Self {
        Self {
            state: coordinator.state().clone(),
            revision: coordinator.revision(),
            epoch: coordinator.navigation_epoch(),
        }
    }

    /// Snapshot of a freshly created coordinator.
    pub fn initial() -> Self {
        Self { state: ViewState::initial(), revision: 0, epoch: 0 }
    }
}
