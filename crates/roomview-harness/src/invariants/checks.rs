//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use super::{Invariant, InvariantResult, ViewSnapshot, Violation};

/// While a room is shown, a pending reply belongs to that room.
///
/// Cross-room replies must be dropped when the view switches rooms, otherwise
/// the composer would quote an event from a room the user is not looking at.
/// With no room shown (loading, or navigated away) the reply is kept.
pub struct ReplyMatchesRoom;

impl Invariant for ReplyMatchesRoom {
    fn name(&self) -> &'static str {
        "ReplyMatchesRoom"
    }

    fn check(&self, _previous: &ViewSnapshot, current: &ViewSnapshot) -> InvariantResult {
        let state = &current.state;
        match &state.replying_to_event {
            Some(event) if state.room_id.as_ref().is_some_and(|room| *room != event.room_id) => {
                Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "replying to {} in {} while viewing {:?}",
                        event.event_id, event.room_id, state.room_id
                    ),
                })
            },
            _ => Ok(()),
        }
    }
}

/// While an alias is loading there is no resolved room.
pub struct LoadingHasNoRoom;

impl Invariant for LoadingHasNoRoom {
    fn name(&self) -> &'static str {
        "LoadingHasNoRoom"
    }

    fn check(&self, _previous: &ViewSnapshot, current: &ViewSnapshot) -> InvariantResult {
        let state = &current.state;
        if state.room_loading && state.room_id.is_some() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("room {:?} set while alias still loading", state.room_id),
            });
        }
        Ok(())
    }
}

/// Every state change is announced, and revisions never go backwards.
pub struct ChangeIsNotified;

impl Invariant for ChangeIsNotified {
    fn name(&self) -> &'static str {
        "ChangeIsNotified"
    }

    fn check(&self, previous: &ViewSnapshot, current: &ViewSnapshot) -> InvariantResult {
        if current.revision < previous.revision {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "revision decreased {} → {}",
                    previous.revision, current.revision
                ),
            });
        }
        if current.state != previous.state && current.revision == previous.revision {
            return Err(Violation {
                invariant: self.name(),
                message: format!("state changed without notification at revision {}", current.revision),
            });
        }
        Ok(())
    }
}
