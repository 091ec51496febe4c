//! Observable view state.
//!
//! [`ViewState`] is the record the coordinator owns and consumers read.
//! Mutations go through [`ViewStateUpdate`], a partial update that names only
//! the fields it changes. [`ViewState::merge`] applies it with a shallow
//! per-field comparison and reports whether anything actually changed, so
//! no-op updates never reach subscribers.

use crate::{
    action::EventRef,
    error::ServiceError,
    ids::{EventId, RoomAlias, RoomId, ServerName},
};

macro_rules! view_state {
    ($( $(#[$doc:meta])* $field:ident : $ty:ty = $init:expr ),* $(,)?) => {
        /// What the room view is currently showing.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct ViewState {
            $( $(#[$doc])* pub $field: $ty, )*
        }

        impl ViewState {
            /// The state at startup and after a session reset.
            pub fn initial() -> Self {
                Self { $( $field: $init, )* }
            }

            /// Apply `update` if at least one named field differs.
            ///
            /// Returns `true` if the state changed. Fields absent from the
            /// update are left untouched.
            pub fn merge(&mut self, update: ViewStateUpdate) -> bool {
                let changed = false $( || update.$field.as_ref().is_some_and(|value| *value != self.$field) )*;
                if !changed {
                    return false;
                }
                $(
                    if let Some(value) = update.$field {
                        self.$field = value;
                    }
                )*
                true
            }
        }

        /// Partial update to [`ViewState`]. Unset fields are left as is.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct ViewStateUpdate {
            $( $field: Option<$ty>, )*
        }

        impl ViewStateUpdate {
            $(
                $(#[$doc])*
                #[must_use]
                pub fn $field(mut self, value: $ty) -> Self {
                    self.$field = Some(value);
                    self
                }
            )*

            /// Whether the update names no fields at all.
            pub fn is_empty(&self) -> bool {
                true $( && self.$field.is_none() )*
            }
        }
    };
}

view_state! {
    /// Room currently targeted for viewing.
    room_id: Option<RoomId> = None,
    /// Alias the navigation was requested with, if any.
    room_alias: Option<RoomAlias> = None,
    /// A join is in flight or presumed in flight.
    ///
    /// Left set after the join call succeeds: membership is only authoritative
    /// once it arrives from sync.
    joining: bool = false,
    /// Last join failure.
    join_error: Option<ServiceError> = None,
    /// Event to scroll to on first render.
    initial_event_id: Option<EventId> = None,
    /// Pixel offset of the scroll anchor.
    initial_event_pixel_offset: Option<i32> = None,
    /// Highlight the initial event.
    is_initial_event_highlighted: bool = false,
    /// An alias is being resolved to a room ID.
    room_loading: bool = false,
    /// Last alias resolution failure.
    room_load_error: Option<ServiceError> = None,
    /// Event being replied to. Belongs to `room_id` whenever a room is shown.
    replying_to_event: Option<EventRef> = None,
    /// Preview the room without joining.
    should_peek: bool = false,
    /// Routing hints for join and alias resolution.
    via_servers: Vec<ServerName> = Vec::new(),
    /// The last navigation was a context switch.
    was_context_switch: bool = false,
    /// Room settings are open for editing. Set by the settings UI; the
    /// coordinator only clears it when the view moves to a room.
    is_editing_settings: bool = false,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::initial()
    }
}
