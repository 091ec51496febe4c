//! Side-effects requested by the coordinator.
//!
//! The coordinator never performs I/O. It returns [`Effect`]s that the
//! [`crate::Runtime`] executes: re-dispatching actions onto the bus, starting
//! remote calls, presenting dialogs and recording analytics.

use crate::{
    action::{JoinOptions, MetricsTrigger, ViewAction, ViewRoomRequest},
    error::ServiceError,
    ids::{RoomAlias, RoomId, ServerName},
};

/// Address used for a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAddress {
    /// Join by alias. Preferred when known.
    Alias(RoomAlias),
    /// Join by room ID.
    Id(RoomId),
}

impl std::fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alias(alias) => write!(f, "{alias}"),
            Self::Id(room_id) => write!(f, "{room_id}"),
        }
    }
}

/// Alias resolution to run against the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasLookup {
    /// Alias to resolve.
    pub alias: RoomAlias,
    /// Original navigation request, re-dispatched with the resolved room ID.
    pub request: ViewRoomRequest,
    /// Navigation epoch at the time resolution started.
    pub epoch: u64,
}

/// Join request built from a snapshot of the view state.
///
/// The fields are captured when the join starts so that later navigation
/// cannot change which room the result is reported against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAttempt {
    /// Where to send the join.
    pub address: RoomAddress,
    /// Room ID at the time the join started.
    pub room_id: Option<RoomId>,
    /// Routing hints at the time the join started.
    pub via_servers: Vec<ServerName>,
    /// Caller-supplied join options.
    pub options: JoinOptions,
    /// Analytics trigger to report with the result.
    pub metrics_trigger: Option<MetricsTrigger>,
}

/// Dialogs the room view can ask the presentation layer to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    /// A join failed.
    JoinFailed {
        /// Dialog title.
        title: String,
        /// User-facing explanation.
        description: String,
    },
    /// Room settings.
    RoomSettings {
        /// Room to edit.
        room_id: Option<RoomId>,
        /// Tab to open first.
        initial_tab: Option<String>,
    },
}

/// Analytics observations. Payload enrichment happens in the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    /// The user navigated to a different room.
    ViewRoom {
        /// Room navigated to.
        room_id: RoomId,
        /// What caused the navigation.
        trigger: MetricsTrigger,
        /// Navigation was keyboard driven.
        via_keyboard: bool,
    },
    /// A join request succeeded.
    JoinedRoom {
        /// Room joined.
        room_id: RoomId,
        /// What caused the join.
        trigger: Option<MetricsTrigger>,
    },
}

/// Effects produced by the coordinator for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Enqueue an action at the back of the bus.
    Dispatch(ViewAction),

    /// Resolve an alias and re-dispatch the navigation.
    ResolveAlias(AliasLookup),

    /// Run a join with bounded retry.
    JoinRoom(JoinAttempt),

    /// Classify a join failure and show it to the user.
    PresentJoinError {
        /// Room the join targeted.
        room_id: Option<RoomId>,
        /// Terminal join failure.
        error: ServiceError,
    },

    /// Show a dialog.
    ShowDialog(Dialog),

    /// Record an analytics observation.
    Track(AnalyticsEvent),
}
