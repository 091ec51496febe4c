//! Actions delivered over the dispatch bus.
//!
//! This module defines [`ViewAction`], the set of messages the
//! [`crate::RoomViewCoordinator`] reacts to. Each variant carries only the
//! fields relevant to it.

use crate::{
    error::ServiceError,
    ids::{EventId, RoomAlias, RoomId, ServerName},
};

/// Reference to a timeline event the user is replying to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRef {
    /// Event ID.
    pub event_id: EventId,
    /// Room the event belongs to.
    pub room_id: RoomId,
}

impl EventRef {
    /// Create an event reference.
    pub fn new(event_id: impl Into<EventId>, room_id: impl Into<RoomId>) -> Self {
        Self { event_id: event_id.into(), room_id: room_id.into() }
    }
}

/// What caused a navigation or join, for analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsTrigger(pub String);

impl MetricsTrigger {
    /// Create a trigger label (e.g. `"RoomList"`, `"Shortcut"`).
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}

/// Caller-supplied options forwarded verbatim to the join call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// Reason attached to the membership event.
    pub reason: Option<String>,
    /// Signing URL for third-party invites.
    pub invite_sign_url: Option<String>,
}

/// Request to show a room.
///
/// Either `room_id` or `room_alias` must be set. An alias-only request is
/// resolved to a room ID and re-dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRoomRequest {
    /// Target room.
    pub room_id: Option<RoomId>,
    /// Alias the navigation was requested with.
    pub room_alias: Option<RoomAlias>,
    /// Event to scroll to when the room is first shown.
    pub event_id: Option<EventId>,
    /// Pixel offset of the scroll anchor.
    pub event_offset: Option<i32>,
    /// Highlight the initial event.
    pub highlighted: bool,
    /// Preview without joining. `None` means peek.
    pub should_peek: Option<bool>,
    /// A join for this room is already in flight.
    pub joining: bool,
    /// Event to reply to once the room is shown. Dropped unless it belongs to
    /// `room_id`.
    pub replying_to_event: Option<EventRef>,
    /// Routing hints for join and alias resolution.
    pub via_servers: Vec<ServerName>,
    /// The navigation came from a context switch (e.g. search results).
    pub context_switch: bool,
    /// Issue a join right after showing the room.
    pub auto_join: bool,
    /// Options for the automatic join.
    pub join_options: JoinOptions,
    /// Analytics trigger. `None` suppresses the view observation.
    pub metrics_trigger: Option<MetricsTrigger>,
    /// Navigation was keyboard driven.
    pub metrics_via_keyboard: bool,
    /// Navigation epoch this request was issued under. Set on follow-ups of
    /// alias lookups; a tagged request is dropped once a newer navigation has
    /// retargeted the view.
    pub navigation_epoch: Option<u64>,
}

impl ViewRoomRequest {
    /// Request to view a room by ID.
    pub fn room(room_id: impl Into<RoomId>) -> Self {
        Self { room_id: Some(room_id.into()), ..Self::default() }
    }

    /// Request to view a room by alias.
    pub fn alias(alias: impl Into<RoomAlias>) -> Self {
        Self { room_alias: Some(alias.into()), ..Self::default() }
    }

    /// Scroll to (and optionally highlight) an event.
    #[must_use]
    pub fn with_event(mut self, event_id: impl Into<EventId>, highlighted: bool) -> Self {
        self.event_id = Some(event_id.into());
        self.highlighted = highlighted;
        self
    }

    /// Attach routing hints.
    #[must_use]
    pub fn with_via(mut self, servers: impl IntoIterator<Item = ServerName>) -> Self {
        self.via_servers = servers.into_iter().collect();
        self
    }

    /// Attach an analytics trigger.
    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.metrics_trigger = Some(MetricsTrigger::new(trigger));
        self
    }

    /// Join the room right after showing it.
    #[must_use]
    pub fn auto_join(mut self) -> Self {
        self.auto_join = true;
        self
    }
}

/// Request to join the currently viewed room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRoomRequest {
    /// Options forwarded to the join call.
    pub options: JoinOptions,
    /// Analytics trigger carried through to [`ViewAction::JoinRoomReady`].
    pub metrics_trigger: Option<MetricsTrigger>,
}

/// Top-level screens that take the user out of the room view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Home page.
    HomePage,
    /// Welcome page.
    WelcomePage,
    /// Create-group screen.
    CreateGroup,
    /// Group list.
    MyGroups,
    /// Single group view.
    Group,
}

/// Timeline the reply action originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingContext {
    /// Main room timeline.
    Room,
    /// Search results.
    Search,
    /// Thread panel.
    Thread,
    /// Notification panel.
    Notification,
    /// File panel.
    File,
}

impl RenderingContext {
    /// Whether reply actions from this context target the room view.
    pub fn targets_room_view(self) -> bool {
        matches!(self, Self::Room | Self::Search)
    }
}

/// Messages processed by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    /// Show a room by ID or alias.
    ViewRoom(ViewRoomRequest),

    /// Alias resolution failed.
    ViewRoomError {
        /// Room ID, if known.
        room_id: Option<RoomId>,
        /// Alias that failed to resolve.
        room_alias: Option<RoomAlias>,
        /// Resolution failure.
        error: ServiceError,
        /// Navigation epoch the resolution was started under.
        navigation_epoch: Option<u64>,
    },

    /// Leave the room view for another top-level screen.
    NavigateAway(Destination),

    /// A join is about to be requested.
    WillJoin,

    /// The user abandoned a join.
    CancelJoin,

    /// Join the currently viewed room.
    JoinRoom(JoinRoomRequest),

    /// The join call succeeded.
    JoinRoomReady {
        /// Room snapshotted when the join started.
        room_id: Option<RoomId>,
        /// Analytics trigger from the join request.
        metrics_trigger: Option<MetricsTrigger>,
    },

    /// The join call failed.
    JoinRoomError {
        /// Room snapshotted when the join started.
        room_id: Option<RoomId>,
        /// Terminal join failure.
        error: ServiceError,
    },

    /// Start replying to an event. `None` clears the reply.
    ReplyToEvent {
        /// Event to reply to.
        event: Option<EventRef>,
        /// Where the reply was started from.
        context: RenderingContext,
    },

    /// Open the room settings dialog.
    OpenRoomSettings {
        /// Room to open settings for. Defaults to the viewed room.
        room_id: Option<RoomId>,
        /// Settings tab to open first.
        initial_tab: Option<String>,
    },

    /// The client can no longer talk to its homeserver.
    ClientNotViable,

    /// The session was logged out.
    LoggedOut,
}

impl ViewAction {
    /// Stable action name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ViewRoom(_) => "view_room",
            Self::ViewRoomError { .. } => "view_room_error",
            Self::NavigateAway(_) => "navigate_away",
            Self::WillJoin => "will_join",
            Self::CancelJoin => "cancel_join",
            Self::JoinRoom(_) => "join_room",
            Self::JoinRoomReady { .. } => "join_room_ready",
            Self::JoinRoomError { .. } => "join_room_error",
            Self::ReplyToEvent { .. } => "reply_to_event",
            Self::OpenRoomSettings { .. } => "open_room_settings",
            Self::ClientNotViable => "on_client_not_viable",
            Self::LoggedOut => "on_logged_out",
        }
    }

    /// Whether this action invalidates the session and resets view state.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::ClientNotViable | Self::LoggedOut)
    }
}
