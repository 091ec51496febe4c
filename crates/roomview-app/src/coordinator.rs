//! Room view state machine.
//!
//! This module defines the [`RoomViewCoordinator`], which tracks which room is
//! being viewed, whether it is loading or being joined, and which event the
//! user is replying to.
//!
//! This is a pure state machine: it consumes [`ViewAction`]s and produces
//! [`Effect`]s for the runtime to execute. Remote calls never happen here, so
//! every transition is synchronous and deterministic.
//!
//! # Responsibilities
//!
//! - Owns the single [`ViewState`] and publishes it on change.
//! - Resolves aliases through the cache, or requests remote resolution.
//! - Snapshots the fields a join depends on before the join starts.
//! - Redirects cross-room replies into a navigation.

use tokio::sync::watch;

use crate::{
    action::{EventRef, JoinRoomRequest, RenderingContext, ViewAction, ViewRoomRequest},
    config::CoordinatorConfig,
    effect::{AliasLookup, AnalyticsEvent, Dialog, Effect, JoinAttempt, RoomAddress},
    error::ServiceError,
    ids::{EventId, RoomAlias, RoomId, ServerName},
    service::AliasCache,
    state::{ViewState, ViewStateUpdate},
};

/// Room view state coordinator.
///
/// One instance exists per client session. It is created at startup with
/// [`ViewState::initial`] and reset to it when the session is invalidated.
#[derive(Debug)]
pub struct RoomViewCoordinator {
    /// Current view state.
    state: ViewState,
    /// Change notification channel. Holds the latest published state.
    notifier: watch::Sender<ViewState>,
    /// Number of change notifications emitted.
    revision: u64,
    /// Incremented by every navigation that retargets the view, so that
    /// alias resolutions started before it can be recognised as stale.
    epoch: u64,
    config: CoordinatorConfig,
}

impl RoomViewCoordinator {
    /// Create a coordinator in the initial state.
    pub fn new(config: CoordinatorConfig) -> Self {
        let state = ViewState::initial();
        let (notifier, _) = watch::channel(state.clone());
        Self { state, notifier, revision: 0, epoch: 0, config }
    }

    /// Process an action and return effects.
    ///
    /// `cache` is consulted for alias-only navigations.
    pub fn handle(&mut self, action: ViewAction, cache: &impl AliasCache) -> Vec<Effect> {
        tracing::debug!(action = action.name(), "handling view action");
        if action.invalidates_session() {
            tracing::info!(action = action.name(), "session invalidated, resetting room view");
        }

        match action {
            ViewAction::ViewRoom(request) => self.view_room(request, cache),
            ViewAction::ViewRoomError { room_id, room_alias, error, navigation_epoch } => {
                if self.is_superseded(navigation_epoch) {
                    tracing::debug!(alias = ?room_alias, "discarding superseded alias failure");
                    return vec![];
                }
                self.view_room_error(room_id, room_alias, error);
                vec![]
            },
            ViewAction::NavigateAway(destination) => {
                tracing::debug!(?destination, "leaving room view");
                self.set_state(
                    ViewStateUpdate::default()
                        .room_id(None)
                        .room_alias(None)
                        .via_servers(Vec::new())
                        .was_context_switch(false),
                );
                vec![]
            },
            ViewAction::WillJoin => {
                self.set_state(ViewStateUpdate::default().joining(true));
                vec![]
            },
            ViewAction::CancelJoin => {
                self.set_state(ViewStateUpdate::default().joining(false));
                vec![]
            },
            ViewAction::JoinRoom(request) => self.join_room(request),
            ViewAction::JoinRoomReady { room_id, metrics_trigger } => {
                if room_id.is_some() && self.state.room_id == room_id {
                    self.set_state(ViewStateUpdate::default().should_peek(false));
                }
                room_id
                    .map(|room_id| {
                        Effect::Track(AnalyticsEvent::JoinedRoom { room_id, trigger: metrics_trigger })
                    })
                    .into_iter()
                    .collect()
            },
            ViewAction::JoinRoomError { room_id, error } => {
                self.set_state(
                    ViewStateUpdate::default().joining(false).join_error(Some(error.clone())),
                );
                vec![Effect::PresentJoinError { room_id, error }]
            },
            ViewAction::ReplyToEvent { event, context } => self.reply_to_event(event, context),
            ViewAction::OpenRoomSettings { room_id, initial_tab } => {
                let room_id = room_id.or_else(|| self.state.room_id.clone());
                vec![Effect::ShowDialog(Dialog::RoomSettings { room_id, initial_tab })]
            },
            ViewAction::ClientNotViable | ViewAction::LoggedOut => {
                self.reset();
                vec![]
            },
        }
    }

    fn view_room(&mut self, request: ViewRoomRequest, cache: &impl AliasCache) -> Vec<Effect> {
        if self.is_superseded(request.navigation_epoch) {
            tracing::debug!(
                room_id = ?request.room_id,
                alias = ?request.room_alias,
                "discarding superseded alias resolution"
            );
            return vec![];
        }

        if let Some(room_id) = request.room_id.clone() {
            return self.view_room_id(room_id, request);
        }

        let Some(alias) = request.room_alias.clone() else {
            tracing::warn!("view_room without room ID or alias ignored");
            return vec![];
        };

        if let Some(room_id) = cache.get(&alias) {
            tracing::debug!(%alias, %room_id, "room alias cache hit");
            return vec![Effect::Dispatch(ViewAction::ViewRoom(ViewRoomRequest {
                room_id: Some(room_id),
                navigation_epoch: Some(self.epoch),
                ..request
            }))];
        }

        self.epoch += 1;
        self.set_state(
            ViewStateUpdate::default()
                .room_id(None)
                .initial_event_id(None)
                .initial_event_pixel_offset(None)
                .is_initial_event_highlighted(false)
                .room_alias(Some(alias.clone()))
                .room_loading(true)
                .room_load_error(None)
                .via_servers(request.via_servers.clone())
                .was_context_switch(request.context_switch),
        );

        vec![Effect::ResolveAlias(AliasLookup { alias, request, epoch: self.epoch })]
    }

    fn view_room_id(&mut self, room_id: RoomId, request: ViewRoomRequest) -> Vec<Effect> {
        self.epoch += 1;
        let mut effects = Vec::new();

        if let Some(trigger) = request.metrics_trigger.clone()
            && self.state.room_id.as_ref() != Some(&room_id)
        {
            effects.push(Effect::Track(AnalyticsEvent::ViewRoom {
                room_id: room_id.clone(),
                trigger,
                via_keyboard: request.metrics_via_keyboard,
            }));
        }

        // Cross-room replies are dropped; only a reply into the target room
        // survives the switch.
        let replying_to_event =
            request.replying_to_event.filter(|event| event.room_id == room_id);

        self.set_state(
            ViewStateUpdate::default()
                .room_id(Some(room_id.clone()))
                .room_alias(request.room_alias)
                .initial_event_id(request.event_id)
                .initial_event_pixel_offset(request.event_offset)
                .is_initial_event_highlighted(request.highlighted)
                .room_loading(false)
                .room_load_error(None)
                .should_peek(request.should_peek.unwrap_or(self.config.default_should_peek))
                .joining(request.joining)
                .replying_to_event(replying_to_event)
                .is_editing_settings(false)
                .via_servers(request.via_servers)
                .was_context_switch(request.context_switch),
        );

        if request.auto_join {
            tracing::debug!(%room_id, "auto-joining viewed room");
            effects.push(Effect::Dispatch(ViewAction::JoinRoom(JoinRoomRequest {
                options: request.join_options,
                metrics_trigger: request.metrics_trigger,
            })));
        }

        effects
    }

    fn view_room_error(
        &mut self,
        room_id: Option<RoomId>,
        room_alias: Option<RoomAlias>,
        error: ServiceError,
    ) {
        self.set_state(
            ViewStateUpdate::default()
                .room_id(room_id)
                .room_alias(room_alias)
                .room_loading(false)
                .room_load_error(Some(error)),
        );
    }

    fn join_room(&mut self, request: JoinRoomRequest) -> Vec<Effect> {
        self.set_state(ViewStateUpdate::default().joining(true));

        // The view may move on before the join resolves; report against the
        // room as it was now.
        let room_id = self.state.room_id.clone();
        let address = match (self.state.room_alias.clone(), room_id.clone()) {
            (Some(alias), _) => RoomAddress::Alias(alias),
            (None, Some(room_id)) => RoomAddress::Id(room_id),
            (None, None) => {
                tracing::warn!("join_room with no room in view");
                return vec![Effect::Dispatch(ViewAction::JoinRoomError {
                    room_id: None,
                    error: ServiceError::InvalidRequest("no room to join".into()),
                })];
            },
        };

        vec![Effect::JoinRoom(JoinAttempt {
            address,
            room_id,
            via_servers: self.state.via_servers.clone(),
            options: request.options,
            metrics_trigger: request.metrics_trigger,
        })]
    }

    fn reply_to_event(
        &mut self,
        event: Option<EventRef>,
        context: RenderingContext,
    ) -> Vec<Effect> {
        if !context.targets_room_view() {
            return vec![];
        }

        match event {
            Some(event) if self.state.room_id.as_ref() != Some(&event.room_id) => {
                tracing::debug!(room_id = %event.room_id, "reply targets another room, switching");
                vec![Effect::Dispatch(ViewAction::ViewRoom(ViewRoomRequest {
                    room_id: Some(event.room_id.clone()),
                    replying_to_event: Some(event),
                    ..ViewRoomRequest::default()
                }))]
            },
            event => {
                self.set_state(ViewStateUpdate::default().replying_to_event(event));
                vec![]
            },
        }
    }

    /// Whether a follow-up tagged with `epoch` was overtaken by a newer
    /// navigation.
    fn is_superseded(&self, epoch: Option<u64>) -> bool {
        self.config.discard_stale_alias_results && epoch.is_some_and(|epoch| epoch != self.epoch)
    }

    /// Restore the initial state, always notifying subscribers.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = ViewState::initial();
        self.notify();
    }

    fn set_state(&mut self, update: ViewStateUpdate) {
        if self.state.merge(update) {
            self.notify();
        }
    }

    fn notify(&mut self) {
        self.revision += 1;
        self.notifier.send_replace(self.state.clone());
    }

    /// Subscribe to change notifications.
    ///
    /// The receiver observes the latest state; intermediate states may be
    /// coalesced if the receiver falls behind.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.notifier.subscribe()
    }

    /// Number of change notifications emitted so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current navigation epoch.
    pub fn navigation_epoch(&self) -> u64 {
        self.epoch
    }

    /// Coordinator configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Full view state.
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Room currently being viewed.
    pub fn room_id(&self) -> Option<&RoomId> {
        self.state.room_id.as_ref()
    }

    /// Event to scroll to when the room is first viewed.
    pub fn initial_event_id(&self) -> Option<&EventId> {
        self.state.initial_event_id.as_ref()
    }

    /// Pixel offset of the initial event.
    pub fn initial_event_pixel_offset(&self) -> Option<i32> {
        self.state.initial_event_pixel_offset
    }

    /// Whether to highlight the initial event.
    pub fn is_initial_event_highlighted(&self) -> bool {
        self.state.is_initial_event_highlighted
    }

    /// Alias the room was navigated to with, if any.
    pub fn room_alias(&self) -> Option<&RoomAlias> {
        self.state.room_alias.as_ref()
    }

    /// Whether an alias is being resolved.
    pub fn is_room_loading(&self) -> bool {
        self.state.room_loading
    }

    /// Last alias resolution failure.
    pub fn room_load_error(&self) -> Option<&ServiceError> {
        self.state.room_load_error.as_ref()
    }

    /// Whether we expect to be joined to the viewed room.
    ///
    /// Stays `true` after the join request succeeds, since membership only
    /// becomes authoritative once it arrives from sync. Consumers should prefer
    /// the room's own membership when a room object exists and fall back to
    /// this flag (spinner vs. join prompt) otherwise.
    pub fn is_joining(&self) -> bool {
        self.state.joining
    }

    /// Last join failure.
    pub fn join_error(&self) -> Option<&ServiceError> {
        self.state.join_error.as_ref()
    }

    /// Event currently being replied to or quoted.
    pub fn quoted_event(&self) -> Option<&EventRef> {
        self.state.replying_to_event.as_ref()
    }

    /// Whether to preview the room without joining.
    pub fn should_peek(&self) -> bool {
        self.state.should_peek
    }

    /// Whether the last navigation was a context switch.
    pub fn was_context_switch(&self) -> bool {
        self.state.was_context_switch
    }

    /// Routing hints for the viewed room.
    pub fn via_servers(&self) -> &[ServerName] {
        &self.state.via_servers
    }
}

impl Default for RoomViewCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}
