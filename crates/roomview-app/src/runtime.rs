//! Generic runtime for the room view.
//!
//! The Runtime drives the dispatch loop, coordinating between:
//! - [`RoomViewCoordinator`]: the view state machine
//! - [`RoomService`]: remote alias resolution and joins
//! - [`AliasCache`], [`DialogPresenter`], [`AnalyticsSink`]: local
//!   collaborators
//!
//! Actions are handled one at a time in bus order. Remote calls run as tasks
//! on a [`JoinSet`]; while they are suspended the loop keeps handling actions.
//! When a call settles its result is turned into a follow-up action and
//! enqueued at the back of the bus, never handled inline.

use tokio::{sync::watch, task::JoinSet};

use crate::{
    action::{MetricsTrigger, ViewAction, ViewRoomRequest},
    classify::{JOIN_FAILED_TITLE, classify_join_error},
    config::CoordinatorConfig,
    coordinator::RoomViewCoordinator,
    dispatcher::{Dispatcher, Inbox, WeakDispatcher},
    effect::{AliasLookup, Dialog, Effect, JoinAttempt},
    error::{RuntimeError, ServiceError},
    ids::RoomId,
    retry::retry,
    service::{AliasCache, AnalyticsSink, DialogPresenter, MembershipLookup, RoomService},
    state::ViewState,
};

/// Result of a remote call, reported back to the loop.
#[derive(Debug)]
enum Completion {
    AliasResolved {
        lookup: AliasLookup,
        result: Result<RoomId, ServiceError>,
    },
    JoinSettled {
        room_id: Option<RoomId>,
        metrics_trigger: Option<MetricsTrigger>,
        result: Result<RoomId, ServiceError>,
    },
}

/// Generic runtime that orchestrates the coordinator and its collaborators.
///
/// # Type Parameters
///
/// - `S`: Remote messaging service (also answers membership lookups)
/// - `C`: Alias cache
/// - `D`: Dialog presenter
/// - `A`: Analytics sink
pub struct Runtime<S, C, D, A>
where
    S: RoomService + MembershipLookup,
    C: AliasCache,
    D: DialogPresenter,
    A: AnalyticsSink,
{
    coordinator: RoomViewCoordinator,
    service: S,
    cache: C,
    presenter: D,
    analytics: A,
    bus: WeakDispatcher,
    inbox: Inbox,
    in_flight: JoinSet<Completion>,
}

impl<S, C, D, A> Runtime<S, C, D, A>
where
    S: RoomService + MembershipLookup,
    C: AliasCache,
    D: DialogPresenter,
    A: AnalyticsSink,
{
    /// Create a runtime and the dispatch handle feeding it.
    ///
    /// The runtime only holds a weak handle to its own bus: once every
    /// [`Dispatcher`] clone is dropped, [`Runtime::run`] drains and returns.
    pub fn new(
        service: S,
        cache: C,
        presenter: D,
        analytics: A,
        config: CoordinatorConfig,
    ) -> (Self, Dispatcher) {
        let (dispatcher, inbox) = Dispatcher::channel();
        let runtime = Self {
            coordinator: RoomViewCoordinator::new(config),
            service,
            cache,
            presenter,
            analytics,
            bus: dispatcher.downgrade(),
            inbox,
            in_flight: JoinSet::new(),
        };
        (runtime, dispatcher)
    }

    /// Run the dispatch loop until the bus closes and in-flight calls settle.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        loop {
            // Queued actions go first so that a navigation already on the bus
            // retargets the view before an older completion is applied.
            tokio::select! {
                biased;

                action = self.inbox.recv() => match action {
                    Some(action) => self.process_action(action),
                    None => break,
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.process_join_result(joined);
                },
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            self.process_join_result(joined);
        }

        tracing::debug!("room view runtime stopped");
        Ok(())
    }

    /// Handle every action currently queued on the bus, without waiting for
    /// remote calls. Returns the number of actions handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(action) = self.inbox.try_recv() {
            self.process_action(action);
            handled += 1;
        }
        handled
    }

    /// Handle queued actions and settle remote calls until nothing is left.
    ///
    /// Queued actions always run before the next completion is awaited.
    pub async fn run_until_idle(&mut self) {
        loop {
            self.process_pending();
            match self.in_flight.join_next().await {
                Some(joined) => self.process_join_result(joined),
                None => {
                    if self.inbox.is_empty() {
                        break;
                    }
                },
            }
        }
    }

    /// Number of remote calls still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn process_action(&mut self, action: ViewAction) {
        let effects = self.coordinator.handle(action, &self.cache);
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Dispatch(action) => self.redispatch(action),
            Effect::ResolveAlias(lookup) => self.spawn_alias_lookup(lookup),
            Effect::JoinRoom(attempt) => self.spawn_join(attempt),
            Effect::PresentJoinError { room_id, error } => {
                tracing::warn!(room_id = ?room_id, %error, "failed to join room");
                let message = classify_join_error(&error, room_id.as_ref(), &self.service);
                self.presenter.show_dialog(Dialog::JoinFailed {
                    title: JOIN_FAILED_TITLE.to_string(),
                    description: message.to_string(),
                });
            },
            Effect::ShowDialog(dialog) => self.presenter.show_dialog(dialog),
            Effect::Track(event) => self.analytics.track(event),
        }
    }

    fn redispatch(&self, action: ViewAction) {
        let name = action.name();
        if let Err(e) = self.bus.dispatch(action) {
            tracing::warn!(action = name, error = %e, "dropping follow-up action");
        }
    }

    fn spawn_alias_lookup(&mut self, lookup: AliasLookup) {
        let service = self.service.clone();
        self.in_flight.spawn(async move {
            let result = service.resolve_alias(&lookup.alias).await;
            Completion::AliasResolved { lookup, result }
        });
    }

    fn spawn_join(&mut self, attempt: JoinAttempt) {
        let service = self.service.clone();
        let policy = self.coordinator.config().join_retry;
        self.in_flight.spawn(async move {
            let JoinAttempt { address, room_id, via_servers, options, metrics_trigger } = attempt;
            let result = retry(
                &policy,
                || service.join_room(&address, &via_servers, &options),
                ServiceError::is_transient,
            )
            .await;
            Completion::JoinSettled { room_id, metrics_trigger, result }
        });
    }

    fn process_join_result(&mut self, joined: Result<Completion, tokio::task::JoinError>) {
        match joined {
            Ok(completion) => self.complete(completion),
            Err(e) => tracing::error!(error = %e, "remote call task failed"),
        }
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::AliasResolved { lookup, result } => self.complete_alias(lookup, result),
            Completion::JoinSettled { room_id, metrics_trigger, result } => match result {
                Ok(joined) => {
                    tracing::info!(room_id = ?room_id, %joined, "join request succeeded");
                    self.redispatch(ViewAction::JoinRoomReady { room_id, metrics_trigger });
                },
                Err(error) => {
                    self.redispatch(ViewAction::JoinRoomError { room_id, error });
                },
            },
        }
    }

    fn complete_alias(&mut self, lookup: AliasLookup, result: Result<RoomId, ServiceError>) {
        let AliasLookup { alias, request, epoch } = lookup;

        // The follow-up carries the lookup's epoch; the coordinator drops it
        // if a newer navigation is handled first.
        match result {
            Ok(room_id) => {
                self.cache.put(alias, room_id.clone());
                self.redispatch(ViewAction::ViewRoom(ViewRoomRequest {
                    room_id: Some(room_id),
                    navigation_epoch: Some(epoch),
                    ..request
                }));
            },
            Err(error) => {
                tracing::error!(%alias, %error, "failed to resolve room alias");
                self.redispatch(ViewAction::ViewRoomError {
                    room_id: None,
                    room_alias: Some(alias),
                    error,
                    navigation_epoch: Some(epoch),
                });
            },
        }
    }

    /// The coordinator.
    pub fn coordinator(&self) -> &RoomViewCoordinator {
        &self.coordinator
    }

    /// Current view state.
    pub fn state(&self) -> &ViewState {
        self.coordinator.state()
    }

    /// Subscribe to view state changes.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.coordinator.subscribe()
    }

    /// The remote service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// The alias cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// The dialog presenter.
    pub fn presenter(&self) -> &D {
        &self.presenter
    }

    /// The analytics sink.
    pub fn analytics(&self) -> &A {
        &self.analytics
    }
}
