//! Integration tests for the Runtime driving the coordinator.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - View state reflects the last navigation
//! - Remote calls were made the expected number of times, with the expected
//!   arguments
//! - Dialogs and analytics observations reached their sinks

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use roomview_app::{
    AliasCache, AnalyticsEvent, CoordinatorConfig, Dialog, Dispatcher, EventRef, JOIN_FAILED_TITLE,
    JoinFailureMessage, JoinOptions, JoinRoomRequest, MemoryAliasCache, MetricsTrigger,
    RenderingContext, RetryPolicy, RoomAddress, RoomAlias, RoomId, Runtime, ServerName,
    ServiceError, ViewAction, ViewRoomRequest, ViewState,
};
use roomview_harness::{
    RecordingAnalytics, RecordingPresenter, SimRoomService, flush, wait_for_state,
    wait_for_updates,
};

type TestRuntime = Runtime<SimRoomService, MemoryAliasCache, RecordingPresenter, RecordingAnalytics>;

/// Create a runtime with default config around `service`.
fn runtime(service: SimRoomService) -> (TestRuntime, Dispatcher) {
    runtime_with(service, MemoryAliasCache::new(), CoordinatorConfig::default())
}

fn runtime_with(
    service: SimRoomService,
    cache: MemoryAliasCache,
    config: CoordinatorConfig,
) -> (TestRuntime, Dispatcher) {
    Runtime::new(service, cache, RecordingPresenter::new(), RecordingAnalytics::new(), config)
}

fn dispatch(bus: &Dispatcher, action: ViewAction) {
    assert!(bus.dispatch(action).is_ok(), "bus closed");
}

fn view(bus: &Dispatcher, request: ViewRoomRequest) {
    dispatch(bus, ViewAction::ViewRoom(request));
}

fn join(bus: &Dispatcher) {
    dispatch(bus, ViewAction::JoinRoom(JoinRoomRequest::default()));
}

fn room(id: &str) -> Option<RoomId> {
    Some(RoomId::from(id))
}

fn join_failed_description(runtime: &TestRuntime) -> Option<String> {
    match runtime.presenter().last() {
        Some(Dialog::JoinFailed { title, description }) => {
            assert_eq!(title, JOIN_FAILED_TITLE);
            Some(description.clone())
        },
        _ => None,
    }
}

#[tokio::test]
async fn cached_alias_skips_remote_resolution() {
    let service = SimRoomService::default();
    let mut cache = MemoryAliasCache::new();
    cache.put(RoomAlias::from("#rust:hs"), RoomId::from("!rust:hs"));
    let (mut runtime, bus) = runtime_with(service.clone(), cache, CoordinatorConfig::default());

    view(&bus, ViewRoomRequest::alias("#rust:hs").with_event("$e:hs", true));

    // The alias navigation and its re-dispatch with the cached ID.
    assert_eq!(runtime.process_pending(), 2);
    assert_eq!(runtime.in_flight(), 0);

    let state = runtime.state();
    assert_eq!(state.room_id, room("!rust:hs"));
    assert_eq!(state.room_alias, Some(RoomAlias::from("#rust:hs")));
    assert_eq!(state.initial_event_id.as_ref().map(|e| e.as_str()), Some("$e:hs"));
    assert!(state.is_initial_event_highlighted);
    assert!(!state.room_loading);
    assert!(service.alias_calls().is_empty());
}

#[tokio::test]
async fn alias_miss_resolves_and_caches() {
    let service = SimRoomService::default().with_alias("#rust:hs", "!rust:hs");
    let (mut runtime, bus) = runtime(service.clone());

    view(
        &bus,
        ViewRoomRequest::alias("#rust:hs").with_via([ServerName::from("hs"), ServerName::from("other")]),
    );
    runtime.process_pending();

    let loading = runtime.state();
    assert!(loading.room_loading);
    assert_eq!(loading.room_id, None);
    assert_eq!(loading.room_alias, Some(RoomAlias::from("#rust:hs")));
    assert_eq!(loading.via_servers.len(), 2);
    assert_eq!(runtime.in_flight(), 1);

    runtime.run_until_idle().await;

    let state = runtime.state();
    assert!(!state.room_loading);
    assert_eq!(state.room_id, room("!rust:hs"));
    assert_eq!(state.room_alias, Some(RoomAlias::from("#rust:hs")));
    assert_eq!(state.via_servers.len(), 2);
    assert_eq!(runtime.cache().get(&RoomAlias::from("#rust:hs")), room("!rust:hs"));
    assert_eq!(service.alias_calls(), vec![RoomAlias::from("#rust:hs")]);
}

#[tokio::test]
async fn alias_failure_sets_load_error_without_retry() {
    let service = SimRoomService::default()
        .with_alias_failure("#gone:hs", ServiceError::http(504));
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::alias("#gone:hs"));
    runtime.run_until_idle().await;

    let state = runtime.state();
    assert!(!state.room_loading);
    assert_eq!(state.room_id, None);
    assert_eq!(state.room_alias, Some(RoomAlias::from("#gone:hs")));
    assert_eq!(state.room_load_error.as_ref().and_then(ServiceError::http_status), Some(504));
    assert_eq!(service.alias_calls().len(), 1);
    assert!(runtime.cache().is_empty());
    assert!(runtime.presenter().dialogs().is_empty());
}

#[tokio::test]
async fn join_retries_gateway_timeouts() {
    let service = SimRoomService::default();
    service.fail_joins(&ServiceError::http(504), 4);
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::room("!a:hs"));
    dispatch(
        &bus,
        ViewAction::JoinRoom(JoinRoomRequest {
            options: JoinOptions::default(),
            metrics_trigger: Some(MetricsTrigger::new("Invite")),
        }),
    );
    runtime.run_until_idle().await;

    assert_eq!(service.join_calls().len(), 5);
    let state = runtime.state();
    assert!(!state.should_peek);
    assert_eq!(state.join_error, None);
    assert!(runtime.presenter().dialogs().is_empty());
    assert_eq!(
        runtime.analytics().events(),
        &[AnalyticsEvent::JoinedRoom {
            room_id: RoomId::from("!a:hs"),
            trigger: Some(MetricsTrigger::new("Invite")),
        }]
    );
}

#[tokio::test]
async fn join_gives_up_after_attempt_cap() {
    let service = SimRoomService::default();
    service.fail_joins(&ServiceError::http(504), 10);
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::room("!a:hs"));
    join(&bus);
    runtime.run_until_idle().await;

    assert_eq!(service.join_calls().len(), 5);
    let state = runtime.state();
    assert!(!state.joining);
    assert_eq!(state.join_error, Some(ServiceError::http(504)));
    assert!(join_failed_description(&runtime).is_some());
}

#[tokio::test]
async fn non_transient_join_failure_is_not_retried() {
    let service = SimRoomService::default();
    service.fail_joins(&ServiceError::matrix(403, "M_FORBIDDEN", "You are banned"), 1);
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::room("!a:hs"));
    join(&bus);
    runtime.run_until_idle().await;

    assert_eq!(service.join_calls().len(), 1);
    assert!(!runtime.state().joining);
    assert_eq!(join_failed_description(&runtime).as_deref(), Some("You are banned"));
    assert!(runtime.analytics().events().is_empty());
}

#[tokio::test]
async fn single_gateway_timeout_then_success() {
    let service = SimRoomService::default();
    service.fail_joins(&ServiceError::http(504), 1);
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::room("!r:hs"));
    join(&bus);
    runtime.run_until_idle().await;

    assert_eq!(service.join_calls().len(), 2);
    let state = runtime.state();
    assert!(state.joining);
    assert!(!state.should_peek);
    assert_eq!(state.room_id, room("!r:hs"));
}

#[tokio::test(start_paused = true)]
async fn join_retry_waits_between_attempts() {
    let service = SimRoomService::default();
    service.fail_joins(&ServiceError::http(504), 2);
    let config = CoordinatorConfig {
        join_retry: RetryPolicy::new(3, 1_000, 10_000),
        ..CoordinatorConfig::default()
    };
    let (mut runtime, bus) = runtime_with(service.clone(), MemoryAliasCache::new(), config);

    view(&bus, ViewRoomRequest::room("!a:hs"));
    join(&bus);

    let started = tokio::time::Instant::now();
    runtime.run_until_idle().await;

    assert_eq!(service.join_calls().len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(3_000));
    assert!(!runtime.state().should_peek);
}

#[tokio::test]
async fn join_prefers_alias_and_forwards_snapshot() {
    let service = SimRoomService::default().with_alias("#rust:hs", "!rust:hs");
    let (mut runtime, bus) = runtime(service.clone());

    view(
        &bus,
        ViewRoomRequest {
            room_alias: Some(RoomAlias::from("#rust:hs")),
            ..ViewRoomRequest::room("!rust:hs").with_via([ServerName::from("hs")])
        },
    );
    let options = JoinOptions { reason: Some("hello".into()), invite_sign_url: None };
    dispatch(
        &bus,
        ViewAction::JoinRoom(JoinRoomRequest { options: options.clone(), metrics_trigger: None }),
    );
    runtime.run_until_idle().await;

    let calls = service.join_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].address, RoomAddress::Alias(RoomAlias::from("#rust:hs")));
    assert_eq!(calls[0].via_servers, vec![ServerName::from("hs")]);
    assert_eq!(calls[0].options, options);
}

#[tokio::test]
async fn join_result_reports_room_at_start() {
    let service = SimRoomService::default();
    service.fail_joins(&ServiceError::matrix(403, "M_FORBIDDEN", "nope"), 1);
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::room("!a:hs"));
    join(&bus);
    runtime.process_pending();

    // Navigate elsewhere before the join settles.
    view(&bus, ViewRoomRequest::room("!b:hs"));
    runtime.run_until_idle().await;

    assert_eq!(runtime.state().room_id, room("!b:hs"));
    assert_eq!(service.join_calls()[0].address, RoomAddress::Id(RoomId::from("!a:hs")));
    assert!(runtime.state().join_error.is_some());
}

#[tokio::test]
async fn not_found_on_invite_from_own_server() {
    let service = SimRoomService::new("home.org").with_invite("!a:hs", "@bob:home.org");
    service.fail_joins(&ServiceError::matrix(404, "M_NOT_FOUND", "No known servers"), 1);
    let (mut runtime, bus) = runtime(service);

    view(&bus, ViewRoomRequest::room("!a:hs"));
    join(&bus);
    runtime.run_until_idle().await;

    assert_eq!(
        join_failed_description(&runtime),
        Some(JoinFailureMessage::InviterLeft.to_string())
    );
}

#[tokio::test]
async fn not_found_on_invite_from_remote_server() {
    let service = SimRoomService::new("home.org").with_invite("!a:hs", "@carol:far.away");
    service.fail_joins(&ServiceError::matrix(404, "M_NOT_FOUND", "No known servers"), 1);
    let (mut runtime, bus) = runtime(service);

    view(&bus, ViewRoomRequest::room("!a:hs"));
    join(&bus);
    runtime.run_until_idle().await;

    assert_eq!(
        join_failed_description(&runtime),
        Some(JoinFailureMessage::InviterLeftOrServerOffline.to_string())
    );
}

#[tokio::test]
async fn connection_failure_shows_generic_message() {
    let service = SimRoomService::default();
    service.fail_joins(&ServiceError::connection("socket closed"), 1);
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::room("!a:hs"));
    join(&bus);
    runtime.run_until_idle().await;

    assert_eq!(service.join_calls().len(), 1);
    assert_eq!(
        join_failed_description(&runtime),
        Some(JoinFailureMessage::ErrorJoining.to_string())
    );
}

#[tokio::test]
async fn auto_join_follows_navigation() {
    let service = SimRoomService::default();
    let (mut runtime, bus) = runtime(service.clone());

    view(&bus, ViewRoomRequest::room("!a:hs").with_trigger("RoomDirectory").auto_join());
    runtime.run_until_idle().await;

    assert_eq!(service.join_calls().len(), 1);
    assert_eq!(service.join_calls()[0].address, RoomAddress::Id(RoomId::from("!a:hs")));
    assert!(!runtime.state().should_peek);
    assert_eq!(
        runtime.analytics().events(),
        &[
            AnalyticsEvent::ViewRoom {
                room_id: RoomId::from("!a:hs"),
                trigger: MetricsTrigger::new("RoomDirectory"),
                via_keyboard: false,
            },
            AnalyticsEvent::JoinedRoom {
                room_id: RoomId::from("!a:hs"),
                trigger: Some(MetricsTrigger::new("RoomDirectory")),
            },
        ]
    );
}

#[tokio::test]
async fn reply_in_other_room_switches_view() {
    let (mut runtime, bus) = runtime(SimRoomService::default());

    view(&bus, ViewRoomRequest::room("!a:hs"));
    dispatch(
        &bus,
        ViewAction::ReplyToEvent {
            event: Some(EventRef::new("$e:hs", "!b:hs")),
            context: RenderingContext::Search,
        },
    );
    runtime.process_pending();

    let state = runtime.state();
    assert_eq!(state.room_id, room("!b:hs"));
    assert_eq!(state.replying_to_event, Some(EventRef::new("$e:hs", "!b:hs")));
}

#[tokio::test]
async fn stale_alias_result_is_cached_but_not_shown() {
    let service = SimRoomService::default().with_alias("#slow:hs", "!slow:hs");
    let gate = service.hold_alias("#slow:hs");
    let (mut runtime, bus) = runtime(service);

    view(&bus, ViewRoomRequest::alias("#slow:hs"));
    runtime.process_pending();
    view(&bus, ViewRoomRequest::room("!fast:hs"));
    runtime.process_pending();
    assert_eq!(runtime.state().room_id, room("!fast:hs"));

    gate.release();
    runtime.run_until_idle().await;

    assert_eq!(runtime.state().room_id, room("!fast:hs"));
    assert_eq!(runtime.cache().get(&RoomAlias::from("#slow:hs")), room("!slow:hs"));
}

#[tokio::test]
async fn late_alias_result_wins_when_not_discarded() {
    let service = SimRoomService::default().with_alias("#slow:hs", "!slow:hs");
    let gate = service.hold_alias("#slow:hs");
    let config = CoordinatorConfig { discard_stale_alias_results: false, ..CoordinatorConfig::default() };
    let (mut runtime, bus) = runtime_with(service, MemoryAliasCache::new(), config);

    view(&bus, ViewRoomRequest::alias("#slow:hs"));
    runtime.process_pending();
    view(&bus, ViewRoomRequest::room("!fast:hs"));
    runtime.process_pending();

    gate.release();
    runtime.run_until_idle().await;

    assert_eq!(runtime.state().room_id, room("!slow:hs"));
}

#[tokio::test]
async fn logout_resets_view() {
    let (mut runtime, bus) = runtime(SimRoomService::default());

    view(&bus, ViewRoomRequest::room("!a:hs").with_event("$e:hs", false));
    dispatch(&bus, ViewAction::WillJoin);
    runtime.process_pending();
    let before = runtime.coordinator().revision();

    dispatch(&bus, ViewAction::LoggedOut);
    runtime.process_pending();

    assert_eq!(runtime.state(), &ViewState::initial());
    assert_eq!(runtime.coordinator().revision(), before + 1);
}

#[tokio::test]
async fn settings_dialog_for_viewed_room() {
    let (mut runtime, bus) = runtime(SimRoomService::default());

    view(&bus, ViewRoomRequest::room("!a:hs"));
    dispatch(
        &bus,
        ViewAction::OpenRoomSettings { room_id: None, initial_tab: Some("security".into()) },
    );
    runtime.process_pending();

    assert_eq!(
        runtime.presenter().dialogs(),
        &[Dialog::RoomSettings { room_id: room("!a:hs"), initial_tab: Some("security".into()) }]
    );
}

#[tokio::test]
async fn run_loop_serves_until_dispatchers_drop() {
    let service = SimRoomService::default().with_alias("#rust:hs", "!rust:hs");
    let (runtime, bus) = runtime(service);
    let mut updates = runtime.subscribe();
    let handle = tokio::spawn(runtime.run());

    view(&bus, ViewRoomRequest::alias("#rust:hs"));
    let shown = wait_for_state(&mut updates, Duration::from_secs(5), |s| s.room_id.is_some()).await;
    assert_eq!(shown.ok().and_then(|s| s.room_id), room("!rust:hs"));

    drop(bus);
    let finished = handle.await;
    assert!(matches!(finished, Ok(Ok(()))));
}

/// Alias cache the test can inspect while the runtime owns a clone.
#[derive(Clone, Default)]
struct SharedCache(Arc<Mutex<HashMap<RoomAlias, RoomId>>>);

impl SharedCache {
    fn contains(&self, alias: &str) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).contains_key(&RoomAlias::from(alias))
    }
}

impl AliasCache for SharedCache {
    fn get(&self, alias: &RoomAlias) -> Option<RoomId> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).get(alias).cloned()
    }

    fn put(&mut self, alias: RoomAlias, room_id: RoomId) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).insert(alias, room_id);
    }
}

#[tokio::test]
async fn run_loop_discards_superseded_alias_result() {
    for round in 0..50 {
        let service = SimRoomService::default().with_alias("#slow:hs", "!slow:hs");
        let gate = service.hold_alias("#slow:hs");
        let cache = SharedCache::default();
        let (runtime, bus) = Runtime::new(
            service,
            cache.clone(),
            RecordingPresenter::new(),
            RecordingAnalytics::new(),
            CoordinatorConfig::default(),
        );
        let mut updates = runtime.subscribe();
        let handle = tokio::spawn(runtime.run());

        view(&bus, ViewRoomRequest::alias("#slow:hs"));
        let loading = wait_for_updates(&mut updates, 1, Duration::from_secs(5)).await;
        assert!(loading.is_ok_and(|s| s.room_loading), "round {round}: alias not loading");

        // The lookup completes while the newer navigation is already queued.
        gate.release();
        view(&bus, ViewRoomRequest::room("!fast:hs"));

        for _ in 0..100 {
            if cache.contains("#slow:hs") {
                break;
            }
            flush().await;
        }
        assert!(cache.contains("#slow:hs"), "round {round}: lookup never settled");
        // Let the loop handle anything the completion enqueued.
        flush().await;

        assert_eq!(updates.borrow().room_id, room("!fast:hs"), "round {round}");

        drop(bus);
        assert!(matches!(handle.await, Ok(Ok(()))));
    }
}
