//! Scripted remote service.
//!
//! `SimRoomService` implements [`RoomService`] and [`MembershipLookup`] from
//! in-memory tables so runtime tests are deterministic. Every call is recorded
//! for later assertions. Clones share state, so a test can keep a handle while
//! the runtime owns another.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use roomview_app::{
    JoinOptions, MembershipLookup, RoomAddress, RoomAlias, RoomId, RoomService, ServerName,
    ServiceError, UserId,
};
use tokio::sync::Notify;

/// A recorded join call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCall {
    /// Address the join was sent to.
    pub address: RoomAddress,
    /// Routing hints sent with the join.
    pub via_servers: Vec<ServerName>,
    /// Options sent with the join.
    pub options: JoinOptions,
}

/// Holds an alias resolution until released.
#[derive(Debug, Clone)]
pub struct AliasGate(Arc<Notify>);

impl AliasGate {
    /// Let the held resolution finish.
    pub fn release(&self) {
        self.0.notify_one();
    }
}

#[derive(Default)]
struct SimState {
    aliases: HashMap<RoomAlias, RoomId>,
    alias_failures: HashMap<RoomAlias, ServiceError>,
    alias_gates: HashMap<RoomAlias, Arc<Notify>>,
    join_outcomes: VecDeque<ServiceError>,
    invites: HashMap<RoomId, UserId>,
    alias_calls: Vec<RoomAlias>,
    join_calls: Vec<JoinCall>,
}

/// Deterministic [`RoomService`] for tests.
#[derive(Clone)]
pub struct SimRoomService {
    state: Arc<Mutex<SimState>>,
    server_name: ServerName,
}

impl Default for SimRoomService {
    fn default() -> Self {
        Self::new("home.org")
    }
}

impl SimRoomService {
    /// Create a service for a user on `server_name`.
    pub fn new(server_name: impl Into<ServerName>) -> Self {
        Self { state: Arc::new(Mutex::new(SimState::default())), server_name: server_name.into() }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish an alias.
    #[must_use]
    pub fn with_alias(self, alias: impl Into<RoomAlias>, room_id: impl Into<RoomId>) -> Self {
        self.lock().aliases.insert(alias.into(), room_id.into());
        self
    }

    /// Make resolution of `alias` fail with `error`.
    #[must_use]
    pub fn with_alias_failure(self, alias: impl Into<RoomAlias>, error: ServiceError) -> Self {
        self.lock().alias_failures.insert(alias.into(), error);
        self
    }

    /// Record that `inviter` invited us to `room_id`.
    #[must_use]
    pub fn with_invite(self, room_id: impl Into<RoomId>, inviter: impl Into<UserId>) -> Self {
        self.lock().invites.insert(room_id.into(), inviter.into());
        self
    }

    /// Fail the next `times` join calls with `error`. Later calls succeed.
    pub fn fail_joins(&self, error: &ServiceError, times: usize) {
        let mut state = self.lock();
        state.join_outcomes.extend(std::iter::repeat_n(error.clone(), times));
    }

    /// Hold resolutions of `alias` until the returned gate is released.
    pub fn hold_alias(&self, alias: impl Into<RoomAlias>) -> AliasGate {
        let notify = Arc::new(Notify::new());
        self.lock().alias_gates.insert(alias.into(), Arc::clone(&notify));
        AliasGate(notify)
    }

    /// Aliases resolved so far, in call order.
    pub fn alias_calls(&self) -> Vec<RoomAlias> {
        self.lock().alias_calls.clone()
    }

    /// Join calls made so far, in call order.
    pub fn join_calls(&self) -> Vec<JoinCall> {
        self.lock().join_calls.clone()
    }
}

impl RoomService for SimRoomService {
    fn resolve_alias(
        &self,
        alias: &RoomAlias,
    ) -> impl Future<Output = Result<RoomId, ServiceError>> + Send {
        let alias = alias.clone();
        let service = self.clone();

        async move {
            let gate = {
                let mut state = service.lock();
                state.alias_calls.push(alias.clone());
                state.alias_gates.get(&alias).cloned()
            };
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let state = service.lock();
            if let Some(error) = state.alias_failures.get(&alias) {
                return Err(error.clone());
            }
            state
                .aliases
                .get(&alias)
                .cloned()
                .ok_or_else(|| ServiceError::matrix(404, "M_NOT_FOUND", "Room alias not found"))
        }
    }

    fn join_room(
        &self,
        address: &RoomAddress,
        via_servers: &[ServerName],
        options: &JoinOptions,
    ) -> impl Future<Output = Result<RoomId, ServiceError>> + Send {
        let call = JoinCall {
            address: address.clone(),
            via_servers: via_servers.to_vec(),
            options: options.clone(),
        };
        let service = self.clone();

        async move {
            let mut state = service.lock();
            let address = call.address.clone();
            state.join_calls.push(call);
            tracing::debug!(%address, "simulated join");

            if let Some(error) = state.join_outcomes.pop_front() {
                return Err(error);
            }
            match address {
                RoomAddress::Id(room_id) => Ok(room_id),
                RoomAddress::Alias(alias) => state
                    .aliases
                    .get(&alias)
                    .cloned()
                    .ok_or_else(|| ServiceError::matrix(404, "M_NOT_FOUND", "Unknown room")),
            }
        }
    }
}

impl MembershipLookup for SimRoomService {
    fn inviter_of(&self, room_id: &RoomId) -> Option<UserId> {
        self.lock().invites.get(room_id).cloned()
    }

    fn own_server_name(&self) -> ServerName {
        self.server_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_published_alias() {
        let service = SimRoomService::default().with_alias("#a:hs", "!a:hs");

        let resolved = service.resolve_alias(&RoomAlias::from("#a:hs")).await;
        assert_eq!(resolved, Ok(RoomId::from("!a:hs")));

        let missing = service.resolve_alias(&RoomAlias::from("#b:hs")).await;
        assert_eq!(missing.map_err(|e| e.http_status()), Err(Some(404)));
        assert_eq!(service.alias_calls().len(), 2);
    }

    #[tokio::test]
    async fn scripted_join_failures_run_out() {
        let service = SimRoomService::default();
        service.fail_joins(&ServiceError::http(504), 2);
        let address = RoomAddress::Id(RoomId::from("!a:hs"));

        assert!(service.join_room(&address, &[], &JoinOptions::default()).await.is_err());
        assert!(service.join_room(&address, &[], &JoinOptions::default()).await.is_err());
        assert_eq!(
            service.join_room(&address, &[], &JoinOptions::default()).await,
            Ok(RoomId::from("!a:hs"))
        );
        assert_eq!(service.join_calls().len(), 3);
    }
}
