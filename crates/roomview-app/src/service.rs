//! Collaborator traits.
//!
//! The runtime talks to the outside world only through these traits. Each
//! frontend supplies its own implementations; the harness crate provides
//! deterministic ones for simulation tests.

use std::{collections::HashMap, future::Future};

use crate::{
    action::JoinOptions,
    effect::{AnalyticsEvent, Dialog, RoomAddress},
    error::ServiceError,
    ids::{RoomAlias, RoomId, ServerName, UserId},
};

/// Remote messaging service.
///
/// Calls run on spawned tasks, so implementations are cloned into each task
/// and must be cheap to clone (typically an `Arc` around a client handle).
pub trait RoomService: Clone + Send + Sync + 'static {
    /// Resolve a room alias to a room ID.
    ///
    /// # Errors
    ///
    /// Returns the service failure if the alias is unknown or the request
    /// fails.
    fn resolve_alias(
        &self,
        alias: &RoomAlias,
    ) -> impl Future<Output = Result<RoomId, ServiceError>> + Send;

    /// Join a room by alias or ID.
    ///
    /// Returns the joined room's ID.
    ///
    /// # Errors
    ///
    /// Returns the service failure. Gateway timeouts are retried by the caller.
    fn join_room(
        &self,
        address: &RoomAddress,
        via_servers: &[ServerName],
        options: &JoinOptions,
    ) -> impl Future<Output = Result<RoomId, ServiceError>> + Send;
}

/// Local membership lookups used to explain join failures.
pub trait MembershipLookup {
    /// User who invited us to `room_id`, if our membership there is an invite.
    fn inviter_of(&self, room_id: &RoomId) -> Option<UserId>;

    /// Our own homeserver.
    fn own_server_name(&self) -> ServerName;
}

/// Alias to room ID navigation cache.
pub trait AliasCache {
    /// Cached room ID for `alias`.
    fn get(&self, alias: &RoomAlias) -> Option<RoomId>;

    /// Remember that `alias` points at `room_id`.
    fn put(&mut self, alias: RoomAlias, room_id: RoomId);
}

/// Dialog presentation service.
pub trait DialogPresenter {
    /// Show `dialog` to the user.
    fn show_dialog(&mut self, dialog: Dialog);
}

/// Analytics sink.
pub trait AnalyticsSink {
    /// Record an observation.
    fn track(&mut self, event: AnalyticsEvent);
}

/// Analytics disabled.
impl AnalyticsSink for () {
    fn track(&mut self, _event: AnalyticsEvent) {}
}

/// In-memory [`AliasCache`].
#[derive(Debug, Clone, Default)]
pub struct MemoryAliasCache {
    entries: HashMap<RoomAlias, RoomId>,
}

impl MemoryAliasCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached aliases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AliasCache for MemoryAliasCache {
    fn get(&self, alias: &RoomAlias) -> Option<RoomId> {
        self.entries.get(alias).cloned()
    }

    fn put(&mut self, alias: RoomAlias, room_id: RoomId) {
        self.entries.insert(alias, room_id);
    }
}
