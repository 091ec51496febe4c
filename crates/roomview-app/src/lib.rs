//! Room view coordinator
//!
//! Tracks which room the chat screen is showing and drives the two remote
//! workflows behind it: resolving a room alias to a room ID, and joining a
//! room with bounded retry.
//!
//! # Architecture
//!
//! The coordinator is a Sans-IO state machine. It receives actions
//! ([`ViewAction`]) from a FIFO dispatch bus, updates a single [`ViewState`]
//! and returns effects ([`Effect`]) for the caller to execute. The generic
//! [`Runtime`] executes those effects against collaborator traits and feeds
//! the results back onto the bus as follow-up actions.
//!
//! # Components
//!
//! - [`RoomViewCoordinator`]: view state machine and read accessors
//! - [`Runtime`]: dispatch loop and remote call orchestration
//! - [`Dispatcher`]: cloneable handle onto the bus
//! - [`RoomService`], [`MembershipLookup`], [`AliasCache`],
//!   [`DialogPresenter`], [`AnalyticsSink`]: collaborator seams

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod classify;
mod config;
mod coordinator;
mod dispatcher;
mod effect;
mod error;
mod ids;
mod retry;
mod runtime;
mod service;
mod state;

pub use action::{
    Destination, EventRef, JoinOptions, JoinRoomRequest, MetricsTrigger, RenderingContext,
    ViewAction, ViewRoomRequest,
};
pub use classify::{JOIN_FAILED_TITLE, JoinFailureMessage, classify_join_error};
pub use config::CoordinatorConfig;
pub use coordinator::RoomViewCoordinator;
pub use dispatcher::{Dispatcher, Inbox};
pub use effect::{AliasLookup, AnalyticsEvent, Dialog, Effect, JoinAttempt, RoomAddress};
pub use error::{
    GATEWAY_TIMEOUT, INCOMPATIBLE_ROOM_VERSION, NOT_FOUND, RuntimeError, ServiceError,
};
pub use ids::{EventId, RoomAlias, RoomId, ServerName, UserId};
pub use retry::{DEFAULT_JOIN_ATTEMPTS, RetryPolicy, retry};
pub use runtime::Runtime;
pub use service::{
    AliasCache, AnalyticsSink, DialogPresenter, MembershipLookup, MemoryAliasCache, RoomService,
};
pub use state::{ViewState, ViewStateUpdate};
