//! Deterministic test harness for the room view coordinator.
//!
//! In-memory implementations of the collaborator traits so that runtime
//! tests are reproducible: a scripted remote service, and a dialog presenter
//! and analytics sink that record what they receive.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! view invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod recorder;
pub mod sim_service;
pub mod wait;

pub use invariants::{
    ChangeIsNotified, Invariant, InvariantRegistry, InvariantResult, LoadingHasNoRoom,
    ReplyMatchesRoom, ViewSnapshot, Violation,
};
pub use recorder::{RecordingAnalytics, RecordingPresenter};
pub use sim_service::{AliasGate, JoinCall, SimRoomService};
pub use wait::{WaitError, flush, wait_for_state, wait_for_updates};
