//! User-facing explanation of join failures.

use std::fmt;

use crate::{
    error::{INCOMPATIBLE_ROOM_VERSION, NOT_FOUND, ServiceError},
    ids::RoomId,
    service::MembershipLookup,
};

/// Title of the join failure dialog.
pub const JOIN_FAILED_TITLE: &str = "Failed to join room";

/// Why a join failed, phrased for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinFailureMessage {
    /// The request never reached the homeserver.
    ErrorJoining,
    /// Our homeserver does not support the room version.
    HomeserverTooOld,
    /// The inviter is on our server and has left the room.
    InviterLeft,
    /// The inviter left the room or their server is unreachable.
    InviterLeftOrServerOffline,
    /// Anything else, shown as reported.
    Raw(String),
}

impl fmt::Display for JoinFailureMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ErrorJoining => f.write_str("There was an error joining the room"),
            Self::HomeserverTooOld => f.write_str(
                "Sorry, your homeserver is too old to participate in this room. Please contact \
                 your homeserver administrator.",
            ),
            Self::InviterLeft => f.write_str("The person who invited you already left the room."),
            Self::InviterLeftOrServerOffline => f.write_str(
                "The person who invited you already left the room, or their server is offline.",
            ),
            Self::Raw(message) => f.write_str(message),
        }
    }
}

/// Classify a terminal join failure.
///
/// A not-found failure on a room we were invited to usually means the inviter
/// left; the only lookup performed is for that invite.
pub fn classify_join_error(
    error: &ServiceError,
    room_id: Option<&RoomId>,
    membership: &impl MembershipLookup,
) -> JoinFailureMessage {
    if matches!(error, ServiceError::Connection { .. }) {
        return JoinFailureMessage::ErrorJoining;
    }
    if error.errcode() == Some(INCOMPATIBLE_ROOM_VERSION) {
        return JoinFailureMessage::HomeserverTooOld;
    }
    if error.http_status() == Some(NOT_FOUND)
        && let Some(inviter) = room_id.and_then(|room_id| membership.inviter_of(room_id))
    {
        return if inviter.is_on_server(&membership.own_server_name()) {
            JoinFailureMessage::InviterLeft
        } else {
            JoinFailureMessage::InviterLeftOrServerOffline
        };
    }
    JoinFailureMessage::Raw(error.raw_message())
}
