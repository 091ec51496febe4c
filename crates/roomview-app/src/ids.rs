//! Identifier newtypes.
//!
//! Rooms, aliases, events, users and servers are all addressed by opaque
//! strings on the wire. Wrapping each in its own type keeps a room alias from
//! being passed where a room ID is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Room identifier, e.g. `!abc123:example.org`.
    RoomId
);

string_id!(
    /// Human-readable room alias, e.g. `#rust:example.org`.
    RoomAlias
);

string_id!(
    /// Event identifier, e.g. `$evt42:example.org`.
    EventId
);

string_id!(
    /// User identifier, e.g. `@alice:example.org`.
    UserId
);

string_id!(
    /// Server name used as a routing hint, e.g. `example.org`.
    ServerName
);

impl UserId {
    /// Server part of the user ID (everything after the first `:`).
    ///
    /// `None` for malformed IDs without a server part.
    pub fn server_name(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, server)| server).filter(|server| !server.is_empty())
    }

    /// Whether this user is registered on `server`.
    pub fn is_on_server(&self, server: &ServerName) -> bool {
        self.server_name() == Some(server.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_server_name() {
        assert_eq!(UserId::from("@alice:example.org").server_name(), Some("example.org"));
        assert_eq!(UserId::from("@bob:host:8448").server_name(), Some("host:8448"));
        assert_eq!(UserId::from("@nobody").server_name(), None);
        assert_eq!(UserId::from("@nobody:").server_name(), None);
    }

    #[test]
    fn same_server_check() {
        let user = UserId::from("@alice:example.org");
        assert!(user.is_on_server(&ServerName::from("example.org")));
        assert!(!user.is_on_server(&ServerName::from("other.org")));
    }
}
