/// ID types for Weave entities
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new random ID
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Get the inner string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Owner (user) identifier, as issued by the content provider
    UserId
);

string_id!(
    /// Blend definition identifier
    BlendId
);

string_id!(
    /// Source pool identifier (a provider-side collection such as a playlist)
    PoolId
);

string_id!(
    /// Provider-side track identifier
    TrackId
);

string_id!(
    /// Sequence identifier
    SequenceId
);

string_id!(
    /// Playback session identifier
    SessionId
);

string_id!(
    /// Identifier of one session-scoped item copy
    SessionItemId
);
