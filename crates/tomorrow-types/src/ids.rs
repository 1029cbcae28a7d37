//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Participants, artifacts, and marker actors each get a distinct ID type
//! so they cannot be mixed up at compile time. Freshly generated IDs use
//! UUID v7 (time-ordered); IDs handed to us by the host are wrapped as-is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            /// Parse an identifier from its hyphenated string form.
            ///
            /// Returns `None` for anything that is not a valid UUID.
            pub fn parse(raw: &str) -> Option<Self> {
                Uuid::parse_str(raw).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Stable identity of a participant (player) in the host environment.
    ParticipantId
}

define_id! {
    /// Identifier of an issued tracking artifact, preserved across re-issuance.
    ArtifactId
}

define_id! {
    /// Opaque handle to a marker actor spawned in the host environment.
    ///
    /// Holding a `MarkerId` never implies the actor is alive; it must be
    /// resolved through the environment before use.
    MarkerId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let participant = ParticipantId::new();
        let marker = MarkerId::new();
        assert_ne!(participant.into_inner(), Uuid::nil());
        assert_ne!(marker.into_inner(), Uuid::nil());
    }

    #[test]
    fn parse_accepts_display_form() {
        let id = ParticipantId::new();
        assert_eq!(ParticipantId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(ParticipantId::parse("not-a-uuid"), None);
        assert_eq!(ArtifactId::parse(""), None);
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = ArtifactId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
