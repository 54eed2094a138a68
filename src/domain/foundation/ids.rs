//! Strongly-typed identifier value objects.
//!
//! Every aggregate and collaborator in the governance domain is keyed by a
//! UUID. Wrapping each one in its own newtype keeps a `PartyId` from being
//! passed where a `DiscussionId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a discussion under deliberation.
    DiscussionId
);

uuid_id!(
    /// Unique identifier for a voting session (a batch of discussions).
    VotingSessionId
);

uuid_id!(
    /// Unique identifier for a pending organizational action.
    PendingActionId
);

uuid_id!(
    /// Identifier of a party, the membership unit discussions belong to.
    PartyId
);

uuid_id!(
    /// Identifier of a company (organization) owning parties.
    CompanyId
);

uuid_id!(
    /// Identifier of a user (member, voter, manager).
    UserId
);
