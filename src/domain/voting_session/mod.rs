//! Voting session module - batches of discussions advanced through phases.

mod aggregate;
mod events;
mod status;

pub use aggregate::{
    end_member, start_member, MembershipDelta, SessionSchedule, VotingSession,
    VotingSessionChanges, MAX_SESSION_NAME_LENGTH,
};
pub use events::VotingSessionPhaseChanged;
pub use status::VotingSessionStatus;
