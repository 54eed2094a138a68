//! Discussion module - proposals raised in a party and their lifecycle.

mod aggregate;
mod events;
mod status;

pub use aggregate::{
    Attachment, Discussion, DiscussionChanges, MAX_CONTENT_LENGTH, MAX_FILE_URL_LENGTH,
    MAX_SUBJECT_LENGTH,
};
pub use events::{DiscussionResolved, DiscussionStatusChanged, DISCUSSION_RESOLVED};
pub use status::DiscussionStatus;
