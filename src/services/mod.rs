// Application services
pub mod comment_service;
pub mod presence_service;

pub use comment_service::{CommentDraft, CommentService};
pub use presence_service::{presence_key, PresenceService};
