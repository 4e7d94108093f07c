use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{ArticleId, CommentId, UserBrief, UserId};

/// What a comment hangs off: an article, or the guestbook when it has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Article(ArticleId),
    Guestbook,
}

impl Subject {
    pub fn from_article_id(article_id: Option<ArticleId>) -> Self {
        match article_id {
            Some(id) => Subject::Article(id),
            None => Subject::Guestbook,
        }
    }

    /// Value stored in `comments.article_id`; `None` for the guestbook.
    pub fn article_id(&self) -> Option<ArticleId> {
        match self {
            Subject::Article(id) => Some(*id),
            Subject::Guestbook => None,
        }
    }
}

/// Moderation state. Stored as 0/1/2 in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_i64(&self) -> i64 {
        match self {
            CommentStatus::Pending => 0,
            CommentStatus::Approved => 1,
            CommentStatus::Rejected => 2,
        }
    }

    pub fn from_i64(value: i64) -> AppResult<Self> {
        match value {
            0 => Ok(CommentStatus::Pending),
            1 => Ok(CommentStatus::Approved),
            2 => Ok(CommentStatus::Rejected),
            other => Err(AppError::DatabaseError(format!(
                "Unknown comment status {}",
                other
            ))),
        }
    }
}

/// A stored comment as returned by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub subject_id: Option<ArticleId>,
    pub author_id: UserId,
    pub parent_id: Option<CommentId>,
    pub reply_to_user_id: Option<UserId>,
    pub content: String,
    pub like_count: i64,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub author: Option<UserBrief>,
    pub reply_to_user: Option<UserBrief>,
}

impl Comment {
    pub fn subject(&self) -> Subject {
        Subject::from_article_id(self.subject_id)
    }
}

/// Insert payload for the repository.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub subject: Subject,
    pub author_id: UserId,
    pub parent_id: Option<CommentId>,
    pub reply_to_user_id: Option<UserId>,
    pub content: String,
    pub status: CommentStatus,
    pub created_at_millis: i64,
}

/// Display shape of a comment, with its replies nested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub article_id: Option<ArticleId>,
    pub user_id: UserId,
    pub parent_id: Option<CommentId>,
    pub reply_to_user_id: Option<UserId>,
    pub content: String,
    pub like_count: i64,
    pub is_liked: bool,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_user: Option<UserBrief>,
    pub replies: Vec<CommentView>,
}

impl CommentView {
    pub fn from_comment(comment: &Comment, is_liked: bool) -> Self {
        Self {
            id: comment.id,
            article_id: comment.subject_id,
            user_id: comment.author_id,
            parent_id: comment.parent_id,
            reply_to_user_id: comment.reply_to_user_id,
            content: comment.content.clone(),
            like_count: comment.like_count,
            is_liked,
            status: comment.status,
            created_at: comment.created_at,
            user: comment.author.clone(),
            reply_to_user: comment.reply_to_user.clone(),
            replies: Vec::new(),
        }
    }
}

/// One page of comments plus the count the page was cut from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentPage<T> {
    pub list: Vec<T>,
    pub total: u64,
    pub page: i64,
    pub limit: i64,
}

/// Filters for the moderation listing.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub article_id: Option<ArticleId>,
    pub status: Option<CommentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_storage_code() {
        for status in [CommentStatus::Pending, CommentStatus::Approved, CommentStatus::Rejected] {
            assert_eq!(CommentStatus::from_i64(status.as_i64()).unwrap(), status);
        }
        assert!(CommentStatus::from_i64(7).is_err());
    }

    #[test]
    fn test_subject_mapping() {
        assert_eq!(Subject::from_article_id(None), Subject::Guestbook);
        assert_eq!(Subject::from_article_id(Some(4)).article_id(), Some(4));
        assert_eq!(Subject::Guestbook.article_id(), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CommentStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }
}
