// Blog domain types shared by the repository, services and HTTP layer

pub mod comment;

use serde::{Deserialize, Serialize};

pub use comment::{
    Comment, CommentFilter, CommentPage, CommentStatus, CommentView, NewComment, Subject,
};

pub type UserId = i64;
pub type ArticleId = i64;
pub type CommentId = i64;

/// Public profile fields attached to comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBrief {
    pub id: UserId,
    pub username: String,
    pub nickname: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
    Offline,
}

impl ArticleStatus {
    pub fn as_i64(&self) -> i64 {
        match self {
            ArticleStatus::Draft => 0,
            ArticleStatus::Published => 1,
            ArticleStatus::Offline => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(ArticleStatus::Draft),
            1 => Some(ArticleStatus::Published),
            2 => Some(ArticleStatus::Offline),
            _ => None,
        }
    }
}

/// The slice of an article the comment workflows care about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSummary {
    pub id: ArticleId,
    pub title: String,
    pub status: ArticleStatus,
    pub comment_count: i64,
}
