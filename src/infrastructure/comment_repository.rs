// Comment and comment-like queries on BlogDatabase

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::Sqlite, sqlite::SqliteRow, QueryBuilder, Row};

use crate::core::comment_tree::{CommentStore, LikeOracle};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{current_time_millis, BlogDatabase};
use crate::models::{
    ArticleId, Comment, CommentFilter, CommentId, CommentStatus, NewComment, Subject, UserBrief,
    UserId,
};

const COMMENT_COLUMNS: &str = r#"
    SELECT c.id, c.article_id, c.user_id, c.parent_id, c.reply_to_user_id, c.content,
           c.like_count, c.status, c.created_at,
           u.username AS author_username, u.nickname AS author_nickname, u.avatar AS author_avatar,
           r.username AS reply_username, r.nickname AS reply_nickname, r.avatar AS reply_avatar
    FROM comments c
    LEFT JOIN users u ON u.id = c.user_id
    LEFT JOIN users r ON r.id = c.reply_to_user_id
"#;

/// Outcome of removing a comment subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedComments {
    /// Comments removed, the root included.
    pub removed: u64,
    pub article_id: Option<ArticleId>,
}

impl BlogDatabase {
    pub async fn insert_comment(&self, comment: &NewComment) -> AppResult<CommentId> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (article_id, user_id, parent_id, reply_to_user_id, content, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.subject.article_id())
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(comment.reply_to_user_id)
        .bind(&comment.content)
        .bind(comment.status.as_i64())
        .bind(comment.created_at_millis)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert comment: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_comment(&self, id: CommentId) -> AppResult<Option<Comment>> {
        let sql = format!("{} WHERE c.id = ?", COMMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comment {}: {}", id, e)))?;

        row.map(|row| comment_from_row(&row)).transpose()
    }

    /// All approved comments of a subject, newest first. The guestbook is
    /// matched through `article_id IS NULL`.
    pub async fn approved_comments(&self, subject: Subject) -> AppResult<Vec<Comment>> {
        let sql = format!(
            "{} WHERE c.status = ? AND c.article_id IS ? ORDER BY c.created_at DESC, c.id DESC",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(CommentStatus::Approved.as_i64())
            .bind(subject.article_id())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to fetch comments: {}", e)))?;

        rows.iter().map(comment_from_row).collect()
    }

    /// Flat moderation listing, newest first, with the unpaged total.
    pub async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: i64,
        limit: i64,
    ) -> AppResult<(Vec<Comment>, u64)> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM comments c WHERE 1 = 1");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count comments: {}", e)))?;

        let mut qb = QueryBuilder::<Sqlite>::new(COMMENT_COLUMNS);
        qb.push(" WHERE 1 = 1");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind((page - 1).saturating_mul(limit).max(0));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list comments: {}", e)))?;

        let comments = rows.iter().map(comment_from_row).collect::<AppResult<Vec<_>>>()?;
        Ok((comments, total.max(0) as u64))
    }

    pub async fn update_comment_status(&self, id: CommentId, status: CommentStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE comments SET status = ? WHERE id = ?")
            .bind(status.as_i64())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to update status of comment {}: {}", id, e))
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// How many levels `id` sits below its top-level comment, counting at
    /// most `limit` ancestors. Missing comments report level 0.
    pub async fn comment_depth(&self, id: CommentId, limit: usize) -> AppResult<usize> {
        let depth: Option<i64> = sqlx::query_scalar(
            r#"
            WITH RECURSIVE ancestors(id, parent_id, depth) AS (
                SELECT id, parent_id, 0 FROM comments WHERE id = ?
                UNION ALL
                SELECT c.id, c.parent_id, a.depth + 1
                FROM comments c JOIN ancestors a ON c.id = a.parent_id
                WHERE a.depth < ?
            )
            SELECT MAX(depth) FROM ancestors
            "#,
        )
        .bind(id)
        .bind(limit as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to measure depth of comment {}: {}", id, e)))?;

        Ok(depth.unwrap_or(0).max(0) as usize)
    }

    /// Delete a comment together with every reply beneath it, and their likes.
    pub async fn delete_comment_tree(&self, id: CommentId) -> AppResult<DeletedComments> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let article_id: Option<Option<ArticleId>> =
            sqlx::query_scalar("SELECT article_id FROM comments WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(article_id) = article_id else {
            return Ok(DeletedComments {
                removed: 0,
                article_id: None,
            });
        };

        // UNION (not UNION ALL) so malformed parent cycles terminate.
        let mut removed = 0;
        for (table, column) in [("comment_likes", "comment_id"), ("comments", "id")] {
            let sql = format!(
                r#"
                WITH RECURSIVE subtree(id) AS (
                    SELECT ?
                    UNION
                    SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id
                )
                DELETE FROM {} WHERE {} IN (SELECT id FROM subtree)
                "#,
                table, column
            );
            removed = sqlx::query(&sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to delete from {}: {}", table, e)))?
                .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit delete: {}", e)))?;

        Ok(DeletedComments { removed, article_id })
    }

    pub async fn comment_like_exists(&self, comment_id: CommentId, user_id: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM comment_likes WHERE comment_id = ? AND user_id = ?")
            .bind(comment_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Record a like and bump `like_count` atomically. Returns `false` if the
    /// viewer had already liked the comment.
    pub async fn add_comment_like(&self, comment_id: CommentId, user_id: UserId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO comment_likes (comment_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(current_time_millis())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE comments SET like_count = like_count + 1 WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Remove a like and decrement `like_count`, never below zero. Returns
    /// `false` when there was nothing to remove.
    pub async fn remove_comment_like(&self, comment_id: CommentId, user_id: UserId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE comments SET like_count = MAX(like_count - 1, 0) WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl CommentStore for BlogDatabase {
    async fn fetch_approved(&self, subject: Subject) -> AppResult<Vec<Comment>> {
        self.approved_comments(subject).await
    }
}

#[async_trait]
impl LikeOracle for BlogDatabase {
    async fn has_liked(&self, comment_id: CommentId, viewer: UserId) -> AppResult<bool> {
        self.comment_like_exists(comment_id, viewer).await
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CommentFilter) {
    if let Some(article_id) = filter.article_id {
        qb.push(" AND c.article_id = ");
        qb.push_bind(article_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND c.status = ");
        qb.push_bind(status.as_i64());
    }
}

fn user_brief(
    row: &SqliteRow,
    id: Option<UserId>,
    prefix: &str,
) -> Result<Option<UserBrief>, sqlx::Error> {
    let username: Option<String> = row.try_get(format!("{}_username", prefix).as_str())?;
    match (id, username) {
        (Some(id), Some(username)) => Ok(Some(UserBrief {
            id,
            username,
            nickname: row
                .try_get::<Option<String>, _>(format!("{}_nickname", prefix).as_str())?
                .unwrap_or_default(),
            avatar: row
                .try_get::<Option<String>, _>(format!("{}_avatar", prefix).as_str())?
                .unwrap_or_default(),
        })),
        _ => Ok(None),
    }
}

fn comment_from_row(row: &SqliteRow) -> AppResult<Comment> {
    let author_id: UserId = row.try_get("user_id")?;
    let reply_to_user_id: Option<UserId> = row.try_get("reply_to_user_id")?;
    let created_millis: i64 = row.try_get("created_at")?;

    Ok(Comment {
        id: row.try_get("id")?,
        subject_id: row.try_get("article_id")?,
        author_id,
        parent_id: row.try_get("parent_id")?,
        reply_to_user_id,
        content: row.try_get("content")?,
        like_count: row.try_get("like_count")?,
        status: CommentStatus::from_i64(row.try_get("status")?)?,
        created_at: DateTime::<Utc>::from_timestamp_millis(created_millis).unwrap_or_default(),
        author: user_brief(row, Some(author_id), "author")?,
        reply_to_user: user_brief(row, reply_to_user_id, "reply")?,
    })
}
