use chrono::Utc;
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{ArticleId, ArticleStatus, ArticleSummary, UserBrief, UserId};

/// SQLite-backed storage for users, articles, comments and comment likes.
///
/// Comment queries live in `comment_repository`.
pub struct BlogDatabase {
    pub pool: SqlitePool,
}

pub fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl BlogDatabase {
    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to {}: {}", database_url, e))
            })?;

        info!("Connected to database at {}", database_url);
        Ok(Self { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    ///
    /// The pool must never recycle its connection, since the data lives in it.
    pub async fn new_in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Create tables and indexes if they are missing.
    pub async fn init(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                nickname TEXT NOT NULL DEFAULT '',
                avatar TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'user',
                status INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author_id INTEGER NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER,
                user_id INTEGER NOT NULL,
                parent_id INTEGER,
                reply_to_user_id INTEGER,
                content TEXT NOT NULL,
                like_count INTEGER NOT NULL DEFAULT 0,
                status INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comment_likes (
                comment_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (comment_id, user_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_comments_article_status ON comments(article_id, status, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id)",
            "CREATE INDEX IF NOT EXISTS idx_comments_user ON comments(user_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }

        Ok(())
    }

    pub async fn create_user(
        &self,
        username: &str,
        nickname: &str,
        avatar: &str,
        role: &str,
    ) -> AppResult<UserId> {
        let result = sqlx::query(
            "INSERT INTO users (username, nickname, avatar, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(nickname)
        .bind(avatar)
        .bind(role)
        .bind(current_time_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create user {}: {}", username, e)))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_user(&self, id: UserId) -> AppResult<Option<UserBrief>> {
        let row = sqlx::query("SELECT id, username, nickname, avatar FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get user {}: {}", id, e)))?;

        row.map(|row| -> AppResult<UserBrief> {
            Ok(UserBrief {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                nickname: row.try_get("nickname")?,
                avatar: row.try_get("avatar")?,
            })
        })
        .transpose()
    }

    pub async fn count_users(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create_article(
        &self,
        title: &str,
        author_id: UserId,
        status: ArticleStatus,
    ) -> AppResult<ArticleId> {
        let result = sqlx::query(
            "INSERT INTO articles (title, author_id, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(title)
        .bind(author_id)
        .bind(status.as_i64())
        .bind(current_time_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create article: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_article(&self, id: ArticleId) -> AppResult<Option<ArticleSummary>> {
        let row = sqlx::query("SELECT id, title, status, comment_count FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get article {}: {}", id, e)))?;

        row.map(|row| article_from_row(&row)).transpose()
    }

    /// Recompute `comment_count` from the approved comments of an article.
    pub async fn refresh_comment_count(&self, id: ArticleId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE articles
            SET comment_count = (
                SELECT COUNT(*) FROM comments WHERE article_id = ? AND status = 1
            )
            WHERE id = ?
            "#,
        )
        .bind(id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to refresh comment count for {}: {}", id, e))
        })?;
        Ok(())
    }
}

fn article_from_row(row: &SqliteRow) -> AppResult<ArticleSummary> {
    let status_code: i64 = row.try_get("status")?;
    let status = ArticleStatus::from_i64(status_code).ok_or_else(|| {
        AppError::DatabaseError(format!("Unknown article status {}", status_code))
    })?;

    Ok(ArticleSummary {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        status,
        comment_count: row.try_get("comment_count")?,
    })
}
