// Demo data for local development

use tracing::info;

use crate::{
    error::AppResult,
    infrastructure::{
        database::{current_time_millis, BlogDatabase},
        token::TokenService,
        viewer::{ROLE_ADMIN, ROLE_USER},
    },
    models::{ArticleStatus, CommentId, CommentStatus, NewComment, Subject, UserId},
};

/// Seed two users, a published article and a small comment thread. Does
/// nothing when users already exist. Returns whether data was written.
pub async fn seed_demo_data(db: &BlogDatabase, tokens: &TokenService) -> AppResult<bool> {
    if db.count_users().await? > 0 {
        info!("Skipping demo data: users already exist");
        return Ok(false);
    }

    let admin = db.create_user("admin", "Administrator", "", ROLE_ADMIN).await?;
    let reader = db.create_user("reader", "Reader", "", ROLE_USER).await?;
    let article = db
        .create_article("Welcome to the blog", admin, ArticleStatus::Published)
        .await?;

    let now = current_time_millis();
    let comment = |subject: Subject,
                   author_id: UserId,
                   parent_id: Option<CommentId>,
                   reply_to_user_id: Option<UserId>,
                   content: &str,
                   offset: i64| NewComment {
        subject,
        author_id,
        parent_id,
        reply_to_user_id,
        content: content.to_string(),
        status: CommentStatus::Approved,
        created_at_millis: now + offset,
    };

    let subject = Subject::Article(article);
    let root = db
        .insert_comment(&comment(subject, reader, None, None, "Great first post!", 0))
        .await?;
    let reply = db
        .insert_comment(&comment(subject, admin, Some(root), Some(reader), "Thanks for reading.", 1))
        .await?;
    db.insert_comment(&comment(subject, reader, Some(reply), Some(admin), "Looking forward to more.", 2))
        .await?;
    db.insert_comment(&comment(Subject::Guestbook, reader, None, None, "Hello from the guestbook.", 3))
        .await?;
    db.refresh_comment_count(article).await?;

    info!(article_id = article, "Seeded demo data");
    info!("Demo admin token: {}", tokens.issue(admin, "admin", ROLE_ADMIN)?);
    info!("Demo reader token: {}", tokens.issue(reader, "reader", ROLE_USER)?);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let db = BlogDatabase::new_in_memory().await.unwrap();
        let tokens = TokenService::new(&AuthConfig {
            jwt_secret: "seed".to_string(),
            expire_hours: 1,
            issuer: "leaf-blog".to_string(),
        });

        assert!(seed_demo_data(&db, &tokens).await.unwrap());
        assert!(!seed_demo_data(&db, &tokens).await.unwrap());
        assert_eq!(db.count_users().await.unwrap(), 2);

        let article = db.get_article(1).await.unwrap().unwrap();
        assert_eq!(article.comment_count, 3);
        assert_eq!(db.approved_comments(Subject::Guestbook).await.unwrap().len(), 1);
    }
}
