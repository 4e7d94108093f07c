// CommentService - comment use cases above the repository and the tree builder

use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    config::BlogConfig,
    core::comment_tree::CommentTreeBuilder,
    error::{AppError, AppResult},
    infrastructure::database::{current_time_millis, BlogDatabase},
    models::{
        ArticleId, ArticleStatus, Comment, CommentFilter, CommentId, CommentPage, CommentStatus,
        CommentView, NewComment, Subject, UserId,
    },
};

/// What a viewer submits when writing a comment or guestbook message.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub subject: Subject,
    pub parent_id: Option<CommentId>,
    pub reply_to_user_id: Option<UserId>,
    pub content: String,
}

#[derive(Clone)]
pub struct CommentService {
    db: Arc<BlogDatabase>,
    tree: CommentTreeBuilder,
    config: BlogConfig,
}

impl CommentService {
    pub fn new(db: Arc<BlogDatabase>, config: BlogConfig) -> Self {
        let tree =
            CommentTreeBuilder::new(db.clone(), db.clone()).with_max_depth(config.max_reply_depth);
        Self { db, tree, config }
    }

    pub fn database(&self) -> &Arc<BlogDatabase> {
        &self.db
    }

    /// Clamp paging input: `page >= 1` and `1 <= limit <= max_page_size`.
    pub fn clamp_paging(&self, page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size.max(1));
        (page, limit)
    }

    #[instrument(skip(self))]
    pub async fn list_article_comments(
        &self,
        article_id: ArticleId,
        viewer: Option<UserId>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<CommentPage<CommentView>> {
        self.list_tree(Subject::Article(article_id), viewer, page, limit).await
    }

    #[instrument(skip(self))]
    pub async fn list_guestbook(
        &self,
        viewer: Option<UserId>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<CommentPage<CommentView>> {
        self.list_tree(Subject::Guestbook, viewer, page, limit).await
    }

    async fn list_tree(
        &self,
        subject: Subject,
        viewer: Option<UserId>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<CommentPage<CommentView>> {
        let (page, limit) = self.clamp_paging(page, limit);
        let tree = self.tree.build_tree(subject, viewer, page, limit).await?;

        Ok(CommentPage {
            list: tree.items,
            total: tree.total_top_level as u64,
            page,
            limit,
        })
    }

    #[instrument(skip(self, draft), fields(subject = ?draft.subject))]
    pub async fn create_comment(&self, author_id: UserId, draft: CommentDraft) -> AppResult<CommentView> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Comment content cannot be empty".to_string()));
        }
        if content.chars().count() > self.config.max_comment_length {
            return Err(AppError::Validation(format!(
                "Comment content exceeds {} characters",
                self.config.max_comment_length
            )));
        }

        if let Subject::Article(article_id) = draft.subject {
            self.require_published_article(article_id).await?;
        }

        let mut reply_to_user_id = draft.reply_to_user_id;
        if let Some(parent_id) = draft.parent_id {
            let parent = self.db.get_comment(parent_id).await?.ok_or_else(|| {
                AppError::Validation(format!("Parent comment {} does not exist", parent_id))
            })?;
            if parent.subject() != draft.subject {
                return Err(AppError::Validation(format!(
                    "Parent comment {} belongs to a different thread",
                    parent_id
                )));
            }
            // Replies under hidden comments are dropped as orphans when threading.
            if parent.status != CommentStatus::Approved {
                return Err(AppError::Validation(format!(
                    "Parent comment {} is not open for replies",
                    parent_id
                )));
            }
            let depth = self.db.comment_depth(parent_id, self.config.max_reply_depth).await?;
            if depth >= self.config.max_reply_depth {
                return Err(AppError::Validation(format!(
                    "Replies nest at most {} levels deep",
                    self.config.max_reply_depth
                )));
            }
            reply_to_user_id = reply_to_user_id.or(Some(parent.author_id));
        }

        if let Some(user_id) = reply_to_user_id {
            if self.db.get_user(user_id).await?.is_none() {
                return Err(AppError::Validation(format!("Reply target user {} does not exist", user_id)));
            }
        }

        let id = self
            .db
            .insert_comment(&NewComment {
                subject: draft.subject,
                author_id,
                parent_id: draft.parent_id,
                reply_to_user_id,
                content: content.to_string(),
                status: CommentStatus::Approved,
                created_at_millis: current_time_millis(),
            })
            .await?;

        if let Subject::Article(article_id) = draft.subject {
            self.db.refresh_comment_count(article_id).await?;
        }

        info!(comment_id = id, author_id, "Comment created");
        let comment = self.require_comment(id).await?;
        Ok(CommentView::from_comment(&comment, false))
    }

    #[instrument(skip(self))]
    pub async fn like_comment(&self, user_id: UserId, comment_id: CommentId) -> AppResult<()> {
        self.require_comment(comment_id).await?;
        if !self.db.add_comment_like(comment_id, user_id).await? {
            return Err(AppError::Conflict(format!("Comment {} is already liked", comment_id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unlike_comment(&self, user_id: UserId, comment_id: CommentId) -> AppResult<()> {
        self.require_comment(comment_id).await?;
        self.db.remove_comment_like(comment_id, user_id).await?;
        Ok(())
    }

    /// Authors may delete their own comments, and a comment's author may
    /// delete replies made directly to it.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, user_id: UserId, comment_id: CommentId) -> AppResult<()> {
        let comment = self.require_comment(comment_id).await?;

        let mut allowed = comment.author_id == user_id;
        if !allowed {
            if let Some(parent_id) = comment.parent_id {
                allowed = self
                    .db
                    .get_comment(parent_id)
                    .await?
                    .is_some_and(|parent| parent.author_id == user_id);
            }
        }
        if !allowed {
            return Err(AppError::Forbidden(format!(
                "Not allowed to delete comment {}",
                comment_id
            )));
        }

        self.remove_subtree(&comment).await
    }

    #[instrument(skip(self))]
    pub async fn admin_list(
        &self,
        filter: CommentFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<CommentPage<CommentView>> {
        let (page, limit) = self.clamp_paging(page, limit);
        let (comments, total) = self.db.list_comments(&filter, page, limit).await?;

        Ok(CommentPage {
            list: comments
                .iter()
                .map(|comment| CommentView::from_comment(comment, false))
                .collect(),
            total,
            page,
            limit,
        })
    }

    #[instrument(skip(self))]
    pub async fn update_status(&self, comment_id: CommentId, status: CommentStatus) -> AppResult<()> {
        let comment = self.require_comment(comment_id).await?;
        self.db.update_comment_status(comment_id, status).await?;
        if let Some(article_id) = comment.subject_id {
            self.db.refresh_comment_count(article_id).await?;
        }
        info!(comment_id, ?status, "Comment status updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn admin_delete(&self, comment_id: CommentId) -> AppResult<()> {
        let comment = self.require_comment(comment_id).await?;
        self.remove_subtree(&comment).await
    }

    async fn remove_subtree(&self, comment: &Comment) -> AppResult<()> {
        let deleted = self.db.delete_comment_tree(comment.id).await?;
        if let Some(article_id) = deleted.article_id {
            self.db.refresh_comment_count(article_id).await?;
        }
        info!(comment_id = comment.id, removed = deleted.removed, "Comment deleted");
        Ok(())
    }

    async fn require_comment(&self, comment_id: CommentId) -> AppResult<Comment> {
        self.db
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))
    }

    async fn require_published_article(&self, article_id: ArticleId) -> AppResult<()> {
        match self.db.get_article(article_id).await? {
            Some(article) if article.status == ArticleStatus::Published => Ok(()),
            _ => Err(AppError::NotFound(format!("Article {} not found", article_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        service: CommentService,
        alice: UserId,
        bob: UserId,
        article: ArticleId,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(BlogDatabase::new_in_memory().await.unwrap());
        let alice = db.create_user("alice", "Alice", "", "user").await.unwrap();
        let bob = db.create_user("bob", "Bob", "", "user").await.unwrap();
        let article = db
            .create_article("Hello", alice, ArticleStatus::Published)
            .await
            .unwrap();
        Fixture {
            service: CommentService::new(db, BlogConfig::default()),
            alice,
            bob,
            article,
        }
    }

    fn draft(subject: Subject, parent_id: Option<CommentId>, content: &str) -> CommentDraft {
        CommentDraft {
            subject,
            parent_id,
            reply_to_user_id: None,
            content: content.to_string(),
        }
    }

    async fn comment_count(f: &Fixture) -> i64 {
        f.service
            .database()
            .get_article(f.article)
            .await
            .unwrap()
            .unwrap()
            .comment_count
    }

    #[tokio::test]
    async fn test_clamp_paging() {
        let f = fixture().await;
        assert_eq!(f.service.clamp_paging(None, None), (1, 10));
        assert_eq!(f.service.clamp_paging(Some(0), Some(0)), (1, 1));
        assert_eq!(f.service.clamp_paging(Some(-3), Some(5_000)), (1, 100));
        assert_eq!(f.service.clamp_paging(Some(4), Some(20)), (4, 20));
    }

    #[tokio::test]
    async fn test_create_and_list_thread() {
        let f = fixture().await;
        let subject = Subject::Article(f.article);

        let root = f
            .service
            .create_comment(f.alice, draft(subject, None, "  first!  "))
            .await
            .unwrap();
        assert_eq!(root.content, "first!");
        assert_eq!(root.status, CommentStatus::Approved);

        let reply = f
            .service
            .create_comment(f.bob, draft(subject, Some(root.id), "welcome"))
            .await
            .unwrap();
        assert_eq!(reply.reply_to_user_id, Some(f.alice));
        assert_eq!(reply.reply_to_user.as_ref().unwrap().username, "alice");

        let page = f
            .service
            .list_article_comments(f.article, Some(f.bob), None, None)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.list[0].id, root.id);
        assert_eq!(page.list[0].replies[0].id, reply.id);
        assert_eq!(comment_count(&f).await, 2);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = fixture().await;
        let subject = Subject::Article(f.article);

        let blank = f.service.create_comment(f.alice, draft(subject, None, "   ")).await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let long = "x".repeat(1001);
        let too_long = f.service.create_comment(f.alice, draft(subject, None, &long)).await;
        assert!(matches!(too_long, Err(AppError::Validation(_))));

        let missing_parent = f
            .service
            .create_comment(f.alice, draft(subject, Some(999), "hi"))
            .await;
        assert!(matches!(missing_parent, Err(AppError::Validation(_))));

        let guest = f
            .service
            .create_comment(f.alice, draft(Subject::Guestbook, None, "guest note"))
            .await
            .unwrap();
        let cross_thread = f
            .service
            .create_comment(f.bob, draft(subject, Some(guest.id), "hi"))
            .await;
        assert!(matches!(cross_thread, Err(AppError::Validation(_))));

        let missing_article = f
            .service
            .create_comment(f.alice, draft(Subject::Article(f.article + 100), None, "hi"))
            .await;
        assert!(matches!(missing_article, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reply_depth_is_capped() {
        let f = fixture().await;
        let config = BlogConfig {
            max_reply_depth: 2,
            ..BlogConfig::default()
        };
        let service = CommentService::new(f.service.database().clone(), config);
        let subject = Subject::Article(f.article);

        let root = service.create_comment(f.alice, draft(subject, None, "root")).await.unwrap();
        let first = service
            .create_comment(f.bob, draft(subject, Some(root.id), "level one"))
            .await
            .unwrap();
        let second = service
            .create_comment(f.alice, draft(subject, Some(first.id), "level two"))
            .await
            .unwrap();

        let third = service
            .create_comment(f.bob, draft(subject, Some(second.id), "level three"))
            .await;
        assert!(matches!(third, Err(AppError::Validation(_))));

        // Siblings below the cap are still accepted.
        service
            .create_comment(f.bob, draft(subject, Some(first.id), "another level two"))
            .await
            .unwrap();
        assert_eq!(comment_count(&f).await, 4);
    }

    #[tokio::test]
    async fn test_reply_to_hidden_parent_rejected() {
        let f = fixture().await;
        let subject = Subject::Article(f.article);
        let root = f
            .service
            .create_comment(f.alice, draft(subject, None, "root"))
            .await
            .unwrap();
        f.service
            .update_status(root.id, CommentStatus::Rejected)
            .await
            .unwrap();

        let reply = f
            .service
            .create_comment(f.bob, draft(subject, Some(root.id), "anyone there?"))
            .await;
        assert!(matches!(reply, Err(AppError::Validation(_))));

        f.service
            .update_status(root.id, CommentStatus::Pending)
            .await
            .unwrap();
        let reply = f
            .service
            .create_comment(f.bob, draft(subject, Some(root.id), "still waiting"))
            .await;
        assert!(matches!(reply, Err(AppError::Validation(_))));
        assert_eq!(comment_count(&f).await, 0);
    }

    #[tokio::test]
    async fn test_draft_article_rejects_comments() {
        let f = fixture().await;
        let draft_article = f
            .service
            .database()
            .create_article("WIP", f.alice, ArticleStatus::Draft)
            .await
            .unwrap();

        let result = f
            .service
            .create_comment(f.bob, draft(Subject::Article(draft_article), None, "early"))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_like_and_unlike() {
        let f = fixture().await;
        let comment = f
            .service
            .create_comment(f.alice, draft(Subject::Guestbook, None, "hello"))
            .await
            .unwrap();

        f.service.like_comment(f.bob, comment.id).await.unwrap();
        let again = f.service.like_comment(f.bob, comment.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let page = f.service.list_guestbook(Some(f.bob), None, None).await.unwrap();
        assert!(page.list[0].is_liked);
        assert_eq!(page.list[0].like_count, 1);

        f.service.unlike_comment(f.bob, comment.id).await.unwrap();
        f.service.unlike_comment(f.bob, comment.id).await.unwrap();
        let page = f.service.list_guestbook(Some(f.bob), None, None).await.unwrap();
        assert!(!page.list[0].is_liked);
        assert_eq!(page.list[0].like_count, 0);

        let missing = f.service.like_comment(f.bob, 12345).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let f = fixture().await;
        let subject = Subject::Article(f.article);
        let carol = f
            .service
            .database()
            .create_user("carol", "Carol", "", "user")
            .await
            .unwrap();

        let root = f
            .service
            .create_comment(f.alice, draft(subject, None, "root"))
            .await
            .unwrap();
        let reply = f
            .service
            .create_comment(f.bob, draft(subject, Some(root.id), "reply"))
            .await
            .unwrap();

        let denied = f.service.delete_comment(carol, reply.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
        let denied = f.service.delete_comment(f.bob, root.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        // Parent author may remove a direct reply.
        f.service.delete_comment(f.alice, reply.id).await.unwrap();
        assert_eq!(comment_count(&f).await, 1);

        f.service.delete_comment(f.alice, root.id).await.unwrap();
        assert_eq!(comment_count(&f).await, 0);
        let gone = f.service.delete_comment(f.alice, root.id).await;
        assert!(matches!(gone, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_replies() {
        let f = fixture().await;
        let subject = Subject::Article(f.article);
        let root = f
            .service
            .create_comment(f.alice, draft(subject, None, "root"))
            .await
            .unwrap();
        let reply = f
            .service
            .create_comment(f.bob, draft(subject, Some(root.id), "reply"))
            .await
            .unwrap();
        f.service
            .create_comment(f.alice, draft(subject, Some(reply.id), "nested"))
            .await
            .unwrap();
        assert_eq!(comment_count(&f).await, 3);

        f.service.delete_comment(f.alice, root.id).await.unwrap();

        let page = f
            .service
            .list_article_comments(f.article, None, None, None)
            .await
            .unwrap();
        assert!(page.list.is_empty());
        assert_eq!(comment_count(&f).await, 0);
    }

    #[tokio::test]
    async fn test_moderation_hides_and_restores() {
        let f = fixture().await;
        let subject = Subject::Article(f.article);
        let comment = f
            .service
            .create_comment(f.bob, draft(subject, None, "spam?"))
            .await
            .unwrap();

        f.service
            .update_status(comment.id, CommentStatus::Rejected)
            .await
            .unwrap();
        let public = f
            .service
            .list_article_comments(f.article, None, None, None)
            .await
            .unwrap();
        assert_eq!(public.total, 0);
        assert_eq!(comment_count(&f).await, 0);

        let rejected = f
            .service
            .admin_list(
                CommentFilter {
                    article_id: Some(f.article),
                    status: Some(CommentStatus::Rejected),
                },
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(rejected.total, 1);
        assert_eq!(rejected.list[0].id, comment.id);

        f.service
            .update_status(comment.id, CommentStatus::Approved)
            .await
            .unwrap();
        assert_eq!(comment_count(&f).await, 1);

        f.service.admin_delete(comment.id).await.unwrap();
        let all = f
            .service
            .admin_list(CommentFilter::default(), None, None)
            .await
            .unwrap();
        assert_eq!(all.total, 0);
    }
}
