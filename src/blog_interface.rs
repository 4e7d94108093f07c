// Blog HTTP interface - public comment, guestbook and presence routes plus comment moderation

use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    app_state::AppState,
    error::AppResult,
    infrastructure::middleware::{viewer_context_middleware, ClientIp, Vc},
    models::{ArticleId, CommentFilter, CommentId, CommentPage, CommentStatus, CommentView, Subject, UserId},
    services::CommentDraft,
};

/// Envelope for every successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

fn success<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        message: "success".to_string(),
        data,
    })
}

type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminCommentQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub article_id: Option<ArticleId>,
    pub status: Option<CommentStatus>,
}

/// A comment on an article, or a guestbook message when `article_id` is absent.
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub article_id: Option<ArticleId>,
    pub parent_id: Option<CommentId>,
    pub reply_to_user_id: Option<UserId>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGuestbookRequest {
    pub parent_id: Option<CommentId>,
    pub reply_to_user_id: Option<UserId>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CommentStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OnlineResponse {
    pub count: usize,
}

// Public handlers

pub async fn list_article_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(article_id): Path<ArticleId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<CommentPage<CommentView>> {
    let page = state
        .comments
        .list_article_comments(article_id, vc.user_id, query.page, query.limit)
        .await?;
    Ok(success(page))
}

pub async fn list_guestbook_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(query): Query<PageQuery>,
) -> ApiResult<CommentPage<CommentView>> {
    let page = state
        .comments
        .list_guestbook(vc.user_id, query.page, query.limit)
        .await?;
    Ok(success(page))
}

pub async fn create_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<CommentView> {
    let user_id = vc.require_user()?;
    let draft = CommentDraft {
        subject: Subject::from_article_id(req.article_id),
        parent_id: req.parent_id,
        reply_to_user_id: req.reply_to_user_id,
        content: req.content,
    };
    let comment = state.comments.create_comment(user_id, draft).await?;
    Ok(success(comment))
}

pub async fn create_guestbook_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CreateGuestbookRequest>,
) -> ApiResult<CommentView> {
    let user_id = vc.require_user()?;
    let draft = CommentDraft {
        subject: Subject::Guestbook,
        parent_id: req.parent_id,
        reply_to_user_id: req.reply_to_user_id,
        content: req.content,
    };
    let comment = state.comments.create_comment(user_id, draft).await?;
    Ok(success(comment))
}

pub async fn like_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(comment_id): Path<CommentId>,
) -> ApiResult<()> {
    let user_id = vc.require_user()?;
    state.comments.like_comment(user_id, comment_id).await?;
    Ok(success(()))
}

pub async fn unlike_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(comment_id): Path<CommentId>,
) -> ApiResult<()> {
    let user_id = vc.require_user()?;
    state.comments.unlike_comment(user_id, comment_id).await?;
    Ok(success(()))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(comment_id): Path<CommentId>,
) -> ApiResult<()> {
    let user_id = vc.require_user()?;
    state.comments.delete_comment(user_id, comment_id).await?;
    Ok(success(()))
}

pub async fn heartbeat_handler(
    State(state): State<AppState>,
    vc: Vc,
    ClientIp(client_ip): ClientIp,
) -> ApiResult<StatusResponse> {
    state.presence.record_heartbeat(vc.user_id, &client_ip).await;
    Ok(success(StatusResponse { status: "ok" }))
}

pub async fn online_count_handler(State(state): State<AppState>) -> ApiResult<OnlineResponse> {
    let count = state.presence.online_count().await;
    Ok(success(OnlineResponse { count }))
}

pub async fn health_handler() -> ApiResult<StatusResponse> {
    Ok(success(StatusResponse { status: "ok" }))
}

// Admin handlers

pub async fn admin_list_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(query): Query<AdminCommentQuery>,
) -> ApiResult<CommentPage<CommentView>> {
    vc.require_admin()?;
    let filter = CommentFilter {
        article_id: query.article_id,
        status: query.status,
    };
    let page = state
        .comments
        .admin_list(filter, query.page, query.limit)
        .await?;
    Ok(success(page))
}

pub async fn admin_update_status_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(comment_id): Path<CommentId>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<()> {
    vc.require_admin()?;
    state.comments.update_status(comment_id, req.status).await?;
    Ok(success(()))
}

pub async fn admin_delete_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(comment_id): Path<CommentId>,
) -> ApiResult<()> {
    vc.require_admin()?;
    state.comments.admin_delete(comment_id).await?;
    Ok(success(()))
}

pub fn create_blog_router() -> Router<AppState> {
    Router::new()
        .route("/articles/{id}/comments", get(list_article_comments_handler))
        .route(
            "/guestbook",
            get(list_guestbook_handler).post(create_guestbook_handler),
        )
        .route("/comments", post(create_comment_handler))
        .route(
            "/comments/{id}/like",
            post(like_comment_handler).delete(unlike_comment_handler),
        )
        .route("/comments/{id}", delete(delete_comment_handler))
        .route("/heartbeat", post(heartbeat_handler))
        .route("/online", get(online_count_handler))
}

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(admin_list_comments_handler))
        .route("/comments/{id}/status", patch(admin_update_status_handler))
        .route("/comments/{id}", delete(admin_delete_comment_handler))
}

/// Full application router with viewer resolution, request tracing and CORS.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/blog", create_blog_router())
        .nest("/api/v1/admin", create_admin_router())
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
