// ViewerContext middleware
// Resolves the bearer token once per request and injects the viewer into request extensions

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::infrastructure::{token::TokenService, viewer::ViewerContext};

/// Application state that can verify bearer tokens
pub trait HasTokenService {
    fn token_service(&self) -> &Arc<TokenService>;
}

/// Every request gets a viewer. A missing or invalid token yields an
/// anonymous one; routes that need a user reject it later.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Response
where
    T: HasTokenService + Clone + Send + Sync + 'static,
{
    let viewer_context = create_viewer_context(request.headers(), app_state.token_service());
    request.extensions_mut().insert(viewer_context);
    next.run(request).await
}

/// The token part of an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub fn create_viewer_context(headers: &HeaderMap, tokens: &TokenService) -> Arc<ViewerContext> {
    let request_id = format!("req-{}", Uuid::new_v4());

    let Some(token) = extract_bearer_token(headers) else {
        return Arc::new(ViewerContext::anonymous(request_id));
    };

    let viewer = match tokens.verify(token).and_then(|claims| {
        let user_id = claims.user_id()?;
        Ok((user_id, claims))
    }) {
        Ok((user_id, claims)) => {
            ViewerContext::authenticated(user_id, claims.username, claims.role, request_id)
        }
        Err(e) => {
            debug!(request_id = %request_id, "Treating request as anonymous: {}", e);
            ViewerContext::anonymous(request_id)
        }
    };

    Arc::new(viewer)
}
