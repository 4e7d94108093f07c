// ViewerContext extractor for handlers

use crate::infrastructure::viewer::ViewerContext;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::sync::Arc;

/// Handler-side view of the request's `ViewerContext`. Cloning only clones
/// the `Arc`.
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Fails only when the viewer middleware was not layered on the route.
impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR);

        async move { vc }
    }
}
