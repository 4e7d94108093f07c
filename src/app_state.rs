use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    infrastructure::{
        database::BlogDatabase, middleware::HasTokenService, token::TokenService,
    },
    services::{CommentService, PresenceService},
};

#[derive(Clone)]
pub struct AppState {
    pub comments: CommentService,
    pub presence: PresenceService,
    pub tokens: Arc<TokenService>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database
        let database =
            BlogDatabase::connect(&config.database.url, config.database.max_connections).await?;
        database.init().await?;

        Ok(Self::with_database(Arc::new(database), config))
    }

    /// Wire services around an already initialized database.
    pub fn with_database(database: Arc<BlogDatabase>, config: Config) -> Self {
        let comments = CommentService::new(database, config.blog.clone());
        let presence = PresenceService::new(
            config.cache.online_capacity,
            Duration::from_secs(config.cache.online_ttl_secs),
        );
        let tokens = Arc::new(TokenService::new(&config.auth));

        Self {
            comments,
            presence,
            tokens,
            config,
        }
    }

    pub fn database(&self) -> &Arc<BlogDatabase> {
        self.comments.database()
    }
}

impl HasTokenService for AppState {
    fn token_service(&self) -> &Arc<TokenService> {
        &self.tokens
    }
}
