// Leaf Blog server - comment threads, guestbook and presence over HTTP

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leaf_blog::{
    app_state::AppState, blog_interface::build_app, config::Config,
    data_seeder::seed_demo_data,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing, RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    if config.blog.seed_demo_data {
        seed_demo_data(app_state.database(), &app_state.tokens).await?;
    }

    let app = build_app(app_state);

    // Start server
    let addr = config.server_address();
    info!("Leaf Blog server starting on http://{}", addr);
    info!("  GET    /api/v1/blog/articles/{{id}}/comments - Article comment tree");
    info!("  GET    /api/v1/blog/guestbook              - Guestbook tree");
    info!("  POST   /api/v1/blog/comments               - Create comment");
    info!("  GET    /api/v1/admin/comments              - Moderation listing");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
