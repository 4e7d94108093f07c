// Core infrastructure modules
pub mod cache;              // LRU and expiring caches
pub mod comment_repository; // Comment and like queries
pub mod database;           // SQLite pool and schema
pub mod middleware;         // Viewer resolution and extractors
pub mod token;              // Bearer token issuing and verification
pub mod viewer;             // Viewer context

pub use cache::{Cache, ExpiringCache};
pub use comment_repository::DeletedComments;
pub use database::{current_time_millis, BlogDatabase};
pub use token::{Claims, TokenService};
pub use viewer::ViewerContext;
