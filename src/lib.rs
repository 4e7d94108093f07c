// Leaf Blog - threaded comments, guestbook and presence for a blog backend

// Core types and the comment tree assembly
pub mod core;
pub mod models;

// Infrastructure - database, caching, tokens and request viewer
pub mod infrastructure;

// Use cases and HTTP surface
pub mod app_state;
pub mod blog_interface;
pub mod services;

// Common utilities
pub mod config;
pub mod data_seeder;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
