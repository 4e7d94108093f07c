use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
    pub blog: BlogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Most visitors tracked for presence at once. Past this, the least
    /// recently seen visitor is evicted even if still live, so the online
    /// count never exceeds it.
    pub online_capacity: usize,
    /// Seconds a heartbeat keeps a visitor counted as online.
    pub online_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub expire_hours: u64,
    pub issuer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub max_comment_length: usize,
    /// Deepest reply level accepted; top-level comments are level 0.
    pub max_reply_depth: usize,
    pub seed_demo_data: bool,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            max_comment_length: 1000,
            max_reply_depth: 10,
            seed_demo_data: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|key| env::var(key).ok())?)
    }

    /// Builds the configuration from an arbitrary key lookup. Unparseable
    /// numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let blog_defaults = BlogConfig::default();

        let jwt_secret = var("JWT_SECRET", "leaf-blog-dev-secret");
        if jwt_secret.trim().is_empty() {
            return Err(AppError::ConfigurationError(
                "JWT_SECRET must not be empty".to_string(),
            ));
        }

        Ok(Self {
            database: DatabaseConfig {
                url: var("DATABASE_URL", "sqlite:data/leaf_blog.db?mode=rwc"),
                max_connections: var("DATABASE_MAX_CONNECTIONS", "5").parse().unwrap_or(5),
            },
            server: ServerConfig {
                host: var("SERVER_HOST", "0.0.0.0"),
                port: var("SERVER_PORT", "3000").parse().unwrap_or(3000),
            },
            cache: CacheConfig {
                online_capacity: var("ONLINE_CAPACITY", "100000").parse().unwrap_or(100_000),
                online_ttl_secs: var("ONLINE_TTL_SECS", "60").parse().unwrap_or(60),
            },
            auth: AuthConfig {
                jwt_secret,
                expire_hours: var("JWT_EXPIRE_HOURS", "24").parse().unwrap_or(24),
                issuer: var("JWT_ISSUER", "leaf-blog"),
            },
            log: LogConfig {
                level: var("LOG_LEVEL", "info"),
            },
            blog: BlogConfig {
                default_page_size: var("DEFAULT_PAGE_SIZE", "10")
                    .parse()
                    .unwrap_or(blog_defaults.default_page_size),
                max_page_size: var("MAX_PAGE_SIZE", "100")
                    .parse()
                    .unwrap_or(blog_defaults.max_page_size),
                max_comment_length: var("MAX_COMMENT_LENGTH", "1000")
                    .parse()
                    .unwrap_or(blog_defaults.max_comment_length),
                max_reply_depth: var("MAX_REPLY_DEPTH", "10")
                    .parse::<usize>()
                    .unwrap_or(blog_defaults.max_reply_depth)
                    .max(1),
                seed_demo_data: var("SEED_DEMO_DATA", "false") == "true",
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppResult<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cache.online_ttl_secs, 60);
        assert_eq!(config.cache.online_capacity, 100_000);
        assert_eq!(config.blog.max_reply_depth, 10);
        assert_eq!(config.blog.max_page_size, 100);
        assert!(!config.blog.seed_demo_data);
        assert_eq!(config.server_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("SERVER_PORT", "not-a-port"), ("MAX_PAGE_SIZE", "x")]).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.blog.max_page_size, 100);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            config_from(&[("JWT_SECRET", "  ")]),
            Err(AppError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_presence_and_depth_settings() {
        let config = config_from(&[("ONLINE_CAPACITY", "250"), ("MAX_REPLY_DEPTH", "0")]).unwrap();
        assert_eq!(config.cache.online_capacity, 250);
        assert_eq!(config.blog.max_reply_depth, 1);
    }
}
