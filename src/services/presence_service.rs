// PresenceService - heartbeat-based online visitor counting

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::infrastructure::{cache::ExpiringCache, current_time_millis};
use crate::models::UserId;

/// Cache key for a visitor: signed-in viewers by id, guests by address.
pub fn presence_key(viewer: Option<UserId>, client_ip: &str) -> String {
    match viewer {
        Some(user_id) => format!("online:user:{}", user_id),
        None => format!("online:guest:{}", client_ip),
    }
}

#[derive(Clone)]
pub struct PresenceService {
    online: Arc<Mutex<ExpiringCache<String, i64>>>,
}

impl PresenceService {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            online: Arc::new(Mutex::new(ExpiringCache::new(capacity, ttl))),
        }
    }

    /// Mark the visitor online for another TTL window and return its key.
    pub async fn record_heartbeat(&self, viewer: Option<UserId>, client_ip: &str) -> String {
        let key = presence_key(viewer, client_ip);
        self.online.lock().await.insert(key.clone(), current_time_millis());
        debug!(key = %key, "Heartbeat recorded");
        key
    }

    pub async fn online_count(&self) -> usize {
        self.online.lock().await.live_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_key() {
        assert_eq!(presence_key(Some(3), "10.0.0.1"), "online:user:3");
        assert_eq!(presence_key(None, "10.0.0.1"), "online:guest:10.0.0.1");
    }

    #[tokio::test]
    async fn test_heartbeats_are_deduplicated() {
        let presence = PresenceService::new(100, Duration::from_secs(60));
        presence.record_heartbeat(Some(1), "10.0.0.1").await;
        presence.record_heartbeat(Some(1), "10.0.0.2").await;
        presence.record_heartbeat(None, "10.0.0.1").await;
        presence.record_heartbeat(None, "10.0.0.1").await;

        assert_eq!(presence.online_count().await, 2);
    }

    #[tokio::test]
    async fn test_visitors_expire() {
        let presence = PresenceService::new(100, Duration::from_millis(50));
        presence.record_heartbeat(None, "10.0.0.9").await;
        assert_eq!(presence.online_count().await, 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(presence.online_count().await, 0);
    }
}
