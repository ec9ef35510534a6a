use chrono::Utc;
use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

/// Counter key for the window containing `now`. A new window gets a new key,
/// so traffic inside one window never extends another.
pub fn window_key(key: &str, now: i64, window_seconds: i64) -> String {
    format!("{}:{}", key, now.div_euclid(window_seconds.max(1)))
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Returns false once `limit` requests have been
    /// seen for `key` inside the current window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let bucket = window_key(key, Utc::now().timestamp(), window_seconds);

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(&bucket, 1)
            .expire(&bucket, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_key_changes_at_window_boundary() {
        assert_eq!(window_key("ratelimit:1.2.3.4", 120, 60), "ratelimit:1.2.3.4:2");
        assert_eq!(window_key("ratelimit:1.2.3.4", 179, 60), "ratelimit:1.2.3.4:2");
        assert_eq!(window_key("ratelimit:1.2.3.4", 180, 60), "ratelimit:1.2.3.4:3");
    }

    #[test]
    fn test_steady_traffic_rolls_over_to_fresh_windows() {
        // Two requests a minute for an hour touch 60 distinct counters
        let keys: std::collections::HashSet<String> = (0..120)
            .map(|i| window_key("ratelimit:ip", 1_700_000_000 + i * 30, 60))
            .collect();
        assert!(keys.len() >= 60);
    }
}
