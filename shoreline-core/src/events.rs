use async_trait::async_trait;

/// Outbound sink for domain events. Delivery is best effort: callers log
/// failures and carry on, the reservation state is the source of truth.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Serialize and publish, logging instead of failing.
pub async fn publish_json<T: serde::Serialize>(
    publisher: &dyn EventPublisher,
    topic: &str,
    key: &str,
    event: &T,
) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to serialize {} event: {}", topic, e);
            return;
        }
    };

    if let Err(e) = publisher.publish(topic, key, &payload).await {
        tracing::warn!(topic, key, "Failed to publish event: {}", e);
    }
}
