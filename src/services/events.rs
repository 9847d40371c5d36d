//! Best-effort domain event publishing to NATS.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Events are only logged when no NATS client is configured.
    pub fn disabled() -> Self { Self::default() }

    /// Failures are logged and never surface to the caller.
    pub async fn publish(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            let subject = event.subject();
            tracing::debug!(subject, ?event, "domain event");
            let Some(client) = &self.nats else { continue };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(subject, error = %e, "failed to encode domain event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
                tracing::warn!(subject, error = %e, "failed to publish domain event");
            }
        }
    }
}
