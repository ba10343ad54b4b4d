//! Domain event publishing
//!
//! Events go to NATS when a client is configured. Publishing never fails the
//! operation that raised the event; errors are logged and dropped.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct Notifier { nats: Option<async_nats::Client> }

impl Notifier {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        tracing::debug!(subject, ?event, "domain event");
        let Some(client) = &self.nats else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => { tracing::warn!(subject, error = %e, "event serialization failed"); return; }
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(subject, error = %e, "event publish failed");
        }
    }
}
