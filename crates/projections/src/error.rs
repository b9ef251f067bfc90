//! Errors raised while feeding events into read models.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Reading the global stream failed.
    #[error("Event store error: {0}")]
    Store(#[from] event_store::EventStoreError),

    /// A stored payload no longer matches the event schema.
    #[error("Cannot decode {event_type} for {aggregate_id}: {source}")]
    UndecodableEvent {
        event_type: String,
        aggregate_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProjectionError {
    pub fn undecodable(envelope: &event_store::EventEnvelope, source: serde_json::Error) -> Self {
        Self::UndecodableEvent {
            event_type: envelope.event_type.clone(),
            aggregate_id: envelope.aggregate_id.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
