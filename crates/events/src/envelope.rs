use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// Envelope for a committed event, carrying stream metadata.
///
/// This is the unit a store appends to its journal.
///
/// Notes:
/// - **Append-only**: `sequence_number` is strictly increasing per stream,
///   starting at 1, with no gaps.
/// - `event_type` / `event_version` are copied from the payload so a journal
///   can be filtered without deserializing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    stream: String,

    /// Position in the stream.
    sequence_number: u64,

    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    pub fn wrap(stream: impl Into<String>, sequence_number: u64, payload: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            stream: stream.into(),
            sequence_number,
            event_type: payload.event_type().to_string(),
            event_version: payload.version(),
            occurred_at: payload.occurred_at(),
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Pinged {
        at: DateTime<Utc>,
    }

    impl Event for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }

        fn version(&self) -> u32 {
            2
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[test]
    fn wrap_copies_event_metadata() {
        let at = Utc::now();
        let env = EventEnvelope::wrap("test", 7, Pinged { at });

        assert_eq!(env.stream(), "test");
        assert_eq!(env.sequence_number(), 7);
        assert_eq!(env.event_type(), "test.pinged");
        assert_eq!(env.event_version(), 2);
        assert_eq!(env.occurred_at(), at);
        assert_eq!(env.payload(), &Pinged { at });
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let env = EventEnvelope::wrap("test", 1, Pinged { at: Utc::now() });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["event_type"], "test.pinged");
        let back: EventEnvelope<Pinged> = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }
}
