//! Event — the unit of traffic on the bus: a topic plus one payload variant.

use serde::{Deserialize, Serialize};

/// A single message routed through the bus.
///
/// The topic is an opaque, equality-matched string ([`crate::topic`] holds
/// the well-known names); the payload carries the actual data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Routing key. No wildcard or prefix matching — exact equality only.
    pub topic: String,
    /// The data carried by this event.
    pub payload: Payload,
}

impl Event {
    /// Create an event for `topic` carrying `payload`.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Payload) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Shorthand for an event with a [`Payload::Value`] payload.
    #[must_use]
    pub fn value(topic: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(topic, Payload::Value {
            value: value.into(),
        })
    }

    /// Shorthand for an event with a [`Payload::KeyValue`] payload.
    #[must_use]
    pub fn key_value(
        topic: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(topic, Payload::KeyValue {
            key: key.into(),
            value: value.into(),
        })
    }
}

/// The payload of an [`Event`] — exactly one variant per event.
///
/// Consumers match on the variant they expect and skip anything else;
/// a mismatched kind can never be misread as another because the fields
/// only exist on their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Payload {
    /// A single opaque value with no key.
    Value {
        /// The value itself.
        value: String,
    },
    /// A named state fact.
    KeyValue {
        /// State key, dotted by convention (e.g. `ruuvi.study.humidity`).
        key: String,
        /// Latest value for the key.
        value: String,
    },
    /// An inbound HTTP body paired with a correlation id.
    HttpRequest {
        /// Correlation id linking this request to its eventual response.
        id: String,
        /// Raw request body.
        body: String,
    },
    /// A response to a specific [`Payload::HttpRequest`].
    HttpResponse {
        /// Correlation id of the request being answered.
        id: String,
        /// HTTP status code to relay.
        status: u16,
        /// Response body to relay.
        body: String,
    },
    /// An outbound notification request.
    Email {
        /// Message subject.
        subject: String,
        /// Message body.
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_value_event() {
        let event = Event::value("every:minute", "2024-05-01T10:00:00+10:00");
        assert_eq!(event.topic, "every:minute");
        assert_eq!(event.payload, Payload::Value {
            value: "2024-05-01T10:00:00+10:00".to_string(),
        });
    }

    #[test]
    fn should_build_key_value_event() {
        let event = Event::key_value("state:update", "daikin.study.power", "on");
        assert_eq!(event.payload, Payload::KeyValue {
            key: "daikin.study.power".to_string(),
            value: "on".to_string(),
        });
    }

    #[test]
    fn should_tag_payload_variants_with_wire_names() {
        let json = serde_json::to_value(Payload::KeyValue {
            key: "a".to_string(),
            value: "1".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "key-value");

        let json = serde_json::to_value(Payload::HttpResponse {
            id: "abc".to_string(),
            status: 200,
            body: "OK".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "http-response");
        assert_eq!(json["status"], 200);
    }

    #[test]
    fn should_round_trip_payload_through_json() {
        let payload = Payload::HttpRequest {
            id: "d4f0".to_string(),
            body: "{}".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
