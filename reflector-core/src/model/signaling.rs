use serde::{Deserialize, Serialize};

/// Discriminant of a signaling frame. Anything else on the wire is a
/// protocol error and terminates the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalEvent {
    Offer,
    Answer,
    Candidate,
}

/// One signaling frame: `{"event": ..., "data": ...}`.
///
/// `data` is itself a JSON-encoded document (an SDP description or an ICE
/// candidate), not an inline object. Existing browser clients depend on this
/// double encoding, so it is preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMessage {
    pub event: SignalEvent,
    pub data: String,
}

impl SignalMessage {
    pub fn new(event: SignalEvent, data: impl Into<String>) -> Self {
        Self {
            event,
            data: data.into(),
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
