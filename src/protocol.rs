//! Event protocol carried over the WebSocket channel.
//!
//! Every text frame holds exactly one JSON object of the form
//! `{"event": "<name>", "data": "<document>"}`.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::types::Document;

/// Named events exchanged between the relay and participants
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Event {
    /// Server to client, sent once per connection with the current document
    InitialStructure(Document),
    /// Either direction, carries a full replacement document
    DrawingUpdate(Document),
}

impl Event {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Event::InitialStructure(_) => "initialStructure",
            Event::DrawingUpdate(_) => "drawingUpdate",
        }
    }

    pub fn document(&self) -> &Document {
        match self {
            Event::InitialStructure(doc) | Event::DrawingUpdate(doc) => doc,
        }
    }

    /// Encodes the event as a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a JSON text frame.
    ///
    /// Unknown event names and non-string payloads are rejected here, which
    /// is how malformed updates get dropped before reaching the relay.
    pub fn from_json(text: &str) -> Result<Self, ClientError> {
        serde_json::from_str(text).map_err(|e| ClientError::Protocol(e.to_string()))
    }
}
