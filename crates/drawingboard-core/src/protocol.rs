//! Messages sent from the board to connected clients.
//!
//! ```json
//! { "sseLocation": "localhost:8080" }
//! { "type": "BIG_CIRCLE", "x": 100, "y": 200, "color": "BLUE" }
//! { "error": "unknown variant `HEXAGON`" }
//! ```

use serde::{Deserialize, Serialize};

use crate::shapes::Shape;

/// Default event-stream location announced to joining clients.
pub const DEFAULT_SSE_LOCATION: &str = "localhost:8080";

/// One-time setup message sent when a client joins a drawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSetup {
    #[serde(rename = "sseLocation")]
    pub sse_location: String,
}

/// Sent back to a client whose frame could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub error: String,
}

/// A message broadcast to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Session(SessionSetup),
    Error(ErrorNotice),
    Shape(Shape),
}

impl ServerMessage {
    pub fn session(sse_location: impl Into<String>) -> Self {
        Self::Session(SessionSetup {
            sse_location: sse_location.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorNotice {
            error: message.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Shape> for ServerMessage {
    fn from(shape: Shape) -> Self {
        Self::Shape(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_setup_json() {
        let json = ServerMessage::session("example.org:9000").to_json().unwrap();
        assert_eq!(json, r#"{"sseLocation":"example.org:9000"}"#);
    }

    #[test]
    fn test_shape_message_is_bare_shape() {
        let shape = Shape::from_json(r#"{"type":"BIG_SQUARE","x":5}"#).unwrap();
        let json = ServerMessage::from(shape.clone()).to_json().unwrap();
        assert_eq!(Shape::from_json(&json).unwrap(), shape);
    }

    #[test]
    fn test_client_side_decoding() {
        let msg: ServerMessage = serde_json::from_str(r#"{"sseLocation":"h:1"}"#).unwrap();
        assert_eq!(msg, ServerMessage::session("h:1"));

        let msg: ServerMessage = serde_json::from_str(r#"{"type":"LINE","x":1}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Shape(_)));

        let msg: ServerMessage = serde_json::from_str(r#"{"error":"bad"}"#).unwrap();
        assert_eq!(msg, ServerMessage::error("bad"));
    }
}
