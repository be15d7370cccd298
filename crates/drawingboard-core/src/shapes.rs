//! Shape values exchanged between clients.
//!
//! The board never interprets geometry. A shape is its kind tag plus whatever
//! other fields the client sent, kept verbatim so it can be retransmitted
//! exactly as received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind tag carried in the `"type"` field of every shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeKind {
    SmallCircle,
    BigCircle,
    SmallSquare,
    BigSquare,
    Line,
    Rectangle,
    Freehand,
    /// Sentinel meaning "every shape so far was deleted".
    ClearAll,
}

/// An immutable shape submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    kind: ShapeKind,
    /// Everything except the kind tag (position, color, points...).
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Shape {
    /// Create a shape from a kind and its payload fields.
    pub fn new(kind: ShapeKind, payload: Map<String, Value>) -> Self {
        Self { kind, payload }
    }

    /// The clear-all sentinel, with no payload.
    pub fn clear_all() -> Self {
        Self::new(ShapeKind::ClearAll, Map::new())
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn is_clear_all(&self) -> bool {
        self.kind == ShapeKind::ClearAll
    }

    /// Parse a shape from a client's JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_shape() {
        let shape =
            Shape::from_json(r#"{"x": 10, "y": 20, "color": "BLUE", "type": "BIG_CIRCLE"}"#)
                .unwrap();
        assert_eq!(shape.kind(), ShapeKind::BigCircle);
        assert_eq!(shape.payload().get("color"), Some(&json!("BLUE")));
        assert!(!shape.payload().contains_key("type"));
    }

    #[test]
    fn test_serialize_is_flat() {
        let shape = Shape::from_json(r#"{"type":"SMALL_SQUARE","x":1,"y":2}"#).unwrap();
        let value = serde_json::to_value(&shape).unwrap();
        assert_eq!(value, json!({"type": "SMALL_SQUARE", "x": 1, "y": 2}));
    }

    #[test]
    fn test_unknown_payload_fields_survive() {
        let text = r#"{"type":"FREEHAND","points":[[0,0],[3,4]],"width":2.5,"meta":{"pen":"soft"}}"#;
        let shape = Shape::from_json(text).unwrap();
        let reparsed: Value = serde_json::to_value(&shape).unwrap();
        assert_eq!(reparsed, serde_json::from_str::<Value>(text).unwrap());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Shape::from_json(r#"{"type":"HEXAGON","x":1}"#).is_err());
        assert!(Shape::from_json(r#"{"x":1}"#).is_err());
    }

    #[test]
    fn test_clear_all() {
        let clear = Shape::clear_all();
        assert!(clear.is_clear_all());
        assert_eq!(serde_json::to_string(&clear).unwrap(), r#"{"type":"CLEAR_ALL"}"#);
        assert!(Shape::from_json(r#"{"type":"CLEAR_ALL"}"#).unwrap().is_clear_all());
    }
}
