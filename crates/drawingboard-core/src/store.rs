//! In-memory drawing histories.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shapes::Shape;

/// Identifier of a drawing session.
pub type DrawingId = i32;

/// A drawing and its ordered shape history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: DrawingId,
    /// Shapes in the order they were appended.
    pub shapes: Vec<Shape>,
}

impl Drawing {
    /// Create an empty drawing.
    pub fn new(id: DrawingId) -> Self {
        Self {
            id,
            shapes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Owns one shape history per drawing ID.
///
/// Drawings are created on first reference and live until the store is
/// dropped. The store has no locking of its own; callers that share it
/// across threads guard it together with whatever else must stay consistent
/// with it (see [`BroadcastHub`](crate::BroadcastHub)).
#[derive(Debug, Default)]
pub struct DrawingStore {
    drawings: HashMap<DrawingId, Drawing>,
}

impl DrawingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the drawing for `id`, creating an empty one if it is unknown.
    pub fn get_or_create(&mut self, id: DrawingId) -> &Drawing {
        self.drawings.entry(id).or_insert_with(|| Drawing::new(id))
    }

    /// Append `shape` to the drawing for `id` and return the updated drawing.
    ///
    /// A clear-all shape resets the history: the sentinel becomes the only
    /// entry, so later joiners replay one clear instead of every deleted shape.
    pub fn append(&mut self, id: DrawingId, shape: Shape) -> &Drawing {
        let drawing = self.drawings.entry(id).or_insert_with(|| Drawing::new(id));
        if shape.is_clear_all() {
            drawing.shapes.clear();
        }
        drawing.shapes.push(shape);
        drawing
    }

    /// Copy of the drawing's current history, in append order.
    pub fn snapshot(&mut self, id: DrawingId) -> Vec<Shape> {
        self.get_or_create(id).shapes.clone()
    }

    /// IDs of every drawing referenced so far, ascending.
    pub fn drawing_ids(&self) -> Vec<DrawingId> {
        let mut ids: Vec<_> = self.drawings.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of drawings held.
    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }
}
