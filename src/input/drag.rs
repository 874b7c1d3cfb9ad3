//! Pointer drag state machine.
//!
//! A drag is a short-lived down → move → up interaction. `down` captures
//! the reference state of whatever is being dragged, `move` reports
//! pixel deltas against it, `up` ends the drag and yields the final
//! state for the committed notification. Only one drag is active at a
//! time; move/up without an active drag (target disposed mid-drag) are
//! no-ops.

use crate::annotation::{EntityId, ShapeKind};

/// What a drag is moving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragTarget {
    /// Rotating the camera; carries the manual (alpha, beta) at down.
    Camera {
        /// Manual alpha at pointer down, degrees.
        start_alpha: f32,
        /// Manual beta at pointer down, degrees.
        start_beta: f32,
    },
    /// Repositioning a committed dot; carries its screen position at
    /// down.
    Dot {
        /// The dot being moved.
        id: EntityId,
        /// Screen position at pointer down.
        origin: (f32, f32),
    },
    /// Repositioning one point of the working shape; carries its screen
    /// position at down.
    ShapePoint {
        /// Which layer the working shape belongs to.
        kind: ShapeKind,
        /// Point index within the working shape.
        index: usize,
        /// Screen position at pointer down.
        origin: (f32, f32),
    },
}

/// An in-progress drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// What is being dragged.
    pub target: DragTarget,
    /// Pointer-down pixel position.
    pub down: (f32, f32),
}

impl DragState {
    /// Pixel delta of the current pointer position against the down
    /// position.
    pub fn delta(&self, current: (f32, f32)) -> (f32, f32) {
        (current.0 - self.down.0, current.1 - self.down.1)
    }
}

/// Tracks the single active drag.
#[derive(Debug, Default)]
pub struct DragController {
    active: Option<DragState>,
}

impl DragController {
    /// Start a drag. Ignored while another drag is active.
    pub fn begin(&mut self, target: DragTarget, down: (f32, f32)) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(DragState { target, down });
        true
    }

    /// The active drag, if any.
    pub const fn current(&self) -> Option<&DragState> {
        self.active.as_ref()
    }

    /// Whether a drag is in progress.
    pub const fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// End the drag and return its state for the committed notification.
    pub fn end(&mut self) -> Option<DragState> {
        self.active.take()
    }
}
