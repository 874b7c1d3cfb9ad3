//! Pointer interaction state machines.

mod drag;

pub use drag::{DragController, DragState, DragTarget};
