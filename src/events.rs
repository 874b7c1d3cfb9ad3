//! Host notification channel.
//!
//! The engine never reaches for a process-wide event bus; the host
//! injects an [`EventSink`] at construction and every notification goes
//! through it. Annotation payloads carry angle pairs, never 3D
//! positions.

use crate::scene::{DotData, SceneKey, ShapeData};

/// Which annotation family an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Point markers.
    Dot,
    /// Stroked paths.
    Line,
    /// Filled rings.
    Polygon,
}

/// Notifications emitted toward the host.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A dot was committed in add mode.
    DotCreated(DotData),
    /// A dot was repositioned by dragging.
    DotUpdated(DotData),
    /// A new line or polygon was committed.
    ShapeCreated {
        /// Line or polygon.
        kind: AnnotationKind,
        /// Entity payload with points as angle pairs, in path order.
        data: ShapeData,
    },
    /// An edited line or polygon was committed.
    ShapeUpdated {
        /// Line or polygon.
        kind: AnnotationKind,
        /// Entity payload with points as angle pairs, in path order.
        data: ShapeData,
    },
    /// The working copy changed mid-construction (point added, moved or
    /// removed); `None` signals the draft ended. Lets the host render a
    /// live preview.
    Draft {
        /// Line or polygon.
        kind: AnnotationKind,
        /// Current working copy, if any.
        data: Option<ShapeData>,
    },
    /// Selection changed; `None` clears it.
    Selected {
        /// Line or polygon.
        kind: AnnotationKind,
        /// Selected entity payload, if any.
        data: Option<ShapeData>,
    },
    /// The manual rotation changed during a drag; `[alpha, beta, gamma]`
    /// degrees.
    ManualRotation([f32; 3]),
    /// A scene finished its thumbnail load and became interactive.
    SceneReady(SceneKey),
    /// A navigation overlay was activated (click or gaze dwell);
    /// carries the target scene key.
    WalkRequested(String),
}

/// Receiver for engine notifications, injected by the host.
pub trait EventSink {
    /// Deliver one notification.
    fn emit(&mut self, event: EngineEvent);
}

/// Sink that drops every event, for hosts that do not listen.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: EngineEvent) {}
}

/// Buffering sink; used by tests and polling hosts.
impl EventSink for Vec<EngineEvent> {
    fn emit(&mut self, event: EngineEvent) {
        self.push(event);
    }
}
