//! Add/edit state machines for line and polygon annotations.
//!
//! One [`AnnotationLayer`] exists per shape family. While a shape is
//! being added it lives only in the working slot; while one is being
//! edited it is detached from the committed list and a snapshot of its
//! wire data is kept so cancel can restore it verbatim.

use super::shape::{EntityId, Shape, ShapeKind};
use crate::events::{AnnotationKind, EngineEvent, EventSink};
use crate::projection::SphereCoord;
use crate::scene::ShapeData;

/// Editor state of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    /// No working shape.
    #[default]
    Idle,
    /// A new shape is being built point by point.
    Adding,
    /// An existing shape is detached and being modified.
    Editing,
}

/// Committed shapes of one kind plus their add/edit state machine.
#[derive(Debug)]
pub struct AnnotationLayer {
    kind: ShapeKind,
    /// Committed shapes, rendered every frame.
    pub shapes: Vec<Shape>,
    state: EditState,
    /// Working copy during add/edit; rendered like a committed shape.
    pub working: Option<Shape>,
    snapshot: Option<ShapeData>,
    title_counter: u32,
}

impl AnnotationLayer {
    /// Empty layer for one shape family.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            shapes: Vec::new(),
            state: EditState::Idle,
            working: None,
            snapshot: None,
            title_counter: 1,
        }
    }

    /// Current editor state.
    pub const fn state(&self) -> EditState {
        self.state
    }

    /// Whether an add or edit is in progress.
    pub const fn is_editing(&self) -> bool {
        !matches!(self.state, EditState::Idle)
    }

    const fn annotation_kind(&self) -> AnnotationKind {
        match self.kind {
            ShapeKind::Line => AnnotationKind::Line,
            ShapeKind::Polygon => AnnotationKind::Polygon,
        }
    }

    /// Replace the committed list from wire data (scene load/switch).
    /// Any in-progress add/edit is discarded.
    pub fn set_shapes(&mut self, data: Vec<ShapeData>) {
        self.shapes = data
            .into_iter()
            .filter(|d| !d.is_hidden)
            .map(|d| Shape::from_data(self.kind, d))
            .collect();
        self.working = None;
        self.snapshot = None;
        self.state = EditState::Idle;
    }

    fn next_title(&mut self) -> String {
        loop {
            let prefix = match self.kind {
                ShapeKind::Line => "Line",
                ShapeKind::Polygon => "Polygon",
            };
            let title = format!("{prefix} {}", self.title_counter);
            self.title_counter += 1;
            if !self.shapes.iter().any(|s| s.meta.title == title) {
                return title;
            }
        }
    }

    /// Begin building a new shape. A previous working shape is dropped.
    pub fn start_add(&mut self, sink: &mut dyn EventSink) {
        let title = self.next_title();
        let meta = ShapeData {
            title,
            line_color: Some("#ffffff".to_owned()),
            line_type: Some("solid".to_owned()),
            line_width: Some(4.0),
            line_color_hover: Some("#ffffff".to_owned()),
            line_type_hover: Some("solid".to_owned()),
            line_width_hover: Some(4.0),
            fill_color: matches!(self.kind, ShapeKind::Polygon)
                .then(|| "rgba(200,200,200,0.5)".to_owned()),
            fill_color_hover: matches!(self.kind, ShapeKind::Polygon)
                .then(|| "rgba(200,200,200,0.9)".to_owned()),
            ..ShapeData::default()
        };
        self.working = Some(Shape::from_data(self.kind, meta));
        self.snapshot = None;
        self.state = EditState::Adding;
        self.emit_draft(sink);
    }

    /// Begin editing the committed shape with the given host id.
    /// Unknown ids are a no-op; nothing is created.
    pub fn start_edit(&mut self, host_id: &str, sink: &mut dyn EventSink) -> bool {
        let Some(index) = self
            .shapes
            .iter()
            .position(|s| s.meta.id.as_deref() == Some(host_id))
        else {
            log::debug!("start_edit: unknown {:?} id {host_id}", self.kind);
            return false;
        };
        let shape = self.shapes.remove(index);
        self.snapshot = Some(shape.to_data());
        self.working = Some(shape);
        self.state = EditState::Editing;
        self.emit_draft(sink);
        true
    }

    /// Append a clicked point to the working shape.
    pub fn append_point(&mut self, angle: SphereCoord, sink: &mut dyn EventSink) {
        if let Some(shape) = self.working.as_mut() {
            shape.points.push(angle);
            self.emit_draft(sink);
        }
    }

    /// Remove the most recently placed point (right-click while drawing).
    pub fn remove_last_point(&mut self, sink: &mut dyn EventSink) {
        if let Some(shape) = self.working.as_mut() {
            if shape.points.pop().is_some() {
                self.emit_draft(sink);
            }
        }
    }

    /// Reposition one point of the working shape (point drag).
    /// Out-of-range indices are a no-op.
    pub fn move_point(&mut self, index: usize, angle: SphereCoord, sink: &mut dyn EventSink) {
        if let Some(shape) = self.working.as_mut() {
            if let Some(point) = shape.points.get_mut(index) {
                *point = angle;
                self.emit_draft(sink);
            }
        }
    }

    /// Commit the working shape.
    ///
    /// Needs at least 2 points; a 2-point polygon commits but is
    /// degenerate (drawable outline, no meaningful fill). An
    /// insufficient working shape is discarded like a cancel.
    pub fn finish(&mut self, sink: &mut dyn EventSink) {
        let committed = match self.working.take() {
            Some(shape) if shape.points.len() > 1 => {
                let data = shape.to_data();
                let event = match self.state {
                    EditState::Editing => EngineEvent::ShapeUpdated {
                        kind: self.annotation_kind(),
                        data,
                    },
                    _ => EngineEvent::ShapeCreated {
                        kind: self.annotation_kind(),
                        data,
                    },
                };
                self.shapes.push(shape);
                self.snapshot = None;
                sink.emit(event);
                true
            }
            Some(_) | None => false,
        };
        if !committed {
            self.restore_snapshot();
        }
        self.end(sink);
    }

    /// Abandon the working shape; an edited shape is restored from its
    /// pre-edit snapshot verbatim.
    pub fn cancel(&mut self, sink: &mut dyn EventSink) {
        self.working = None;
        self.restore_snapshot();
        self.end(sink);
    }

    fn restore_snapshot(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.shapes.push(Shape::from_data(self.kind, snapshot));
        }
    }

    fn end(&mut self, sink: &mut dyn EventSink) {
        self.state = EditState::Idle;
        self.snapshot = None;
        sink.emit(EngineEvent::Selected {
            kind: self.annotation_kind(),
            data: None,
        });
        sink.emit(EngineEvent::Draft {
            kind: self.annotation_kind(),
            data: None,
        });
    }

    fn emit_draft(&self, sink: &mut dyn EventSink) {
        if let Some(shape) = self.working.as_ref() {
            sink.emit(EngineEvent::Draft {
                kind: self.annotation_kind(),
                data: Some(shape.to_data()),
            });
        }
    }

    /// Find a committed shape by its internal handle.
    pub fn shape(&self, id: EntityId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Find a committed shape by the host-assigned id.
    pub fn shape_by_host_id(&self, host_id: &str) -> Option<&Shape> {
        self.shapes
            .iter()
            .find(|s| s.meta.id.as_deref() == Some(host_id))
    }
}
