//! Annotation entities, visibility clipping, path projection, editing.

pub mod clip;
mod editor;
mod path;
mod shape;
mod style;

pub use clip::{classify, interpolate, is_hidden, SegmentClass, BISECTION_STEPS};
pub use editor::{AnnotationLayer, EditState};
pub use path::{
    draft_segment, hit_fill, hit_path, outline_positions, project_path, triangulate_fill,
    FillMesh, PathSegment, ProjectedPath, MESH_SCALE,
};
pub use shape::{Dot, EntityId, Shape, ShapeKind};
pub use style::{
    resolve_color, Rgba, Stroke, StrokePattern, DEFAULT_HOVER_COLOR, DEFAULT_STROKE_COLOR,
};
