//! Projection of annotation point lists into drawable output.
//!
//! Lines and polygons are re-projected every frame: each consecutive
//! point pair is classified against the frustum and contributes either a
//! direct screen segment, nothing, or a segment clipped at the
//! visibility boundary. Polygons additionally produce a triangulated
//! surface mesh for the render target.

use glam::Vec3;

use super::clip::{self, SegmentClass};
use crate::camera::Frustum;
use crate::projection::{AngleProjector, ScreenPoint, SphereCoord, SPHERE_RADIUS};
use crate::camera::Camera;

/// Fill/outline meshes sit slightly inside the panorama sphere so they
/// are never z-fought by the sphere surface.
pub const MESH_SCALE: f32 = 0.9;

/// One straight screen-space piece of a projected path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    /// Start point in pixels.
    pub a: ScreenPoint,
    /// End point in pixels.
    pub b: ScreenPoint,
}

/// Screen-space output for one line or polygon this frame.
#[derive(Debug, Clone, Default)]
pub struct ProjectedPath {
    /// Visible sub-segments, in path order.
    pub segments: Vec<PathSegment>,
    /// Projection of the last visible point, for label attachment.
    /// `None` when every point is hidden, in which case the label is
/// skipped.
    pub label_anchor: Option<ScreenPoint>,
}

/// Project a point list into visible screen segments.
///
/// `closed` wraps the last point back to the first (polygons). Mixed
/// visibility pairs are clipped at the bisected boundary: the emitted
/// segment runs from the visible endpoint to the boundary point, never
/// to the hidden endpoint's raw (undefined) projection.
pub fn project_path(
    projector: &AngleProjector,
    camera: &Camera,
    frustum: &Frustum,
    points: &[SphereCoord],
    closed: bool,
    bisection_steps: u32,
) -> ProjectedPath {
    let mut path = ProjectedPath::default();
    if points.len() < 2 {
        path.label_anchor = points
            .first()
            .filter(|p| !clip::is_hidden(frustum, **p))
            .map(|p| projector.angle_to_screen(camera, *p).point);
        return path;
    }

    let pair_count = if closed {
        points.len()
    } else {
        points.len() - 1
    };

    for i in 0..pair_count {
        let p1 = points[i];
        let p2 = points[(i + 1) % points.len()];
        match clip::classify(frustum, p1, p2) {
            SegmentClass::BothHidden => {}
            SegmentClass::BothVisible => {
                path.segments.push(PathSegment {
                    a: projector.angle_to_screen(camera, p1).point,
                    b: projector.angle_to_screen(camera, p2).point,
                });
            }
            SegmentClass::FirstVisible => {
                let boundary = clip::interpolate(frustum, p1, p2, bisection_steps);
                path.segments.push(PathSegment {
                    a: projector.angle_to_screen(camera, p1).point,
                    b: projector.angle_to_screen(camera, boundary).point,
                });
            }
            SegmentClass::SecondVisible => {
                let boundary = clip::interpolate(frustum, p2, p1, bisection_steps);
                path.segments.push(PathSegment {
                    a: projector.angle_to_screen(camera, p2).point,
                    b: projector.angle_to_screen(camera, boundary).point,
                });
            }
        }
    }

    path.label_anchor = points
        .iter()
        .rev()
        .find(|p| !clip::is_hidden(frustum, **p))
        .map(|p| projector.angle_to_screen(camera, *p).point);

    path
}

/// Preview segment from the last placed point toward the cursor while a
/// shape is being drawn.
///
/// When the last point is off screen the segment starts at the bisected
/// boundary between the cursor's angle and that point, so the preview
/// still "fades at the horizon" instead of jumping.
pub fn draft_segment(
    projector: &AngleProjector,
    camera: &Camera,
    frustum: &Frustum,
    last_point: SphereCoord,
    cursor: (f32, f32),
    bisection_steps: u32,
) -> PathSegment {
    let cursor_point = ScreenPoint::new(cursor.0, cursor.1);
    let start = if clip::is_hidden(frustum, last_point) {
        let cursor_angle = projector.pixel_to_angle(camera, Some(cursor));
        let boundary = clip::interpolate(frustum, cursor_angle, last_point, bisection_steps);
        projector.angle_to_screen(camera, boundary).point
    } else {
        projector.angle_to_screen(camera, last_point).point
    };
    PathSegment {
        a: start,
        b: cursor_point,
    }
}

/// Triangulated surface mesh for a filled polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct FillMesh {
    /// Vertices on the (slightly shrunk) sphere surface.
    pub vertices: Vec<Vec3>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
}

/// Ear-clip a polygon's angle-space ring into a surface mesh.
///
/// Triangulation runs in (lg, lt) space, over the same ring the path
/// projection walks, and the triangles are lifted onto the sphere.
/// Returns `None` for degenerate rings (< 3 points or a failed cut).
pub fn triangulate_fill(points: &[SphereCoord]) -> Option<FillMesh> {
    if points.len() < 3 {
        return None;
    }
    let mut ring: Vec<f64> = Vec::with_capacity(points.len() * 2);
    for p in points {
        ring.push(f64::from(p.lg));
        ring.push(f64::from(p.lt));
    }
    let holes: Vec<usize> = Vec::new();
    let indices = earcutr::earcut(&ring, &holes, 2).ok()?;
    if indices.is_empty() {
        return None;
    }
    Some(FillMesh {
        vertices: outline_positions(points),
        indices: indices.iter().map(|&i| i as u32).collect(),
    })
}

/// 3D positions of a path's points, scaled inside the sphere, for the
/// render target's stroke mesh.
pub fn outline_positions(points: &[SphereCoord]) -> Vec<Vec3> {
    points
        .iter()
        .map(|p| p.to_xyz(SPHERE_RADIUS) * MESH_SCALE)
        .collect()
}

/// Distance-to-segment hit test for stroked lines.
pub fn hit_path(segments: &[PathSegment], x: f32, y: f32, tolerance: f32) -> bool {
    segments
        .iter()
        .any(|s| point_segment_distance(x, y, s.a, s.b) <= tolerance)
}

/// Even-odd point-in-polygon test over a projected screen ring.
pub fn hit_fill(ring: &[ScreenPoint], x: f32, y: f32) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (pi, pj) = (ring[i], ring[j]);
        if (pi.y > y) != (pj.y > y) {
            let cross_x = (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x;
            if x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn point_segment_distance(x: f32, y: f32, a: ScreenPoint, b: ScreenPoint) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let (apx, apy) = (x - a.x, y - a.y);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (dx, dy) = (apx - abx * t, apy - aby * t);
    (dx * dx + dy * dy).sqrt()
}
