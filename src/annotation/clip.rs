//! Visibility classification and boundary bisection for annotation
//! segments.
//!
//! A segment between two sphere points may be fully visible, fully
//! hidden, or straddle the edge of the view. In the mixed case the path
//! must stop at the visibility boundary: drawing toward the hidden
//! endpoint's raw projection would wrap the stroke across the back of
//! the sphere.

use crate::camera::Frustum;
use crate::projection::{SphereCoord, SPHERE_RADIUS};

/// Visibility class of a two-point segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentClass {
    /// Both endpoints inside the frustum: draw directly.
    BothVisible,
    /// Both endpoints hidden: draw nothing.
    BothHidden,
    /// First endpoint visible, second hidden.
    FirstVisible,
    /// Second endpoint visible, first hidden.
    SecondVisible,
}

/// Bisection step cap for the boundary search. Ten halvings give
/// roughly 2⁻¹⁰ of the segment's angular span. This is a fixed-depth
/// approximation, not a convergence test.
pub const BISECTION_STEPS: u32 = 10;

/// Whether a sphere point is hidden under the current camera.
pub fn is_hidden(frustum: &Frustum, point: SphereCoord) -> bool {
    !frustum.contains_point(point.to_xyz(SPHERE_RADIUS))
}

/// Classify a segment by its endpoints' frustum visibility.
pub fn classify(frustum: &Frustum, p1: SphereCoord, p2: SphereCoord) -> SegmentClass {
    match (is_hidden(frustum, p1), is_hidden(frustum, p2)) {
        (false, false) => SegmentClass::BothVisible,
        (true, true) => SegmentClass::BothHidden,
        (false, true) => SegmentClass::FirstVisible,
        (true, false) => SegmentClass::SecondVisible,
    }
}

/// Find the angle at which visibility transitions between a visible and
/// a hidden endpoint.
///
/// Bisects along the great-circle path: the midpoint (shortest-path
/// longitude average, plain latitude average) replaces whichever
/// endpoint shares its visibility class, halving the interval each
/// step. After `steps` halvings the visible-side bound is returned, so
/// the result is always drawable.
pub fn interpolate(
    frustum: &Frustum,
    visible: SphereCoord,
    hidden: SphereCoord,
    steps: u32,
) -> SphereCoord {
    let mut lo = visible;
    let mut hi = hidden;
    for _ in 0..steps {
        let mid = lo.midpoint(hi);
        if is_hidden(frustum, mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, Frustum};
    use crate::projection::{AngleProjector, Viewport};

    fn setup() -> (Frustum, SphereCoord, SphereCoord) {
        let mut camera = Camera::default();
        camera.resize(1280.0, 720.0);
        let frustum = Frustum::from_view_projection(camera.build_matrix());

        let projector = AngleProjector::new(Viewport::new(1280.0, 720.0));
        let center = projector.pixel_to_angle(&camera, None);
        let behind = SphereCoord::new(
            (center.lg + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU),
            -center.lt,
        );
        (frustum, center, behind)
    }

    #[test]
    fn test_classify_all_cases() {
        let (frustum, center, behind) = setup();
        assert_eq!(classify(&frustum, center, center), SegmentClass::BothVisible);
        assert_eq!(classify(&frustum, behind, behind), SegmentClass::BothHidden);
        assert_eq!(classify(&frustum, center, behind), SegmentClass::FirstVisible);
        assert_eq!(classify(&frustum, behind, center), SegmentClass::SecondVisible);
    }

    #[test]
    fn test_interpolate_returns_visible_side() {
        let (frustum, center, behind) = setup();
        let boundary = interpolate(&frustum, center, behind, BISECTION_STEPS);
        // The returned point must itself be visible...
        assert!(!is_hidden(&frustum, boundary));
        // ...and differ from the hidden endpoint's class.
        assert!(is_hidden(&frustum, behind));
    }

    /// Shortest angular distance between two longitudes.
    fn circular_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(std::f32::consts::TAU);
        d.min(std::f32::consts::TAU - d)
    }

    #[test]
    fn test_interpolate_converges_toward_boundary() {
        let (frustum, center, behind) = setup();
        let coarse = interpolate(&frustum, center, behind, 2);
        let fine = interpolate(&frustum, center, behind, BISECTION_STEPS);
        // The visible-side bound only ever moves toward the hidden
        // endpoint, so more steps can never leave it further away.
        let d_coarse = circular_distance(coarse.lg, behind.lg);
        let d_fine = circular_distance(fine.lg, behind.lg);
        assert!(
            d_fine <= d_coarse,
            "10 steps ({d_fine}) further from the boundary than 2 ({d_coarse})"
        );
    }

    #[test]
    fn test_zero_steps_returns_visible_endpoint() {
        let (frustum, center, behind) = setup();
        let result = interpolate(&frustum, center, behind, 0);
        assert_eq!(result, center);
    }
}
