use glam::{Vec3, Vec4};

use super::{SphereCoord, LONGITUDE_OFFSET, SPHERE_RADIUS, TAU};
use crate::camera::Camera;

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Viewport {
    /// Viewport from pixel dimensions.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width / height.
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// A position in pixel coordinates, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    /// Horizontal pixel coordinate.
    pub x: f32,
    /// Vertical pixel coordinate.
    pub y: f32,
}

impl ScreenPoint {
    /// Build from pixel coordinates.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Result of the forward angle→screen mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Pixel position (meaningful only when on screen).
    pub point: ScreenPoint,
    /// Whether the point is behind the camera or outside the frustum.
    pub off_screen: bool,
}

/// Bidirectional mapping between screen pixels and sphere angle
/// coordinates under a camera orientation and field of view.
#[derive(Debug, Clone, Copy)]
pub struct AngleProjector {
    /// Pixel dimensions the mapping is computed against.
    pub viewport: Viewport,
}

impl AngleProjector {
    /// Projector for the given viewport.
    pub const fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    /// Map a pixel to the sphere angle it looks at.
    ///
    /// `pixel` of `None` uses the screen centre (used to auto-place
    /// overlays that arrive without coordinates). Returns
    /// [`SphereCoord::SENTINEL`] when the ray misses the sphere; callers
    /// that cannot tolerate an undefined angle must pre-check visibility.
    pub fn pixel_to_angle(&self, camera: &Camera, pixel: Option<(f32, f32)>) -> SphereCoord {
        let (ndc_x, ndc_y) = match pixel {
            Some((px, py)) => (
                2.0 * (px / self.viewport.width) - 1.0,
                -2.0 * (py / self.viewport.height) + 1.0,
            ),
            None => (0.0, 0.0),
        };

        let inverse = camera.build_matrix().inverse();
        let world = inverse * Vec4::new(ndc_x, ndc_y, 0.5, 1.0);
        if world.w.abs() < f32::EPSILON {
            return SphereCoord::SENTINEL;
        }
        let world = world.truncate() / world.w;
        let direction = (world - camera.eye).normalize();

        match ray_sphere_intersection(camera.eye, direction, SPHERE_RADIUS) {
            Some(point) => {
                let theta = point.x.atan2(-point.z);
                let phi = point
                    .y
                    .atan2((point.x * point.x + point.z * point.z).sqrt());
                SphereCoord {
                    lg: (theta + LONGITUDE_OFFSET).rem_euclid(TAU),
                    lt: phi,
                }
            }
            None => SphereCoord::SENTINEL,
        }
    }

    /// Map a sphere angle to its pixel position, with an off-screen flag.
    pub fn angle_to_screen(&self, camera: &Camera, coord: SphereCoord) -> Projection {
        self.project_world(camera, coord.to_xyz(SPHERE_RADIUS))
    }

    /// Project a world-space point through the camera to pixels.
    pub fn project_world(&self, camera: &Camera, position: Vec3) -> Projection {
        let clip = camera.build_matrix() * position.extend(1.0);
        if clip.w <= 0.0 {
            // Behind the camera; the NDC coordinates are meaningless.
            return Projection {
                point: ScreenPoint::default(),
                off_screen: true,
            };
        }
        let ndc = clip.truncate() / clip.w;
        let off_screen = ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || ndc.z.abs() > 1.0;
        Projection {
            point: ScreenPoint::new(
                (ndc.x + 1.0) / 2.0 * self.viewport.width,
                (-ndc.y + 1.0) / 2.0 * self.viewport.height,
            ),
            off_screen,
        }
    }
}

/// Nearest positive intersection of a ray with a sphere centred at the
/// origin.
fn ray_sphere_intersection(origin: Vec3, direction: Vec3, radius: f32) -> Option<Vec3> {
    let b = origin.dot(direction);
    let c = origin.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    // Camera inside the sphere: the far root is the visible surface.
    let t = if -b - sqrt_d > 0.0 {
        -b - sqrt_d
    } else {
        -b + sqrt_d
    };
    if t <= 0.0 {
        return None;
    }
    Some(origin + direction * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    fn projector() -> (AngleProjector, Camera) {
        let viewport = Viewport::new(1280.0, 720.0);
        let mut camera = Camera::default();
        camera.resize(viewport.width, viewport.height);
        (AngleProjector::new(viewport), camera)
    }

    #[test]
    fn test_center_pixel_matches_default() {
        let (projector, camera) = projector();
        let by_pixel = projector.pixel_to_angle(&camera, Some((640.0, 360.0)));
        let by_default = projector.pixel_to_angle(&camera, None);
        assert!((by_pixel.lg - by_default.lg).abs() < 1e-4);
        assert!((by_pixel.lt - by_default.lt).abs() < 1e-4);
    }

    #[test]
    fn test_round_trip_on_screen_pixels() {
        let (projector, camera) = projector();
        for &(px, py) in &[
            (640.0, 360.0),
            (100.0, 100.0),
            (1200.0, 650.0),
            (320.0, 540.0),
        ] {
            let angle = projector.pixel_to_angle(&camera, Some((px, py)));
            let projection = projector.angle_to_screen(&camera, angle);
            assert!(!projection.off_screen, "({px},{py}) projected off screen");
            assert!(
                (projection.point.x - px).abs() < 1.0,
                "x: {} vs {px}",
                projection.point.x
            );
            assert!(
                (projection.point.y - py).abs() < 1.0,
                "y: {} vs {py}",
                projection.point.y
            );
        }
    }

    #[test]
    fn test_point_behind_camera_is_off_screen() {
        let (projector, camera) = projector();
        let ahead = projector.pixel_to_angle(&camera, None);
        // The antipode of the view centre is squarely behind the camera.
        let behind = SphereCoord::new(
            (ahead.lg + std::f32::consts::PI).rem_euclid(TAU),
            -ahead.lt,
        );
        let projection = projector.angle_to_screen(&camera, behind);
        assert!(projection.off_screen);
    }

    #[test]
    fn test_ray_always_hits_from_sphere_center() {
        let hit = ray_sphere_intersection(Vec3::ZERO, Vec3::NEG_Z, SPHERE_RADIUS);
        let point = hit.unwrap();
        assert!((point.length() - SPHERE_RADIUS).abs() < 1e-2);
    }

    #[test]
    fn test_ray_misses_from_outside() {
        let origin = Vec3::new(0.0, 0.0, SPHERE_RADIUS * 3.0);
        assert!(ray_sphere_intersection(origin, Vec3::Z, SPHERE_RADIUS).is_none());
    }
}
