//! Sphere-surface angular coordinates and pixel mapping.
//!
//! The stable representation of every annotation position is a
//! (longitude, latitude) pair in radians on the panorama sphere. This
//! module owns that type, the conversion to 3D positions, and the
//! pixel-space projector built on top of it.

mod projector;

pub use projector::{AngleProjector, Projection, ScreenPoint, Viewport};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Radius of the panorama sphere in world units.
///
/// A calibration constant tied to the texture UV origin convention of the
/// stored scenes, together with [`LONGITUDE_OFFSET`]. Changing either shifts
/// every persisted annotation on screen.
pub const SPHERE_RADIUS: f32 = 500.0;

/// Longitude offset (3π/2) applied when converting a sphere intersection
/// back to an angle coordinate. Empirically calibrated; do not re-derive.
pub const LONGITUDE_OFFSET: f32 = 3.0 * std::f32::consts::PI / 2.0;

const TAU: f32 = std::f32::consts::TAU;

/// A point on the panorama sphere: longitude (`lg`) and latitude (`lt`)
/// in radians.
///
/// Longitude lives in [0, 2π), latitude in [-π/2, π/2]. This is the only
/// persisted form of an annotation position; 3D placement is derived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SphereCoord {
    /// Longitude in radians.
    pub lg: f32,
    /// Latitude in radians.
    pub lt: f32,
}

impl SphereCoord {
    /// Build from longitude/latitude radians.
    pub const fn new(lg: f32, lt: f32) -> Self {
        Self { lg, lt }
    }

    /// The `(0, 0)` sentinel returned when a pixel ray misses the sphere.
    /// Callers that cannot tolerate an undefined angle must pre-check
    /// visibility.
    pub const SENTINEL: SphereCoord = SphereCoord::new(0.0, 0.0);

    /// Derived 3D position on the sphere surface.
    ///
    /// The latitude is converted to a polar angle (`-lt + π/2`) so that
    /// positions stored by earlier revisions of the host keep landing on
    /// the same spot.
    pub fn to_xyz(self, radius: f32) -> Vec3 {
        lglt2xyz(self.lg, -self.lt + std::f32::consts::FRAC_PI_2, radius)
    }

    /// Great-circle midpoint used by the visibility bisection: shortest-path
    /// longitude average, plain latitude average.
    pub fn midpoint(self, other: SphereCoord) -> SphereCoord {
        SphereCoord {
            lg: middle_longitude(self.lg, other.lg),
            lt: (self.lt + other.lt) / 2.0,
        }
    }
}

/// Spherical (longitude, polar angle) to cartesian conversion.
///
/// `polar` is measured from the +Y axis. The axis arrangement is the exact
/// inverse of the intersection mapping in
/// [`AngleProjector::pixel_to_angle`]: `atan2(x, -z) + 3π/2 ≡ lg (mod 2π)`.
pub fn lglt2xyz(lg: f32, polar: f32, radius: f32) -> Vec3 {
    Vec3::new(
        radius * polar.sin() * lg.cos(),
        radius * polar.cos(),
        radius * polar.sin() * lg.sin(),
    )
}

/// Shortest-path longitude average.
///
/// Longitudes close to the ±π seam must interpolate across it: 175° and
/// -172° are near neighbours, not 347° apart. When the raw difference
/// exceeds π the average is taken through the seam and re-wrapped.
pub fn middle_longitude(x1: f32, x2: f32) -> f32 {
    let a1 = x1.max(x2);
    let a2 = x1.min(x2);
    if a1 - a2 > std::f32::consts::PI {
        let a = (a1 + TAU + a2) / 2.0;
        if a > std::f32::consts::PI {
            a - TAU
        } else {
            a
        }
    } else {
        (x1 + x2) / 2.0
    }
}
