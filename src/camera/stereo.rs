//! Dual-eye camera derivation for the immersive display mode.
//!
//! The stereo rig takes the mono camera produced by the orientation
//! composer and derives one camera per eye, offset along the camera's
//! right axis. Annotation projection runs once per eye; an annotation can
//! be visible to one eye and hidden from the other, and each eye's
//! element is shown or hidden independently.

use glam::Vec3;

use super::core::Camera;
use crate::projection::Viewport;

/// Default interocular distance in world units.
pub const DEFAULT_EYE_SEPARATION: f32 = 0.064;

/// Side of the split viewport an eye renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    /// Left half (landscape) or top half (portrait).
    Left,
    /// Right half (landscape) or bottom half (portrait).
    Right,
}

/// Axis-aligned screen rectangle, used for the gaze focus region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusRect {
    /// Left edge in pixels.
    pub left: f32,
    /// Top edge in pixels.
    pub top: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl FocusRect {
    /// Whether a screen point falls inside the rectangle.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.left && x < self.left + self.width && y > self.top && y < self.top + self.height
    }
}

const FOCUSER_SIZE: f32 = 50.0;

/// Derives per-eye cameras and split-viewport mappings from a mono
/// camera.
#[derive(Debug, Clone, Copy)]
pub struct StereoRig {
    /// Interocular distance in world units.
    pub eye_separation: f32,
}

impl Default for StereoRig {
    fn default() -> Self {
        Self {
            eye_separation: DEFAULT_EYE_SEPARATION,
        }
    }
}

impl StereoRig {
    /// Rig with an explicit interocular distance.
    pub const fn new(eye_separation: f32) -> Self {
        Self { eye_separation }
    }

    /// Camera for one eye: same orientation as the mono camera, eye
    /// offset half the separation along the camera's right axis, aspect
    /// halved for the split viewport.
    pub fn eye_camera(&self, mono: &Camera, eye: Eye) -> Camera {
        let half = self.eye_separation / 2.0;
        let offset = match eye {
            Eye::Left => -half,
            Eye::Right => half,
        };
        let mut camera = mono.clone();
        camera.eye = mono.eye + mono.right() * offset;
        camera.aspect = mono.aspect / 2.0;
        camera
    }

    /// Both eye cameras, left then right.
    pub fn cameras(&self, mono: &Camera) -> [Camera; 2] {
        [
            self.eye_camera(mono, Eye::Left),
            self.eye_camera(mono, Eye::Right),
        ]
    }

    /// The sub-viewport one eye renders into. Landscape splits left/right,
    /// portrait top/bottom.
    pub fn eye_viewport(&self, full: Viewport, eye: Eye) -> (Viewport, f32, f32) {
        if full.width < full.height {
            let half = Viewport::new(full.width, full.height / 2.0);
            let origin_y = match eye {
                Eye::Left => 0.0,
                Eye::Right => full.height / 2.0,
            };
            (half, 0.0, origin_y)
        } else {
            let half = Viewport::new(full.width / 2.0, full.height);
            let origin_x = match eye {
                Eye::Left => 0.0,
                Eye::Right => full.width / 2.0,
            };
            (half, origin_x, 0.0)
        }
    }

    /// Centered gaze focus rectangle for one eye, in full-viewport pixel
    /// coordinates. An overlay projected inside it becomes the gaze
    /// target; the host runs the dwell countdown.
    pub fn focus_rect(&self, full: Viewport, eye: Eye) -> FocusRect {
        let center_left = full.width / 2.0 - FOCUSER_SIZE / 2.0;
        let center_top = full.height / 2.0 - FOCUSER_SIZE / 2.0;
        if full.width < full.height {
            let base = full.height / 4.0;
            let offset = match eye {
                Eye::Left => -base,
                Eye::Right => base,
            };
            FocusRect {
                left: center_left,
                top: center_top + offset,
                width: FOCUSER_SIZE,
                height: FOCUSER_SIZE,
            }
        } else {
            let base = full.width / 4.0;
            let offset = match eye {
                Eye::Left => -base,
                Eye::Right => base,
            };
            FocusRect {
                left: center_left + offset,
                top: center_top,
                width: FOCUSER_SIZE,
                height: FOCUSER_SIZE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eyes_are_separated_along_right_axis() {
        let rig = StereoRig::default();
        let mono = Camera::default();
        let [left, right] = rig.cameras(&mono);
        let delta = right.eye - left.eye;
        assert!((delta.length() - rig.eye_separation).abs() < 1e-6);
        assert!(delta.dot(Vec3::X) > 0.0);
    }

    #[test]
    fn test_eye_aspect_halved() {
        let rig = StereoRig::default();
        let mono = Camera::default();
        let left = rig.eye_camera(&mono, Eye::Left);
        assert!((left.aspect - mono.aspect / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_landscape_viewport_split() {
        let rig = StereoRig::default();
        let full = Viewport::new(1600.0, 900.0);
        let (half, x, _) = rig.eye_viewport(full, Eye::Right);
        assert_eq!(half.width, 800.0);
        assert_eq!(x, 800.0);
    }

    #[test]
    fn test_focus_rects_mirror_each_other() {
        let rig = StereoRig::default();
        let full = Viewport::new(1600.0, 900.0);
        let left = rig.focus_rect(full, Eye::Left);
        let right = rig.focus_rect(full, Eye::Right);
        assert!(left.left < right.left);
        assert_eq!(left.top, right.top);
        assert!(left.contains(left.left + 25.0, left.top + 25.0));
        assert!(!left.contains(right.left + 25.0, right.top + 25.0));
    }
}
