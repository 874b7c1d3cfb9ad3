use glam::{Mat4, Quat, Vec3};

/// Default vertical field of view restored on every scene switch.
pub const DEFAULT_FOV: f32 = 90.0;

/// Perspective camera at the centre of the panorama sphere, oriented by
/// a quaternion.
///
/// The eye sits at the origin in mono mode; stereo rigs offset it along
/// the camera's right axis.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye position in world space.
    pub eye: Vec3,
    /// Camera orientation.
    pub orientation: Quat,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            aspect: 16.0 / 9.0,
            fovy: DEFAULT_FOV,
            znear: 1.0,
            zfar: 1000.0,
        }
    }
}

impl Camera {
    /// Build the combined view-projection matrix.
    pub fn build_matrix(&self) -> Mat4 {
        let view = Mat4::from_rotation_translation(self.orientation, self.eye).inverse();
        // perspective_rh_gl uses [-1,1] depth (the convention the stored
        // calibration constants were derived under)
        let proj = Mat4::perspective_rh_gl(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        );
        proj * view
    }

    /// Camera forward direction in world space.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Camera right direction in world space.
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// Update the aspect ratio after a viewport resize.
    pub fn resize(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }
}
