//! Composition of the correction and manual rotations into the camera
//! orientation.

use glam::Quat;

use super::rotation::{RotationKind, RotationModel};

/// Manual pose every scene entry animates *from*: looking down and
/// rotated so the opening flight sweeps up into the authored view.
pub const ENTRY_POSE: [f32; 3] = [70.0, -90.0, 0.0];

/// Owns the correction and manual rotation models and keeps their
/// composition current.
///
/// The composed orientation is `correction ∘ manual` (correction applied
/// outermost). Every mutation recomposes immediately; there is no
/// deferred update, so the camera quaternion read after any setter
/// already reflects it.
#[derive(Debug, Clone)]
pub struct OrientationComposer {
    correction: RotationModel,
    manual: RotationModel,
    composed: Quat,
}

impl Default for OrientationComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationComposer {
    /// Composer with zero correction and the manual model at
    /// [`ENTRY_POSE`].
    pub fn new() -> Self {
        let mut composer = Self {
            correction: RotationModel::new(RotationKind::Correction, 0.0, 0.0, 0.0),
            manual: RotationModel::new(
                RotationKind::Manual,
                ENTRY_POSE[0],
                ENTRY_POSE[1],
                ENTRY_POSE[2],
            ),
            composed: Quat::IDENTITY,
        };
        composer.recompose();
        composer
    }

    fn recompose(&mut self) {
        self.composed = self.correction.quaternion() * self.manual.quaternion();
    }

    /// The composed camera orientation.
    pub const fn quaternion(&self) -> Quat {
        self.composed
    }

    /// Reset either sub-model (or both) and recompose.
    pub fn set_init_rotation(
        &mut self,
        correction: Option<[f32; 3]>,
        rotation: Option<[f32; 3]>,
    ) {
        if let Some(angles) = correction {
            self.correction.reset(angles);
        }
        if let Some(angles) = rotation {
            self.manual.reset(angles);
        }
        self.recompose();
    }

    /// Correction yaw in degrees.
    pub fn set_yaw(&mut self, value: f32) {
        self.correction.set_alpha(value);
        self.recompose();
    }

    /// Correction pitch in degrees, clamped to ±90.
    pub fn set_pitch(&mut self, value: f32) {
        self.correction.set_beta(value);
        self.recompose();
    }

    /// Correction roll in degrees.
    pub fn set_roll(&mut self, value: f32) {
        self.correction.set_gamma(value);
        self.recompose();
    }

    /// Manual yaw (alpha) in degrees.
    pub fn set_manual_yaw(&mut self, value: f32) {
        self.manual.set_alpha(value);
        self.recompose();
    }

    /// Manual pitch (beta) in degrees, clamped to ±90.
    pub fn set_manual_pitch(&mut self, value: f32) {
        self.manual.set_beta(value);
        self.recompose();
    }

    /// Live manual angles `[alpha, beta, gamma]` for persistence.
    pub const fn manual_angles(&self) -> [f32; 3] {
        self.manual.angles()
    }

    /// Live correction angles `[alpha, beta, gamma]` for persistence.
    pub const fn correction_angles(&self) -> [f32; 3] {
        self.correction.angles()
    }

    /// Recover the manual rotation from an externally observed camera
    /// quaternion: `manual = correction⁻¹ * camera`.
    ///
    /// Used when leaving sensor-driven mode so the manual model picks up
    /// where the sensors pointed the camera.
    pub fn derive_manual_from_camera(&mut self, camera: Quat) {
        let manual = self.correction.quaternion().inverse() * camera;
        self.manual.set_from_quaternion(manual);
        self.recompose();
    }
}
