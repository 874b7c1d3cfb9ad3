//! Camera orientation: rotation models, composition, frustum, stereo.

mod core;
mod frustum;
mod orientation;
mod rotation;
mod stereo;

pub use core::{Camera, DEFAULT_FOV};
pub use frustum::{Frustum, Plane};
pub use orientation::{OrientationComposer, ENTRY_POSE};
pub use rotation::{RotationKind, RotationModel};
pub use stereo::{Eye, FocusRect, StereoRig, DEFAULT_EYE_SEPARATION};
