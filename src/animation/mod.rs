//! Explicit interpolation tasks and their easing curves.

mod easing;
mod tween;

pub use easing::EasingFunction;
pub use tween::{Lerp, Tween};
