// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Tests may assert by panicking
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
// Graphics math: casts and float comparison are intentional
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]
#![allow(clippy::many_single_char_names)]

//! Spherical panorama orientation, projection and annotation engine.
//!
//! Sphaira keeps a 360° panorama, its camera and its annotations
//! mutually consistent frame over frame: two rotation sources compose
//! into one camera orientation, screen pixels map both ways to sphere
//! angle coordinates, textures stream progressively from thumbnail to
//! tile grid, and line/polygon annotations are clipped against the view
//! with a bisected boundary search so paths fade at the horizon instead
//! of wrapping across the sphere's back side.
//!
//! # Key entry points
//!
//! - [`engine::PanoramaEngine`] - the per-frame engine driven by the host
//! - [`camera::OrientationComposer`] - correction ∘ manual orientation
//! - [`projection::AngleProjector`] - pixel ↔ angle mapping
//! - [`streaming::TileStreamer`] - thumbnail/tile-grid streaming
//! - [`scene::SceneDescriptor`] - the host's wire format
//!
//! # Architecture
//!
//! Everything runs on one cooperatively scheduled render loop: the host
//! calls [`engine::PanoramaEngine::tick`] once per display frame with
//! the current instant, a [`streaming::TextureLoader`] and a
//! [`streaming::RenderTarget`]. Asynchronous texture results are tagged
//! with their owning scene key and dropped when stale; animations are
//! explicit interpolation tasks advanced by the tick. No threads, no
//! async runtime.

pub mod animation;
pub mod annotation;
pub mod camera;
pub mod engine;
pub mod error;
pub mod events;
pub mod input;
pub mod options;
pub mod projection;
pub mod scene;
pub mod streaming;

pub use engine::PanoramaEngine;
pub use error::SphairaError;
