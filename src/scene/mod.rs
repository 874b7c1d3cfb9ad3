//! Scene descriptors: the host's wire format for panoramas and their
//! annotations.
//!
//! Field names follow the host's camelCase JSON. Descriptors are swapped
//! wholesale on scene-to-scene navigation; the previous scene's live
//! rotation is written back before switching so re-entering a scene
//! restores where the user left off.

use serde::{Deserialize, Serialize};

use crate::error::SphairaError;

/// Stable identity of a scene, used to tag asynchronous work so results
/// arriving after a scene switch can be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneKey(pub String);

impl SceneKey {
    /// Key from any string-ish id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SceneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Thumbnail plus tile grid image sources for the panorama sphere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SphereSource {
    /// Low-resolution full-sphere texture, loaded first.
    pub thumb: String,
    /// Row-major grid of high-resolution tile URLs.
    #[serde(default)]
    pub slices: Vec<Vec<String>>,
}

/// Per-scene camera parameters and image sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneParams {
    /// Persisted manual rotation `[alpha, beta, gamma]` degrees.
    pub rotation: [f32; 3],
    /// Persisted correction rotation `[alpha, beta, gamma]` degrees.
    pub correction: [f32; 3],
    /// Narrowest allowed field of view in degrees (zoomed in).
    pub angle_near: f32,
    /// Field of view applied when the scene is entered.
    pub angle_init: f32,
    /// Widest allowed field of view in degrees (zoomed out).
    pub angle_far: f32,
    /// Nonzero marks the scene the browser opens on.
    #[serde(default)]
    pub is_default: i32,
    /// Sphere texture sources.
    pub sphere_source: SphereSource,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            rotation: [0.0, 0.0, 0.0],
            correction: [0.0, 0.0, 0.0],
            angle_near: 40.0,
            angle_init: 90.0,
            angle_far: 100.0,
            is_default: 0,
            sphere_source: SphereSource::default(),
        }
    }
}

/// A navigation overlay: a clickable marker that walks to another scene.
///
/// Entries without `x`/`y` are auto-placed at the current screen centre
/// when the scene is shown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayData {
    /// Display label.
    #[serde(default)]
    pub title: String,
    /// Marker icon URL.
    #[serde(default)]
    pub icon: Option<String>,
    /// Longitude in radians, if authored.
    #[serde(default)]
    pub x: Option<f32>,
    /// Latitude in radians, if authored.
    #[serde(default)]
    pub y: Option<f32>,
    /// Whether the overlay is shown at all.
    #[serde(default)]
    pub enable: bool,
    /// Key of the scene this overlay walks to.
    #[serde(default, rename = "next_photo_key")]
    pub next_photo_key: Option<String>,
}

/// A point marker annotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DotData {
    /// Host-assigned identity.
    #[serde(default)]
    pub id: Option<String>,
    /// Display label.
    #[serde(default)]
    pub title: String,
    /// Longitude in radians.
    pub x: f32,
    /// Latitude in radians.
    pub y: f32,
    /// Marker icon URL.
    #[serde(default)]
    pub mark_pic: Option<String>,
    /// Label color override.
    #[serde(default)]
    pub title_color: Option<String>,
    /// Label font size override.
    #[serde(default)]
    pub title_font_size: Option<f32>,
    /// Whether the marker opens a rich-text popup.
    #[serde(default)]
    pub enable_tooltip: bool,
    /// Base64 popup content.
    #[serde(default)]
    pub content: String,
    /// Hidden entities are kept in the data but never rendered.
    #[serde(default)]
    pub is_hidden: bool,
}

/// One annotation point of a line or polygon, as angle radians.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PointData {
    /// Longitude in radians.
    pub x: f32,
    /// Latitude in radians.
    pub y: f32,
}

/// A line or polygon annotation as carried on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeData {
    /// Host-assigned identity.
    #[serde(default)]
    pub id: Option<String>,
    /// Display label.
    #[serde(default)]
    pub title: String,
    /// Whether the label is drawn next to the path.
    #[serde(default)]
    pub show_content: bool,
    /// Stroke color (CSS string).
    #[serde(default)]
    pub line_color: Option<String>,
    /// Stroke dash pattern name.
    #[serde(default)]
    pub line_type: Option<String>,
    /// Stroke width in pixels.
    #[serde(default)]
    pub line_width: Option<f32>,
    /// Hover stroke color.
    #[serde(default)]
    pub line_color_hover: Option<String>,
    /// Hover dash pattern name.
    #[serde(default)]
    pub line_type_hover: Option<String>,
    /// Hover stroke width.
    #[serde(default)]
    pub line_width_hover: Option<f32>,
    /// Fill color (polygons only).
    #[serde(default)]
    pub fill_color: Option<String>,
    /// Hover fill color (polygons only).
    #[serde(default)]
    pub fill_color_hover: Option<String>,
    /// Whether the first point opens a rich-text popup.
    #[serde(default)]
    pub enable_tooltip: bool,
    /// Base64 popup content.
    #[serde(default)]
    pub content: String,
    /// Ordered path points; order defines path order.
    #[serde(default)]
    pub points: Vec<PointData>,
    /// Hidden entities are kept in the data but never rendered.
    #[serde(default)]
    pub is_hidden: bool,
}

/// A whole scene: camera parameters plus its annotation sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescriptor {
    /// Stable scene id; also the key overlays walk to.
    pub id: String,
    /// Camera parameters and image sources.
    pub scene: SceneParams,
    /// Navigation overlays.
    #[serde(default)]
    pub overlays: Vec<OverlayData>,
    /// Point markers.
    #[serde(default)]
    pub dots: Vec<DotData>,
    /// Line annotations.
    #[serde(default)]
    pub lines: Vec<ShapeData>,
    /// Polygon annotations.
    #[serde(default)]
    pub polygons: Vec<ShapeData>,
}

impl SceneDescriptor {
    /// Key identifying this scene.
    pub fn key(&self) -> SceneKey {
        SceneKey::new(self.id.clone())
    }

    /// Parse one descriptor from JSON.
    pub fn from_json(json: &str) -> Result<Self, SphairaError> {
        serde_json::from_str(json).map_err(|e| SphairaError::DescriptorParse(e.to_string()))
    }

    /// Parse a list of descriptors from JSON.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, SphairaError> {
        serde_json::from_str(json).map_err(|e| SphairaError::DescriptorParse(e.to_string()))
    }
}
