//! Stroke and fill styling for annotation entities.
//!
//! Scene descriptors carry CSS-style color strings (`#rgb`, `#rrggbb`,
//! `rgba(...)`); they are parsed lazily at render time so malformed
//! values degrade to the defaults instead of failing the scene load.

/// An RGBA color with 8-bit channels and a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Opacity in [0, 1].
    pub alpha: f32,
}

impl Rgba {
    /// Build an opaque color.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.0,
        }
    }

    /// Parse a CSS color string: `#rgb`, `#rrggbb` or `rgba(r,g,b,a)`.
    /// Returns `None` for anything else.
    pub fn parse_css(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            let expanded: String = if hex.len() == 3 {
                hex.chars().flat_map(|c| [c, c]).collect()
            } else {
                hex.to_owned()
            };
            if expanded.len() != 6 {
                return None;
            }
            let red = u8::from_str_radix(&expanded[0..2], 16).ok()?;
            let green = u8::from_str_radix(&expanded[2..4], 16).ok()?;
            let blue = u8::from_str_radix(&expanded[4..6], 16).ok()?;
            return Some(Self::rgb(red, green, blue));
        }
        if let Some(body) = value.strip_prefix("rgba(").and_then(|v| v.strip_suffix(')')) {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if parts.len() != 4 {
                return None;
            }
            return Some(Self {
                red: parts[0].parse().ok()?,
                green: parts[1].parse().ok()?,
                blue: parts[2].parse().ok()?,
                alpha: parts[3].parse().ok()?,
            });
        }
        None
    }
}

/// Dash pattern of a stroked path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokePattern {
    /// Continuous line.
    #[default]
    Solid,
    /// Long dashes.
    Dashed,
    /// Dash-dot alternation.
    DotLine,
    /// Evenly spaced dots.
    Dots,
}

impl StrokePattern {
    /// Parse the descriptor's `lineType` string; unknown values fall back
    /// to solid.
    pub fn parse(value: &str) -> Self {
        match value {
            "dashed" => Self::Dashed,
            "dot-line" => Self::DotLine,
            "dots" => Self::Dots,
            _ => Self::Solid,
        }
    }

    /// Dash segment lengths for 2D stroking, scaled by the stroke width.
    /// Empty means solid.
    pub fn dash_lengths(&self, width: f32) -> Vec<f32> {
        let w = width.max(2.0);
        match self {
            Self::Solid => Vec::new(),
            Self::Dashed => vec![10.0, w],
            Self::DotLine => vec![15.0, w, w, w],
            Self::Dots => vec![w, w],
        }
    }
}

/// Resolved stroke style for one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    /// Stroke color.
    pub color: Rgba,
    /// Stroke width in pixels.
    pub width: f32,
    /// Dash pattern.
    pub pattern: StrokePattern,
}

/// Default used when an entity carries no stroke color or a malformed one.
pub const DEFAULT_STROKE_COLOR: Rgba = Rgba {
    red: 200,
    green: 200,
    blue: 200,
    alpha: 0.5,
};

/// Default hover variant.
pub const DEFAULT_HOVER_COLOR: Rgba = Rgba {
    red: 200,
    green: 200,
    blue: 200,
    alpha: 0.9,
};

/// Resolve an optional CSS color string against a default.
pub fn resolve_color(value: Option<&str>, default: Rgba) -> Rgba {
    value.and_then(Rgba::parse_css).unwrap_or(default)
}
