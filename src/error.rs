//! Crate-level error types.

use std::fmt;

/// Errors produced by the sphaira crate.
///
/// The render path absorbs its own failures (missing tiles, sentinel
/// angles, stale loads); these variants cover the genuinely fallible
/// edges: parsing host input and resolving scene keys.
#[derive(Debug)]
pub enum SphairaError {
    /// Scene descriptor JSON parsing failure.
    DescriptorParse(String),
    /// Engine options TOML parsing/serialization failure.
    OptionsParse(String),
    /// A scene switch named a key that is not loaded.
    SceneNotFound(String),
}

impl fmt::Display for SphairaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DescriptorParse(msg) => {
                write!(f, "scene descriptor parse error: {msg}")
            }
            Self::OptionsParse(msg) => write!(f, "options parse error: {msg}"),
            Self::SceneNotFound(key) => write!(f, "unknown scene key: {key}"),
        }
    }
}

impl std::error::Error for SphairaError {}
