//! Style configuration with TOML preset support.
//!
//! Styles are plain data passed into the representation constructors —
//! deliberately decoupled from any render-node or material lifecycle.
//! All structs use `#[serde(default)]` so partial preset files (e.g.
//! only overriding `[stick]`) work correctly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MolmeshError;

/// Shading parameters for the merged-stick representations.
///
/// `scale` seeds the SCALE parameter row of every stick at build time;
/// the remaining fields are pass-through for the external shading stage
/// and do not affect the emitted geometry or parameter rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StickStyle {
    /// Cylinder radius scale, written to the SCALE row at build time.
    pub scale: f32,
    /// Link shrink factor (shading-stage pass-through).
    pub shrink: f32,
    /// Whether sticks cast and receive shadows (pass-through).
    pub with_shadow: bool,
    /// Shading brightness multiplier (pass-through).
    pub brightness: f32,
    /// Distance attenuation (pass-through).
    pub attenuation: f32,
}

impl Default for StickStyle {
    fn default() -> Self {
        Self {
            scale: 0.035,
            shrink: 0.001,
            with_shadow: true,
            brightness: 1.0,
            attenuation: 0.0,
        }
    }
}

/// Shading parameters for the merged-sphere representation.
///
/// `scale` seeds the SCALE parameter row of every sphere at build time;
/// `brightness` and `with_shadow` are pass-through for the external
/// shading stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SphereStyle {
    /// Global sphere scale, written to the SCALE row at build time.
    pub scale: f32,
    /// Shading brightness multiplier (pass-through).
    pub brightness: f32,
    /// Whether spheres cast and receive shadows (pass-through).
    pub with_shadow: bool,
}

impl Default for SphereStyle {
    fn default() -> Self {
        Self {
            scale: 1.0,
            brightness: 1.0,
            with_shadow: true,
        }
    }
}

/// Top-level style container for preset files.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default,
)]
#[serde(default)]
pub struct Styles {
    /// Stick representation style.
    pub stick: StickStyle,
    /// Sphere representation style.
    pub sphere: SphereStyle,
}

impl Styles {
    /// Load styles from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::Io`] when the file cannot be read,
    /// [`MolmeshError::StyleParse`] on malformed TOML.
    pub fn load(path: &Path) -> Result<Self, MolmeshError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| MolmeshError::StyleParse(e.to_string()))
    }

    /// Save styles to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`MolmeshError::Io`] when the file cannot be written,
    /// [`MolmeshError::StyleParse`] on serialization failure.
    pub fn save(&self, path: &Path) -> Result<(), MolmeshError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MolmeshError::StyleParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
