//! # Display Configuration
//!
//! Panel geometry plus the defaults applied when a session starts:
//! brightness, backplate LED colour and orientation.
//!
//! ## Built-in Presets
//!
//! | Preset | Resolution | Backplate LED |
//! |--------|------------|---------------|
//! | `turing-3.5` | 320x480 | no |
//! | `flagship-3.5` | 320x480 | yes |
//!
//! ## Loading from JSON
//!
//! ```
//! use lucero::display::{DisplayConfig, Orientation};
//!
//! let config = DisplayConfig::from_json(r#"{
//!     "name": "Desk panel",
//!     "width": 320,
//!     "height": 480,
//!     "brightness": 40,
//!     "orientation": "landscape"
//! }"#)?;
//! assert_eq!(config.orientation, Orientation::Landscape);
//! assert_eq!(config.backplate_color, [255, 255, 255]);
//! # Ok::<(), lucero::LuceroError>(())
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::orientation::Orientation;
use crate::error::LuceroError;
use crate::transport::SerialSettings;

/// # Display Configuration
///
/// Width and height are the panel's native (portrait) resolution in pixels.
/// Brightness is a percentage, 0-100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Human-readable name
    pub name: String,

    /// Display width in pixels
    pub width: u16,

    /// Display height in pixels
    pub height: u16,

    /// Default brightness (used by `screen_on`), 0-100
    pub brightness: u8,

    /// Default backplate LED colour (flagship panels only)
    pub backplate_color: [u8; 3],

    /// Default orientation
    pub orientation: Orientation,

    /// Serial line settings
    pub serial: SerialSettings,
}

impl DisplayConfig {
    /// 3.5" revision B panel, 320x480
    pub fn turing_3_5() -> Self {
        Self {
            name: "Turing 3.5\" rev B".to_string(),
            width: 320,
            height: 480,
            brightness: 20,
            backplate_color: [255, 255, 255],
            orientation: Orientation::Portrait,
            serial: SerialSettings::default(),
        }
    }

    /// 3.5" "flagship" panel with RGB backplate, 320x480
    pub fn flagship_3_5() -> Self {
        Self {
            name: "Flagship 3.5\"".to_string(),
            ..Self::turing_3_5()
        }
    }

    /// Bytes of pixel data sent per write while streaming a bitmap
    /// (8 display rows' worth).
    #[inline]
    pub fn line_chunk_bytes(&self) -> usize {
        self.width as usize * 8
    }

    /// Check that the configuration describes a usable panel.
    pub fn validate(&self) -> Result<(), LuceroError> {
        if self.width == 0 || self.height == 0 {
            return Err(LuceroError::Config(format!(
                "display dimensions must be non-zero (got {}x{})",
                self.width, self.height
            )));
        }
        if self.brightness > 100 {
            return Err(LuceroError::Config(format!(
                "brightness must be 0-100 (got {})",
                self.brightness
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// values from [`DisplayConfig::default`].
    pub fn from_json(json: &str) -> Result<Self, LuceroError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LuceroError::Config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LuceroError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            LuceroError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Look up a built-in preset by its short name.
    pub fn preset(name: &str) -> Result<Self, LuceroError> {
        match name.to_lowercase().as_str() {
            "turing-3.5" | "rev-b" => Ok(Self::turing_3_5()),
            "flagship-3.5" | "flagship" => Ok(Self::flagship_3_5()),
            other => Err(LuceroError::Config(format!(
                "unknown preset '{}'. Use one of: {}",
                other,
                Self::preset_names().join(", ")
            ))),
        }
    }

    pub fn preset_names() -> &'static [&'static str] {
        &["turing-3.5", "flagship-3.5"]
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::turing_3_5()
    }
}

// ============================================================================
// TESTS
// ============================================================================
