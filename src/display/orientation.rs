//! Screen orientation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LuceroError;

/// Screen orientation as seen by the user.
///
/// Revision B panels only distinguish portrait from landscape; the reverse
/// variants share a device value with their forward counterpart and are
/// expected to be handled by rotating the image before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
    ReversePortrait,
    ReverseLandscape,
}

impl Orientation {
    /// Payload byte for the SetOrientation command.
    ///
    /// | Orientation | Value |
    /// |-------------|-------|
    /// | Portrait, ReversePortrait | 0 |
    /// | Landscape, ReverseLandscape | 1 |
    #[inline]
    pub fn device_value(self) -> u8 {
        match self {
            Self::Portrait | Self::ReversePortrait => 0,
            Self::Landscape | Self::ReverseLandscape => 1,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
            Self::ReversePortrait => "reverse-portrait",
            Self::ReverseLandscape => "reverse-landscape",
        };
        f.write_str(name)
    }
}

impl FromStr for Orientation {
    type Err = LuceroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "portrait" => Ok(Self::Portrait),
            "landscape" => Ok(Self::Landscape),
            "reverse-portrait" => Ok(Self::ReversePortrait),
            "reverse-landscape" => Ok(Self::ReverseLandscape),
            other => Err(LuceroError::InvalidArgument(format!(
                "unknown orientation '{}'",
                other
            ))),
        }
    }
}
