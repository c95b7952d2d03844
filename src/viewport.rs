use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Fixed browser viewport applied once before the route loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewportParseError {
    #[error("Invalid viewport format: expected WIDTHxHEIGHT (e.g., 1280x720)")]
    InvalidFormat,
    #[error("Invalid width: {0}")]
    InvalidWidth(String),
    #[error("Invalid height: {0}")]
    InvalidHeight(String),
    #[error("Width must be positive")]
    ZeroWidth,
    #[error("Height must be positive")]
    ZeroHeight,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, ViewportParseError> {
        if width == 0 {
            return Err(ViewportParseError::ZeroWidth);
        }
        if height == 0 {
            return Err(ViewportParseError::ZeroHeight);
        }
        Ok(Self { width, height })
    }
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or(ViewportParseError::InvalidFormat)?;
        if height.contains(['x', 'X']) {
            return Err(ViewportParseError::InvalidFormat);
        }

        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidWidth(width.trim().to_string()))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidHeight(height.trim().to_string()))?;

        Viewport::new(width, height)
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// Config files may spell the viewport as `{ width, height }` or as "1280x720".
impl<'de> Deserialize<'de> for Viewport {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Dims { width: u32, height: u32 },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Dims { width, height } => {
                Viewport::new(width, height).map_err(serde::de::Error::custom)
            }
        }
    }
}
