use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// RGB colour with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Colour {
    /// Colour used for files without an extension
    pub const NEUTRAL: Colour = Colour {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Deterministic colour for an arbitrary string (a file extension)
    pub fn hashed(value: &str) -> Self {
        let digest = Sha256::digest(value.as_bytes());
        Self::from_rgb8(digest[0], digest[1], digest[2])
    }

    /// Colour for a file path: hashed from the extension, or [`Colour::NEUTRAL`]
    pub fn for_path(path: &str) -> Self {
        match extension(path) {
            Some(ext) => Self::hashed(ext),
            None => Self::NEUTRAL,
        }
    }

    /// Parse `RRGGBB` or `#RRGGBB`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Upper-case `RRGGBB`
    pub fn to_hex(&self) -> String {
        let to8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("{:02X}{:02X}{:02X}", to8(self.r), to8(self.g), to8(self.b))
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Extension of the last path component, if it has a non-empty one
pub fn extension(path: &str) -> Option<&str> {
    let dot = path.rfind('.')?;
    if dot + 1 >= path.len() {
        return None;
    }
    match path.rfind('/') {
        Some(slash) if slash > dot => None,
        _ => Some(&path[dot + 1..]),
    }
}
