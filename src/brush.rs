use std::{fmt, str::FromStr};

use bytemuck::{Pod, Zeroable};
use serde::{de::Visitor, Deserialize};

/// An 8-bit RGBA color with straight (non-premultiplied) alpha.
///
/// Also used as the pixel type of [`Pixmap`](crate::raster::Pixmap), so its layout must stay
/// `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xff)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl FromStr for Color {
    type Err = String;

    /// Parses `#RRGGBB` or `#AARRGGBB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{s}' must start with '#'"))?;
        let value = match hex.len() {
            6 | 8 if hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                u32::from_str_radix(hex, 16).map_err(|e| format!("color '{s}': {e}"))?
            }
            _ => return Err(format!("color '{s}' must be #RRGGBB or #AARRGGBB hex")),
        };
        let [a, r, g, b] = value.to_be_bytes();
        Ok(if hex.len() == 6 {
            Self::rgb(r, g, b)
        } else {
            Self::rgba(r, g, b, a)
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xff {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                self.a, self.r, self.g, self.b
            )
        }
    }
}

impl<'a> Deserialize<'a> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        struct HexVisitor;

        impl<'de> Visitor<'de> for HexVisitor {
            type Value = Color;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("hex color string like \"#FF0000\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/// One of the three brush width presets offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushSize {
    Small,
    Medium,
    Large,
}

impl BrushSize {
    pub fn index(self) -> usize {
        match self {
            BrushSize::Small => 0,
            BrushSize::Medium => 1,
            BrushSize::Large => 2,
        }
    }
}

/// The brush applied to strokes started from now on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushConfig {
    pub color: Color,
    /// Line width in pixels.
    pub width: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 10.0,
        }
    }
}
