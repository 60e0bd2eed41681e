use std::fmt;
use std::str::FromStr;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// An opaque RGB color, serialized as `#rrggbb`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }

    /// Scales the brightness by `1 + factor`, clamping every channel.
    pub fn adjusted(self, factor: f32) -> Color {
        let f = |c: u8| (c as f32 * (1.0 + factor)).round().clamp(0.0, 255.0) as u8;
        Color::new(f(self.r), f(self.g), f(self.b))
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Color> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(anyhow!("invalid color {s:?}, expected #rrggbb"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i .. i + 2], 16)
                .map_err(|_| anyhow!("invalid color {s:?}, expected #rrggbb"))
        };
        Ok(Color::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Color> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
