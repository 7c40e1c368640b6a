use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An sRGB color. Serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to `0.0..=1.0`, as PDF color operators expect them.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parses `#RGB` or `#RRGGBB` (case-insensitive).
    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
                Some(Self::new(r, g, b))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::new(r, g, b))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s).ok_or_else(|| crate::Error::InvalidColor {
            value: s.to_string(),
        })
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::parse_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color {raw:?}")))
    }
}

/// Report color palette.
///
/// `good`/`warn`/`bad` carry qualitative status (above/within/below an expected band); the
/// composer picks one per bar or chart series, primitives never derive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub primary: Rgb,
    pub dark: Rgb,
    pub muted: Rgb,
    pub card_background: Rgb,
    pub line: Rgb,
    pub track: Rgb,
    pub good: Rgb,
    pub warn: Rgb,
    pub bad: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Rgb::new(44, 16, 156),
            dark: Rgb::new(20, 20, 30),
            muted: Rgb::new(105, 105, 120),
            card_background: Rgb::new(246, 246, 250),
            line: Rgb::new(225, 225, 235),
            track: Rgb::new(232, 232, 240),
            good: Rgb::new(21, 128, 61),
            warn: Rgb::new(180, 83, 9),
            bad: Rgb::new(185, 28, 28),
        }
    }
}
