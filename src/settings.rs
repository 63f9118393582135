//! Visual settings for a generated code.
//!
//! [`Settings`] is the snapshot stored with every history entry, so its JSON
//! shape (camelCase keys, lowercase enum tags) is part of the history file
//! format and must stay stable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payload::{FALLBACK_URL, PayloadKind};

pub const MIN_SIZE: u32 = 100;
pub const MAX_SIZE: u32 = 2000;
pub const MIN_LOGO_PERCENT: u32 = 5;
pub const MAX_LOGO_PERCENT: u32 = 50;

/// Errors raised by [`Settings::validate`] and color parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid color '{0}': expected #rrggbb")]
    InvalidColor(String),

    #[error("Size {0}px is out of range (100-2000)")]
    SizeOutOfRange(u32),

    #[error("Logo size {0}% is out of range (5-50)")]
    LogoSizeOutOfRange(u32),

    #[error("Content is empty")]
    EmptyContent,
}

/// Module shape preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Square,
    Rounded,
    Dots,
    Diamond,
}

impl Shape {
    pub fn label(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Rounded => "rounded",
            Self::Dots => "dots",
            Self::Diamond => "diamond",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Square, Self::Rounded, Self::Dots, Self::Diamond]
    }
}

impl std::str::FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "rounded" => Ok(Self::Rounded),
            "dots" | "dot" => Ok(Self::Dots),
            "diamond" => Ok(Self::Diamond),
            _ => Err(format!("Unknown shape: {}", s)),
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl ErrorCorrection {
    pub fn to_ec_level(self) -> qrcode::EcLevel {
        match self {
            Self::L => qrcode::EcLevel::L,
            Self::M => qrcode::EcLevel::M,
            Self::Q => qrcode::EcLevel::Q,
            Self::H => qrcode::EcLevel::H,
        }
    }
}

impl std::str::FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            _ => Err(format!("Unknown error correction level: {}", s)),
        }
    }
}

impl std::fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(c)
    }
}

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Parse `#rrggbb` or `#rgb`.
    pub fn parse(input: &str) -> Result<Self, SettingsError> {
        let err = || SettingsError::InvalidColor(input.to_string());
        let hex = input.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(err()),
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| err());
        Ok(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Linear interpolation between two colors, `t` clamped to `0..=1`.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// Visual settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub content: String,
    pub shape: Shape,
    pub fg_color: String,
    pub bg_color: String,
    pub gradient: bool,
    pub gradient_start: String,
    pub gradient_end: String,
    pub transparent: bool,
    /// Logo edge as a percentage of the code's edge.
    pub logo_size: u32,
    /// Output edge in pixels.
    pub size: u32,
    pub error_correction: ErrorCorrection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kind: PayloadKind::Url,
            content: FALLBACK_URL.to_string(),
            shape: Shape::Square,
            fg_color: "#1a1a2e".to_string(),
            bg_color: "#ffffff".to_string(),
            gradient: false,
            gradient_start: "#667eea".to_string(),
            gradient_end: "#764ba2".to_string(),
            transparent: false,
            logo_size: 25,
            size: 300,
            error_correction: ErrorCorrection::M,
        }
    }
}

impl Settings {
    /// Check ranges and color syntax.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.content.is_empty() {
            return Err(SettingsError::EmptyContent);
        }
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.size) {
            return Err(SettingsError::SizeOutOfRange(self.size));
        }
        if !(MIN_LOGO_PERCENT..=MAX_LOGO_PERCENT).contains(&self.logo_size) {
            return Err(SettingsError::LogoSizeOutOfRange(self.logo_size));
        }
        for color in [
            &self.fg_color,
            &self.bg_color,
            &self.gradient_start,
            &self.gradient_end,
        ] {
            Rgb::parse(color)?;
        }
        Ok(())
    }

    /// Apply the non-empty fields of `overrides` on top of these settings.
    pub fn apply(&mut self, overrides: &SettingsOverrides) {
        if let Some(kind) = overrides.kind {
            self.kind = kind;
        }
        if let Some(shape) = overrides.shape {
            self.shape = shape;
        }
        if let Some(c) = &overrides.fg_color {
            self.fg_color = c.clone();
        }
        if let Some(c) = &overrides.bg_color {
            self.bg_color = c.clone();
        }
        if let Some(g) = overrides.gradient {
            self.gradient = g;
        }
        if let Some(c) = &overrides.gradient_start {
            self.gradient_start = c.clone();
        }
        if let Some(c) = &overrides.gradient_end {
            self.gradient_end = c.clone();
        }
        if let Some(t) = overrides.transparent {
            self.transparent = t;
        }
        if let Some(l) = overrides.logo_size {
            self.logo_size = l;
        }
        if let Some(s) = overrides.size {
            self.size = s;
        }
        if let Some(ec) = overrides.error_correction {
            self.error_correction = ec;
        }
    }
}

/// Partial settings, as read from the `[defaults]` config table or CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsOverrides {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PayloadKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_correction: Option<ErrorCorrection>,
}
