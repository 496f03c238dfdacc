//! Reader display settings.
//!
//! Settings travel as camelCase JSON between the server and its clients
//! and feed the presentation normalizer as inline-style inputs. Values
//! are validated at the write boundary only; out-of-range input is
//! rejected, never clamped.

use serde::{Deserialize, Serialize};

/// Typography and media preferences applied during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    pub font_size: u8,
    pub font_family: FontFamily,
    pub line_height: f32,
    pub text_align: TextAlign,
    pub show_images: bool,
    pub show_videos: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    #[serde(rename = "PT Serif")]
    PtSerif,
    #[serde(rename = "PT Sans")]
    PtSans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            font_size: 18,
            font_family: FontFamily::PtSerif,
            line_height: 1.6,
            text_align: TextAlign::Left,
            show_images: true,
            show_videos: true,
        }
    }
}

impl DisplaySettings {
    /// Reject settings outside the supported ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(10..=30).contains(&self.font_size) {
            return Err(format!("fontSize must be between 10 and 30, got {}", self.font_size));
        }
        if !(1.0..=3.0).contains(&self.line_height) {
            return Err(format!("lineHeight must be between 1.0 and 3.0, got {}", self.line_height));
        }
        Ok(())
    }
}

impl FontFamily {
    /// CSS font stack for the family.
    pub fn as_css(&self) -> &'static str {
        match self {
            FontFamily::PtSerif => "'PT Serif', Georgia, serif",
            FontFamily::PtSans => "'PT Sans', Helvetica, sans-serif",
        }
    }
}

impl TextAlign {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }
}
