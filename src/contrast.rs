use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContrastError {
    #[error("invalid color format: {0}")]
    InvalidColorFormat(String),
}

/// An sRGB color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse a 3- or 6-digit hex color, case-insensitive, leading `#` optional.
    /// 3-digit shorthand expands each nibble by duplication (`f0a` -> `ff00aa`).
    pub fn parse(hex: &str) -> Result<Self, ContrastError> {
        let raw = hex.strip_prefix('#').unwrap_or(hex);
        if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ContrastError::InvalidColorFormat(hex.to_string()));
        }
        let expanded = match raw.len() {
            3 => raw.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => raw.to_string(),
            _ => return Err(ContrastError::InvalidColorFormat(hex.to_string())),
        };
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&expanded[range], 16)
                .map_err(|_| ContrastError::InvalidColorFormat(hex.to_string()))
        };
        Ok(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// WCAG relative luminance: linearize each channel, then combine with the
    /// fixed perceptual weights (R 0.2126, G 0.7152, B 0.0722).
    pub fn relative_luminance(self) -> f64 {
        fn linearize(channel: u8) -> f64 {
            let v = f64::from(channel) / 255.0;
            if v <= 0.03928 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linearize(self.r) + 0.7152 * linearize(self.g) + 0.0722 * linearize(self.b)
    }
}

/// Text size category selecting which WCAG thresholds apply.
/// Large text is >= 18pt, or 14pt bold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    #[default]
    Normal,
    Large,
}

impl TextSize {
    /// Minimum ratios as (AA, AAA).
    fn thresholds(self) -> (f64, f64) {
        match self {
            TextSize::Normal => (4.5, 7.0),
            TextSize::Large => (3.0, 4.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContrastResult {
    pub ratio: f64,
    pub aa: bool,
    pub aaa: bool,
}

/// Compute the WCAG contrast ratio between two hex colors and classify it
/// against the AA/AAA thresholds for the given text size.
///
/// The ratio is (L_lighter + 0.05) / (L_darker + 0.05), rounded half-up to
/// 2 decimal places, so it is symmetric in its two arguments. Identical
/// colors yield 1.00; pure black on pure white yields 21.00.
pub fn compute_contrast(
    fg_hex: &str,
    bg_hex: &str,
    size: TextSize,
) -> Result<ContrastResult, ContrastError> {
    let fg = Rgb::parse(fg_hex)?.relative_luminance();
    let bg = Rgb::parse(bg_hex)?.relative_luminance();
    let (lighter, darker) = if fg >= bg { (fg, bg) } else { (bg, fg) };
    let ratio = ((lighter + 0.05) / (darker + 0.05) * 100.0).round() / 100.0;
    let (aa_min, aaa_min) = size.thresholds();
    Ok(ContrastResult {
        ratio,
        aa: ratio >= aa_min,
        aaa: ratio >= aaa_min,
    })
}
