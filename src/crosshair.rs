use bevy::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

const CODE_DELIMITER: char = ';';
// Crosshair palette indexed by the `c` key
const PALETTE: [&str; 8] = [
    "#ffffff", "#00ff00", "#ffff00", "#00ff00", "#ffff00", "#00ffff", "#ff00ff", "#ffffff",
];

#[derive(Debug, Error, PartialEq)]
pub enum CrosshairCodeError {
    #[error("crosshair key `{key}` expects a number, got `{value}`")]
    NotANumber { key: String, value: String },
}

// --- Crosshair Style ---

#[derive(Debug, Clone, PartialEq)]
pub struct CrosshairStyle {
    pub color: &'static str,
    pub thickness: f32,
    pub length: f32,
    pub offset: f32,
    pub opacity: f32,
}

impl Default for CrosshairStyle {
    fn default() -> Self {
        Self {
            color: PALETTE[0],
            thickness: 2.0,
            length: 6.0,
            offset: 2.0,
            opacity: 1.0,
        }
    }
}

impl CrosshairStyle {
    // Overall span of one arm pair in pixels
    pub fn width(&self) -> f32 {
        self.length * 2.0 + self.offset * 2.0
    }
}

fn numeric(params: &HashMap<&str, &str>, key: &str, default: f32) -> Result<f32, CrosshairCodeError> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|parsed| parsed.is_finite())
            .ok_or_else(|| CrosshairCodeError::NotANumber {
                key: key.to_string(),
                value: value.to_string(),
            }),
    }
}

/// Parses a `key;value;key;value` code on top of the current style.
///
/// Absent numeric keys take their defaults; an absent or unknown color index
/// keeps the current color. Unknown keys and a trailing key without value are
/// skipped.
pub fn parse_code(code: &str, current: &CrosshairStyle) -> Result<CrosshairStyle, CrosshairCodeError> {
    let tokens: Vec<&str> = code.split(CODE_DELIMITER).collect();
    let mut params = HashMap::new();
    for pair in tokens.chunks(2) {
        if let [key, value] = pair {
            if !key.is_empty() && !value.is_empty() {
                params.insert(*key, *value);
            }
        }
    }

    let defaults = CrosshairStyle::default();
    let color = params
        .get("c")
        .and_then(|index| index.trim().parse::<usize>().ok())
        .and_then(|index| PALETTE.get(index).copied())
        .unwrap_or(current.color);

    Ok(CrosshairStyle {
        color,
        thickness: numeric(&params, "0t", defaults.thickness)?,
        length: numeric(&params, "0l", defaults.length)?,
        offset: numeric(&params, "0o", defaults.offset)?,
        opacity: numeric(&params, "0a", defaults.opacity)?,
    })
}

// Display styling only; the session never reads it
#[derive(Resource, Debug, Default)]
pub struct CrosshairState {
    pub style: CrosshairStyle,
}

impl CrosshairState {
    /// Applies a code atomically; a bad code is logged and changes nothing.
    pub fn apply_code(&mut self, code: &str) -> bool {
        if code.is_empty() {
            return false;
        }
        match parse_code(code, &self.style) {
            Ok(style) => {
                self.style = style;
                true
            }
            Err(err) => {
                warn!("Invalid crosshair code: {err}");
                false
            }
        }
    }
}
