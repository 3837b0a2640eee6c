use serde::{Deserialize, Serialize};

// --- Calibration Constants ---

// Competitive-shooter convention: one input count turns the view 0.07 degrees
pub const DEGREES_PER_COUNT: f32 = 0.07;
// Compensates pointer polling/latency on top of the device pixel ratio
pub const POINTER_COMPENSATION: f32 = 1.08;
pub const DEFAULT_SENSITIVITY: f32 = 0.25;

// --- Sensitivity Profile ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityProfile {
    pub sensitivity: f32,
    pub device_pixel_ratio: f32,
}

impl Default for SensitivityProfile {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            device_pixel_ratio: 1.0,
        }
    }
}

impl SensitivityProfile {
    // Scale applied to a raw pointer delta before the angular conversion
    pub fn compensation(&self) -> f32 {
        self.device_pixel_ratio * POINTER_COMPENSATION
    }

    /// Radians of view rotation produced by one raw device pixel.
    pub fn radians_per_pixel(&self) -> f32 {
        (self.compensation() * self.sensitivity * DEGREES_PER_COUNT).to_radians()
    }

    // Full-turn distance in raw pixels, handy for displaying the current setting
    pub fn pixels_per_360(&self) -> Option<f32> {
        let per_pixel = self.radians_per_pixel().abs();
        (per_pixel > 0.0).then(|| std::f32::consts::TAU / per_pixel)
    }
}

/// Lenient sensitivity parse used for free-text input.
///
/// Honors the longest leading numeric prefix ("0.3abc" is 0.3) and coerces
/// anything else, including empty input, to 0 so the session stays usable.
pub fn parse_sensitivity(input: &str) -> f32 {
    let trimmed = input.trim();
    let mut parsed = 0.0;
    for (end, _) in trimmed
        .char_indices()
        .skip(1)
        .chain(std::iter::once((trimmed.len(), ' ')))
    {
        if let Ok(value) = trimmed[..end].parse::<f32>() {
            if value.is_finite() {
                parsed = value;
            }
        }
    }
    parsed
}
