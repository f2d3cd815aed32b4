use tileworld_common::Color;

/// Resolved lighting for one tile: a brightness and the hue it is tinted with.
///
/// `color` is chromaticity only (its brightest channel is 255 unless black);
/// how bright the tile is lives in `intensity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Color,
    pub intensity: f32,
}

impl Light {
    pub const DARK: Light = Light {
        color: Color::BLACK,
        intensity: 0.0,
    };
}

/// One light source's share of a tile's illumination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub color: Color,
    pub intensity: f32,
}

/// sRGB transfer function, display to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB transfer function, linear to display.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Linear falloff: full `intensity` at the source, zero at `radius` and beyond.
pub fn falloff(intensity: f32, radius: f32, distance: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (intensity * (1.0 - distance / radius)).max(0.0)
}

/// Additively mix contributions in linear space.
///
/// Each color is gamma-decoded and scaled by its intensity before summing.
/// The peak channel of the sum (capped at 1) becomes the brightness, and the
/// sum divided by its peak, re-encoded to sRGB, becomes the hue. Returns
/// `None` when nothing contributes.
pub fn mix_additive(contributions: &[Contribution]) -> Option<Light> {
    let mut sum = [0.0f32; 3];
    for c in contributions.iter().filter(|c| c.intensity > 0.0) {
        for (acc, channel) in sum.iter_mut().zip(c.color.to_unit()) {
            *acc += srgb_to_linear(channel) * c.intensity;
        }
    }
    let peak = sum.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return None;
    }
    let hue = sum.map(|v| linear_to_srgb(v / peak));
    Some(Light {
        color: Color::from_unit(hue),
        intensity: peak.min(1.0),
    })
}
