//! Color math for light transitions.
//!
//! - [`interpolate`] - blending two [`Parameters`](crate::types::Parameters)
//!   sets at a progress fraction
//! - Mired / Kelvin conversion and a Kelvin → RGB approximation, used when
//!   one side of a blend only knows its color temperature

pub mod interpolate;

pub use interpolate::{Interpolator, DEFAULT_GAMMA};

use crate::types::Rgb;

/// Convert mireds (reciprocal megakelvin) to Kelvin.
pub fn mired_to_kelvin(mireds: i32) -> u32 {
    if mireds <= 0 {
        return 0;
    }
    (1_000_000.0 / f64::from(mireds)).round() as u32
}

/// Convert Kelvin to mireds.
pub fn kelvin_to_mired(kelvin: u32) -> i32 {
    if kelvin == 0 {
        return 0;
    }
    (1_000_000.0 / f64::from(kelvin)).round() as i32
}

/// Approximate the RGB appearance of a black-body radiator.
///
/// Valid between 1000K and 40000K; values outside are clamped.
pub fn kelvin_to_rgb(kelvin: u32) -> Rgb {
    let temp = (f64::from(kelvin) / 100.0).clamp(10.0, 400.0);

    let red = if temp <= 66.0 {
        255.0
    } else {
        329.698_727_446 * (temp - 60.0).powf(-0.133_204_759_2)
    };

    let green = if temp <= 66.0 {
        99.470_802_586_1 * temp.ln() - 161.119_568_166_1
    } else {
        288.122_169_528_3 * (temp - 60.0).powf(-0.075_514_849_2)
    };

    let blue = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.517_731_223_1 * (temp - 10.0).ln() - 305.044_792_730_7
    };

    Rgb::new(to_channel(red), to_channel(green), to_channel(blue))
}

/// RGB appearance of a color temperature given in mireds.
pub fn mired_to_rgb(mireds: i32) -> Rgb {
    kelvin_to_rgb(mired_to_kelvin(mireds))
}

fn to_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
