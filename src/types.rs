//! Core value types for lightflow
//!
//! # Main Types
//!
//! - [`Parameters`] - Desired brightness / RGB / color temperature of a light
//! - [`Rgb`] - 8-bit RGB triple
//! - [`Transition`] - Target parameters plus an optional duration
//!
//! A brightness of `0` means "off". A brightness of [`MAX_BRIGHTNESS`] with no
//! color fields means "on" for binary devices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Highest brightness a device accepts
pub const MAX_BRIGHTNESS: f64 = 255.0;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_channels(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

/// Desired state of a light.
///
/// Structural equality: two parameter sets are equal only when every field is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameters {
    /// Brightness in `[0, 255]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    /// RGB color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<Rgb>,
    /// Color temperature in mireds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<i32>,
}

impl Parameters {
    /// The "off" state.
    pub fn off() -> Self {
        Self {
            brightness: Some(0.0),
            ..Self::default()
        }
    }

    /// The "on" state for binary devices.
    pub fn on() -> Self {
        Self::with_brightness(MAX_BRIGHTNESS)
    }

    pub fn with_brightness(brightness: f64) -> Self {
        Self {
            brightness: Some(brightness),
            ..Self::default()
        }
    }

    pub fn rgb(mut self, rgb: impl Into<Rgb>) -> Self {
        self.rgb = Some(rgb.into());
        self
    }

    pub fn color_temp(mut self, mireds: i32) -> Self {
        self.color_temp = Some(mireds);
        self
    }

    /// Brightness with "absent" read as zero.
    pub fn brightness_or_zero(&self) -> f64 {
        self.brightness.unwrap_or(0.0)
    }

    /// Whether these parameters describe a light that is off.
    ///
    /// A missing brightness with no color information also counts as off.
    pub fn is_off(&self) -> bool {
        match self.brightness {
            Some(b) => b <= 0.0,
            None => !self.has_color(),
        }
    }

    /// Whether any color field is present.
    pub fn has_color(&self) -> bool {
        self.rgb.is_some() || self.color_temp.is_some()
    }

    /// Copy `other`'s color fields onto `self`.
    pub fn take_color_from(&mut self, other: &Parameters) {
        self.rgb = other.rgb;
        self.color_temp = other.color_temp;
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            Ok(())
        };
        if let Some(b) = self.brightness {
            sep(f)?;
            write!(f, "brightness: {}", b)?;
        }
        if let Some(rgb) = self.rgb {
            sep(f)?;
            write!(f, "rgb: ({}, {}, {})", rgb.r, rgb.g, rgb.b)?;
        }
        if let Some(ct) = self.color_temp {
            sep(f)?;
            write!(f, "color_temp: {}", ct)?;
        }
        write!(f, "}}")
    }
}

/// Target parameters plus the duration to reach them.
///
/// `duration == None` means apply instantly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transition {
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl Transition {
    pub fn new(parameters: Parameters, duration: Option<Duration>) -> Self {
        Self {
            parameters,
            duration,
        }
    }

    /// Apply `parameters` with no transition time.
    pub fn instant(parameters: Parameters) -> Self {
        Self::new(parameters, None)
    }

    /// Reach `parameters` over `duration`.
    pub fn over(parameters: Parameters, duration: Duration) -> Self {
        Self::new(parameters, Some(duration))
    }

    pub fn off() -> Self {
        Self::instant(Parameters::off())
    }

    pub fn on() -> Self {
        Self::instant(Parameters::on())
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration {
            Some(d) => write!(f, "{} over {}ms", self.parameters, d.as_millis()),
            None => write!(f, "{} instantly", self.parameters),
        }
    }
}
