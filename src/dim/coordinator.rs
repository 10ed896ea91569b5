//! Per-pulse dim/brighten decisions.
//!
//! # Dim
//!
//! While any device is above the minimum brightness, every such device
//! steps down (clamped to the minimum) and nobody turns off. Once all are at
//! or below the minimum, the first lit device in dim order turns off.
//!
//! # Brighten
//!
//! The mirror image, scanning in reverse dim order: the last unlit device in
//! reverse order turns on at the minimum, provided every device after it is
//! already on and nobody is above the minimum. When all devices are on, they
//! all step up together.
//!
//! Every decision is a pure function of one [`DimmingContext`], so devices
//! evaluated against the same snapshot agree on who acts.

use super::context::DimmingContext;
use crate::config::DimSettings;
use crate::device::DeviceId;
use crate::error::{LightError, Result};
use crate::types::{Parameters, Transition, MAX_BRIGHTNESS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Pulse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimDirection {
    Dim,
    Brighten,
}

impl fmt::Display for DimDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimDirection::Dim => write!(f, "dim"),
            DimDirection::Brighten => write!(f, "brighten"),
        }
    }
}

/// What one device does on a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", content = "brightness", rename_all = "snake_case")]
pub enum DimAction {
    TurnOff,
    /// Turn on at the minimum brightness
    TurnOn(f64),
    SetBrightness(f64),
}

impl DimAction {
    /// Brightness after the action.
    pub fn brightness(&self) -> f64 {
        match *self {
            DimAction::TurnOff => 0.0,
            DimAction::TurnOn(b) | DimAction::SetBrightness(b) => b,
        }
    }

    /// The instant transition carrying out this action on a light currently
    /// at `current`. Color is preserved unless the light turns off.
    pub fn to_transition(&self, current: &Parameters) -> Transition {
        match self {
            DimAction::TurnOff => Transition::off(),
            DimAction::TurnOn(b) | DimAction::SetBrightness(b) => {
                let mut parameters = current.clone();
                parameters.brightness = Some(*b);
                Transition::instant(parameters)
            }
        }
    }
}

/// Check that `order` names every member exactly once and nothing else.
pub fn validate_dim_order<M, O>(members: &[M], order: &[O]) -> Result<()>
where
    M: AsRef<str>,
    O: AsRef<str>,
{
    let known: HashSet<&str> = members.iter().map(|m| m.as_ref()).collect();
    let mut seen = HashSet::new();
    for id in order.iter().map(|o| o.as_ref()) {
        if !known.contains(id) {
            return Err(LightError::Config(format!(
                "dim order names '{}', which is not a member of the group",
                id
            )));
        }
        if !seen.insert(id) {
            return Err(LightError::Config(format!("dim order names '{}' more than once", id)));
        }
    }
    if let Some(missing) = members.iter().map(|m| m.as_ref()).find(|m| !seen.contains(m)) {
        return Err(LightError::Config(format!(
            "group member '{}' is missing from the dim order",
            missing
        )));
    }
    Ok(())
}

/// Decides, per device and per pulse, what that device does.
#[derive(Debug, Clone)]
pub struct DimCoordinator {
    order: Vec<DeviceId>,
    settings: DimSettings,
}

impl DimCoordinator {
    /// Fails when `dim_order` and `members` disagree or the settings are out
    /// of range.
    pub fn new(members: &[DeviceId], dim_order: &[DeviceId], settings: DimSettings) -> Result<Self> {
        settings.validate()?;
        validate_dim_order(members, dim_order)?;
        Ok(Self {
            order: dim_order.to_vec(),
            settings,
        })
    }

    pub fn order(&self) -> &[DeviceId] {
        &self.order
    }

    pub fn settings(&self) -> &DimSettings {
        &self.settings
    }

    /// Snapshot the group in dim order.
    pub fn snapshot<F>(&self, lookup: F) -> DimmingContext
    where
        F: FnMut(&DeviceId) -> Parameters,
    {
        DimmingContext::capture(&self.order, lookup)
    }

    pub fn step(&self, direction: DimDirection, ctx: &DimmingContext, subject: &DeviceId) -> Option<DimAction> {
        match direction {
            DimDirection::Dim => self.dim_step(ctx, subject),
            DimDirection::Brighten => self.brighten_step(ctx, subject),
        }
    }

    pub fn dim_step(&self, ctx: &DimmingContext, subject: &DeviceId) -> Option<DimAction> {
        let min = self.settings.min_brightness;
        let Some(current) = ctx.brightness(subject) else {
            tracing::debug!("{} is not part of the dimming context", subject);
            return None;
        };

        if ctx.brightnesses().any(|(_, b)| b > min) {
            // Someone still has to step down before anybody turns off.
            return self.decrement(current);
        }

        match ctx.brightnesses().find(|(_, b)| *b > 0.0 && *b <= min) {
            Some((candidate, _)) if candidate == subject => Some(DimAction::TurnOff),
            Some(_) => None,
            None => self.decrement(current),
        }
    }

    pub fn brighten_step(&self, ctx: &DimmingContext, subject: &DeviceId) -> Option<DimAction> {
        let min = self.settings.min_brightness;
        let Some(current) = ctx.brightness(subject) else {
            tracing::debug!("{} is not part of the dimming context", subject);
            return None;
        };

        let mut candidate: Option<&DeviceId> = None;
        let mut exceeds = false;
        for (id, b) in ctx.brightnesses().rev() {
            if b >= min {
                if candidate.is_some() {
                    // Lit device before the gap: order is broken, nobody acts.
                    return None;
                }
                exceeds |= b > min;
            } else if candidate.is_none() {
                candidate = Some(id);
            }
        }

        match candidate {
            Some(_) if exceeds => None,
            Some(id) if id == subject => Some(DimAction::TurnOn(min)),
            Some(_) => None,
            None => self.increment(current),
        }
    }

    fn decrement(&self, current: f64) -> Option<DimAction> {
        let min = self.settings.min_brightness;
        if current <= min {
            return None;
        }
        let next = (current - self.settings.brightness_step).max(min);
        (next != current).then_some(DimAction::SetBrightness(next))
    }

    fn increment(&self, current: f64) -> Option<DimAction> {
        if current >= MAX_BRIGHTNESS {
            return None;
        }
        let next = (current + self.settings.brightness_step).min(MAX_BRIGHTNESS);
        (next != current).then_some(DimAction::SetBrightness(next))
    }
}
