//! Group dimming arbitration.
//!
//! A group of lights dims and brightens as one logical dimmer, with exactly
//! one light crossing between on and off per pulse, in a fixed dim order.
//!
//! - [`DimmingContext`] - ordered brightness snapshot taken once per pulse
//! - [`DimCoordinator`] - the per-device decision for one pulse
//! - [`DimGroup`] - owns the devices and drives whole pulses

pub mod context;
pub mod coordinator;
pub mod group;

pub use context::DimmingContext;
pub use coordinator::{validate_dim_order, DimAction, DimCoordinator, DimDirection};
pub use group::DimGroup;
