//! # lightflow: composable light-behaviour pipelines
//!
//! Computes a continuously updated target state (brightness, color and an
//! optional transition time) for one or more lights by chaining small,
//! independently testable behaviour nodes, and dims groups of lights as if
//! they were one logical dimmer.
//!
//! ## Architecture
//!
//! - **Pipeline**: stateful nodes with pass-through and one-shot override
//!   semantics, chained so each node's output drives the next node's input
//! - **Transitions**: scheduled, resumable interpolation that hands off
//!   smoothly when a target is replaced mid-fade
//! - **Delegates**: hot-swappable behaviour, driven by sequences or triggers
//! - **Dimming**: per-pulse arbitration so exactly one light crosses between
//!   on and off at a time, in a fixed order
//! - **Scheduling**: a scheduler trait with a wall-clock implementation
//!   (crossbeam worker thread) and a deterministic virtual clock
//!
//! ## Configuration
//!
//! Engine settings are TOML, read from the platform config directory:
//!
//! - **Linux**: `~/.config/lightflow/config.toml`
//! - **macOS**: `~/Library/Application Support/lightflow/config.toml`
//! - **Windows**: `%APPDATA%\lightflow\config.toml`
//!
//! ## Example
//!
//! ```
//! use lightflow::{
//!     config::EngineConfig,
//!     device::SimulatedLight,
//!     pipeline::{LightBinding, NodeContext, Pipeline, TransitionNode},
//!     scheduler::VirtualScheduler,
//!     types::{Parameters, Transition},
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let scheduler = Arc::new(VirtualScheduler::new());
//! let light = Arc::new(SimulatedLight::off("kitchen"));
//! let ctx = NodeContext::new("kitchen", scheduler.clone(), EngineConfig::default());
//!
//! let pipeline = Arc::new(Pipeline::new("kitchen"));
//! pipeline.register_node(TransitionNode::new(&ctx));
//! let _binding = LightBinding::bind(pipeline.clone(), light.clone());
//!
//! pipeline.set_default(Some(Transition::over(Parameters::on(), Duration::from_secs(2))));
//! assert_eq!(light.brightness(), 255.0);
//! ```

pub mod color;
pub mod config;
pub mod device;
pub mod dim;
pub mod error;
pub mod pipeline;
pub mod scheduler;
mod sync;
pub mod types;

// Re-export commonly used types
pub use config::{DimSettings, EngineConfig, ScenarioFile};
pub use device::{Device, DeviceId, SimulatedLight};
pub use dim::{DimAction, DimCoordinator, DimDirection, DimGroup, DimmingContext};
pub use error::{LightError, Result};
pub use pipeline::{Pipeline, PipelineNode};
pub use scheduler::{Scheduler, ThreadScheduler, VirtualScheduler};
pub use types::{Parameters, Rgb, Transition};
