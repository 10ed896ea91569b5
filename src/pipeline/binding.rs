//! Binding a pipeline to a device.

use crate::device::Device;
use crate::pipeline::executor::{OutputMode, Pipeline};
use crate::types::Transition;
use std::sync::Arc;

/// Applies every distinct pipeline output to a device.
///
/// The binding is the pipeline's output handler; dropping or
/// [`unbind`](LightBinding::unbind)ing it detaches the device.
pub struct LightBinding {
    pipeline: Arc<Pipeline<Transition>>,
    device: Arc<dyn Device>,
}

impl LightBinding {
    pub fn bind(pipeline: Arc<Pipeline<Transition>>, device: Arc<dyn Device>) -> Self {
        Self::bind_with_mode(pipeline, device, OutputMode::Distinct)
    }

    pub fn bind_with_mode(pipeline: Arc<Pipeline<Transition>>, device: Arc<dyn Device>, mode: OutputMode) -> Self {
        let target = device.clone();
        pipeline.set_output_handler(move |transition: &Transition| target.apply_transition(transition), mode);
        tracing::debug!("Bound pipeline '{}' to {}", pipeline.name(), device.id());
        Self { pipeline, device }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline<Transition>> {
        &self.pipeline
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn unbind(self) {}
}

impl Drop for LightBinding {
    fn drop(&mut self) {
        self.pipeline.clear_output_handler();
    }
}
