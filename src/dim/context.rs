//! Per-pulse snapshot of a dim group.

use crate::device::DeviceId;
use crate::types::Parameters;

/// Ordered `(device, parameters)` snapshot for one pulse.
///
/// Built fresh for every pulse and never kept across pulses.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DimmingContext {
    entries: Vec<(DeviceId, Parameters)>,
}

impl DimmingContext {
    /// Entries must already be in dim order.
    pub fn new(entries: Vec<(DeviceId, Parameters)>) -> Self {
        Self { entries }
    }

    /// Snapshot `order`, reading each device's state through `lookup`.
    pub fn capture<F>(order: &[DeviceId], mut lookup: F) -> Self
    where
        F: FnMut(&DeviceId) -> Parameters,
    {
        Self {
            entries: order.iter().map(|id| (id.clone(), lookup(id))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parameters(&self, id: &DeviceId) -> Option<&Parameters> {
        self.entries.iter().find(|(d, _)| d == id).map(|(_, p)| p)
    }

    /// Brightness of `id`, absent read as zero.
    pub fn brightness(&self, id: &DeviceId) -> Option<f64> {
        self.parameters(id).map(Parameters::brightness_or_zero)
    }

    /// `(device, brightness)` pairs in dim order.
    pub fn brightnesses(&self) -> impl DoubleEndedIterator<Item = (&DeviceId, f64)> + '_ {
        self.entries.iter().map(|(id, p)| (id, p.brightness_or_zero()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DeviceId, Parameters)> + '_ {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_keeps_order() {
        let order: Vec<DeviceId> = vec!["b".into(), "a".into()];
        let ctx = DimmingContext::capture(&order, |id| {
            if id.as_str() == "a" {
                Parameters::with_brightness(10.0)
            } else {
                Parameters::default()
            }
        });
        let seen: Vec<(String, f64)> = ctx.brightnesses().map(|(id, b)| (id.to_string(), b)).collect();
        assert_eq!(seen, vec![("b".to_string(), 0.0), ("a".to_string(), 10.0)]);
        assert_eq!(ctx.brightness(&"a".into()), Some(10.0));
        assert_eq!(ctx.brightness(&"zzz".into()), None);
    }
}
