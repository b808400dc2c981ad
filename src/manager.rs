//! Device manager and current-device registry.
//!
//! Owns the devices that received a template and tracks, per
//! [`DeviceCategory`], the order in which they were activated. The current
//! device of a category is the most recently activated one still active.

use crate::device::{DeviceCategory, InputDevice};
use crate::discovery::{on_device_discovered, DeviceDescription};
use crate::error::{LayoutError, Result};
use crate::registry::TemplateRegistry;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

pub struct DeviceManager<'r> {
    registry: &'r TemplateRegistry,
    devices: BTreeMap<u32, InputDevice>,
    activation: HashMap<DeviceCategory, Vec<u32>>,
    next_id: u32,
}

impl DeviceManager<'static> {
    /// Manager over the process-wide registry.
    pub fn global() -> Self {
        Self::new(TemplateRegistry::global())
    }
}

impl<'r> DeviceManager<'r> {
    pub fn new(registry: &'r TemplateRegistry) -> Self {
        Self {
            registry,
            devices: BTreeMap::new(),
            activation: HashMap::new(),
            next_id: 1,
        }
    }

    /// Manager populated from every enabled backend. Devices without a template are skipped.
    pub fn discover(registry: &'r TemplateRegistry) -> Self {
        let mut manager = Self::new(registry);
        for description in crate::backends::probe_descriptions() {
            if let Err(err) = manager.add_device(description, None) {
                debug!(error = %err, "skipping device");
            }
        }
        info!(devices = manager.len(), "device discovery finished");
        manager
    }

    pub fn registry(&self) -> &'r TemplateRegistry {
        self.registry
    }

    /// Bind a device to a template and make it current for its category.
    ///
    /// `matched_template` names a template chosen by some other mechanism;
    /// otherwise the discovery gate decides.
    pub fn add_device(
        &mut self,
        description: DeviceDescription,
        matched_template: Option<&str>,
    ) -> Result<u32> {
        let name = match matched_template.filter(|m| !m.is_empty()) {
            Some(name) => name.to_string(),
            None => on_device_discovered(self.registry, &description, None)
                .ok_or_else(|| LayoutError::NoTemplate(description.to_string()))?,
        };
        let template = self.registry.resolve(&name)?;

        let id = self.next_id;
        self.next_id += 1;
        let device = InputDevice::new(id, description, template);
        info!(device = %device, category = %device.category(), "device added");
        self.devices.insert(id, device);
        self.activate(id)?;
        Ok(id)
    }

    /// Make `id` the current device of its category.
    pub fn activate(&mut self, id: u32) -> Result<()> {
        let category = self.device(id).ok_or(LayoutError::UnknownDevice(id))?.category();
        let order = self.activation.entry(category).or_default();
        order.retain(|d| *d != id);
        order.push(id);
        Ok(())
    }

    /// Drop `id` from its category's activation order; the previous device becomes current.
    pub fn deactivate(&mut self, id: u32) -> Result<()> {
        let category = self.device(id).ok_or(LayoutError::UnknownDevice(id))?.category();
        if let Some(order) = self.activation.get_mut(&category) {
            order.retain(|d| *d != id);
        }
        Ok(())
    }

    pub fn remove_device(&mut self, id: u32) -> Result<InputDevice> {
        self.deactivate(id)?;
        let device = self.devices.remove(&id).ok_or(LayoutError::UnknownDevice(id))?;
        info!(device = %device, "device removed");
        Ok(device)
    }

    pub fn current(&self, category: DeviceCategory) -> Option<&InputDevice> {
        self.activation
            .get(&category)
            .and_then(|order| order.last())
            .and_then(|id| self.devices.get(id))
    }

    pub fn is_active(&self, id: u32) -> bool {
        self.activation.values().any(|order| order.contains(&id))
    }

    pub fn device(&self, id: u32) -> Option<&InputDevice> {
        self.devices.get(&id)
    }

    pub fn update_state(&mut self, id: u32, bytes: &[u8]) -> Result<()> {
        self.devices
            .get_mut(&id)
            .ok_or(LayoutError::UnknownDevice(id))?
            .update_state(bytes)
    }

    /// Devices in id order.
    pub fn devices(&self) -> impl Iterator<Item = &InputDevice> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;

    fn hid(product: &str, usage: i32) -> DeviceDescription {
        DeviceDescription {
            interface_name: Some("HID".into()),
            product: Some(product.into()),
            capabilities: Some(format!(
                r#"{{"usagePageId":1,"usageId":{usage},"elements":[{{"usagePageId":9,"usageId":1,"reportSizeInBits":1}}]}}"#
            )),
            ..Default::default()
        }
    }

    #[test]
    fn most_recent_activation_is_current() {
        let registry = TemplateRegistry::with_builtins(CompilerConfig::default());
        let mut manager = DeviceManager::new(&registry);

        let a = manager.add_device(hid("Pad A", 5), None).unwrap();
        let b = manager.add_device(hid("Pad B", 5), None).unwrap();
        let stick = manager.add_device(hid("Stick", 4), None).unwrap();

        assert_eq!(manager.current(DeviceCategory::Gamepad).unwrap().id(), b);
        assert_eq!(manager.current(DeviceCategory::Joystick).unwrap().id(), stick);

        manager.activate(a).unwrap();
        assert_eq!(manager.current(DeviceCategory::Gamepad).unwrap().id(), a);

        manager.deactivate(a).unwrap();
        assert_eq!(manager.current(DeviceCategory::Gamepad).unwrap().id(), b);
        assert!(!manager.is_active(a));

        manager.remove_device(b).unwrap();
        assert!(manager.current(DeviceCategory::Gamepad).is_none());
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn matched_templates_skip_the_gate() {
        let registry = TemplateRegistry::with_builtins(CompilerConfig::default());
        let mut manager = DeviceManager::new(&registry);
        let id = manager
            .add_device(DeviceDescription::default(), Some("Keyboard"))
            .unwrap();
        let keyboard = manager.current(DeviceCategory::Keyboard).unwrap();
        assert_eq!(keyboard.id(), id);
        assert_eq!(keyboard.state().len(), 16);

        let mut pressed = [0xFF; 16];
        pressed[13] = 0x7F;
        pressed[14] = 0;
        pressed[15] = 0;
        manager.update_state(id, &pressed).unwrap();
        assert!(manager.update_state(id, &[0; 4]).is_err());

        // Bits past the last key never reach the device state.
        assert!(matches!(
            manager.update_state(id, &[0xFF; 16]),
            Err(LayoutError::FieldOutOfRange { .. })
        ));
        assert_eq!(manager.device(id).unwrap().state(), &pressed);
    }

    #[test]
    fn failures_are_reported() {
        let registry = TemplateRegistry::with_builtins(CompilerConfig::default());
        let mut manager = DeviceManager::new(&registry);
        assert!(matches!(
            manager.add_device(DeviceDescription::default(), None),
            Err(LayoutError::NoTemplate(_))
        ));
        assert!(matches!(
            manager.add_device(DeviceDescription::default(), Some("Nope")),
            Err(LayoutError::UnknownTemplate(_))
        ));
        assert!(matches!(manager.activate(42), Err(LayoutError::UnknownDevice(42))));
        assert!(manager.remove_device(42).is_err());
        assert!(manager.is_empty());
    }
}
