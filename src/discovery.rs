//! Discovery gate.
//!
//! Decides whether a newly discovered device gets a compiled HID template.
//! Every failure is a decline: the device simply falls back to whatever
//! less specific representation the caller has. On success the device's
//! template is registered (lazily built) and its name returned.
//!
//! # Example
//! ```
//! use inputforge::{on_device_discovered, DeviceDescription, TemplateRegistry};
//! use inputforge::config::CompilerConfig;
//!
//! let registry = TemplateRegistry::with_builtins(CompilerConfig::default());
//! let description = DeviceDescription {
//!     interface_name: Some("HID".into()),
//!     product: Some("Pedals".into()),
//!     capabilities: Some(r#"{"elements":[{"usagePageId":9,"usageId":1,"reportSizeInBits":1}]}"#.into()),
//!     ..Default::default()
//! };
//! let name = on_device_discovered(&registry, &description, None);
//! assert_eq!(name.as_deref(), Some("HID::Pedals"));
//! ```

use crate::classify::is_usable;
use crate::config::{CompilerConfig, TemplateNaming};
use crate::descriptor::{self, HidDeviceDescriptor};
use crate::error::{LayoutError, Result};
use crate::registry::TemplateRegistry;
use crate::usage::{GenericDesktop, UsagePage};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// What the platform layer reports about a device.
///
/// Fields are optional; backends fill what they know.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceDescription {
    /// Interface tag, e.g. `"HID"`.
    pub interface_name: Option<String>,
    pub device_class: Option<String>,
    pub manufacturer: Option<String>,
    /// Friendly product string; names the template.
    pub product: Option<String>,
    pub serial: Option<String>,
    pub version: Option<String>,
    /// Capability blob in the interface's textual format.
    pub capabilities: Option<String>,
    /// OS path of the device. Diagnostic only; may change across reconnects.
    pub path: Option<String>,
}

impl DeviceDescription {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LayoutError::MalformedDescriptor(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| LayoutError::MalformedDescriptor(e.to_string()))
    }
}

impl fmt::Display for DeviceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let product = self.product.as_deref().unwrap_or("unknown product");
        match (&self.manufacturer, &self.interface_name) {
            (Some(m), Some(i)) => write!(f, "{m} {product} [{i}]"),
            (Some(m), None) => write!(f, "{m} {product}"),
            (None, Some(i)) => write!(f, "{product} [{i}]"),
            (None, None) => f.write_str(product),
        }
    }
}

/// Base template for a device: its top-level usage picks a specialization.
pub fn base_template_for(descriptor: &HidDeviceDescriptor) -> &'static str {
    if descriptor.usage_page_id != UsagePage::GenericDesktop.id() {
        return "HID";
    }
    match GenericDesktop::from_id(descriptor.usage_id) {
        Some(GenericDesktop::Joystick) => "Joystick",
        Some(GenericDesktop::Gamepad) => "Gamepad",
        _ => "HID",
    }
}

/// Template name for a device under the configured naming policy.
pub fn template_name_for(
    config: &CompilerConfig,
    product: &str,
    descriptor: &HidDeviceDescriptor,
) -> String {
    match config.naming {
        TemplateNaming::Product => format!("{}::{}", config.namespace, product),
        TemplateNaming::ProductWithIds => format!(
            "{}::{}::{:04x}:{:04x}",
            config.namespace, product, descriptor.vendor_id, descriptor.product_id
        ),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Run the gate, reporting why a device was declined.
pub fn try_discover(
    registry: &TemplateRegistry,
    description: &DeviceDescription,
    matched_template: Option<&str>,
) -> Result<String> {
    if let Some(matched) = matched_template.filter(|m| !m.is_empty()) {
        return Err(LayoutError::AlreadyMatched(matched.to_string()));
    }

    let config = registry.config();
    let interface = description.interface_name.as_deref().unwrap_or_default();
    if interface != config.interface_name {
        return Err(LayoutError::UnsupportedInterface(interface.to_string()));
    }
    let product = non_empty(&description.product).ok_or(LayoutError::MissingProduct)?;
    let blob = non_empty(&description.capabilities).ok_or(LayoutError::MissingCapabilities)?;

    let descriptor = descriptor::parse(interface, &config.interface_name, blob)?;
    if !descriptor.elements.iter().any(is_usable) {
        return Err(LayoutError::Unrepresentable);
    }

    let base = base_template_for(&descriptor);
    let name = template_name_for(config, product, &descriptor);
    registry.register_hid(&name, base, descriptor);
    Ok(name)
}

/// Run the gate; `None` means "no opinion" and is a normal outcome.
pub fn on_device_discovered(
    registry: &TemplateRegistry,
    description: &DeviceDescription,
    matched_template: Option<&str>,
) -> Option<String> {
    match try_discover(registry, description, matched_template) {
        Ok(name) => Some(name),
        Err(err @ LayoutError::MalformedDescriptor(_)) => {
            warn!(device = %description, error = %err, "ignoring device capabilities");
            None
        }
        Err(err) => {
            debug!(device = %description, reason = %err, "no HID template for device");
            None
        }
    }
}
