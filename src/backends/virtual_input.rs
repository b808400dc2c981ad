//! Devices assembled in code.
//!
//! [`VirtualHid`] builds a capability descriptor element by element and wraps
//! it in a [`DeviceDescription`], as a platform backend would.
//!
//! ```
//! use inputforge::backends::virtual_input::VirtualHid;
//! use inputforge::usage::GenericDesktop;
//!
//! let description = VirtualHid::joystick("Virtual Stick")
//!     .axis(GenericDesktop::X, 16)
//!     .axis(GenericDesktop::Y, 16)
//!     .buttons(1..=4)
//!     .describe()
//!     .unwrap();
//! assert_eq!(description.product.as_deref(), Some("Virtual Stick"));
//! ```

use crate::descriptor::{HidDeviceDescriptor, HidElementDescriptor, HidReportType};
use crate::discovery::DeviceDescription;
use crate::error::Result;
use crate::usage::{GenericDesktop, UsagePage};
use std::ops::RangeInclusive;

#[derive(Clone, Debug)]
pub struct VirtualHid {
    interface_name: String,
    product: String,
    manufacturer: Option<String>,
    descriptor: HidDeviceDescriptor,
}

impl VirtualHid {
    /// Generic device with no elements.
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            interface_name: "HID".into(),
            product: product.into(),
            manufacturer: None,
            descriptor: HidDeviceDescriptor::default(),
        }
    }

    pub fn joystick(product: impl Into<String>) -> Self {
        Self::new(product).with_usage(UsagePage::GenericDesktop.id(), GenericDesktop::Joystick.id())
    }

    pub fn gamepad(product: impl Into<String>) -> Self {
        Self::new(product).with_usage(UsagePage::GenericDesktop.id(), GenericDesktop::Gamepad.id())
    }

    pub fn with_usage(mut self, usage_page_id: i32, usage_id: i32) -> Self {
        self.descriptor.usage_page_id = usage_page_id;
        self.descriptor.usage_id = usage_id;
        self
    }

    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.descriptor.vendor_id = i32::from(vendor_id);
        self.descriptor.product_id = i32::from(product_id);
        self
    }

    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interface_name = name.into();
        self
    }

    pub fn with_manufacturer(mut self, name: impl Into<String>) -> Self {
        self.manufacturer = Some(name.into());
        self
    }

    /// Append a raw element as-is.
    pub fn element(mut self, element: HidElementDescriptor) -> Self {
        self.descriptor.elements.push(element);
        self
    }

    /// One-bit Input button.
    pub fn button(self, usage_id: i32) -> Self {
        self.element(HidElementDescriptor {
            usage_page_id: UsagePage::Button.id(),
            usage_id,
            logical_max: 1,
            report_count: 1,
            report_size_in_bits: 1,
            ..Default::default()
        })
    }

    pub fn buttons(self, usages: RangeInclusive<i32>) -> Self {
        usages.fold(self, Self::button)
    }

    /// Unsigned Input axis of `bits` width.
    pub fn axis(self, usage: GenericDesktop, bits: i32) -> Self {
        let logical_max = match bits {
            i32::MIN..=0 => 0,
            31.. => i32::MAX,
            _ => (1 << bits) - 1,
        };
        self.element(HidElementDescriptor {
            usage_page_id: UsagePage::GenericDesktop.id(),
            usage_id: usage.id(),
            logical_max,
            physical_max: logical_max,
            report_count: 1,
            report_size_in_bits: bits,
            ..Default::default()
        })
    }

    /// Output element; carried in the descriptor but never a control.
    pub fn output(self, usage_page_id: i32, usage_id: i32, bits: i32) -> Self {
        self.element(HidElementDescriptor {
            usage_page_id,
            usage_id,
            report_type: HidReportType::Output,
            report_count: 1,
            report_size_in_bits: bits,
            ..Default::default()
        })
    }

    pub fn descriptor(&self) -> &HidDeviceDescriptor {
        &self.descriptor
    }

    pub fn describe(&self) -> Result<DeviceDescription> {
        Ok(DeviceDescription {
            interface_name: Some(self.interface_name.clone()),
            device_class: None,
            manufacturer: self.manufacturer.clone(),
            product: Some(self.product.clone()),
            serial: None,
            version: None,
            capabilities: Some(self.descriptor.to_json()?),
            path: Some(format!("virtual:{}", self.product)),
        })
    }
}
