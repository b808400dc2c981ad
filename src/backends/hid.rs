//! `hidapi` backend.
//!
//! Reads each device's raw report descriptor and decodes it into a capability
//! blob. Devices that cannot be opened or decoded are skipped.

use crate::descriptor::HidDeviceDescriptor;
use crate::discovery::DeviceDescription;
use crate::error::Result;
use crate::report_descriptor;
use hidapi::{DeviceInfo, HidApi};
use tracing::debug;

/// Largest report descriptor a USB HID device may expose.
const MAX_REPORT_DESCRIPTOR_SIZE: usize = 4096;

/// Open `info` and decode its report descriptor.
pub fn read_descriptor(api: &HidApi, info: &DeviceInfo) -> Result<HidDeviceDescriptor> {
    let device = info.open_device(api)?;
    let mut buf = [0u8; MAX_REPORT_DESCRIPTOR_SIZE];
    let len = device.get_report_descriptor(&mut buf)?;
    let mut descriptor = report_descriptor::decode(&buf[..len])?;
    descriptor.vendor_id = i32::from(info.vendor_id());
    descriptor.product_id = i32::from(info.product_id());
    Ok(descriptor)
}

/// Describe one device; `None` when it can't be read.
pub fn describe(api: &HidApi, info: &DeviceInfo) -> Option<DeviceDescription> {
    let path = info.path().to_string_lossy().into_owned();
    let capabilities = match read_descriptor(api, info).and_then(|d| d.to_json()) {
        Ok(blob) => blob,
        Err(err) => {
            debug!(path = %path, error = %err, "skipping HID device");
            return None;
        }
    };

    let release = info.release_number();
    Some(DeviceDescription {
        interface_name: Some("HID".into()),
        device_class: None,
        manufacturer: info.manufacturer_string().map(str::to_string),
        product: info.product_string().map(str::to_string),
        serial: info.serial_number().map(str::to_string),
        version: Some(format!("{:x}.{:02x}", release >> 8, release & 0xFF)),
        capabilities: Some(capabilities),
        path: Some(path),
    })
}

/// Describe every device `api` currently lists.
pub fn describe_devices(api: &HidApi) -> Vec<DeviceDescription> {
    let found: Vec<_> = api.device_list().filter_map(|info| describe(api, info)).collect();
    debug!(count = found.len(), "described HID devices");
    found
}
