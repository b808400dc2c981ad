//! Device description sources.
//!
//! Backends turn platform devices into [`DeviceDescription`]s carrying a JSON
//! capability blob, ready for the discovery gate.
//!
//! # Feature flags
//! - **`hid`**: live devices through `hidapi`, decoded from their raw report
//!   descriptors.
//!
//! [`virtual_input`] is always available and builds descriptions in code.

use crate::discovery::DeviceDescription;

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;
pub mod virtual_input;

/// Descriptions from every enabled backend.
pub fn probe_descriptions() -> Vec<DeviceDescription> {
    #[allow(unused_mut)]
    let mut out = Vec::new();

    #[cfg(feature = "hid")]
    {
        match hidapi::HidApi::new() {
            Ok(api) => out.extend(hid::describe_devices(&api)),
            Err(err) => tracing::warn!(error = %err, "failed to initialize HID API"),
        }
    }

    out
}
