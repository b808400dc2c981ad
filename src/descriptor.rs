//! Capability descriptor model and its textual codec.
//!
//! The platform layer describes a generic HID as a JSON blob (the
//! `capabilities` field of a [`DeviceDescription`](crate::DeviceDescription)).
//! The field names below are the wire contract with native producers; do not
//! rename them.
//!
//! # Tolerance
//! - Every field is optional. Missing numbers are `0`, missing flags `false`,
//!   missing or `null` element lists are empty.
//! - Unknown fields are ignored.
//! - `reportType` may arrive as its name (`"Input"`) or its ordinal (`0`).
//!
//! Anything that fails to decode at all is a single
//! [`LayoutError::MalformedDescriptor`].
//!
//! # Example
//! ```
//! use inputforge::descriptor::{HidDeviceDescriptor, HidReportType};
//!
//! let blob = r#"{ "usagePageId": 1, "usageId": 5,
//!                 "elements": [ { "usagePageId": 9, "usageId": 1,
//!                                 "reportType": "Input", "reportSizeInBits": 1 } ] }"#;
//! let desc = HidDeviceDescriptor::from_json(blob).unwrap();
//! assert_eq!(desc.elements[0].report_type, HidReportType::Input);
//! ```

use crate::error::{LayoutError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Report an element belongs to.
///
/// Ordinals match the native enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ReportTypeRepr")]
pub enum HidReportType {
    #[default]
    Input,
    Output,
    Feature,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReportTypeRepr {
    Ordinal(i64),
    Name(String),
}

impl TryFrom<ReportTypeRepr> for HidReportType {
    type Error = String;

    fn try_from(repr: ReportTypeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ReportTypeRepr::Ordinal(0) => Ok(HidReportType::Input),
            ReportTypeRepr::Ordinal(1) => Ok(HidReportType::Output),
            ReportTypeRepr::Ordinal(2) => Ok(HidReportType::Feature),
            ReportTypeRepr::Ordinal(n) => Err(format!("unknown report type ordinal {n}")),
            ReportTypeRepr::Name(name) => match name.as_str() {
                "Input" => Ok(HidReportType::Input),
                "Output" => Ok(HidReportType::Output),
                "Feature" => Ok(HidReportType::Feature),
                _ => Err(format!("unknown report type '{name}'")),
            },
        }
    }
}

/// One field of hardware capability.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HidElementDescriptor {
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub usage_id: i32,
    pub usage_page_id: i32,
    pub unit: i32,
    pub unit_exponent: i32,
    pub logical_min: i32,
    pub logical_max: i32,
    pub physical_min: i32,
    pub physical_max: i32,
    pub report_type: HidReportType,
    pub report_id: i32,
    pub report_count: i32,
    /// Total bits the element occupies in its report (width × count).
    pub report_size_in_bits: i32,
    pub has_null_state: bool,
    pub has_preferred_state: bool,
    pub is_array: bool,
    pub is_non_linear: bool,
    pub is_relative: bool,
    pub is_virtual: bool,
    pub is_wrapping: bool,
}

impl HidElementDescriptor {
    /// Bits consumed in the report; negative widths count as zero.
    #[inline]
    pub fn size_in_bits(&self) -> u32 {
        u32::try_from(self.report_size_in_bits).unwrap_or(0)
    }

    /// Report id clamped into the wire range.
    #[inline]
    pub fn report_id_u8(&self) -> u8 {
        u8::try_from(self.report_id).unwrap_or(0)
    }
}

/// Device-level capability record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HidDeviceDescriptor {
    pub vendor_id: i32,
    pub product_id: i32,
    pub usage_id: i32,
    pub usage_page_id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub elements: Vec<HidElementDescriptor>,
}

impl HidDeviceDescriptor {
    /// Decode a capability blob.
    pub fn from_json(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).map_err(|e| LayoutError::MalformedDescriptor(e.to_string()))
    }

    /// Encode back into the wire format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LayoutError::MalformedDescriptor(e.to_string()))
    }

    pub fn input_elements(&self) -> impl Iterator<Item = &HidElementDescriptor> {
        self.elements
            .iter()
            .filter(|e| e.report_type == HidReportType::Input)
    }
}

/// Decode `blob` if `interface` names the generic capability interface `expected`.
pub fn parse(interface: &str, expected: &str, blob: &str) -> Result<HidDeviceDescriptor> {
    if interface != expected {
        return Err(LayoutError::UnsupportedInterface(interface.to_string()));
    }
    HidDeviceDescriptor::from_json(blob)
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}
