//! Per-element classification.
//!
//! Decides, for one [`HidElementDescriptor`], whether it becomes a control and
//! if so which kind, under which name, with which format tag and semantic
//! usages. Pure and total: the same element always classifies the same way.
//!
//! Rules:
//! - Only Input-report elements are representable.
//! - Button page → [`ControlKind::Button`].
//! - Generic desktop `X`/`Y`/`Z`/`Rx`/`Ry`/`Rz` → [`ControlKind::Axis`].
//! - Format comes from the bit width alone (1/8/16/32). Any other width yields
//!   [`FourCC::EMPTY`]; the compiler skips such controls.
//! - A button with usage `0` is tagged as the primary trigger and action.

use crate::descriptor::{HidElementDescriptor, HidReportType};
use crate::format::FourCC;
use crate::usage::{common, generic_desktop_name, GenericDesktop, UsagePage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a control as application code sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    Button,
    Axis,
    Key,
    /// Aggregate over a whole block of keys; pressed when any key is.
    AnyKey,
    Integer,
}

impl ControlKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ControlKind::Button => "Button",
            ControlKind::Axis => "Axis",
            ControlKind::Key => "Key",
            ControlKind::AnyKey => "AnyKey",
            ControlKind::Integer => "Integer",
        }
    }

    /// Aggregates deliberately span other controls' bits.
    pub const fn is_aggregate(self) -> bool {
        matches!(self, ControlKind::AnyKey)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of classifying a representable element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementClass {
    pub name: String,
    pub kind: ControlKind,
    pub format: FourCC,
    pub usages: &'static [&'static str],
}

impl ElementClass {
    /// `false` when the element's width has no format tag.
    #[inline]
    pub fn has_format(&self) -> bool {
        !self.format.is_empty()
    }
}

const PRIMARY_BUTTON_USAGES: &[&str] = &[common::PRIMARY_TRIGGER, common::PRIMARY_ACTION];

impl HidElementDescriptor {
    pub fn control_kind(&self) -> Option<ControlKind> {
        // TODO: output elements need a write path before they can be controls.
        if self.report_type != HidReportType::Input {
            return None;
        }
        match UsagePage::from_id(self.usage_page_id)? {
            UsagePage::Button => Some(ControlKind::Button),
            UsagePage::GenericDesktop => GenericDesktop::from_id(self.usage_id)
                .filter(|u| u.is_axis())
                .map(|_| ControlKind::Axis),
            _ => None,
        }
    }

    pub fn control_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        match UsagePage::from_id(self.usage_page_id)? {
            UsagePage::Button => Some(format!("button{}", self.usage_id)),
            UsagePage::GenericDesktop => Some(generic_desktop_name(self.usage_id)),
            _ => None,
        }
    }

    pub fn format(&self) -> FourCC {
        FourCC::for_bit_width(self.size_in_bits())
    }

    pub fn usages(&self) -> &'static [&'static str] {
        if self.usage_page_id == UsagePage::Button.id() && self.usage_id == 0 {
            PRIMARY_BUTTON_USAGES
        } else {
            &[]
        }
    }
}

/// Classify one element; `None` when it cannot become a control.
pub fn classify(element: &HidElementDescriptor) -> Option<ElementClass> {
    let kind = element.control_kind()?;
    let name = element.control_name()?;
    Some(ElementClass {
        name,
        kind,
        format: element.format(),
        usages: element.usages(),
    })
}

/// Whether `element` is representable at all. Odd widths still count: the
/// compiler skips them, but the device keeps its template.
pub fn is_usable(element: &HidElementDescriptor) -> bool {
    classify(element).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(page: i32, usage: i32, bits: i32) -> HidElementDescriptor {
        HidElementDescriptor {
            usage_page_id: page,
            usage_id: usage,
            report_size_in_bits: bits,
            ..Default::default()
        }
    }

    #[test]
    fn button_gets_synthesized_name_and_bit_format() {
        let class = classify(&element(0x09, 5, 1)).unwrap();
        assert_eq!(class.name, "button5");
        assert_eq!(class.kind, ControlKind::Button);
        assert_eq!(class.format, FourCC::BIT);
        assert!(class.usages.is_empty());
    }

    #[test]
    fn six_dof_axes_are_axes() {
        for (usage, name) in [(0x30, "X"), (0x31, "Y"), (0x32, "Z"), (0x33, "Rx"), (0x34, "Ry"), (0x35, "Rz")] {
            let class = classify(&element(0x01, usage, 16)).unwrap();
            assert_eq!(class.kind, ControlKind::Axis);
            assert_eq!(class.name, name);
            assert_eq!(class.format, FourCC::SHORT);
        }
    }

    #[test]
    fn other_usages_are_unrepresentable() {
        // Hat switch, slider, keyboard page, vendor page.
        assert_eq!(classify(&element(0x01, 0x39, 4)), None);
        assert_eq!(classify(&element(0x01, 0x36, 8)), None);
        assert_eq!(classify(&element(0x07, 0x04, 1)), None);
        assert_eq!(classify(&element(0xFF00, 0x20, 8)), None);
    }

    #[test]
    fn only_input_reports_are_representable() {
        for report_type in [HidReportType::Output, HidReportType::Feature] {
            let e = HidElementDescriptor {
                report_type,
                ..element(0x09, 1, 1)
            };
            assert_eq!(classify(&e), None);
        }
    }

    #[test]
    fn explicit_name_wins() {
        let e = HidElementDescriptor {
            name: Some("Trigger".into()),
            ..element(0x09, 1, 1)
        };
        assert_eq!(classify(&e).unwrap().name, "Trigger");
    }

    #[test]
    fn odd_widths_have_no_format() {
        let class = classify(&element(0x01, 0x30, 10)).unwrap();
        assert!(!class.has_format());
        assert!(is_usable(&element(0x01, 0x30, 10)));
        assert!(is_usable(&element(0x01, 0x30, 32)));
        assert!(!is_usable(&element(0x01, 0x38, 8)));
        assert_eq!(element(0x01, 0x30, 8).format(), FourCC::BYTE);
    }

    #[test]
    fn button_zero_is_primary() {
        let class = classify(&element(0x09, 0, 1)).unwrap();
        assert_eq!(class.usages, &[common::PRIMARY_TRIGGER, common::PRIMARY_ACTION]);
        assert_eq!(class.name, "button0");
    }
}
