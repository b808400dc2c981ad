//! Layout compiler: capability descriptor → offset-resolved template.
//!
//! Elements are laid out in descriptor order from bit 0. Each Input element
//! advances the running offset by its full report size whether or not it
//! became a control, so skipped elements still reserve their bits. Output and
//! Feature elements never advance it.
//!
//! The result depends only on the descriptor, so the same descriptor always
//! compiles to the same bytes.

use crate::classify::classify;
use crate::descriptor::{HidDeviceDescriptor, HidReportType};
use crate::error::{LayoutError, Result};
use crate::format::FourCC;
use crate::mapping::InputPipeline;
use crate::template::{InputTemplate, TemplateBuilder};
use tracing::{debug, trace};

/// Compile `descriptor` into a template named `name`, extending `base`.
pub fn compile_hid_template(
    name: &str,
    base: Option<&str>,
    descriptor: &HidDeviceDescriptor,
    alignment: u32,
) -> Result<InputTemplate> {
    let mut builder = TemplateBuilder::new(name)
        .with_base(base.map(str::to_string))
        .with_format(FourCC::HID);
    let mut offset: u32 = 0;

    for (index, element) in descriptor.elements.iter().enumerate() {
        match classify(element) {
            Some(class) if class.has_format() => {
                trace!(
                    template = name,
                    control = %class.name,
                    kind = %class.kind,
                    bit_offset = offset,
                    format = %class.format,
                    "placing control"
                );
                builder
                    .add_control(class.name)
                    .with_kind(class.kind)
                    .with_offset(offset)
                    .with_format(class.format)
                    .with_size_in_bits(element.size_in_bits())
                    .with_report_id(element.report_id_u8())
                    .with_usages(class.usages.iter().copied());
            }
            Some(class) => {
                debug!(
                    template = name,
                    element = index,
                    control = %class.name,
                    bits = element.size_in_bits(),
                    "no format for element width; skipping"
                );
            }
            None => {}
        }

        if element.report_type == HidReportType::Input {
            offset = offset
                .checked_add(element.size_in_bits())
                .ok_or(LayoutError::LayoutOverflow)?;
        }
    }

    builder.set_size_in_bits(u64::from(offset));
    let mut template = builder.build(alignment)?;
    template.pipeline = InputPipeline::identity(FourCC::HID, template.size_in_bytes);

    debug!(
        template = name,
        controls = template.controls.len(),
        size_in_bytes = template.size_in_bytes,
        "compiled HID template"
    );
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ControlKind;
    use crate::descriptor::HidElementDescriptor;

    fn element(page: i32, usage: i32, bits: i32, report_type: HidReportType) -> HidElementDescriptor {
        HidElementDescriptor {
            usage_page_id: page,
            usage_id: usage,
            report_size_in_bits: bits,
            report_type,
            ..Default::default()
        }
    }

    fn descriptor(elements: Vec<HidElementDescriptor>) -> HidDeviceDescriptor {
        HidDeviceDescriptor {
            elements,
            ..Default::default()
        }
    }

    #[test]
    fn single_button() {
        let d = descriptor(vec![element(0x09, 5, 1, HidReportType::Input)]);
        let t = compile_hid_template("HID::Pad", Some("HID"), &d, 4).unwrap();
        assert_eq!(t.controls.len(), 1);
        let c = &t.controls[0];
        assert_eq!((c.name.as_str(), c.kind, c.bit_offset), ("button5", ControlKind::Button, 0));
        assert_eq!(c.format, FourCC::BIT);
        assert_eq!(t.size_in_bytes, 4);
        assert_eq!(t.base.as_deref(), Some("HID"));
        assert_eq!(t.format, FourCC::HID);
    }

    #[test]
    fn two_int_axes() {
        let d = descriptor(vec![
            element(0x01, 0x30, 32, HidReportType::Input),
            element(0x01, 0x31, 32, HidReportType::Input),
        ]);
        let t = compile_hid_template("HID::Stick", None, &d, 4).unwrap();
        let offsets: Vec<_> = t.controls.iter().map(|c| (c.name.as_str(), c.bit_offset)).collect();
        assert_eq!(offsets, [("X", 0), ("Y", 32)]);
        assert!(t.size_in_bits() >= 64);
        assert_eq!(t.size_in_bytes, 8);
        assert!(t.pipeline.find(FourCC::HID, FourCC::HID).is_some());
    }

    #[test]
    fn skipped_elements_still_reserve_bits() {
        let d = descriptor(vec![
            element(0x01, 0x30, 10, HidReportType::Input), // no format
            element(0x01, 0x39, 4, HidReportType::Input),  // hat, unrepresentable
            element(0x09, 1, 8, HidReportType::Output),    // does not advance
            element(0x09, 2, 1, HidReportType::Input),
        ]);
        let t = compile_hid_template("T", None, &d, 4).unwrap();
        assert_eq!(t.controls.len(), 1);
        assert_eq!(t.controls[0].name, "button2");
        assert_eq!(t.controls[0].bit_offset, 14);
        assert_eq!(t.size_in_bytes, 4);
    }

    #[test]
    fn report_ids_are_carried() {
        let mut e = element(0x09, 1, 1, HidReportType::Input);
        e.report_id = 2;
        let t = compile_hid_template("T", None, &descriptor(vec![e]), 4).unwrap();
        assert_eq!(t.controls[0].report_id, 2);
    }

    #[test]
    fn deterministic() {
        let d = descriptor(vec![
            element(0x09, 0, 1, HidReportType::Input),
            element(0x01, 0x32, 16, HidReportType::Input),
        ]);
        let a = compile_hid_template("T", None, &d, 4).unwrap();
        let b = compile_hid_template("T", None, &d, 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.controls[0].usages, ["PrimaryTrigger", "PrimaryAction"]);
    }

    #[test]
    fn overflowing_offsets_are_rejected() {
        let d = descriptor(vec![
            element(0x09, 1, i32::MAX, HidReportType::Input),
            element(0x09, 2, i32::MAX, HidReportType::Input),
            element(0x09, 3, i32::MAX, HidReportType::Input),
        ]);
        assert!(matches!(
            compile_hid_template("T", None, &d, 4),
            Err(LayoutError::LayoutOverflow)
        ));
    }
}
