//! Raw HID report-descriptor decoding.
//!
//! Some platforms hand us the device's report descriptor bytes instead of a
//! pre-digested element list. `hidreport` parses the item stream; this module
//! flattens its reports into the same [`HidDeviceDescriptor`] the JSON path
//! yields, so everything downstream (classification, layout) is identical.
//!
//! ## Element expansion
//! - **Variable** fields become one element each, `report_size` bits wide.
//! - **Array** fields become a single element covering all their bits.
//! - **Constant** fields become padding elements on usage page `0`. They
//!   never classify as controls, but Input padding still advances the layout
//!   offset, which keeps later fields where the device puts them.
//!
//! Elements are emitted Input reports first, then Output, then Feature, each
//! report's fields in wire order.
//!
//! Before parsing, the item stream is scanned once. Descriptors that would
//! expand past [`MAX_ELEMENTS`], main items with a zero report size or count,
//! and usages with no usage page in scope are rejected as
//! [`LayoutError::MalformedDescriptor`], as is anything `hidreport` refuses.

use crate::descriptor::{HidDeviceDescriptor, HidElementDescriptor, HidReportType};
use crate::error::{LayoutError, Result};
use hidreport::{Field, Report, ReportDescriptor};
use std::ops::Range;
use tracing::trace;

/// Most elements one descriptor may expand into.
pub const MAX_ELEMENTS: usize = 1 << 14;

fn malformed(message: impl std::fmt::Display) -> LayoutError {
    LayoutError::MalformedDescriptor(message.to_string())
}

#[derive(Clone, Copy, Debug, Default)]
struct ScanGlobals {
    has_usage_page: bool,
    report_size: Option<usize>,
    report_count: Option<usize>,
}

/// Walk the items once, bounding the expansion before anything is built.
fn scan_items(bytes: &[u8]) -> Result<()> {
    use hidreport::hid::*;

    let items = ReportDescriptorItems::try_from(bytes).map_err(malformed)?;
    let mut current = ScanGlobals::default();
    let mut saved: Vec<ScanGlobals> = Vec::new();
    let mut elements = 0usize;

    for rdesc_item in items.iter() {
        let offset = rdesc_item.offset();
        let main = match rdesc_item.item().item_type() {
            ItemType::Main(MainItem::Input(i)) => Some((i.is_constant(), i.is_variable())),
            ItemType::Main(MainItem::Output(i)) => Some((i.is_constant(), i.is_variable())),
            ItemType::Main(MainItem::Feature(i)) => Some((i.is_constant(), i.is_variable())),
            ItemType::Global(GlobalItem::UsagePage { .. }) => {
                current.has_usage_page = true;
                None
            }
            ItemType::Global(GlobalItem::ReportSize { size }) => {
                current.report_size = Some(usize::from(size));
                None
            }
            ItemType::Global(GlobalItem::ReportCount { count }) => {
                current.report_count = Some(usize::from(count));
                None
            }
            ItemType::Global(GlobalItem::Push) => {
                saved.push(current);
                None
            }
            ItemType::Global(GlobalItem::Pop) => {
                current = saved
                    .pop()
                    .ok_or_else(|| malformed(format!("pop without push at byte {offset}")))?;
                None
            }
            ItemType::Local(LocalItem::Usage { usage_page: None, .. })
                if !current.has_usage_page =>
            {
                return Err(malformed(format!("usage without a usage page at byte {offset}")));
            }
            _ => None,
        };

        let Some((constant, variable)) = main else { continue };
        // Missing sizes are left for the parser to report.
        let (Some(size), Some(count)) = (current.report_size, current.report_count) else {
            continue;
        };
        if size == 0 || count == 0 {
            return Err(malformed(format!("empty main item at byte {offset}")));
        }
        elements += if variable && !constant { count } else { 1 };
        if elements > MAX_ELEMENTS {
            return Err(malformed(format!(
                "descriptor expands past {MAX_ELEMENTS} elements at byte {offset}"
            )));
        }
    }
    Ok(())
}

/// Decode a raw report descriptor into the capability model.
pub fn decode(bytes: &[u8]) -> Result<HidDeviceDescriptor> {
    scan_items(bytes)?;
    let rdesc = ReportDescriptor::try_from(bytes).map_err(malformed)?;

    let mut out = HidDeviceDescriptor::default();
    push_reports(&mut out.elements, rdesc.input_reports(), HidReportType::Input);
    push_reports(&mut out.elements, rdesc.output_reports(), HidReportType::Output);
    push_reports(&mut out.elements, rdesc.feature_reports(), HidReportType::Feature);

    // The outermost collection's usage names the device.
    let device_usage = top_level_usage(rdesc.input_reports())
        .or_else(|| top_level_usage(rdesc.output_reports()))
        .or_else(|| top_level_usage(rdesc.feature_reports()));
    if let Some(usage) = device_usage {
        out.usage_page_id = i32::from(u16::from(usage.usage_page));
        out.usage_id = i32::from(u16::from(usage.usage_id));
    }

    trace!(elements = out.elements.len(), "decoded report descriptor");
    Ok(out)
}

fn top_level_usage(reports: &[impl Report]) -> Option<hidreport::Usage> {
    reports
        .iter()
        .flat_map(|r| r.fields())
        .find_map(|field| field.collections().first()?.usages().first().copied())
}

fn push_reports(
    out: &mut Vec<HidElementDescriptor>,
    reports: &[impl Report],
    report_type: HidReportType,
) {
    for report in reports {
        let report_id = (*report.report_id()).map_or(0, |id| i32::from(u8::from(id)));
        out.extend(report.fields().iter().map(|field| HidElementDescriptor {
            report_type,
            report_id,
            ..element(field)
        }));
    }
}

fn element(field: &Field) -> HidElementDescriptor {
    match field {
        Field::Variable(v) => HidElementDescriptor {
            usage_page_id: i32::from(u16::from(v.usage.usage_page)),
            usage_id: i32::from(u16::from(v.usage.usage_id)),
            logical_min: i32::from(v.logical_minimum),
            logical_max: i32::from(v.logical_maximum),
            physical_min: v.physical_minimum.map_or(0, i32::from),
            physical_max: v.physical_maximum.map_or(0, i32::from),
            report_count: 1,
            report_size_in_bits: width(&v.bits),
            ..Default::default()
        },
        Field::Array(a) => {
            let (page, id) = a
                .usages()
                .first()
                .map_or((0, 0), |u| (u16::from(u.usage_page), u16::from(u.usage_id)));
            HidElementDescriptor {
                usage_page_id: i32::from(page),
                usage_id: i32::from(id),
                logical_min: i32::from(a.logical_minimum),
                logical_max: i32::from(a.logical_maximum),
                physical_min: a.physical_minimum.map_or(0, i32::from),
                physical_max: a.physical_maximum.map_or(0, i32::from),
                report_count: i32::try_from(usize::from(a.report_count)).unwrap_or(i32::MAX),
                report_size_in_bits: width(&a.bits),
                is_array: true,
                ..Default::default()
            }
        }
        Field::Constant(c) => HidElementDescriptor {
            report_count: 1,
            report_size_in_bits: width(&c.bits),
            ..Default::default()
        },
    }
}

fn width(bits: &Range<usize>) -> i32 {
    let len = bits.end.saturating_sub(bits.start);
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two 8-bit axes, four buttons, four bits of padding, one output byte.
    const JOYSTICK: &[u8] = &[
        0x05, 0x01, // Usage Page (Generic Desktop)
        0x09, 0x04, // Usage (Joystick)
        0xA1, 0x01, // Collection (Application)
        0x15, 0x81, //   Logical Minimum (-127)
        0x25, 0x7F, //   Logical Maximum (127)
        0x09, 0x30, //   Usage (X)
        0x09, 0x31, //   Usage (Y)
        0x75, 0x08, //   Report Size (8)
        0x95, 0x02, //   Report Count (2)
        0x81, 0x02, //   Input (Data,Var,Abs)
        0x05, 0x09, //   Usage Page (Button)
        0x19, 0x01, //   Usage Minimum (1)
        0x29, 0x04, //   Usage Maximum (4)
        0x15, 0x00, //   Logical Minimum (0)
        0x25, 0x01, //   Logical Maximum (1)
        0x75, 0x01, //   Report Size (1)
        0x95, 0x04, //   Report Count (4)
        0x81, 0x02, //   Input (Data,Var,Abs)
        0x95, 0x01, //   Report Count (1)
        0x75, 0x04, //   Report Size (4)
        0x81, 0x03, //   Input (Const,Var,Abs)
        0x05, 0x08, //   Usage Page (LEDs)
        0x09, 0x01, //   Usage (Num Lock)
        0x75, 0x08, //   Report Size (8)
        0x91, 0x02, //   Output (Data,Var,Abs)
        0xC0, // End Collection
    ];

    #[test]
    fn decodes_device_usage_and_elements() {
        let desc = decode(JOYSTICK).unwrap();
        assert_eq!((desc.usage_page_id, desc.usage_id), (0x01, 0x04));

        let summary: Vec<_> = desc
            .elements
            .iter()
            .map(|e| (e.usage_page_id, e.usage_id, e.report_size_in_bits, e.report_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0x01, 0x30, 8, HidReportType::Input),
                (0x01, 0x31, 8, HidReportType::Input),
                (0x09, 1, 1, HidReportType::Input),
                (0x09, 2, 1, HidReportType::Input),
                (0x09, 3, 1, HidReportType::Input),
                (0x09, 4, 1, HidReportType::Input),
                (0x00, 0, 4, HidReportType::Input),
                (0x08, 0x01, 8, HidReportType::Output),
            ]
        );
        assert_eq!(desc.elements[0].logical_min, -127);
        assert_eq!(desc.elements[0].logical_max, 127);
        assert_eq!(desc.elements[2].logical_max, 1);
    }

    #[test]
    fn two_byte_maximum_stays_positive() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, 0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00,
            0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
        ];
        let desc = decode(&bytes).unwrap();
        assert_eq!(desc.elements[0].logical_max, 255);
    }

    #[test]
    fn array_items_collapse_to_one_element() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x07, 0x19, 0x00, 0x29, 0x65, 0x15, 0x00, 0x25, 0x65,
            0x75, 0x08, 0x95, 0x06, 0x81, 0x00,
        ];
        let desc = decode(&bytes).unwrap();
        assert_eq!(desc.elements.len(), 1);
        let e = &desc.elements[0];
        assert!(e.is_array);
        assert_eq!(e.report_count, 6);
        assert_eq!(e.report_size_in_bits, 48);
        assert_eq!((e.usage_page_id, e.usage_id), (0x07, 0x00));
    }

    #[test]
    fn push_pop_restores_globals() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, // page GD
            0xA4,       // push
            0x05, 0x09, // page Button
            0xB4,       // pop
            0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00, 0x75, 0x10, 0x95, 0x01, 0x81, 0x02,
        ];
        let desc = decode(&bytes).unwrap();
        assert_eq!(desc.elements[0].usage_page_id, 0x01);
        assert_eq!(desc.elements[0].report_size_in_bits, 16);
    }

    #[test]
    fn extended_usage_carries_its_page() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x09, 0x0B, 0x30, 0x00, 0x01, 0x00, 0x15, 0x00, 0x25, 0x7F,
            0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
        ];
        let desc = decode(&bytes).unwrap();
        assert_eq!((desc.elements[0].usage_page_id, desc.elements[0].usage_id), (1, 0x30));
    }

    #[test]
    fn report_id_is_carried() {
        #[rustfmt::skip]
        let bytes = [
            0x85, 0x03, 0x05, 0x01, 0x09, 0x38, 0x15, 0x81, 0x25, 0x7F,
            0x75, 0x08, 0x95, 0x01, 0x81, 0x06,
        ];
        let desc = decode(&bytes).unwrap();
        assert_eq!(desc.elements[0].report_id, 3);
        assert_eq!(desc.elements[0].usage_id, 0x38);
    }

    #[test]
    fn malformed_streams_are_rejected() {
        // Pop with nothing pushed.
        assert!(matches!(decode(&[0xB4]), Err(LayoutError::MalformedDescriptor(_))));
        // Usage before any usage page.
        assert!(matches!(
            decode(&[0x09, 0x30, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02]),
            Err(LayoutError::MalformedDescriptor(_))
        ));
        // Zero-width main item.
        assert!(matches!(
            decode(&[0x75, 0x00, 0x95, 0x01, 0x81, 0x03]),
            Err(LayoutError::MalformedDescriptor(_))
        ));
        // Data item with no logical range.
        assert!(matches!(
            decode(&[0x05, 0x01, 0x09, 0x30, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02]),
            Err(LayoutError::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn expansion_is_bounded() {
        // Report Count 0xFFFF of 1-bit variables, repeated: millions of elements.
        let mut bytes = vec![
            0x05, 0x09, 0x19, 0x01, 0x29, 0x01, 0x15, 0x00, 0x25, 0x01, 0x75, 0x01, 0x96, 0xFF,
            0xFF,
        ];
        for _ in 0..200 {
            bytes.extend_from_slice(&[0x81, 0x02]);
        }
        assert!(matches!(decode(&bytes), Err(LayoutError::MalformedDescriptor(_))));

        // Right at the cap is still accepted.
        let at_cap = (MAX_ELEMENTS as u16).to_le_bytes();
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x09, 0x19, 0x01, 0x29, 0x01, 0x15, 0x00, 0x25, 0x01,
            0x75, 0x01, 0x96, at_cap[0], at_cap[1], 0x81, 0x02,
        ];
        assert_eq!(decode(&bytes).unwrap().elements.len(), MAX_ELEMENTS);
    }
}
