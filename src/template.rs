//! Control trees ("templates").
//!
//! An [`InputTemplate`] is the compiled, offset-resolved description of a
//! device's state block: an ordered list of [`ControlDescriptor`]s, each naming
//! a span of bits and its format. Templates are built once, through
//! [`TemplateBuilder`], and are immutable afterwards.
//!
//! ## Invariants enforced by [`TemplateBuilder::build`]
//! - The declared size is the larger of the explicit size and the end of the
//!   last control, rounded up to the alignment unit.
//! - Two non-aggregate controls in the same report may not share a bit.
//!   Controls in different reports may, since they are told apart by report id
//!   when read. Aggregates such as [`ControlKind::AnyKey`] span other controls
//!   on purpose.
//!
//! ## Specialization
//! A template that names a `base` is composed with it at resolution time
//! ([`InputTemplate::compose`]): base controls first, then the derived ones,
//! with a derived control replacing a base control of the same name.

use crate::classify::ControlKind;
use crate::device::DeviceCategory;
use crate::error::{LayoutError, Result};
use crate::format::FourCC;
use crate::mapping::InputPipeline;
use serde::{Deserialize, Serialize};

/// One named control inside a template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlDescriptor {
    pub name: String,
    pub kind: ControlKind,
    /// Offset from the start of the owning block, in bits.
    pub bit_offset: u32,
    pub size_in_bits: u32,
    pub format: FourCC,
    /// HID report the bits live in; `0` for non-HID blocks.
    pub report_id: u8,
    pub usages: Vec<String>,
    pub aliases: Vec<String>,
}

impl ControlDescriptor {
    #[inline]
    pub fn end_bit(&self) -> u64 {
        u64::from(self.bit_offset) + u64::from(self.size_in_bits)
    }

    /// Matches the control's name or one of its aliases, ignoring case.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    fn overlaps(&self, other: &ControlDescriptor) -> bool {
        u64::from(self.bit_offset) < other.end_bit() && u64::from(other.bit_offset) < self.end_bit()
    }
}

/// A compiled control tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputTemplate {
    pub name: String,
    pub base: Option<String>,
    pub category: Option<DeviceCategory>,
    /// Format tag of the state block this template describes.
    pub format: FourCC,
    pub size_in_bytes: u32,
    pub controls: Vec<ControlDescriptor>,
    /// Struct mappings owned by this template; released with it.
    #[serde(skip)]
    pub pipeline: InputPipeline,
}

impl InputTemplate {
    #[inline]
    pub fn size_in_bits(&self) -> u64 {
        u64::from(self.size_in_bytes) * 8
    }

    pub fn control(&self, name: &str) -> Option<&ControlDescriptor> {
        self.controls.iter().find(|c| c.answers_to(name))
    }

    /// Layer `self` on top of `base`.
    pub fn compose(&self, base: &InputTemplate) -> InputTemplate {
        let mut controls: Vec<ControlDescriptor> = base
            .controls
            .iter()
            .filter(|b| !self.controls.iter().any(|c| c.name.eq_ignore_ascii_case(&b.name)))
            .cloned()
            .collect();
        controls.extend(self.controls.iter().cloned());

        InputTemplate {
            name: self.name.clone(),
            base: self.base.clone(),
            category: self.category.or(base.category),
            format: if self.format.is_empty() { base.format } else { self.format },
            size_in_bytes: self.size_in_bytes.max(base.size_in_bytes),
            controls,
            pipeline: if self.pipeline.is_empty() {
                base.pipeline.clone()
            } else {
                self.pipeline.clone()
            },
        }
    }
}

/// Round `bits` up to whole bytes, then up to a multiple of `alignment` bytes.
pub fn aligned_size_in_bytes(bits: u64, alignment: u32) -> Result<u32> {
    let alignment = u64::from(alignment.max(1));
    let bytes = bits.div_ceil(8);
    let rounded = bytes.div_ceil(alignment) * alignment;
    u32::try_from(rounded).map_err(|_| LayoutError::LayoutOverflow)
}

/// Incremental construction of an [`InputTemplate`].
///
/// ```
/// use inputforge::{ControlKind, FourCC, TemplateBuilder};
///
/// let mut builder = TemplateBuilder::new("Pedals");
/// builder
///     .add_control("Throttle")
///     .with_kind(ControlKind::Axis)
///     .with_offset(0)
///     .with_format(FourCC::SHORT);
/// let template = builder.build(4).unwrap();
/// assert_eq!(template.size_in_bytes, 4);
/// ```
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    name: String,
    base: Option<String>,
    category: Option<DeviceCategory>,
    format: FourCC,
    size_in_bits: u64,
    controls: Vec<ControlDescriptor>,
    pipeline: InputPipeline,
}

impl TemplateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_base(mut self, base: Option<String>) -> Self {
        self.base = base;
        self
    }

    pub fn with_category(mut self, category: DeviceCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_format(mut self, format: FourCC) -> Self {
        self.format = format;
        self
    }

    /// Declared block size before alignment.
    pub fn with_size_in_bits(mut self, bits: u64) -> Self {
        self.size_in_bits = bits;
        self
    }

    pub fn with_pipeline(mut self, pipeline: InputPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn set_size_in_bits(&mut self, bits: u64) {
        self.size_in_bits = bits;
    }

    /// Append a control and return a handle for filling it in.
    ///
    /// New controls default to a single bit at offset 0.
    pub fn add_control(&mut self, name: impl Into<String>) -> ControlBuilder<'_> {
        self.controls.push(ControlDescriptor {
            name: name.into(),
            kind: ControlKind::Button,
            bit_offset: 0,
            size_in_bits: 1,
            format: FourCC::BIT,
            report_id: 0,
            usages: Vec::new(),
            aliases: Vec::new(),
        });
        let index = self.controls.len() - 1;
        ControlBuilder {
            control: &mut self.controls[index],
        }
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn build(self, alignment: u32) -> Result<InputTemplate> {
        check_overlap(&self.controls)?;
        let end = self
            .controls
            .iter()
            .map(ControlDescriptor::end_bit)
            .max()
            .unwrap_or(0)
            .max(self.size_in_bits);

        Ok(InputTemplate {
            size_in_bytes: aligned_size_in_bytes(end, alignment)?,
            name: self.name,
            base: self.base,
            category: self.category,
            format: self.format,
            controls: self.controls,
            pipeline: self.pipeline,
        })
    }
}

/// Handle to the control most recently added to a [`TemplateBuilder`].
pub struct ControlBuilder<'a> {
    control: &'a mut ControlDescriptor,
}

impl<'a> ControlBuilder<'a> {
    pub fn with_kind(self, kind: ControlKind) -> Self {
        self.control.kind = kind;
        self
    }

    pub fn with_offset(self, bit_offset: u32) -> Self {
        self.control.bit_offset = bit_offset;
        self
    }

    /// Sets the format, and the size when the format implies one.
    pub fn with_format(self, format: FourCC) -> Self {
        self.control.format = format;
        if let Some(bits) = format.bit_width() {
            self.control.size_in_bits = bits;
        }
        self
    }

    pub fn with_size_in_bits(self, bits: u32) -> Self {
        self.control.size_in_bits = bits;
        self
    }

    pub fn with_report_id(self, report_id: u8) -> Self {
        self.control.report_id = report_id;
        self
    }

    pub fn with_usages<I, S>(self, usages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.control.usages.extend(usages.into_iter().map(Into::into));
        self
    }

    pub fn with_aliases<I, S>(self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.control.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }
}

fn check_overlap(controls: &[ControlDescriptor]) -> Result<()> {
    let mut spans: Vec<&ControlDescriptor> = controls
        .iter()
        .filter(|c| !c.kind.is_aggregate() && c.size_in_bits > 0)
        .collect();
    spans.sort_by_key(|c| (c.report_id, c.bit_offset));

    for pair in spans.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.report_id == b.report_id && a.overlaps(b) {
            return Err(LayoutError::OverlappingControls {
                first: a.name.clone(),
                second: b.name.clone(),
                report_id: a.report_id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_rounds_up_to_alignment() {
        assert_eq!(aligned_size_in_bytes(0, 4).unwrap(), 0);
        assert_eq!(aligned_size_in_bytes(1, 4).unwrap(), 4);
        assert_eq!(aligned_size_in_bytes(32, 4).unwrap(), 4);
        assert_eq!(aligned_size_in_bytes(33, 4).unwrap(), 8);
        assert_eq!(aligned_size_in_bytes(9, 1).unwrap(), 2);
    }

    #[test]
    fn explicit_size_wins_over_control_extent() {
        let mut builder = TemplateBuilder::new("T").with_size_in_bits(70);
        builder.add_control("a").with_offset(0);
        assert_eq!(builder.build(4).unwrap().size_in_bytes, 12);
    }

    #[test]
    fn format_sets_width() {
        let mut builder = TemplateBuilder::new("T");
        builder.add_control("x").with_format(FourCC::INT).with_offset(8);
        let t = builder.build(4).unwrap();
        assert_eq!(t.controls[0].size_in_bits, 32);
        assert_eq!(t.size_in_bytes, 8);
    }

    #[test]
    fn overlapping_controls_in_one_report_are_rejected() {
        let mut builder = TemplateBuilder::new("T");
        builder.add_control("a").with_format(FourCC::BYTE).with_offset(0);
        builder.add_control("b").with_format(FourCC::BYTE).with_offset(4);
        let err = builder.build(4).unwrap_err();
        assert!(matches!(err, LayoutError::OverlappingControls { report_id: 0, .. }));
    }

    #[test]
    fn overlap_across_reports_and_aggregates_is_allowed() {
        let mut builder = TemplateBuilder::new("T");
        builder.add_control("a").with_format(FourCC::BYTE).with_report_id(1);
        builder.add_control("b").with_format(FourCC::BYTE).with_report_id(2);
        builder
            .add_control("any")
            .with_kind(ControlKind::AnyKey)
            .with_size_in_bits(32);
        assert!(builder.build(4).is_ok());
    }

    #[test]
    fn lookup_honours_aliases_case_insensitively() {
        let mut builder = TemplateBuilder::new("T");
        builder.add_control("RightAlt").with_aliases(["AltGr"]);
        let t = builder.build(4).unwrap();
        assert_eq!(t.control("altgr").map(|c| c.name.as_str()), Some("RightAlt"));
        assert!(t.control("LeftAlt").is_none());
    }

    #[test]
    fn compose_layers_derived_over_base() {
        let mut base = TemplateBuilder::new("Base")
            .with_category(DeviceCategory::Gamepad)
            .with_format(FourCC::HID);
        base.add_control("a").with_offset(0);
        base.add_control("b").with_offset(1);
        let base = base.build(4).unwrap();

        let mut derived = TemplateBuilder::new("Derived").extends("Base");
        derived.add_control("B").with_offset(40);
        let derived = derived.build(4).unwrap();

        let composed = derived.compose(&base);
        let names: Vec<_> = composed.controls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "B"]);
        assert_eq!(composed.category, Some(DeviceCategory::Gamepad));
        assert_eq!(composed.format, FourCC::HID);
        assert_eq!(composed.size_in_bytes, 8);
    }
}
