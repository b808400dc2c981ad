//! Struct-mapping pipelines.
//!
//! A pipeline converts one fixed-format binary block into another: a raw event
//! as a native producer writes it into the shape a consumer stores. It is a
//! flat list of [`InputStructMapping`]s, each owning a contiguous run of
//! [`InputTransform`]s in a shared transform list. That is the layout native
//! code consumes.
//!
//! ## Execution
//! - Transforms run in list order; a later transform may overwrite bits an
//!   earlier one wrote.
//! - Reads stay inside the first `input_size_in_bytes` of the source and
//!   writes inside the first `output_size_in_bytes` of the destination.
//! - A mapping with no transforms is a bit-identical copy, which requires
//!   both sides to have the same size.
//!
//! Bit addressing is LSB-first within each byte, bytes ascending, matching
//! the HID report convention.

use crate::error::{LayoutError, Result};
use crate::format::FourCC;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum width of one transformed field.
pub const MAX_FIELD_BITS: u32 = 64;

/// Numeric reinterpretation applied while copying a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conversion {
    /// Zero-extend or truncate.
    #[default]
    Copy,
    /// Treat the source as two's complement and widen keeping the sign.
    SignExtend,
    /// Linearly map `[src_min, src_max]` onto `[dst_min, dst_max]`, clamping.
    Rescale {
        src_min: i64,
        src_max: i64,
        dst_min: i64,
        dst_max: i64,
    },
    /// Map `[min, max]` onto an `f32` in `[0, 1]`; needs a 32-bit destination.
    Normalize { min: i64, max: i64 },
}

impl Conversion {
    fn convert(self, raw: u64, src_bits: u32) -> u64 {
        match self {
            Conversion::Copy => raw,
            Conversion::SignExtend => sign_extend(raw, src_bits) as u64,
            Conversion::Rescale {
                src_min,
                src_max,
                dst_min,
                dst_max,
            } => {
                let t = unit_interval(read_signed(raw, src_bits, src_min), src_min, src_max);
                // Full i64 ranges overflow an integer span.
                let span = dst_max as f64 - dst_min as f64;
                (dst_min as f64 + (t * span).round()) as i64 as u64
            }
            Conversion::Normalize { min, max } => {
                let t = unit_interval(read_signed(raw, src_bits, min), min, max);
                u64::from((t as f32).to_bits())
            }
        }
    }
}

fn sign_extend(raw: u64, bits: u32) -> i64 {
    if bits == 0 || bits >= 64 {
        return raw as i64;
    }
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

// Signed sources only when the declared range reaches below zero.
fn read_signed(raw: u64, bits: u32, min: i64) -> i64 {
    if min < 0 {
        sign_extend(raw, bits)
    } else {
        raw as i64
    }
}

fn unit_interval(value: i64, min: i64, max: i64) -> f64 {
    if max == min {
        return 0.0;
    }
    ((value as f64 - min as f64) / (max as f64 - min as f64)).clamp(0.0, 1.0)
}

/// Copy one field from the source block to the destination block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTransform {
    pub src_bit_offset: u32,
    pub src_bits: u32,
    pub dst_bit_offset: u32,
    pub dst_bits: u32,
    pub conversion: Conversion,
}

impl InputTransform {
    /// Same-width copy.
    pub fn copy(src_bit_offset: u32, dst_bit_offset: u32, bits: u32) -> Self {
        Self {
            src_bit_offset,
            src_bits: bits,
            dst_bit_offset,
            dst_bits: bits,
            conversion: Conversion::Copy,
        }
    }

    /// Zero-extending copy into a wider (or narrower) field.
    pub fn resize(src_bit_offset: u32, src_bits: u32, dst_bit_offset: u32, dst_bits: u32) -> Self {
        Self {
            src_bit_offset,
            src_bits,
            dst_bit_offset,
            dst_bits,
            conversion: Conversion::Copy,
        }
    }

    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }

    fn src_end(&self) -> u64 {
        u64::from(self.src_bit_offset) + u64::from(self.src_bits)
    }

    fn dst_end(&self) -> u64 {
        u64::from(self.dst_bit_offset) + u64::from(self.dst_bits)
    }

    fn run(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        let widths = 1..=MAX_FIELD_BITS;
        if !widths.contains(&self.src_bits) || !widths.contains(&self.dst_bits) {
            return Err(LayoutError::InvalidMapping(format!(
                "field widths of {self:?} must be 1..={MAX_FIELD_BITS} bits"
            )));
        }
        let src_range = self.src_bit_offset as usize..self.src_end() as usize;
        let dst_range = self.dst_bit_offset as usize..self.dst_end() as usize;

        let raw: u64 = src
            .view_bits::<Lsb0>()
            .get(src_range)
            .ok_or_else(|| out_of_block("source", self))?
            .load_le();
        let value = self.conversion.convert(raw, self.src_bits);
        dst.view_bits_mut::<Lsb0>()
            .get_mut(dst_range)
            .ok_or_else(|| out_of_block("destination", self))?
            .store_le(value);
        Ok(())
    }
}

fn out_of_block(side: &str, t: &InputTransform) -> LayoutError {
    LayoutError::InvalidMapping(format!("{side} span of {t:?} leaves its block"))
}

/// Rule converting blocks of one format into another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStructMapping {
    pub input_format: FourCC,
    pub output_format: FourCC,
    pub input_size_in_bytes: u32,
    pub output_size_in_bytes: u32,
    pub transform_start_index: u32,
    pub transform_count: u32,
}

/// Struct mappings plus the transform list they index into.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPipeline {
    pub struct_mappings: Vec<InputStructMapping>,
    pub transforms: Vec<InputTransform>,
}

impl InputPipeline {
    /// Pipeline with no mappings at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single mapping of a format onto itself: zero transforms, a straight copy.
    pub fn identity(format: FourCC, size_in_bytes: u32) -> Self {
        Self {
            struct_mappings: vec![InputStructMapping {
                input_format: format,
                output_format: format,
                input_size_in_bytes: size_in_bytes,
                output_size_in_bytes: size_in_bytes,
                transform_start_index: 0,
                transform_count: 0,
            }],
            transforms: Vec::new(),
        }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.struct_mappings.is_empty()
    }

    pub fn find(&self, input: FourCC, output: FourCC) -> Option<&InputStructMapping> {
        self.struct_mappings
            .iter()
            .find(|m| m.input_format == input && m.output_format == output)
    }

    /// The transforms a mapping owns, or `None` when its index range is bogus.
    pub fn transforms_of(&self, mapping: &InputStructMapping) -> Option<&[InputTransform]> {
        let start = mapping.transform_start_index as usize;
        let end = start.checked_add(mapping.transform_count as usize)?;
        self.transforms.get(start..end)
    }

    /// Check every mapping against its declared block sizes.
    pub fn validate(&self) -> Result<()> {
        for (i, mapping) in self.struct_mappings.iter().enumerate() {
            if self.struct_mappings[..i]
                .iter()
                .any(|m| m.input_format == mapping.input_format && m.output_format == mapping.output_format)
            {
                return Err(LayoutError::InvalidMapping(format!(
                    "duplicate mapping {} -> {}",
                    mapping.input_format, mapping.output_format
                )));
            }
            validate_mapping(self, mapping)?;
        }
        Ok(())
    }

    /// Convert `src` (an `input`-format block) into `dst` (an `output`-format block).
    pub fn apply(&self, input: FourCC, output: FourCC, src: &[u8], dst: &mut [u8]) -> Result<()> {
        let mapping = self
            .find(input, output)
            .ok_or(LayoutError::MissingMapping { input, output })?;
        let in_len = mapping.input_size_in_bytes as usize;
        let out_len = mapping.output_size_in_bytes as usize;

        let src = src.get(..in_len).ok_or(LayoutError::BlockTooSmall {
            needed: in_len,
            actual: src.len(),
        })?;
        let actual = dst.len();
        let dst = dst.get_mut(..out_len).ok_or(LayoutError::BlockTooSmall {
            needed: out_len,
            actual,
        })?;

        let transforms = self.transforms_of(mapping).ok_or_else(|| {
            LayoutError::InvalidMapping(format!("transform range of {input} -> {output} is out of bounds"))
        })?;

        if transforms.is_empty() {
            if in_len != out_len {
                return Err(LayoutError::InvalidMapping(format!(
                    "{input} -> {output} has no transforms but sizes differ"
                )));
            }
            dst.copy_from_slice(src);
            return Ok(());
        }

        // Commit only once every transform has run.
        let mut staged = dst.to_vec();
        for transform in transforms {
            transform.run(src, &mut staged)?;
        }
        dst.copy_from_slice(&staged);
        Ok(())
    }
}

fn validate_mapping(pipeline: &InputPipeline, mapping: &InputStructMapping) -> Result<()> {
    let name = format!("{} -> {}", mapping.input_format, mapping.output_format);
    let transforms = pipeline
        .transforms_of(mapping)
        .ok_or_else(|| LayoutError::InvalidMapping(format!("{name}: transform range out of bounds")))?;

    if transforms.is_empty() && mapping.input_size_in_bytes != mapping.output_size_in_bytes {
        return Err(LayoutError::InvalidMapping(format!(
            "{name}: no transforms but sizes differ"
        )));
    }

    let src_limit = u64::from(mapping.input_size_in_bytes) * 8;
    let dst_limit = u64::from(mapping.output_size_in_bytes) * 8;
    let mut previous: Option<&InputTransform> = None;

    for t in transforms {
        let widths = 1..=MAX_FIELD_BITS;
        if !widths.contains(&t.src_bits) || !widths.contains(&t.dst_bits) {
            return Err(LayoutError::InvalidMapping(format!(
                "{name}: field widths must be 1..={MAX_FIELD_BITS} bits"
            )));
        }
        if t.src_end() > src_limit || t.dst_end() > dst_limit {
            return Err(LayoutError::InvalidMapping(format!(
                "{name}: {t:?} exceeds the declared block sizes"
            )));
        }
        match t.conversion {
            Conversion::Normalize { min, max } if max == min || t.dst_bits != 32 => {
                return Err(LayoutError::InvalidMapping(format!(
                    "{name}: normalize needs a non-empty range and a 32-bit destination"
                )));
            }
            Conversion::Rescale { src_min, src_max, .. } if src_min == src_max => {
                return Err(LayoutError::InvalidMapping(format!("{name}: empty rescale range")));
            }
            _ => {}
        }
        if let Some(prev) = previous {
            if t.src_bit_offset < prev.src_bit_offset || t.dst_bit_offset < prev.dst_bit_offset {
                return Err(LayoutError::InvalidMapping(format!(
                    "{name}: transforms must keep field order"
                )));
            }
        }
        previous = Some(t);
    }
    Ok(())
}

/// Builds a pipeline mapping by mapping; `build` validates the result.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    pipeline: InputPipeline,
    orphan_transform: bool,
}

impl PipelineBuilder {
    /// Start a new mapping; subsequent transforms belong to it.
    pub fn mapping(
        mut self,
        input_format: FourCC,
        input_size_in_bytes: u32,
        output_format: FourCC,
        output_size_in_bytes: u32,
    ) -> Self {
        self.pipeline.struct_mappings.push(InputStructMapping {
            input_format,
            output_format,
            input_size_in_bytes,
            output_size_in_bytes,
            transform_start_index: self.pipeline.transforms.len() as u32,
            transform_count: 0,
        });
        self
    }

    pub fn transform(mut self, transform: InputTransform) -> Self {
        match self.pipeline.struct_mappings.last_mut() {
            Some(mapping) => {
                mapping.transform_count += 1;
                self.pipeline.transforms.push(transform);
            }
            None => self.orphan_transform = true,
        }
        self
    }

    pub fn build(self) -> Result<InputPipeline> {
        if self.orphan_transform {
            return Err(LayoutError::InvalidMapping(
                "transform added before any mapping".into(),
            ));
        }
        self.pipeline.validate()?;
        Ok(self.pipeline)
    }
}

/// A fixed-format data type that declares how it converts into other shapes.
pub trait InputData {
    const FORMAT: FourCC;
    const SIZE_IN_BYTES: u32;

    /// Struct mappings out of this type. Built on request; callers may cache.
    fn pipeline() -> InputPipeline;
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: FourCC = FourCC::new(b'A', b'A', b'A', b'A');
    const B: FourCC = FourCC::new(b'B', b'B', b'B', b'B');

    #[test]
    fn identity_is_a_straight_copy() {
        let pipeline = InputPipeline::identity(A, 4);
        assert!(pipeline.transforms.is_empty());
        pipeline.validate().unwrap();

        let src = [1, 2, 3, 4];
        let mut dst = [0u8; 6];
        pipeline.apply(A, A, &src, &mut dst).unwrap();
        assert_eq!(dst, [1, 2, 3, 4, 0, 0]);
    }

    #[test]
    fn widens_a_byte_into_an_int() {
        let pipeline = InputPipeline::builder()
            .mapping(A, 1, B, 4)
            .transform(InputTransform::resize(0, 8, 0, 32))
            .build()
            .unwrap();
        let mut dst = [0xFFu8; 4];
        pipeline.apply(A, B, &[0xF0], &mut dst).unwrap();
        assert_eq!(dst, [0xF0, 0, 0, 0]);

        let pipeline = InputPipeline::builder()
            .mapping(A, 1, B, 4)
            .transform(InputTransform::resize(0, 8, 0, 32).with_conversion(Conversion::SignExtend))
            .build()
            .unwrap();
        pipeline.apply(A, B, &[0xF0], &mut dst).unwrap();
        assert_eq!(i32::from_le_bytes(dst), -16);
    }

    #[test]
    fn moves_bit_fields_between_offsets() {
        // Bits 3..7 of the source land at bit 12 of the destination.
        let pipeline = InputPipeline::builder()
            .mapping(A, 1, B, 2)
            .transform(InputTransform::copy(3, 12, 4))
            .build()
            .unwrap();
        let mut dst = [0u8; 2];
        pipeline.apply(A, B, &[0b0101_1000], &mut dst).unwrap();
        assert_eq!(u16::from_le_bytes(dst), 0b1011 << 12);
    }

    #[test]
    fn rescale_and_normalize() {
        let pipeline = InputPipeline::builder()
            .mapping(A, 2, B, 8)
            .transform(InputTransform::resize(0, 8, 0, 16).with_conversion(Conversion::Rescale {
                src_min: 0,
                src_max: 255,
                dst_min: -32768,
                dst_max: 32767,
            }))
            .transform(InputTransform::resize(8, 8, 32, 32).with_conversion(Conversion::Normalize {
                min: -128,
                max: 127,
            }))
            .build()
            .unwrap();
        let mut dst = [0u8; 8];
        pipeline.apply(A, B, &[255, 0x80], &mut dst).unwrap();
        assert_eq!(i16::from_le_bytes([dst[0], dst[1]]), 32767);
        let f = f32::from_le_bytes([dst[4], dst[5], dst[6], dst[7]]);
        assert_eq!(f, 0.0);
    }

    #[test]
    fn rescale_across_the_full_i64_range() {
        let pipeline = InputPipeline::builder()
            .mapping(A, 1, B, 8)
            .transform(InputTransform::resize(0, 8, 0, 64).with_conversion(Conversion::Rescale {
                src_min: 0,
                src_max: 255,
                dst_min: i64::MIN,
                dst_max: i64::MAX,
            }))
            .build()
            .unwrap();
        let mut dst = [0u8; 8];
        pipeline.apply(A, B, &[0], &mut dst).unwrap();
        assert_eq!(i64::from_le_bytes(dst), i64::MIN);
        pipeline.apply(A, B, &[255], &mut dst).unwrap();
        assert_eq!(i64::from_le_bytes(dst), i64::MAX);
    }

    #[test]
    fn failed_apply_leaves_destination_untouched() {
        // Hand-assembled and never validated: the second transform leaves the block.
        let pipeline = InputPipeline {
            struct_mappings: vec![InputStructMapping {
                input_format: A,
                output_format: B,
                input_size_in_bytes: 1,
                output_size_in_bytes: 1,
                transform_start_index: 0,
                transform_count: 2,
            }],
            transforms: vec![InputTransform::copy(0, 0, 8), InputTransform::copy(0, 4, 8)],
        };
        assert!(pipeline.validate().is_err());

        let mut dst = [0xAAu8; 1];
        assert!(matches!(
            pipeline.apply(A, B, &[0x11], &mut dst),
            Err(LayoutError::InvalidMapping(_))
        ));
        assert_eq!(dst, [0xAA]);
    }

    #[test]
    fn later_transforms_win() {
        let pipeline = InputPipeline::builder()
            .mapping(A, 2, B, 1)
            .transform(InputTransform::copy(0, 0, 8))
            .transform(InputTransform::copy(8, 0, 8))
            .build()
            .unwrap();
        let mut dst = [0u8; 1];
        pipeline.apply(A, B, &[1, 2], &mut dst).unwrap();
        assert_eq!(dst, [2]);
    }

    #[test]
    fn writes_stay_inside_the_output_block() {
        let pipeline = InputPipeline::builder()
            .mapping(A, 1, B, 1)
            .transform(InputTransform::copy(0, 0, 8))
            .build()
            .unwrap();
        let mut dst = [0xAAu8; 3];
        pipeline.apply(A, B, &[0x11, 0x22], &mut dst).unwrap();
        assert_eq!(dst, [0x11, 0xAA, 0xAA]);
    }

    #[test]
    fn rejects_spans_outside_declared_sizes() {
        let err = InputPipeline::builder()
            .mapping(A, 1, B, 4)
            .transform(InputTransform::copy(4, 0, 8))
            .build();
        assert!(matches!(err, Err(LayoutError::InvalidMapping(_))));

        let err = InputPipeline::builder()
            .mapping(A, 4, B, 1)
            .transform(InputTransform::copy(0, 0, 16))
            .build();
        assert!(matches!(err, Err(LayoutError::InvalidMapping(_))));
    }

    #[test]
    fn rejects_reordering_and_bad_shapes() {
        let reorder = InputPipeline::builder()
            .mapping(A, 2, B, 2)
            .transform(InputTransform::copy(8, 0, 8))
            .transform(InputTransform::copy(0, 8, 8))
            .build();
        assert!(matches!(reorder, Err(LayoutError::InvalidMapping(_))));

        let sizes = InputPipeline::builder().mapping(A, 2, B, 4).build();
        assert!(matches!(sizes, Err(LayoutError::InvalidMapping(_))));

        let orphan = InputPipeline::builder()
            .transform(InputTransform::copy(0, 0, 8))
            .build();
        assert!(matches!(orphan, Err(LayoutError::InvalidMapping(_))));

        let dup = InputPipeline::builder().mapping(A, 1, A, 1).mapping(A, 1, A, 1).build();
        assert!(matches!(dup, Err(LayoutError::InvalidMapping(_))));
    }

    #[test]
    fn apply_reports_missing_mapping_and_short_blocks() {
        let pipeline = InputPipeline::identity(A, 4);
        let mut dst = [0u8; 4];
        assert!(matches!(
            pipeline.apply(A, B, &[0; 4], &mut dst),
            Err(LayoutError::MissingMapping { .. })
        ));
        assert!(matches!(
            pipeline.apply(A, A, &[0; 2], &mut dst),
            Err(LayoutError::BlockTooSmall { needed: 4, actual: 2 })
        ));
    }
}
