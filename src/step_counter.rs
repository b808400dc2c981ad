//! Step counter event and stored component.
//!
//! Native producers emit [`StepCounterEvent`]s; the pipeline converts each into
//! the [`StepCounterInput`] consumers keep.

use crate::classify::ControlKind;
use crate::device::DeviceCategory;
use crate::error::{LayoutError, Result};
use crate::format::FourCC;
use crate::mapping::{InputData, InputPipeline, InputTransform};
use crate::state::{InputStateTypeInfo, STATE_ALIGNMENT};
use crate::template::{InputTemplate, TemplateBuilder};

/// Raw event as written by the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct StepCounterEvent {
    pub step_counter: i32,
}

/// Stored step counter state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct StepCounterInput {
    pub step_counter: i32,
}

macro_rules! le_codec {
    ($ty:ident) => {
        impl $ty {
            pub const SIZE_IN_BYTES: u32 = 4;

            pub fn to_bytes(self) -> [u8; 4] {
                self.step_counter.to_le_bytes()
            }

            pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                let raw: [u8; 4] = bytes
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(LayoutError::BlockTooSmall {
                        needed: 4,
                        actual: bytes.len(),
                    })?;
                Ok(Self {
                    step_counter: i32::from_le_bytes(raw),
                })
            }
        }

        impl InputStateTypeInfo for $ty {
            fn format(&self) -> FourCC {
                <$ty as InputData>::FORMAT
            }
        }
    };
}

le_codec!(StepCounterEvent);
le_codec!(StepCounterInput);

impl InputData for StepCounterEvent {
    const FORMAT: FourCC = FourCC::from_u32(2531298077);
    const SIZE_IN_BYTES: u32 = 4;

    fn pipeline() -> InputPipeline {
        // Infallible: one in-bounds 32-bit copy.
        InputPipeline::builder()
            .mapping(Self::FORMAT, 4, StepCounterInput::FORMAT, 4)
            .transform(InputTransform::copy(0, 0, 32))
            .build()
            .unwrap_or_default()
    }
}

impl InputData for StepCounterInput {
    const FORMAT: FourCC = FourCC::from_u32(4152427195);
    const SIZE_IN_BYTES: u32 = 4;

    fn pipeline() -> InputPipeline {
        InputPipeline::new()
    }
}

impl StepCounterEvent {
    /// Run this event through its pipeline.
    pub fn to_input(self) -> Result<StepCounterInput> {
        let mut out = [0u8; 4];
        Self::pipeline().apply(
            <Self as InputData>::FORMAT,
            <StepCounterInput as InputData>::FORMAT,
            &self.to_bytes(),
            &mut out,
        )?;
        StepCounterInput::from_bytes(&out)
    }
}

/// The `StepCounter` template: one 32-bit integer control.
pub fn template() -> Result<InputTemplate> {
    let mut builder = TemplateBuilder::new("StepCounter")
        .with_category(DeviceCategory::StepCounter)
        .with_format(<StepCounterInput as InputData>::FORMAT)
        .with_pipeline(StepCounterEvent::pipeline());
    builder
        .add_control("stepCounter")
        .with_kind(ControlKind::Integer)
        .with_format(FourCC::INT);
    builder.build(STATE_ALIGNMENT)
}
