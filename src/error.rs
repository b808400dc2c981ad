//! Crate-wide error type.
//!
//! Most of these never reach application code: the discovery gate folds every
//! descriptor failure into "no template produced". They exist so the layers
//! below the gate can say *why* they declined.

use crate::format::FourCC;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    /// Capability blob present but undecodable.
    #[error("malformed capability descriptor: {0}")]
    MalformedDescriptor(String),

    /// Well-formed descriptor without a single usable element.
    #[error("descriptor has no representable elements")]
    Unrepresentable,

    #[error("device already matched template '{0}'")]
    AlreadyMatched(String),

    #[error("interface '{0}' is not a generic capability interface")]
    UnsupportedInterface(String),

    #[error("device description has no product name")]
    MissingProduct,

    #[error("device description has no capability descriptor")]
    MissingCapabilities,

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{0}' extends itself through its base chain")]
    TemplateCycle(String),

    #[error("controls '{first}' and '{second}' overlap in report {report_id}")]
    OverlappingControls {
        first: String,
        second: String,
        report_id: u8,
    },

    #[error("layout exceeds the addressable bit range")]
    LayoutOverflow,

    #[error("invalid struct mapping: {0}")]
    InvalidMapping(String),

    #[error("no struct mapping from {input} to {output}")]
    MissingMapping { input: FourCC, output: FourCC },

    #[error("block too small: need {needed} bytes, got {actual}")]
    BlockTooSmall { needed: usize, actual: usize },

    #[error("field {key} is outside a block of {field_count} fields")]
    FieldOutOfRange { key: u32, field_count: u32 },

    #[error("no template available for device '{0}'")]
    NoTemplate(String),

    #[error("unknown device id {0}")]
    UnknownDevice(u32),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to decode configuration: {0}")]
    ConfigDecode(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "hid")]
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
