//! # inputforge
//!
//! Turns device capability descriptors into binary layouts.
//!
//! A platform backend reports a device as a [`DeviceDescription`] whose
//! capability blob lists the device's report elements. The discovery gate
//! ([`on_device_discovered`]) decides whether the device is representable and,
//! if so, registers a template for it. Resolving that template
//! ([`TemplateRegistry::resolve`]) runs the layout compiler: every usable
//! element becomes a named control at a fixed bit offset, and the total size
//! is rounded to the block alignment.
//!
//! Alongside HID templates the crate ships fixed-layout device types
//! ([`keyboard`], [`step_counter`]) with bit-packed state blocks and
//! struct-mapping pipelines that convert raw event blocks into stored ones.
//!
//! ```
//! use inputforge::backends::virtual_input::VirtualHid;
//! use inputforge::usage::GenericDesktop;
//! use inputforge::{DeviceCategory, DeviceManager, TemplateRegistry};
//! use inputforge::config::CompilerConfig;
//!
//! let registry = TemplateRegistry::with_builtins(CompilerConfig::default());
//! let mut manager = DeviceManager::new(&registry);
//!
//! let stick = VirtualHid::joystick("Stick")
//!     .axis(GenericDesktop::X, 16)
//!     .button(1)
//!     .describe()
//!     .unwrap();
//! manager.add_device(stick, None).unwrap();
//!
//! let current = manager.current(DeviceCategory::Joystick).unwrap();
//! assert_eq!(current.control("button1").unwrap().bit_offset, 16);
//! ```
//!
//! ## Features
//! - **`hid`**: enumerate live devices through `hidapi`.
//!
//! Logging goes through `tracing`; install a subscriber to see it.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod classify;
pub mod compiler;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod discovery;
pub mod error;
pub mod format;
pub mod keyboard;
pub mod manager;
pub mod mapping;
pub mod registry;
pub mod report_descriptor;
pub mod state;
pub mod step_counter;
pub mod template;
pub mod usage;

pub use classify::{classify, ControlKind, ElementClass};
pub use compiler::compile_hid_template;
pub use device::{DeviceCategory, InputDevice};
pub use discovery::{on_device_discovered, try_discover, DeviceDescription};
pub use error::{LayoutError, Result};
pub use format::FourCC;
pub use manager::DeviceManager;
pub use mapping::{InputData, InputPipeline};
pub use registry::{Registration, TemplateRecipe, TemplateRegistry};
pub use state::BitPackedBlock;
pub use template::{ControlDescriptor, InputTemplate, TemplateBuilder};
