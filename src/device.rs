use crate::discovery::DeviceDescription;
use crate::error::{LayoutError, Result};
use crate::keyboard::KeyboardState;
use crate::template::{ControlDescriptor, InputTemplate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Coarse device family; the current-device registry keeps one slot per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceCategory {
    Generic,
    Joystick,
    Gamepad,
    Keyboard,
    StepCounter,
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A device bound to a resolved template, with a state buffer shaped by it.
#[derive(Clone, Debug)]
pub struct InputDevice {
    id: u32,
    description: DeviceDescription,
    template: Arc<InputTemplate>,
    state: Vec<u8>,
}

impl InputDevice {
    pub fn new(id: u32, description: DeviceDescription, template: Arc<InputTemplate>) -> Self {
        let state = vec![0; template.size_in_bytes as usize];
        Self {
            id,
            description,
            template,
            state,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Display name: product string, falling back to the template name.
    pub fn name(&self) -> &str {
        self.description
            .product
            .as_deref()
            .unwrap_or(&self.template.name)
    }

    pub fn description(&self) -> &DeviceDescription {
        &self.description
    }

    pub fn template(&self) -> &Arc<InputTemplate> {
        &self.template
    }

    pub fn category(&self) -> DeviceCategory {
        self.template.category.unwrap_or(DeviceCategory::Generic)
    }

    pub fn control(&self, name: &str) -> Option<&ControlDescriptor> {
        self.template.control(name)
    }

    pub fn state(&self) -> &[u8] {
        &self.state
    }

    /// Replace the state block; `bytes` must be exactly the template's size.
    /// Keyboard blocks must also keep the bits past the last key clear.
    pub fn update_state(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.state.len() {
            return Err(LayoutError::BlockTooSmall {
                needed: self.state.len(),
                actual: bytes.len(),
            });
        }
        if self.template.format == KeyboardState::FORMAT {
            KeyboardState::from_slice(bytes)?;
        }
        self.state.copy_from_slice(bytes);
        Ok(())
    }
}

impl fmt::Display for InputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.id, self.name(), self.template.name)
    }
}
