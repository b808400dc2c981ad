//! Compiler configuration.
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! interface_name = "HID"
//! namespace = "HID"
//! naming = "product_with_ids"
//! alignment_bytes = 4
//! ```

use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How discovered devices are named.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateNaming {
    /// `<namespace>::<product>`.
    #[default]
    Product,
    /// `<namespace>::<product>::<vid>:<pid>`, hex, so equally named products stay apart.
    ProductWithIds,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Interface tag the discovery gate accepts.
    pub interface_name: String,
    /// Prefix of synthesized template names.
    pub namespace: String,
    pub naming: TemplateNaming,
    /// Block alignment unit in bytes; a power of two.
    pub alignment_bytes: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            interface_name: "HID".into(),
            namespace: "HID".into(),
            naming: TemplateNaming::Product,
            alignment_bytes: 4,
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.alignment_bytes.is_power_of_two() {
            return Err(LayoutError::Config(format!(
                "alignment_bytes must be a power of two, got {}",
                self.alignment_bytes
            )));
        }
        if self.interface_name.is_empty() {
            return Err(LayoutError::Config("interface_name is empty".into()));
        }
        if self.namespace.is_empty() {
            return Err(LayoutError::Config("namespace is empty".into()));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| LayoutError::Config(e.to_string()))
    }
}
