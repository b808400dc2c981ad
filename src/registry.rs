//! Process-wide template registry.
//!
//! Templates are registered as recipes and built lazily on first
//! [`resolve`](TemplateRegistry::resolve). A resolved template is composed
//! with its base chain and cached until the registry changes.
//!
//! Registering a name that already exists replaces the entry atomically
//! (last writer wins). Distinct names never contend beyond the map lock.

use crate::compiler::compile_hid_template;
use crate::config::CompilerConfig;
use crate::descriptor::HidDeviceDescriptor;
use crate::device::DeviceCategory;
use crate::error::{LayoutError, Result};
use crate::format::FourCC;
use crate::state::STATE_ALIGNMENT;
use crate::template::{InputTemplate, TemplateBuilder};
use crate::{keyboard, step_counter};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// How a registered template gets built.
#[derive(Clone, Debug)]
pub enum TemplateRecipe {
    /// A fixed table known at compile time.
    Static(fn() -> Result<InputTemplate>),
    /// A discovered device, compiled from its descriptor.
    Hid(HidDeviceDescriptor),
}

/// Outcome of [`TemplateRegistry::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Added,
    Replaced,
}

#[derive(Debug)]
struct Entry {
    base: Option<String>,
    recipe: TemplateRecipe,
    description: Option<String>,
    built: Mutex<Option<Arc<InputTemplate>>>,
}

#[derive(Debug)]
pub struct TemplateRegistry {
    config: CompilerConfig,
    entries: RwLock<HashMap<String, Arc<Entry>>>,
    /// Bumped, under the write lock, whenever cached templates are dropped.
    generation: AtomicU64,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl TemplateRegistry {
    /// An empty registry.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// A registry holding the built-in templates.
    pub fn with_builtins(config: CompilerConfig) -> Self {
        let registry = Self::new(config);
        registry.register_builtins();
        registry
    }

    /// Shared registry with the default configuration and the built-ins.
    pub fn global() -> &'static TemplateRegistry {
        static GLOBAL: OnceLock<TemplateRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| TemplateRegistry::with_builtins(CompilerConfig::default()))
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn register(
        &self,
        name: &str,
        base: Option<&str>,
        recipe: TemplateRecipe,
        description: Option<&str>,
    ) -> Registration {
        let entry = Arc::new(Entry {
            base: base.map(str::to_string),
            recipe,
            description: description.map(str::to_string),
            built: Mutex::new(None),
        });

        let mut entries = self.entries.write();
        let previous = entries.insert(name.to_string(), entry);
        if previous.is_some() {
            // Derived templates may have cached the old one.
            self.invalidate(&entries);
            drop(entries);
            warn!(template = name, "template name already registered; replacing");
            Registration::Replaced
        } else {
            drop(entries);
            info!(template = name, base = base.unwrap_or(""), "registered template");
            Registration::Added
        }
    }

    /// Shorthand for registering a discovered device.
    pub fn register_hid(
        &self,
        name: &str,
        base: &str,
        descriptor: HidDeviceDescriptor,
    ) -> Registration {
        self.register(name, Some(base), TemplateRecipe::Hid(descriptor), None)
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let removed = entries.remove(name).is_some();
        if removed {
            self.invalidate(&entries);
            debug!(template = name, "unregistered template");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn base_of(&self, name: &str) -> Option<String> {
        self.entry(name).and_then(|e| e.base.clone())
    }

    pub fn description_of(&self, name: &str) -> Option<String> {
        self.entry(name).and_then(|e| e.description.clone())
    }

    /// Build (or fetch) the template registered as `name`, composed with its bases.
    pub fn resolve(&self, name: &str) -> Result<Arc<InputTemplate>> {
        let generation = self.generation.load(Ordering::Acquire);
        self.resolve_chain(name, generation, &mut Vec::new())
    }

    fn entry(&self, name: &str) -> Option<Arc<Entry>> {
        self.entries.read().get(name).cloned()
    }

    fn resolve_chain(
        &self,
        name: &str,
        generation: u64,
        visiting: &mut Vec<String>,
    ) -> Result<Arc<InputTemplate>> {
        if visiting.iter().any(|v| v == name) {
            return Err(LayoutError::TemplateCycle(name.to_string()));
        }
        let entry = self
            .entry(name)
            .ok_or_else(|| LayoutError::UnknownTemplate(name.to_string()))?;
        if let Some(built) = entry.built.lock().clone() {
            return Ok(built);
        }

        visiting.push(name.to_string());
        let mut template = self.build(name, &entry)?;
        if let Some(base) = &entry.base {
            let base = self.resolve_chain(base, generation, visiting)?;
            template = template.compose(&base);
        }
        visiting.pop();

        let template = Arc::new(template);
        // A registration since we started may have replaced part of the chain.
        {
            let _entries = self.entries.read();
            if self.generation.load(Ordering::Acquire) == generation {
                *entry.built.lock() = Some(Arc::clone(&template));
            }
        }
        debug!(
            template = name,
            controls = template.controls.len(),
            size_in_bytes = template.size_in_bytes,
            "resolved template"
        );
        Ok(template)
    }

    fn build(&self, name: &str, entry: &Entry) -> Result<InputTemplate> {
        let mut template = match &entry.recipe {
            TemplateRecipe::Static(build) => build()?,
            TemplateRecipe::Hid(descriptor) => compile_hid_template(
                name,
                entry.base.as_deref(),
                descriptor,
                self.config.alignment_bytes,
            )?,
        };
        template.name = name.to_string();
        template.base = entry.base.clone();
        Ok(template)
    }

    fn invalidate(&self, entries: &HashMap<String, Arc<Entry>>) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        for entry in entries.values() {
            *entry.built.lock() = None;
        }
    }

    fn register_builtins(&self) {
        let builtins: [(&str, Option<&str>, fn() -> Result<InputTemplate>, &str); 5] = [
            ("HID", None, hid_base, "Generic HID device"),
            ("Joystick", Some("HID"), joystick, "HID joystick"),
            ("Gamepad", Some("HID"), gamepad, "HID gamepad"),
            ("Keyboard", None, keyboard::template, "Keyboard"),
            ("StepCounter", None, step_counter::template, "Step counter"),
        ];
        for (name, base, build, description) in builtins {
            self.register(name, base, TemplateRecipe::Static(build), Some(description));
        }
    }
}

fn category_base(name: &str, category: DeviceCategory) -> Result<InputTemplate> {
    TemplateBuilder::new(name)
        .with_category(category)
        .with_format(FourCC::HID)
        .build(STATE_ALIGNMENT)
}

fn hid_base() -> Result<InputTemplate> {
    category_base("HID", DeviceCategory::Generic)
}

fn joystick() -> Result<InputTemplate> {
    category_base("Joystick", DeviceCategory::Joystick)
}

fn gamepad() -> Result<InputTemplate> {
    category_base("Gamepad", DeviceCategory::Gamepad)
}
