//! Settings class metadata and the provider the cloner resolves it from.
//!
//! A settings class is described by an ordered list of parameters and a list
//! of embedded settings slots. Classes that need custom reconciliation declare
//! after-clone / after-merge hooks when they are registered.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::settings::Settings;

fn default_cloneable() -> bool {
    true
}

/// Describes one parameter of a settings class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    pub property: String,

    /// Whether object data in this parameter is duplicated on clone and merge.
    /// When `false` the reference is shared.
    #[serde(default = "default_cloneable")]
    pub cloneable: bool,

    /// Name of the parameter type used to normalize the value.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<String>,
}

impl ParameterMetadata {
    pub fn new(property: &str) -> Self {
        Self {
            property: property.to_string(),
            cloneable: true,
            parameter_type: None,
        }
    }

    pub fn cloneable(mut self, cloneable: bool) -> Self {
        self.cloneable = cloneable;
        self
    }

    pub fn typed(mut self, parameter_type: &str) -> Self {
        self.parameter_type = Some(parameter_type.to_string());
        self
    }
}

/// An embedded settings slot: `property` holds settings of class `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    pub property: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsMetadata {
    pub class: String,
    pub parameters: Vec<ParameterMetadata>,
    pub embedded: Vec<EmbeddedMetadata>,
}

impl SettingsMetadata {
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
            parameters: Vec::new(),
            embedded: Vec::new(),
        }
    }

    pub fn parameter(mut self, parameter: ParameterMetadata) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn embed(mut self, property: &str, target: &str) -> Self {
        self.embedded.push(EmbeddedMetadata {
            property: property.to_string(),
            target: target.to_string(),
        });
        self
    }

    fn check_unique_properties(&self) -> Result<(), SettingsError> {
        let mut seen = HashSet::new();
        let names = self
            .parameters
            .iter()
            .map(|p| &p.property)
            .chain(self.embedded.iter().map(|e| &e.property));
        for name in names {
            if !seen.insert(name) {
                return Err(SettingsError::DuplicateProperty {
                    class: self.class.clone(),
                    property: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Called on a fresh clone with `(clone, original)` once all its properties are set.
pub type AfterCloneHook = Rc<dyn Fn(&Settings, &Settings) -> Result<(), SettingsError>>;

/// Called on the merge target with `(into, copy)` once its subtree is merged.
pub type AfterMergeHook = Rc<dyn Fn(&Settings, &Settings) -> Result<(), SettingsError>>;

/// A registered settings class: its metadata plus optional hooks.
#[derive(Clone)]
pub struct SettingsClass {
    metadata: SettingsMetadata,
    after_clone: Option<AfterCloneHook>,
    after_merge: Option<AfterMergeHook>,
}

impl SettingsClass {
    pub fn new(metadata: SettingsMetadata) -> Self {
        Self {
            metadata,
            after_clone: None,
            after_merge: None,
        }
    }

    pub fn with_after_clone(
        mut self,
        hook: impl Fn(&Settings, &Settings) -> Result<(), SettingsError> + 'static,
    ) -> Self {
        self.after_clone = Some(Rc::new(hook));
        self
    }

    pub fn with_after_merge(
        mut self,
        hook: impl Fn(&Settings, &Settings) -> Result<(), SettingsError> + 'static,
    ) -> Self {
        self.after_merge = Some(Rc::new(hook));
        self
    }

    pub fn class_name(&self) -> &str {
        &self.metadata.class
    }

    pub fn metadata(&self) -> &SettingsMetadata {
        &self.metadata
    }

    pub fn after_clone(&self) -> Option<&AfterCloneHook> {
        self.after_clone.as_ref()
    }

    pub fn after_merge(&self) -> Option<&AfterMergeHook> {
        self.after_merge.as_ref()
    }

    /// A new instance of this class with nothing set.
    pub fn instantiate(&self) -> Settings {
        Settings::bare(&self.metadata.class)
    }
}

impl fmt::Debug for SettingsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsClass")
            .field("metadata", &self.metadata)
            .field("after_clone", &self.after_clone.is_some())
            .field("after_merge", &self.after_merge.is_some())
            .finish()
    }
}

/// Resolves the class description for settings instances.
pub trait MetadataProvider {
    fn settings_class(&self, class: &str) -> Result<Rc<SettingsClass>, SettingsError>;

    /// Metadata for an instance. Never forces a lazy placeholder.
    fn metadata_for(&self, settings: &Settings) -> Result<Rc<SettingsClass>, SettingsError> {
        self.settings_class(settings.class_name())
    }
}

/// In-memory registry of settings classes.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    classes: BTreeMap<String, Rc<SettingsClass>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. Each class name can be registered once.
    pub fn register(&mut self, class: SettingsClass) -> Result<(), SettingsError> {
        class.metadata.check_unique_properties()?;
        let name = class.class_name().to_string();
        if self.classes.contains_key(&name) {
            return Err(SettingsError::DuplicateClass(name));
        }
        self.classes.insert(name, Rc::new(class));
        Ok(())
    }

    /// Chainable form of [`register`](Self::register).
    pub fn with_class(mut self, class: SettingsClass) -> Result<Self, SettingsError> {
        self.register(class)?;
        Ok(self)
    }

    /// Attach an after-clone hook to an already registered class.
    pub fn set_after_clone(
        &mut self,
        class: &str,
        hook: impl Fn(&Settings, &Settings) -> Result<(), SettingsError> + 'static,
    ) -> Result<(), SettingsError> {
        self.update(class, |c| c.with_after_clone(hook))
    }

    /// Attach an after-merge hook to an already registered class.
    pub fn set_after_merge(
        &mut self,
        class: &str,
        hook: impl Fn(&Settings, &Settings) -> Result<(), SettingsError> + 'static,
    ) -> Result<(), SettingsError> {
        self.update(class, |c| c.with_after_merge(hook))
    }

    fn update(
        &mut self,
        class: &str,
        f: impl FnOnce(SettingsClass) -> SettingsClass,
    ) -> Result<(), SettingsError> {
        let entry = self
            .classes
            .get_mut(class)
            .ok_or_else(|| SettingsError::UnknownClass(class.to_string()))?;
        *entry = Rc::new(f(SettingsClass::clone(&**entry)));
        Ok(())
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Registered class names in sorted order.
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Check that every embedded target refers to a registered class.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for class in self.classes.values() {
            for embedded in &class.metadata.embedded {
                if !self.contains(&embedded.target) {
                    return Err(SettingsError::UnknownClass(embedded.target.clone()));
                }
            }
        }
        Ok(())
    }

    /// A bare instance of a registered class.
    pub fn instantiate(&self, class: &str) -> Result<Settings, SettingsError> {
        Ok(self.settings_class(class)?.instantiate())
    }
}

impl MetadataProvider for MetadataRegistry {
    fn settings_class(&self, class: &str) -> Result<Rc<SettingsClass>, SettingsError> {
        self.classes
            .get(class)
            .cloned()
            .ok_or_else(|| SettingsError::UnknownClass(class.to_string()))
    }
}
