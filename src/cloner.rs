//! Cloning and merging of settings object graphs.
//!
//! The shape of a graph comes from the [`MetadataProvider`], not from the
//! Rust types involved, so both operations walk the graph property by
//! property:
//!
//! - [`create_clone`](SettingsCloner::create_clone) builds a structural copy.
//!   Embedded settings are handed to the [`ProxyFactory`] so that branches
//!   nobody touches are never cloned.
//! - [`merge_copy`](SettingsCloner::merge_copy) writes a detached copy back
//!   into a live instance, optionally recursing into embedded settings.
//!
//! Settings classes may embed each other in cycles. Both walks remember which
//! classes they already produced (clone) or visited (merge), keyed by class
//! name, and register a class before recursing into its children. A class
//! is therefore cloned or merged at most once per call.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::builder::ClonerBuilder;
use crate::error::SettingsError;
use crate::metadata::{EmbeddedMetadata, MetadataProvider, ParameterMetadata};
use crate::proxy::ProxyFactory;
use crate::settings::{Initializer, Settings, WeakSettings};
use crate::value::{DuplicateError, ParameterValue};

/// Clones produced so far for one graph, by class name.
///
/// Shared with the lazy initializers created during the clone, so branches
/// initialized later still close cycles onto the same instances. Entries are
/// weak: the map never keeps a clone alive on its own.
type CloneMap = Rc<RefCell<HashMap<String, WeakSettings>>>;

#[derive(Clone)]
pub struct SettingsCloner {
    metadata: Rc<dyn MetadataProvider>,
    proxies: Rc<dyn ProxyFactory>,
}

impl SettingsCloner {
    pub fn new(metadata: Rc<dyn MetadataProvider>, proxies: Rc<dyn ProxyFactory>) -> Self {
        Self { metadata, proxies }
    }

    pub fn builder() -> ClonerBuilder {
        ClonerBuilder::new()
    }

    /// Create a structural copy of `settings` and everything it embeds.
    ///
    /// No constructor logic runs for the new instances. Object parameters are
    /// duplicated or shared according to their cloneable flag; see
    /// [`should_be_cloned`].
    pub fn create_clone(&self, settings: &Settings) -> Result<Settings, SettingsError> {
        debug!(class = settings.class_name(), "cloning settings");
        let clones = CloneMap::default();
        self.clone_internal(settings, &clones)
    }

    fn clone_internal(
        &self,
        settings: &Settings,
        clones: &CloneMap,
    ) -> Result<Settings, SettingsError> {
        let class = self.metadata.metadata_for(settings)?;
        let metadata = class.metadata();
        let clone = class.instantiate();

        for parameter in &metadata.parameters {
            let value = settings.parameter(&parameter.property)?;
            let value = copy_parameter(value, parameter, &metadata.class)?;
            clone.set_parameter(&parameter.property, value)?;
        }

        // Registered before the embedded loop so a cycle back to this class
        // resolves to this instance.
        clones
            .borrow_mut()
            .insert(metadata.class.clone(), clone.downgrade());

        for embedded in &metadata.embedded {
            let embedded_clone = match produced_clone(clones, &embedded.target) {
                Some(existing) => {
                    trace!(
                        class = %metadata.class,
                        property = %embedded.property,
                        embedded_class = %embedded.target,
                        "reusing clone for cyclic embedding"
                    );
                    existing
                }
                None => self.proxies.create_proxy(
                    &embedded.target,
                    self.deferred_clone(settings, embedded, clones),
                )?,
            };
            clone.set_embedded(&embedded.property, embedded_clone)?;
        }

        if let Some(after_clone) = class.after_clone() {
            after_clone(&clone, settings)?;
        }

        Ok(clone)
    }

    /// Initializer that clones `original.<embedded.property>` when first needed.
    ///
    /// The embedded instance is read from the original at initialization time,
    /// not when the placeholder is created.
    fn deferred_clone(
        &self,
        original: &Settings,
        embedded: &EmbeddedMetadata,
        clones: &CloneMap,
    ) -> Initializer {
        let cloner = self.clone();
        let original = original.clone();
        let property = embedded.property.clone();
        let target = embedded.target.clone();
        let clones = Rc::clone(clones);

        Box::new(move || -> Result<Settings, SettingsError> {
            if let Some(existing) = produced_clone(&clones, &target) {
                return Ok(existing);
            }
            let source = original.embedded(&property)?;
            cloner.clone_internal(&source, &clones)
        })
    }

    /// Copy the state of `copy` into `into` and return `into`.
    ///
    /// With `recursive`, embedded settings are merged as well. Each class is
    /// merged at most once; when several paths reach the same class, the first
    /// one in declaration order wins and later ones are skipped. Embedded
    /// placeholders in `copy` that were never initialized are skipped
    /// entirely, since their data cannot have changed.
    pub fn merge_copy(
        &self,
        copy: &Settings,
        into: &Settings,
        recursive: bool,
    ) -> Result<Settings, SettingsError> {
        debug!(class = copy.class_name(), recursive, "merging settings copy");
        let mut merged = HashSet::new();
        self.merge_internal(copy, into, recursive, &mut merged)?;
        Ok(into.clone())
    }

    fn merge_internal(
        &self,
        copy: &Settings,
        into: &Settings,
        recursive: bool,
        merged: &mut HashSet<String>,
    ) -> Result<(), SettingsError> {
        if copy.class_name() != into.class_name() {
            return Err(SettingsError::ClassMismatch {
                expected: into.class_name().to_string(),
                actual: copy.class_name().to_string(),
            });
        }
        let class = self.metadata.metadata_for(copy)?;
        let metadata = class.metadata();

        for parameter in &metadata.parameters {
            let value = copy.parameter(&parameter.property)?;
            let value = copy_parameter(value, parameter, &metadata.class)?;
            into.set_parameter(&parameter.property, value)?;
        }

        merged.insert(metadata.class.clone());

        if recursive {
            for embedded in &metadata.embedded {
                if merged.contains(&embedded.target) {
                    trace!(embedded_class = %embedded.target, "class already merged, skipping");
                    continue;
                }

                let copy_embedded = copy.embedded(&embedded.property)?;
                if copy_embedded.is_lazy() && !copy_embedded.is_initialized() {
                    trace!(
                        class = %metadata.class,
                        property = %embedded.property,
                        "embedded settings never initialized, skipping"
                    );
                    continue;
                }

                let into_embedded = into.embedded(&embedded.property)?;
                self.merge_internal(&copy_embedded, &into_embedded, recursive, merged)?;
            }
        }

        if let Some(after_merge) = class.after_merge() {
            after_merge(into, copy)?;
        }

        Ok(())
    }
}

fn produced_clone(clones: &CloneMap, class: &str) -> Option<Settings> {
    clones.borrow().get(class).and_then(WeakSettings::upgrade)
}

/// Whether a parameter value is duplicated rather than shared.
///
/// Plain values are already copies and enum cases are singletons, so only
/// object data is ever duplicated, and only if the parameter is cloneable.
pub fn should_be_cloned(value: &ParameterValue, parameter: &ParameterMetadata) -> bool {
    match value {
        ParameterValue::Object(_) => parameter.cloneable,
        _ => false,
    }
}

fn copy_parameter(
    value: ParameterValue,
    parameter: &ParameterMetadata,
    settings_class: &str,
) -> Result<ParameterValue, SettingsError> {
    if !should_be_cloned(&value, parameter) {
        return Ok(value);
    }
    let ParameterValue::Object(object) = value else {
        return Ok(value);
    };
    match object.duplicate() {
        Ok(duplicate) => Ok(ParameterValue::Object(duplicate)),
        Err(DuplicateError::Unsupported) => Err(SettingsError::ParameterDataNotCloneable {
            data_type: object.type_name().to_string(),
            property: parameter.property.clone(),
            settings_class: settings_class.to_string(),
        }),
        Err(DuplicateError::Failed(reason)) => Err(SettingsError::DuplicationFailed {
            property: parameter.property.clone(),
            settings_class: settings_class.to_string(),
            reason,
        }),
    }
}
