//! Settings instances and their property accessor.
//!
//! A [`Settings`] is a cheap handle to one of two things:
//!
//! - a concrete instance holding parameter values and embedded settings, or
//! - a lazy placeholder for a class, holding an initializer that produces the
//!   concrete instance on first property access.
//!
//! Both kinds are interchangeable everywhere a settings value is expected.
//! The placeholder state is a tagged variant; callers can ask whether it has
//! been initialized without forcing it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::SettingsError;
use crate::value::ParameterValue;

/// Produces the concrete instance behind a lazy placeholder. Runs at most once.
pub type Initializer = Box<dyn FnOnce() -> Result<Settings, SettingsError>>;

#[derive(Clone)]
pub struct Settings(Rc<Node>);

/// A non-owning settings handle.
#[derive(Clone)]
pub(crate) struct WeakSettings(Weak<Node>);

impl WeakSettings {
    pub(crate) fn upgrade(&self) -> Option<Settings> {
        self.0.upgrade().map(Settings)
    }
}

struct Node {
    class: String,
    body: Body,
}

enum Body {
    Instance(RefCell<Properties>),
    Lazy(RefCell<LazyState>),
}

#[derive(Default)]
struct Properties {
    parameters: HashMap<String, ParameterValue>,
    embedded: HashMap<String, Settings>,
}

enum LazyState {
    Uninitialized(Initializer),
    Initializing,
    Initialized(Settings),
    Failed,
}

impl Settings {
    /// Allocate an instance of `class` with no properties set.
    ///
    /// No construction logic runs; every property must be assigned through the
    /// accessor before it can be read.
    pub fn bare(class: &str) -> Self {
        Self(Rc::new(Node {
            class: class.to_string(),
            body: Body::Instance(RefCell::new(Properties::default())),
        }))
    }

    /// Create a lazy placeholder for `class`.
    pub fn lazy(class: &str, initializer: Initializer) -> Self {
        Self(Rc::new(Node {
            class: class.to_string(),
            body: Body::Lazy(RefCell::new(LazyState::Uninitialized(initializer))),
        }))
    }

    pub fn class_name(&self) -> &str {
        &self.0.class
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.0.body, Body::Lazy(_))
    }

    /// `false` only for a placeholder whose initializer has not completed.
    pub fn is_initialized(&self) -> bool {
        match &self.0.body {
            Body::Instance(_) => true,
            Body::Lazy(state) => matches!(&*state.borrow(), LazyState::Initialized(_)),
        }
    }

    /// Force a placeholder and return the concrete instance behind it.
    /// A concrete instance returns itself.
    pub fn initialize(&self) -> Result<Settings, SettingsError> {
        let Body::Lazy(state) = &self.0.body else {
            return Ok(self.clone());
        };

        let initializer = {
            let mut current = state.borrow_mut();
            match &*current {
                LazyState::Initialized(target) => return Ok(target.clone()),
                LazyState::Initializing => {
                    return Err(SettingsError::LazyReentrancy(self.0.class.clone()));
                }
                LazyState::Failed => {
                    return Err(SettingsError::LazyInitializationFailed(self.0.class.clone()));
                }
                LazyState::Uninitialized(_) => {}
            }
            match std::mem::replace(&mut *current, LazyState::Initializing) {
                LazyState::Uninitialized(init) => init,
                _ => return Err(SettingsError::LazyReentrancy(self.0.class.clone())),
            }
        };

        trace!(class = %self.0.class, "initializing lazy settings");
        let result = initializer().and_then(|target| target.initialize());
        let target = match result {
            Ok(target) if target.class_name() == self.class_name() => target,
            Ok(target) => {
                *state.borrow_mut() = LazyState::Failed;
                return Err(SettingsError::ClassMismatch {
                    expected: self.0.class.clone(),
                    actual: target.class_name().to_string(),
                });
            }
            Err(e) => {
                *state.borrow_mut() = LazyState::Failed;
                return Err(e);
            }
        };
        *state.borrow_mut() = LazyState::Initialized(target.clone());
        Ok(target)
    }

    fn with_properties<R>(
        &self,
        f: impl FnOnce(&RefCell<Properties>) -> R,
    ) -> Result<R, SettingsError> {
        let target = self.initialize()?;
        match &target.0.body {
            Body::Instance(props) => Ok(f(props)),
            Body::Lazy(_) => Err(SettingsError::LazyReentrancy(target.0.class.clone())),
        }
    }

    /// Read a parameter. Object values are returned as shared references.
    pub fn parameter(&self, name: &str) -> Result<ParameterValue, SettingsError> {
        self.with_properties(|p| p.borrow().parameters.get(name).cloned())?
            .ok_or_else(|| self.uninitialized(name))
    }

    pub fn set_parameter(
        &self,
        name: &str,
        value: impl Into<ParameterValue>,
    ) -> Result<(), SettingsError> {
        let value = value.into();
        self.with_properties(|p| {
            p.borrow_mut().parameters.insert(name.to_string(), value);
        })
    }

    /// Read an embedded settings property. The returned handle may be a
    /// placeholder; reading it does not force it.
    pub fn embedded(&self, name: &str) -> Result<Settings, SettingsError> {
        self.with_properties(|p| p.borrow().embedded.get(name).cloned())?
            .ok_or_else(|| self.uninitialized(name))
    }

    pub fn set_embedded(&self, name: &str, settings: Settings) -> Result<(), SettingsError> {
        self.with_properties(|p| {
            p.borrow_mut().embedded.insert(name.to_string(), settings);
        })
    }

    pub(crate) fn downgrade(&self) -> WeakSettings {
        WeakSettings(Rc::downgrade(&self.0))
    }

    /// Handle identity. A placeholder and its target are different handles.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Whether both handles lead to the same concrete instance.
    /// Forces any placeholder involved.
    pub fn same_instance(a: &Self, b: &Self) -> Result<bool, SettingsError> {
        Ok(Self::ptr_eq(&a.initialize()?, &b.initialize()?))
    }

    fn uninitialized(&self, property: &str) -> SettingsError {
        SettingsError::UninitializedProperty {
            class: self.0.class.clone(),
            property: property.to_string(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("class", &self.0.class)
            .field("lazy", &self.is_lazy())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn bare_instance_has_no_properties() {
        let s = Settings::bare("Profile");
        assert_eq!(s.class_name(), "Profile");
        assert!(!s.is_lazy());
        assert!(s.is_initialized());
        assert!(matches!(
            s.parameter("name"),
            Err(SettingsError::UninitializedProperty { .. })
        ));
    }

    #[test]
    fn parameters_round_trip_through_accessor() {
        let s = Settings::bare("Profile");
        s.set_parameter("name", "alice").unwrap();
        assert_eq!(s.parameter("name").unwrap(), ParameterValue::from("alice"));
        assert!(matches!(
            s.parameter("age"),
            Err(SettingsError::UninitializedProperty { property, .. }) if property == "age"
        ));
    }

    #[test]
    fn lazy_runs_initializer_once_on_first_access() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let lazy = Settings::lazy(
            "Address",
            Box::new(move || -> Result<Settings, SettingsError> {
                counter.set(counter.get() + 1);
                let a = Settings::bare("Address");
                a.set_parameter("city", "Berlin")?;
                Ok(a)
            }),
        );

        assert!(lazy.is_lazy());
        assert!(!lazy.is_initialized());
        assert_eq!(calls.get(), 0);

        assert_eq!(lazy.parameter("city").unwrap(), ParameterValue::from("Berlin"));
        lazy.set_parameter("city", "Paris").unwrap();
        assert_eq!(lazy.parameter("city").unwrap(), ParameterValue::from("Paris"));
        assert!(lazy.is_initialized());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn lazy_writes_reach_the_target() {
        let target = Settings::bare("Address");
        let inner = target.clone();
        let lazy = Settings::lazy(
            "Address",
            Box::new(move || -> Result<Settings, SettingsError> {
                Ok(inner)
            }),
        );
        lazy.set_parameter("city", "Rome").unwrap();
        assert_eq!(target.parameter("city").unwrap(), ParameterValue::from("Rome"));
        assert!(Settings::same_instance(&lazy, &target).unwrap());
        assert!(!Settings::ptr_eq(&lazy, &target));
    }

    #[test]
    fn failed_initializer_is_not_retried() {
        let lazy = Settings::lazy(
            "Address",
            Box::new(|| -> Result<Settings, SettingsError> {
                Err(SettingsError::UnknownClass("Address".into()))
            }),
        );
        assert!(matches!(
            lazy.initialize(),
            Err(SettingsError::UnknownClass(_))
        ));
        assert!(matches!(
            lazy.initialize(),
            Err(SettingsError::LazyInitializationFailed(_))
        ));
        assert!(!lazy.is_initialized());
    }

    #[test]
    fn initializer_returning_wrong_class_fails() {
        let lazy = Settings::lazy(
            "Address",
            Box::new(|| -> Result<Settings, SettingsError> {
                Ok(Settings::bare("Profile"))
            }),
        );
        assert!(matches!(
            lazy.initialize(),
            Err(SettingsError::ClassMismatch { .. })
        ));
    }

    #[test]
    fn reentrant_access_is_reported() {
        let slot: Rc<RefCell<Option<Settings>>> = Rc::new(RefCell::new(None));
        let inner = Rc::clone(&slot);
        let lazy = Settings::lazy(
            "Node",
            Box::new(move || -> Result<Settings, SettingsError> {
                let me = inner.borrow().clone().ok_or_else(|| {
                    SettingsError::UnknownClass("Node".into())
                })?;
                me.initialize()
            }),
        );
        *slot.borrow_mut() = Some(lazy.clone());
        assert!(matches!(
            lazy.initialize(),
            Err(SettingsError::LazyReentrancy(_))
        ));
    }

    #[test]
    fn embedded_read_does_not_force_placeholder() {
        let parent = Settings::bare("Profile");
        let lazy = Settings::lazy(
            "Address",
            Box::new(|| -> Result<Settings, SettingsError> {
                Ok(Settings::bare("Address"))
            }),
        );
        parent.set_embedded("address", lazy).unwrap();
        let read = parent.embedded("address").unwrap();
        assert!(read.is_lazy());
        assert!(!read.is_initialized());
    }
}
