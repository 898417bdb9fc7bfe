//! Proxy factories: how the cloner wraps embedded settings it has not cloned yet.

use tracing::trace;

use crate::error::SettingsError;
use crate::settings::{Initializer, Settings};

/// Builds a stand-in for settings of `class` from a one-shot initializer.
///
/// The returned value must be usable as settings of `class` right away. If it
/// is a placeholder, [`Settings::is_initialized`] must report whether the
/// initializer has run.
pub trait ProxyFactory {
    fn create_proxy(&self, class: &str, initializer: Initializer)
    -> Result<Settings, SettingsError>;
}

/// Defers the initializer until the first property access.
#[derive(Debug, Default, Clone, Copy)]
pub struct LazyProxyFactory;

impl ProxyFactory for LazyProxyFactory {
    fn create_proxy(
        &self,
        class: &str,
        initializer: Initializer,
    ) -> Result<Settings, SettingsError> {
        trace!(class, "creating lazy settings proxy");
        Ok(Settings::lazy(class, initializer))
    }
}

/// Runs the initializer immediately and hands back the concrete instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct EagerProxyFactory;

impl ProxyFactory for EagerProxyFactory {
    fn create_proxy(
        &self,
        class: &str,
        initializer: Initializer,
    ) -> Result<Settings, SettingsError> {
        let settings = initializer()?.initialize()?;
        if settings.class_name() != class {
            return Err(SettingsError::ClassMismatch {
                expected: class.to_string(),
                actual: settings.class_name().to_string(),
            });
        }
        Ok(settings)
    }
}
