use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::cloner::SettingsCloner;
use crate::config::{self, ClonerConfig, ConfigInput};
use crate::error::SettingsError;
use crate::metadata::MetadataProvider;
use crate::proxy::{EagerProxyFactory, LazyProxyFactory, ProxyFactory};
use crate::schema;

/// Builder for a [`SettingsCloner`].
///
/// Two things are wired here:
///
/// - **Metadata**: an explicit [`metadata()`](Self::metadata) provider, or a
///   TOML [`schema_file()`](Self::schema_file) loaded at build time.
/// - **Proxies**: an explicit [`proxy_factory()`](Self::proxy_factory), or the
///   lazy/eager default picked by the resolved [`ClonerConfig`].
pub struct ClonerBuilder {
    metadata: Option<Rc<dyn MetadataProvider>>,
    proxy_factory: Option<Rc<dyn ProxyFactory>>,
    schema_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    env_enabled: bool,
    overrides: Vec<(String, toml::Value)>,
}

impl ClonerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            metadata: None,
            proxy_factory: None,
            schema_file: None,
            config_file: None,
            env_enabled: true,
            overrides: Vec::new(),
        }
    }

    /// Use `provider` for all class metadata. Takes precedence over
    /// [`schema_file()`](Self::schema_file).
    pub fn metadata(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.metadata = Some(Rc::new(provider));
        self
    }

    /// Load class metadata from a TOML schema file when building.
    pub fn schema_file(mut self, path: impl AsRef<Path>) -> Self {
        self.schema_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the proxy factory chosen from `lazy_embedded`.
    pub fn proxy_factory(mut self, factory: impl ProxyFactory + 'static) -> Self {
        self.proxy_factory = Some(Rc::new(factory));
        self
    }

    /// Read cloner options from a TOML file. A missing file is not an error.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    pub fn lazy_embedded(mut self, lazy: bool) -> Self {
        self.overrides
            .push(("lazy_embedded".to_string(), toml::Value::Boolean(lazy)));
        self
    }

    pub fn strict_schema(mut self, strict: bool) -> Self {
        self.overrides
            .push(("strict_schema".to_string(), toml::Value::Boolean(strict)));
        self
    }

    /// Resolve the configuration through defaults, file, env and overrides.
    pub fn effective_config(&self) -> Result<ClonerConfig, SettingsError> {
        let env_vars: Vec<(String, String)> = if self.env_enabled {
            std::env::vars().collect()
        } else {
            Vec::new()
        };
        config::load_config(&ConfigInput {
            file: self.config_file.clone(),
            env: self.env_enabled,
            env_vars,
            overrides: self.overrides.clone(),
        })
    }

    fn effective_metadata(
        &self,
        config: &ClonerConfig,
    ) -> Result<Rc<dyn MetadataProvider>, SettingsError> {
        if let Some(provider) = &self.metadata {
            return Ok(Rc::clone(provider));
        }
        let path = self
            .schema_file
            .as_ref()
            .ok_or(SettingsError::MetadataRequired)?;
        let registry = schema::load_schema_file(path, config.strict_schema)?;
        Ok(Rc::new(registry))
    }

    fn effective_proxy_factory(&self, config: &ClonerConfig) -> Rc<dyn ProxyFactory> {
        if let Some(factory) = &self.proxy_factory {
            return Rc::clone(factory);
        }
        if config.lazy_embedded {
            Rc::new(LazyProxyFactory)
        } else {
            Rc::new(EagerProxyFactory)
        }
    }

    pub fn build(self) -> Result<SettingsCloner, SettingsError> {
        let config = self.effective_config()?;
        let metadata = self.effective_metadata(&config)?;
        let proxies = self.effective_proxy_factory(&config);
        debug!(
            lazy_embedded = config.lazy_embedded,
            strict_schema = config.strict_schema,
            "built settings cloner"
        );
        Ok(SettingsCloner::new(metadata, proxies))
    }
}
