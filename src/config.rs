//! Cloner configuration, resolved from layered sources.
//!
//! ```text
//! Compiled defaults     #[config(default = ...)]
//!        ↑ overridden by
//! Config file           optional TOML file
//!        ↑ overridden by
//! Environment vars      SETTINGSKIT_LAZY_EMBEDDED, SETTINGSKIT_STRICT_SCHEMA
//!        ↑ overridden by
//! Overrides             builder calls such as .lazy_embedded(false)
//! ```

use std::path::PathBuf;

use confique::Config;
use confique::meta::FieldKind;
use toml::{Table, Value};

use crate::error::SettingsError;

/// Prefix of the environment variables read into [`ClonerConfig`].
pub const ENV_PREFIX: &str = "SETTINGSKIT_";

#[derive(Config, Debug, Clone, PartialEq)]
pub struct ClonerConfig {
    /// Wrap embedded settings of a clone in lazy placeholders, so branches are
    /// only cloned once something touches them.
    #[config(default = true)]
    pub lazy_embedded: bool,

    /// Reject unknown keys in settings schema files.
    #[config(default = true)]
    pub strict_schema: bool,
}

/// Everything needed to resolve a [`ClonerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigInput {
    pub file: Option<PathBuf>,
    /// Whether `env_vars` are applied at all.
    pub env: bool,
    /// Raw environment variable pairs (pass `std::env::vars().collect()` or
    /// synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// `(key, value)` pairs with the highest priority. Later entries win.
    pub overrides: Vec<(String, Value)>,
}

/// Build a table from `SETTINGSKIT_*` variables.
///
/// The rest of the name is lowercased and must name a config field; other
/// variables are ignored. Values are parsed as bool, then integer, then
/// float, then string.
pub fn env_to_table(vars: impl IntoIterator<Item = (String, String)>) -> Table {
    let mut table = Table::new();
    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key = rest.to_lowercase();
        if is_config_field(&key) {
            table.insert(key, parse_env_value(&value));
        }
    }
    table
}

fn is_config_field(key: &str) -> bool {
    ClonerConfig::META
        .fields
        .iter()
        .any(|field| field.name == key && matches!(field.kind, FieldKind::Leaf { .. }))
}

fn parse_env_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::String(s.to_string())
}

pub fn load_config(input: &ConfigInput) -> Result<ClonerConfig, SettingsError> {
    let mut table = if input.env {
        env_to_table(input.env_vars.iter().cloned())
    } else {
        Table::new()
    };
    for (key, value) in &input.overrides {
        table.insert(key.clone(), value.clone());
    }
    let layer: <ClonerConfig as Config>::Layer =
        Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| SettingsError::InvalidValue {
                key: "<overrides>".into(),
                reason: e.to_string(),
            })?;

    // confique gives earlier sources priority over later ones.
    let mut builder = ClonerConfig::builder().preloaded(layer);
    if let Some(path) = &input.file {
        builder = builder.file(path);
    }
    builder.load().map_err(SettingsError::from)
}
