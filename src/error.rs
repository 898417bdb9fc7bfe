use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(
        "The data of type '{data_type}' of the property '{property}' in settings class '{settings_class}' is not cloneable. Mark the parameter as not cloneable and implement custom clone and merge logic for this property."
    )]
    ParameterDataNotCloneable {
        data_type: String,
        property: String,
        settings_class: String,
    },

    #[error("Failed to duplicate '{property}' in settings class '{settings_class}': {reason}")]
    DuplicationFailed {
        property: String,
        settings_class: String,
        reason: String,
    },

    #[error("Unknown settings class '{0}'")]
    UnknownClass(String),

    #[error("Settings class '{0}' is registered twice")]
    DuplicateClass(String),

    #[error("Settings class '{class}' declares property '{property}' more than once")]
    DuplicateProperty { class: String, property: String },

    #[error("Property '{property}' of settings class '{class}' must not be accessed before initialization")]
    UninitializedProperty { class: String, property: String },

    #[error("Expected settings of class '{expected}', got '{actual}'")]
    ClassMismatch { expected: String, actual: String },

    #[error("Lazy settings of class '{0}' were accessed while being initialized")]
    LazyReentrancy(String),

    #[error("Lazy settings of class '{0}' failed to initialize earlier")]
    LazyInitializationFailed(String),

    #[error("Hook of settings class '{class}' failed: {reason}")]
    HookFailed { class: String, reason: String },

    #[error("Unknown parameter type '{0}'")]
    UnknownParameterType(String),

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in schema file")]
    UnknownKeys(Vec<SettingsError>),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] confique::Error),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("No metadata provider configured; call .metadata() or .schema_file() on the builder")]
    MetadataRequired,
}
