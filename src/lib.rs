//! Metadata-driven cloning and merging of settings object graphs.
//!
//! Settings objects often form graphs: a profile embeds an address, a node
//! embeds the next node, two classes embed each other. Editing such a graph
//! safely means working on a detached copy and writing the changes back
//! once they are accepted. settingskit does both halves:
//!
//! ```ignore
//! let cloner = SettingsCloner::builder()
//!     .schema_file("settings.toml")
//!     .build()?;
//!
//! let copy = cloner.create_clone(&live)?;
//! copy.set_parameter("name", "bob")?;
//! cloner.merge_copy(&copy, &live, true)?;
//! ```
//!
//! # Metadata as source of truth
//!
//! The shape of a settings class is declared once, in a [`SettingsMetadata`]:
//!
//! - **Parameters** hold values. Each has a `cloneable` flag (default
//!   `true`) and an optional parameter type name.
//! - **Embedded settings** hold another settings instance of a declared
//!   target class.
//!
//! Metadata is served by a [`MetadataProvider`]. [`MetadataRegistry`] is the
//! in-memory provider; it can be filled in code or loaded from a TOML schema
//! with [`load_schema_file`]. Per-class `after_clone` and `after_merge` hooks
//! are attached to the registry.
//!
//! # Cloning
//!
//! [`SettingsCloner::create_clone`] creates a new instance of the same class
//! without running any construction logic, then copies every parameter.
//! Plain values are copied, enum cases are shared, and object data is
//! duplicated only when its parameter is cloneable (see
//! [`should_be_cloned`]). Object data that cannot be duplicated but is
//! flagged cloneable fails the clone with
//! [`SettingsError::ParameterDataNotCloneable`].
//!
//! Embedded settings go through a [`ProxyFactory`]. The default
//! [`LazyProxyFactory`] returns placeholders that clone their branch on first
//! access; [`EagerProxyFactory`] clones everything up front. Either way, each
//! class is cloned at most once per graph, so cycles close on the clone that
//! already exists.
//!
//! # Merging
//!
//! [`SettingsCloner::merge_copy`] writes a copy back into a live instance,
//! recursing into embedded settings on request. Each class is merged at most
//! once per call; when several paths reach the same class, the first one in
//! declaration order wins. Branches of the copy that were never touched are
//! skipped.
//!
//! # Parameter types
//!
//! Typed parameters can be converted to and from a normalized
//! `serde_json::Value` form with [`normalize`] and [`denormalize`], using the
//! types in a [`ParameterTypeRegistry`].
//!
//! # Configuration
//!
//! ```text
//! Compiled defaults     lazy_embedded = true, strict_schema = true
//!        ↑ overridden by
//! Config file           .config_file(path)
//!        ↑ overridden by
//! Environment vars      SETTINGSKIT_LAZY_EMBEDDED, SETTINGSKIT_STRICT_SCHEMA
//!        ↑ overridden by
//! Overrides             .lazy_embedded(..), .strict_schema(..)
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`SettingsError`]. Errors name the class
//! and property involved, and schema errors carry the file path and line.

pub mod error;

mod builder;
mod cloner;
mod config;
mod metadata;
mod parameter_types;
mod proxy;
mod schema;
mod settings;
mod value;

#[cfg(test)]
mod fixtures;

pub use builder::ClonerBuilder;
pub use cloner::{SettingsCloner, should_be_cloned};
pub use config::{ClonerConfig, ConfigInput, load_config};
pub use error::SettingsError;
pub use metadata::{
    AfterCloneHook, AfterMergeHook, EmbeddedMetadata, MetadataProvider, MetadataRegistry,
    ParameterMetadata, SettingsClass, SettingsMetadata,
};
pub use parameter_types::{
    BoolType, FloatType, IntType, ParameterType, ParameterTypeRegistry, StringType,
    apply_normalized, denormalize, normalize,
};
pub use proxy::{EagerProxyFactory, LazyProxyFactory, ProxyFactory};
pub use schema::{load_schema_file, parse_schema};
pub use settings::{Initializer, Settings};
pub use value::{DuplicateError, EnumValue, ObjectValue, ParameterData, ParameterValue};
