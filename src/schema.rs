//! Declarative settings class schemas in TOML.
//!
//! ```toml
//! [classes.Profile]
//! parameters = [
//!     { property = "name", cloneable = false, type = "string" },
//! ]
//! embedded = [{ property = "address", target = "Address" }]
//!
//! [classes.Address]
//! parameters = [{ property = "city" }]
//! ```
//!
//! In strict mode every key the schema does not understand is reported with
//! its path and a best-effort line number, detected with `serde_ignored`.
//! Loaded registries are validated: every embedded target must be declared.
//! Hooks cannot be expressed in TOML; attach them to the returned registry.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::SettingsError;
use crate::metadata::{
    EmbeddedMetadata, MetadataRegistry, ParameterMetadata, SettingsClass, SettingsMetadata,
};

#[derive(Debug, Default, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    classes: BTreeMap<String, ClassDeclaration>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassDeclaration {
    #[serde(default)]
    parameters: Vec<ParameterMetadata>,
    #[serde(default)]
    embedded: Vec<EmbeddedMetadata>,
}

/// Build a registry from schema text. `path` is only used in error messages.
pub fn parse_schema(
    content: &str,
    path: &Path,
    strict: bool,
) -> Result<MetadataRegistry, SettingsError> {
    let document = if strict {
        parse_strict(content, path)?
    } else {
        toml::from_str::<SchemaDocument>(content).map_err(|e| SettingsError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?
    };

    let mut registry = MetadataRegistry::new();
    for (class, declaration) in document.classes {
        registry.register(SettingsClass::new(SettingsMetadata {
            class,
            parameters: declaration.parameters,
            embedded: declaration.embedded,
        }))?;
    }
    registry.validate()?;

    debug!(path = %path.display(), classes = registry.len(), "loaded settings schema");
    Ok(registry)
}

/// Read and parse a schema file.
pub fn load_schema_file(path: &Path, strict: bool) -> Result<MetadataRegistry, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|e| SettingsError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_schema(&content, path, strict)
}

fn parse_strict(content: &str, path: &Path) -> Result<SchemaDocument, SettingsError> {
    let mut unknown_keys: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let document: SchemaDocument = serde_ignored::deserialize(deserializer, |ignored_path| {
        unknown_keys.push(ignored_path.to_string());
    })
    .map_err(|e| SettingsError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if unknown_keys.is_empty() {
        return Ok(document);
    }

    let errors: Vec<SettingsError> = unknown_keys
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            SettingsError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();

    Err(SettingsError::UnknownKeys(errors))
}

/// Find the 1-indexed line of an unknown key, or 0 if it cannot be located.
///
/// Keys below `classes.<Name>` are searched inside the `[classes.<Name>]`
/// section, including inline tables such as `{ property = "x", typo = 1 }`.
/// Quoted keys and dotted section headers other than the class ones are not
/// handled.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let leaf = segments.last().copied().unwrap_or(dotted_key);
    let expected_section: Vec<&str> = match segments.as_slice() {
        ["classes", class, _, ..] => vec!["classes", *class],
        [_] => Vec::new(),
        [prefix @ .., _] => prefix.to_vec(),
        [] => Vec::new(),
    };

    let mut current_section: Vec<String> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            current_section = header.split('.').map(|s| s.trim().to_string()).collect();
            continue;
        }

        let in_right_section = expected_section.len() == current_section.len()
            && expected_section
                .iter()
                .zip(&current_section)
                .all(|(a, b)| *a == b);

        if in_right_section && line_assigns_key(trimmed, leaf) {
            return i + 1;
        }
    }
    0
}

/// Whether `line` contains `key = ...` as a bare key, at the start of the
/// line or inside an inline table.
fn line_assigns_key(line: &str, key: &str) -> bool {
    line.match_indices(key).any(|(start, _)| {
        let before = line[..start].trim_end();
        let boundary = before.is_empty() || before.ends_with('{') || before.ends_with(',');
        boundary && line[start + key.len()..].trim_start().starts_with('=')
    })
}
