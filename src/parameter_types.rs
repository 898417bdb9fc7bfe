//! Parameter types: conversion between parameter values and their normalized
//! form.
//!
//! The normalized form is what storage sees, a `serde_json::Value` limited to
//! null, booleans, numbers, strings, arrays and objects. Each parameter names
//! its type in [`ParameterMetadata::parameter_type`]; parameters without a
//! type are not normalized.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use crate::error::SettingsError;
use crate::metadata::{MetadataProvider, ParameterMetadata};
use crate::settings::Settings;
use crate::value::ParameterValue;

pub trait ParameterType {
    fn name(&self) -> &str;

    fn to_normalized(
        &self,
        value: &ParameterValue,
        parameter: &ParameterMetadata,
    ) -> Result<Value, SettingsError>;

    fn from_normalized(
        &self,
        value: &Value,
        parameter: &ParameterMetadata,
    ) -> Result<ParameterValue, SettingsError>;
}

fn invalid(parameter: &ParameterMetadata, reason: String) -> SettingsError {
    SettingsError::InvalidValue {
        key: parameter.property.clone(),
        reason,
    }
}

fn wrong_type(parameter: &ParameterMetadata, expected: &str, actual: &str) -> SettingsError {
    invalid(
        parameter,
        format!("must be a {expected} or null, but {actual} given"),
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BoolType;

impl ParameterType for BoolType {
    fn name(&self) -> &str {
        "bool"
    }

    fn to_normalized(
        &self,
        value: &ParameterValue,
        parameter: &ParameterMetadata,
    ) -> Result<Value, SettingsError> {
        match value {
            ParameterValue::Null => Ok(Value::Null),
            ParameterValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(wrong_type(parameter, "bool", other.kind())),
        }
    }

    fn from_normalized(
        &self,
        value: &Value,
        parameter: &ParameterMetadata,
    ) -> Result<ParameterValue, SettingsError> {
        match value {
            Value::Null => Ok(ParameterValue::Null),
            Value::Bool(b) => Ok(ParameterValue::Bool(*b)),
            Value::Number(n) => Ok(ParameterValue::Bool(n.as_f64() != Some(0.0))),
            other => Err(wrong_type(parameter, "bool", json_kind(other))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IntType;

impl ParameterType for IntType {
    fn name(&self) -> &str {
        "int"
    }

    fn to_normalized(
        &self,
        value: &ParameterValue,
        parameter: &ParameterMetadata,
    ) -> Result<Value, SettingsError> {
        match value {
            ParameterValue::Null => Ok(Value::Null),
            ParameterValue::Int(i) => Ok(Value::from(*i)),
            other => Err(wrong_type(parameter, "int", other.kind())),
        }
    }

    fn from_normalized(
        &self,
        value: &Value,
        parameter: &ParameterMetadata,
    ) -> Result<ParameterValue, SettingsError> {
        match value {
            Value::Null => Ok(ParameterValue::Null),
            Value::Bool(b) => Ok(ParameterValue::Int(i64::from(*b))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(ParameterValue::Int(i));
                }
                match n.as_f64() {
                    Some(f) if (i64::MIN as f64..i64::MAX as f64).contains(&f) => {
                        Ok(ParameterValue::Int(f.trunc() as i64))
                    }
                    _ => Err(invalid(parameter, format!("{n} is out of range for an int"))),
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ParameterValue::Int)
                .map_err(|e| invalid(parameter, e.to_string())),
            other => Err(wrong_type(parameter, "int", json_kind(other))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FloatType;

impl ParameterType for FloatType {
    fn name(&self) -> &str {
        "float"
    }

    fn to_normalized(
        &self,
        value: &ParameterValue,
        parameter: &ParameterMetadata,
    ) -> Result<Value, SettingsError> {
        match value {
            ParameterValue::Null => Ok(Value::Null),
            ParameterValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| invalid(parameter, format!("{f} cannot be stored"))),
            other => Err(wrong_type(parameter, "float", other.kind())),
        }
    }

    fn from_normalized(
        &self,
        value: &Value,
        parameter: &ParameterMetadata,
    ) -> Result<ParameterValue, SettingsError> {
        match value {
            Value::Null => Ok(ParameterValue::Null),
            Value::Bool(b) => Ok(ParameterValue::Float(if *b { 1.0 } else { 0.0 })),
            Value::Number(n) => n
                .as_f64()
                .map(ParameterValue::Float)
                .ok_or_else(|| invalid(parameter, format!("{n} is not a float"))),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(ParameterValue::Float)
                .map_err(|e| invalid(parameter, e.to_string())),
            other => Err(wrong_type(parameter, "float", json_kind(other))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StringType;

impl ParameterType for StringType {
    fn name(&self) -> &str {
        "string"
    }

    fn to_normalized(
        &self,
        value: &ParameterValue,
        parameter: &ParameterMetadata,
    ) -> Result<Value, SettingsError> {
        match value {
            ParameterValue::Null => Ok(Value::Null),
            ParameterValue::String(s) => Ok(Value::String(s.clone())),
            other => Err(wrong_type(parameter, "string", other.kind())),
        }
    }

    fn from_normalized(
        &self,
        value: &Value,
        parameter: &ParameterMetadata,
    ) -> Result<ParameterValue, SettingsError> {
        match value {
            Value::Null => Ok(ParameterValue::Null),
            Value::String(s) => Ok(ParameterValue::String(s.clone())),
            Value::Bool(b) => Ok(ParameterValue::String(b.to_string())),
            Value::Number(n) => Ok(ParameterValue::String(n.to_string())),
            other => Err(wrong_type(parameter, "string", json_kind(other))),
        }
    }
}

/// Parameter types by name.
#[derive(Clone, Default)]
pub struct ParameterTypeRegistry {
    types: BTreeMap<String, Rc<dyn ParameterType>>,
}

impl ParameterTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `bool`, `int`, `float` and `string`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(BoolType);
        registry.register(IntType);
        registry.register(FloatType);
        registry.register(StringType);
        registry
    }

    /// Register a type under its name, replacing any type of the same name.
    pub fn register(&mut self, parameter_type: impl ParameterType + 'static) {
        self.types
            .insert(parameter_type.name().to_string(), Rc::new(parameter_type));
    }

    pub fn get(&self, name: &str) -> Result<Rc<dyn ParameterType>, SettingsError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| SettingsError::UnknownParameterType(name.to_string()))
    }

    /// Registered type names in sorted order.
    pub fn registered_types(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }
}

/// Normalize every typed parameter of `settings` into a JSON object.
pub fn normalize(
    settings: &Settings,
    metadata: &dyn MetadataProvider,
    types: &ParameterTypeRegistry,
) -> Result<Map<String, Value>, SettingsError> {
    let class = metadata.metadata_for(settings)?;
    let mut out = Map::new();
    for parameter in &class.metadata().parameters {
        let Some(type_name) = &parameter.parameter_type else {
            continue;
        };
        let parameter_type = types.get(type_name)?;
        let value = settings.parameter(&parameter.property)?;
        out.insert(
            parameter.property.clone(),
            parameter_type.to_normalized(&value, parameter)?,
        );
    }
    Ok(out)
}

/// Write normalized values onto `settings`. Typed parameters missing from
/// `data` keep their current value.
pub fn apply_normalized(
    settings: &Settings,
    data: &Map<String, Value>,
    metadata: &dyn MetadataProvider,
    types: &ParameterTypeRegistry,
) -> Result<(), SettingsError> {
    let class = metadata.metadata_for(settings)?;
    for parameter in &class.metadata().parameters {
        let Some(type_name) = &parameter.parameter_type else {
            continue;
        };
        let Some(normalized) = data.get(&parameter.property) else {
            continue;
        };
        let parameter_type = types.get(type_name)?;
        let value = parameter_type.from_normalized(normalized, parameter)?;
        settings.set_parameter(&parameter.property, value)?;
    }
    Ok(())
}

/// Create a bare instance of `class` populated from normalized values.
pub fn denormalize(
    class: &str,
    data: &Map<String, Value>,
    metadata: &dyn MetadataProvider,
    types: &ParameterTypeRegistry,
) -> Result<Settings, SettingsError> {
    let settings = metadata.settings_class(class)?.instantiate();
    apply_normalized(&settings, data, metadata, types)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::PROFILE_SCHEMA;
    use crate::schema::parse_schema;
    use serde_json::json;
    use std::path::Path;

    fn param(name: &str) -> ParameterMetadata {
        ParameterMetadata::new(name)
    }

    #[test]
    fn float_accepts_float_and_null() {
        let p = param("ratio");
        assert_eq!(
            FloatType.to_normalized(&ParameterValue::Float(0.5), &p).unwrap(),
            json!(0.5)
        );
        assert_eq!(
            FloatType.to_normalized(&ParameterValue::Null, &p).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn float_rejects_other_values_naming_the_property() {
        let err = FloatType
            .to_normalized(&ParameterValue::from("0.5"), &param("ratio"))
            .unwrap_err();
        match err {
            SettingsError::InvalidValue { key, reason } => {
                assert_eq!(key, "ratio");
                assert!(reason.contains("string"), "reason: {reason}");
            }
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn float_rejects_non_finite() {
        let err = FloatType
            .to_normalized(&ParameterValue::Float(f64::NAN), &param("ratio"))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn float_coerces_normalized_numbers() {
        let p = param("ratio");
        assert_eq!(
            FloatType.from_normalized(&json!(3), &p).unwrap(),
            ParameterValue::Float(3.0)
        );
        assert_eq!(
            FloatType.from_normalized(&json!(true), &p).unwrap(),
            ParameterValue::Float(1.0)
        );
        assert_eq!(
            FloatType.from_normalized(&json!("2.5"), &p).unwrap(),
            ParameterValue::Float(2.5)
        );
        assert_eq!(
            FloatType.from_normalized(&Value::Null, &p).unwrap(),
            ParameterValue::Null
        );
        assert!(FloatType.from_normalized(&json!([1.0]), &p).is_err());
    }

    #[test]
    fn int_truncates_floats() {
        assert_eq!(
            IntType.from_normalized(&json!(4.9), &param("n")).unwrap(),
            ParameterValue::Int(4)
        );
        assert!(IntType.from_normalized(&json!("four"), &param("n")).is_err());
    }

    #[test]
    fn int_rejects_out_of_range_numbers() {
        for big in [json!(1e300), json!(-1e300), json!(u64::MAX)] {
            match IntType.from_normalized(&big, &param("count")).unwrap_err() {
                SettingsError::InvalidValue { key, reason } => {
                    assert_eq!(key, "count");
                    assert!(reason.contains("out of range"), "reason: {reason}");
                }
                other => panic!("Expected InvalidValue, got {other:?}"),
            }
        }
        assert_eq!(
            IntType.from_normalized(&json!(-7.5), &param("count")).unwrap(),
            ParameterValue::Int(-7)
        );
    }

    #[test]
    fn bool_and_string_round_trip() {
        let p = param("flag");
        let normalized = BoolType.to_normalized(&ParameterValue::Bool(true), &p).unwrap();
        assert_eq!(
            BoolType.from_normalized(&normalized, &p).unwrap(),
            ParameterValue::Bool(true)
        );
        assert_eq!(
            StringType.from_normalized(&json!(12), &p).unwrap(),
            ParameterValue::from("12")
        );
    }

    #[test]
    fn registry_lists_and_resolves_defaults() {
        let types = ParameterTypeRegistry::with_defaults();
        assert_eq!(
            types.registered_types(),
            vec!["bool", "float", "int", "string"]
        );
        assert_eq!(types.get("float").unwrap().name(), "float");
        assert!(matches!(
            types.get("decimal"),
            Err(SettingsError::UnknownParameterType(name)) if name == "decimal"
        ));
    }

    #[test]
    fn normalize_covers_typed_parameters_only() {
        let registry = parse_schema(PROFILE_SCHEMA, Path::new("schema.toml"), true).unwrap();
        let profile = registry.instantiate("Profile").unwrap();
        profile.set_parameter("name", "alice").unwrap();
        profile.set_parameter("ratio", 0.25).unwrap();

        let data = normalize(&profile, &registry, &ParameterTypeRegistry::with_defaults()).unwrap();
        assert_eq!(Value::Object(data), json!({ "name": "alice", "ratio": 0.25 }));
    }

    #[test]
    fn denormalize_builds_instance() {
        let registry = parse_schema(PROFILE_SCHEMA, Path::new("schema.toml"), true).unwrap();
        let data = json!({ "name": "bob", "ratio": 1 });
        let Value::Object(data) = data else {
            panic!("expected object");
        };

        let profile = denormalize(
            "Profile",
            &data,
            &registry,
            &ParameterTypeRegistry::with_defaults(),
        )
        .unwrap();
        assert_eq!(profile.parameter("name").unwrap(), ParameterValue::from("bob"));
        assert_eq!(profile.parameter("ratio").unwrap(), ParameterValue::Float(1.0));
    }

    #[test]
    fn apply_keeps_missing_values() {
        let registry = parse_schema(PROFILE_SCHEMA, Path::new("schema.toml"), true).unwrap();
        let profile = registry.instantiate("Profile").unwrap();
        profile.set_parameter("name", "alice").unwrap();
        profile.set_parameter("ratio", 0.5).unwrap();

        let mut data = Map::new();
        data.insert("ratio".into(), json!(0.75));
        apply_normalized(
            &profile,
            &data,
            &registry,
            &ParameterTypeRegistry::with_defaults(),
        )
        .unwrap();

        assert_eq!(profile.parameter("name").unwrap(), ParameterValue::from("alice"));
        assert_eq!(profile.parameter("ratio").unwrap(), ParameterValue::Float(0.75));
    }

    #[test]
    fn unknown_type_in_metadata_errors() {
        let registry = parse_schema(
            "[classes.A]\nparameters = [{ property = \"x\", type = \"decimal\" }]\n",
            Path::new("schema.toml"),
            true,
        )
        .unwrap();
        let a = registry.instantiate("A").unwrap();
        a.set_parameter("x", 1i64).unwrap();
        assert!(matches!(
            normalize(&a, &registry, &ParameterTypeRegistry::with_defaults()),
            Err(SettingsError::UnknownParameterType(_))
        ));
    }
}
