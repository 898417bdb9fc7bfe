//! Parameter values held by settings instances.
//!
//! Plain values (`Null`, booleans, numbers, strings, lists) behave like values:
//! copying them is always a full copy. Two kinds of values are references:
//!
//! - [`EnumValue`]: a fixed, enum-like singleton. Never duplicated.
//! - [`ObjectValue`]: shared parameter data. Whether a clone or merge
//!   duplicates it or shares the reference is decided per parameter by the
//!   cloneable flag in the settings metadata.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Why a piece of parameter data could not be duplicated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DuplicateError {
    /// The data type has no structural duplication at all.
    #[error("data does not support duplication")]
    Unsupported,
    /// Custom duplication logic ran and failed.
    #[error("{0}")]
    Failed(String),
}

/// Object data stored in a parameter.
///
/// Implement this directly when a type needs custom duplication logic.
/// [`ObjectValue::new`] and [`ObjectValue::opaque`] cover the common cases.
pub trait ParameterData: fmt::Debug + 'static {
    fn type_name(&self) -> &str;

    /// Produce an independent copy of this data.
    fn duplicate(&self) -> Result<Rc<dyn ParameterData>, DuplicateError>;

    /// Content equality with another piece of data.
    fn data_eq(&self, other: &dyn ParameterData) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Data duplicated through its `Clone` impl.
#[derive(Debug, Clone, PartialEq)]
struct Duplicable<T>(T);

impl<T: Clone + PartialEq + fmt::Debug + 'static> ParameterData for Duplicable<T> {
    fn type_name(&self) -> &str {
        std::any::type_name::<T>()
    }

    fn duplicate(&self) -> Result<Rc<dyn ParameterData>, DuplicateError> {
        Ok(Rc::new(self.clone()))
    }

    fn data_eq(&self, other: &dyn ParameterData) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.0 == self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Data that cannot be duplicated. Equality is identity.
#[derive(Debug)]
struct Opaque<T>(T);

impl<T: fmt::Debug + 'static> ParameterData for Opaque<T> {
    fn type_name(&self) -> &str {
        std::any::type_name::<T>()
    }

    fn duplicate(&self) -> Result<Rc<dyn ParameterData>, DuplicateError> {
        Err(DuplicateError::Unsupported)
    }

    fn data_eq(&self, other: &dyn ParameterData) -> bool {
        std::ptr::addr_eq(self.as_any(), other.as_any())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A shared reference to parameter data.
#[derive(Clone)]
pub struct ObjectValue(Rc<dyn ParameterData>);

impl ObjectValue {
    /// Wrap data that is duplicated with `Clone`.
    pub fn new<T: Clone + PartialEq + fmt::Debug + 'static>(data: T) -> Self {
        Self(Rc::new(Duplicable(data)))
    }

    /// Wrap data that must never be duplicated.
    pub fn opaque<T: fmt::Debug + 'static>(data: T) -> Self {
        Self(Rc::new(Opaque(data)))
    }

    pub fn custom(data: Rc<dyn ParameterData>) -> Self {
        Self(data)
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    pub fn duplicate(&self) -> Result<Self, DuplicateError> {
        self.0.duplicate().map(Self)
    }

    /// Borrow the wrapped data as `T`, if that is what it holds.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        let any = self.0.as_any();
        if let Some(d) = any.downcast_ref::<Duplicable<T>>() {
            return Some(&d.0);
        }
        if let Some(o) = any.downcast_ref::<Opaque<T>>() {
            return Some(&o.0);
        }
        any.downcast_ref::<T>()
    }

    /// Reference identity: both values point at the same data.
    pub fn same_object(a: &Self, b: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&a.0), Rc::as_ptr(&b.0))
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Self::same_object(self, other) || self.0.data_eq(&*other.0)
    }
}

/// One case of a fixed, enum-like type. Cheap to clone; clones share the case.
#[derive(Clone, PartialEq, Eq)]
pub struct EnumValue(Rc<EnumCase>);

#[derive(Debug, PartialEq, Eq)]
struct EnumCase {
    enum_type: String,
    case: String,
}

impl EnumValue {
    pub fn new(enum_type: &str, case: &str) -> Self {
        Self(Rc::new(EnumCase {
            enum_type: enum_type.to_string(),
            case: case.to_string(),
        }))
    }

    pub fn enum_type(&self) -> &str {
        &self.0.enum_type
    }

    pub fn case(&self) -> &str {
        &self.0.case
    }

    pub fn same_case(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.0.enum_type, self.0.case)
    }
}

/// The value of a single settings parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParameterValue>),
    Enum(EnumValue),
    Object(ObjectValue),
}

impl ParameterValue {
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            ParameterValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the value's kind, for error messages.
    pub fn kind(&self) -> &str {
        match self {
            ParameterValue::Null => "null",
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::String(_) => "string",
            ParameterValue::List(_) => "list",
            ParameterValue::Enum(e) => e.enum_type(),
            ParameterValue::Object(o) => o.type_name(),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::String(v)
    }
}

impl From<EnumValue> for ParameterValue {
    fn from(v: EnumValue) -> Self {
        ParameterValue::Enum(v)
    }
}

impl From<ObjectValue> for ParameterValue {
    fn from(v: ObjectValue) -> Self {
        ParameterValue::Object(v)
    }
}
