//! The value model walked by the masker.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Serialize, Serializer, ser::Error as _};
use serde_json::{Number, Value as JsonValue};

/// A value that can be converted into the Object/Array/Scalar model.
///
/// Implemented for every `Serialize` type. Conversion goes through
/// `serde_json`, so it fails for the same inputs `serde_json::to_value` does
/// (non-string map keys, `Serialize` impls that return errors).
pub trait Canonical: Send + Sync {
    fn canonicalize(&self) -> Result<JsonValue, serde_json::Error>;
}

impl<T> Canonical for T
where
    T: Serialize + Send + Sync + ?Sized,
{
    fn canonicalize(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A leaf value. Never inspected, never masked by content.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

/// A nested log payload.
///
/// `Object(None)` and `Array(None)` are the absent forms of a container and
/// stay distinct from empty containers through masking. Both serialize as
/// `null`.
#[derive(Clone)]
pub enum StructuredValue {
    Scalar(Scalar),
    Object(Option<BTreeMap<String, StructuredValue>>),
    Array(Option<Vec<StructuredValue>>),
    /// An application value not yet decomposed; see [`Canonical`].
    Unknown(Arc<dyn Canonical>),
}

impl StructuredValue {
    /// Wraps an application-defined value for later canonicalization.
    pub fn opaque<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::Unknown(Arc::new(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(value.into()))
    }

    pub fn empty_object() -> Self {
        Self::Object(Some(BTreeMap::new()))
    }

    pub fn empty_array() -> Self {
        Self::Array(Some(Vec::new()))
    }

    /// Whether the value may hold named sub-fields and so needs a walk.
    ///
    /// Decided on shape alone: containers (absent or not) and undecomposed
    /// values are complex, scalars are not.
    pub fn is_complex(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    /// Decomposes an [`StructuredValue::Unknown`] one level; other variants
    /// are returned as they are.
    pub fn canonical(self) -> Result<Self, serde_json::Error> {
        match self {
            Self::Unknown(opaque) => opaque.canonicalize().map(Self::from),
            other => Ok(other),
        }
    }

    /// Converts to a `serde_json::Value`, canonicalizing any unknown parts.
    pub fn to_json(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Looks up a key on an object value.
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(Some(map)) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<JsonValue> for StructuredValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Scalar(Scalar::Null),
            JsonValue::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            JsonValue::Number(n) => Self::Scalar(Scalar::Number(n)),
            JsonValue::String(s) => Self::Scalar(Scalar::String(s)),
            JsonValue::Array(items) => Self::Array(Some(items.into_iter().map(Self::from).collect())),
            JsonValue::Object(map) => Self::Object(Some(
                map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            )),
        }
    }
}

impl From<Scalar> for StructuredValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<BTreeMap<String, StructuredValue>> for StructuredValue {
    fn from(map: BTreeMap<String, StructuredValue>) -> Self {
        Self::Object(Some(map))
    }
}

impl From<Vec<StructuredValue>> for StructuredValue {
    fn from(items: Vec<StructuredValue>) -> Self {
        Self::Array(Some(items))
    }
}

impl Serialize for StructuredValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::Object(None) | Self::Array(None) => serializer.serialize_none(),
            Self::Object(Some(map)) => serializer.collect_map(map),
            Self::Array(Some(items)) => serializer.collect_seq(items),
            Self::Unknown(opaque) => opaque
                .canonicalize()
                .map_err(S::Error::custom)?
                .serialize(serializer),
        }
    }
}

impl PartialEq for StructuredValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Unknown(a), Self::Unknown(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => f.debug_tuple("Scalar").field(scalar).finish(),
            Self::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Self::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Self::Unknown(_) => f.write_str("Unknown(..)"),
        }
    }
}
