//! Records, fields, and the encoder boundary.
//!
//! - [`Encoder`]: turns one [`Entry`] and its fields into bytes
//! - [`RedactingEncoder`]: an `Encoder` that masks fields before delegating
//! - [`JsonEncoder`]: a line-delimited JSON encoder to wrap
//!
//! Fields are passed by value: a record's fields belong to one encode call
//! and are consumed by it.

mod json;
mod redacting;

use std::{borrow::Cow, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use json::{JsonEncoder, JsonKeys};
pub use redacting::{RedactingEncoder, Redactor};

use crate::{error::EncodeError, pending::PendingMask, value::StructuredValue};

/// Key of the single field carried by a fallback record.
pub const ENCODE_ERROR_KEY: &str = "encode_error";

/// Record severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Panic,
    Fatal,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Panic => "panic",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record metadata: everything except the fields.
#[derive(Clone, Debug)]
pub struct Entry {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub logger: Option<String>,
    pub message: String,
    pub caller: Option<String>,
    pub stack: Option<String>,
}

impl Entry {
    /// Creates an entry stamped with the current time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            time: Utc::now(),
            logger: None,
            message: message.into(),
            caller: None,
            stack: None,
        }
    }

    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// The value of one field.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Null,
    /// A pre-formatted payload; opaque, never inspected.
    Bytes(Vec<u8>),
    Structured(StructuredValue),
    /// A complex value that is masked when it is written.
    Pending(PendingMask),
}

impl FieldValue {
    /// Whether the value may hold nested named fields.
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Structured(value) if value.is_complex())
    }
}

/// A named value attached to one record.
#[derive(Clone, Debug)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn str(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Str(value.into()))
    }

    pub fn i64(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self::new(key, FieldValue::I64(value))
    }

    pub fn u64(key: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Self::new(key, FieldValue::U64(value))
    }

    pub fn f64(key: impl Into<Cow<'static, str>>, value: f64) -> Self {
        Self::new(key, FieldValue::F64(value))
    }

    pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Self::new(key, FieldValue::Bool(value))
    }

    pub fn null(key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(key, FieldValue::Null)
    }

    pub fn bytes(key: impl Into<Cow<'static, str>>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, FieldValue::Bytes(value.into()))
    }

    /// A field holding a decomposed value (object, array or scalar).
    pub fn structured(key: impl Into<Cow<'static, str>>, value: impl Into<StructuredValue>) -> Self {
        Self::new(key, FieldValue::Structured(value.into()))
    }

    /// A field holding any serializable application value.
    ///
    /// The value is canonicalized lazily, when the field is masked.
    pub fn any<T>(key: impl Into<Cow<'static, str>>, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::new(key, FieldValue::Structured(StructuredValue::opaque(value)))
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Turns a record into bytes.
pub trait Encoder {
    fn encode_entry(&self, entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError>;

    /// Encodes the record, or on failure the entry alone with a single
    /// [`ENCODE_ERROR_KEY`] field describing the failure.
    ///
    /// None of the original field values reach the fallback record; the
    /// marker is [`EncodeError::marker`], the failing key and failure kind.
    fn encode_or_fallback(&self, entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError> {
        match self.encode_entry(entry, fields) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                let marker = err.marker();
                tracing::warn!(error = %marker, message = %entry.message, "record fell back to error marker");
                self.encode_entry(entry, vec![Field::str(ENCODE_ERROR_KEY, marker)])
            }
        }
    }
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn encode_entry(&self, entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError> {
        (**self).encode_entry(entry, fields)
    }
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    fn encode_entry(&self, entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError> {
        (**self).encode_entry(entry, fields)
    }
}

impl<E: Encoder + ?Sized> Encoder for Arc<E> {
    fn encode_entry(&self, entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError> {
        (**self).encode_entry(entry, fields)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn level_names_are_lowercase() {
        assert_eq!(Level::Warn.to_string(), "warn");
        assert_eq!(Level::Fatal.as_str(), "fatal");
    }

    #[test]
    fn complexity_follows_value_shape() {
        assert!(!Field::str("a", "b").value.is_complex());
        assert!(!Field::structured("a", json!("scalar")).value.is_complex());
        assert!(Field::structured("a", json!({"b": 1})).value.is_complex());
        assert!(Field::structured("a", json!([1, 2])).value.is_complex());
        assert!(Field::any("a", vec![1, 2]).value.is_complex());
        assert!(!Field::bytes("a", b"{\"password\":1}".to_vec()).value.is_complex());
    }

    #[test]
    fn owned_and_static_keys() {
        let dynamic = String::from("user_id");
        assert_eq!(Field::u64(dynamic, 7).key(), "user_id");
        assert!(matches!(Field::null("k").key, Cow::Borrowed("k")));
    }
}
