//! Masking for `slog` pipelines.
//!
//! This module exists to put a [`Redactor`] in front of any `slog::Drain`.
//! [`RedactingDrain`] collects a record's key/values and the logger's owned
//! key/values, masks them, and hands the wrapped drain a rebuilt record whose
//! only key/values are the masked ones.
//!
//! It is responsible for:
//! - Keeping message, level, tag, location and key order of the record.
//! - Deferring the walk of nested (`slog::Serde`) values until the wrapped
//!   drain serializes them.
//! - Failing serialization, never emitting the raw value, when a nested value
//!   cannot be masked under the `reject` policy.
//!
//! It does not build loggers, filter levels, or format output.

use std::{fmt::Arguments, sync::Mutex};

use serde::{Serialize, ser::Error as _};
use serde_json::Value as JsonValue;
use slog::{
    BorrowedKV, Drain, KV, Key, Level, OwnedKVList, Record, RecordLocation, RecordStatic,
    SerdeValue, Serializer,
};
use thiserror::Error;

use crate::{
    config::RedactionConfig,
    encoder::{FieldValue, Redactor},
    error::RedactError,
    value::StructuredValue,
};

/// Failure of a [`RedactingDrain`].
#[derive(Debug, Error)]
pub enum DrainError<E> {
    /// A key/value of the incoming record failed to serialize.
    #[error("failed to collect record key/values: {0}")]
    Collect(slog::Error),
    /// The wrapped drain failed.
    #[error("wrapped drain failed: {0}")]
    Drain(E),
}

/// A drain decorator that masks sensitive key/values.
pub struct RedactingDrain<D> {
    drain: D,
    redactor: Redactor,
    empty: OwnedKVList,
}

impl<D> RedactingDrain<D> {
    pub fn new(drain: D, redactor: Redactor) -> Self {
        Self {
            drain,
            redactor,
            empty: OwnedKVList::from(slog::o!()),
        }
    }

    pub fn from_config(drain: D, config: &RedactionConfig) -> Self {
        Self::new(drain, config.build())
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn into_inner(self) -> D {
        self.drain
    }
}

impl<D: Drain> Drain for RedactingDrain<D> {
    type Ok = D::Ok;
    type Err = DrainError<D::Err>;

    fn log(&self, record: &Record<'_>, values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        if !self.redactor.is_active() {
            return self.drain.log(record, values).map_err(DrainError::Drain);
        }

        let mut collector = FieldCollector::default();
        record
            .kv()
            .serialize(record, &mut collector)
            .and_then(|()| values.serialize(record, &mut collector))
            .map_err(|err| {
                tracing::warn!(error = %err, "slog record dropped: key/values could not be collected");
                DrainError::Collect(err)
            })?;

        let masker = self.redactor.masker();
        let kv = RedactedKv(
            collector
                .fields
                .into_iter()
                .map(|(key, value)| (key, Redactor::redact_value(&masker, key, value)))
                .collect(),
        );

        let location = RecordLocation {
            file: record.file(),
            line: record.line(),
            column: record.column(),
            function: record.function(),
            module: record.module(),
        };
        let rstatic = RecordStatic {
            location: &location,
            tag: record.tag(),
            level: record.level(),
        };
        let redacted = Record::new(&rstatic, record.msg(), BorrowedKV(&kv));
        self.drain
            .log(&redacted, &self.empty)
            .map_err(DrainError::Drain)
    }

    fn is_enabled(&self, level: Level) -> bool {
        self.drain.is_enabled(level)
    }
}

/// Turns key/values into field values.
#[derive(Default)]
struct FieldCollector {
    fields: Vec<(Key, FieldValue)>,
}

impl FieldCollector {
    fn push(&mut self, key: Key, value: FieldValue) -> slog::Result {
        self.fields.push((key, value));
        Ok(())
    }
}

impl Serializer for FieldCollector {
    fn emit_arguments(&mut self, key: Key, val: &Arguments<'_>) -> slog::Result {
        self.push(key, FieldValue::Str(val.to_string()))
    }

    fn emit_str(&mut self, key: Key, val: &str) -> slog::Result {
        self.push(key, FieldValue::Str(val.to_owned()))
    }

    fn emit_char(&mut self, key: Key, val: char) -> slog::Result {
        self.push(key, FieldValue::Str(val.to_string()))
    }

    fn emit_bool(&mut self, key: Key, val: bool) -> slog::Result {
        self.push(key, FieldValue::Bool(val))
    }

    fn emit_usize(&mut self, key: Key, val: usize) -> slog::Result {
        let val = u64::try_from(val).map_err(|_| slog::Error::Other)?;
        self.push(key, FieldValue::U64(val))
    }

    fn emit_isize(&mut self, key: Key, val: isize) -> slog::Result {
        let val = i64::try_from(val).map_err(|_| slog::Error::Other)?;
        self.push(key, FieldValue::I64(val))
    }

    fn emit_u8(&mut self, key: Key, val: u8) -> slog::Result {
        self.push(key, FieldValue::U64(val.into()))
    }

    fn emit_i8(&mut self, key: Key, val: i8) -> slog::Result {
        self.push(key, FieldValue::I64(val.into()))
    }

    fn emit_u16(&mut self, key: Key, val: u16) -> slog::Result {
        self.push(key, FieldValue::U64(val.into()))
    }

    fn emit_i16(&mut self, key: Key, val: i16) -> slog::Result {
        self.push(key, FieldValue::I64(val.into()))
    }

    fn emit_u32(&mut self, key: Key, val: u32) -> slog::Result {
        self.push(key, FieldValue::U64(val.into()))
    }

    fn emit_i32(&mut self, key: Key, val: i32) -> slog::Result {
        self.push(key, FieldValue::I64(val.into()))
    }

    fn emit_u64(&mut self, key: Key, val: u64) -> slog::Result {
        self.push(key, FieldValue::U64(val))
    }

    fn emit_i64(&mut self, key: Key, val: i64) -> slog::Result {
        self.push(key, FieldValue::I64(val))
    }

    fn emit_f32(&mut self, key: Key, val: f32) -> slog::Result {
        self.push(key, FieldValue::F64(val.into()))
    }

    fn emit_f64(&mut self, key: Key, val: f64) -> slog::Result {
        self.push(key, FieldValue::F64(val))
    }

    fn emit_unit(&mut self, key: Key) -> slog::Result {
        self.push(key, FieldValue::Null)
    }

    fn emit_none(&mut self, key: Key) -> slog::Result {
        self.push(key, FieldValue::Null)
    }

    fn emit_serde(&mut self, key: Key, value: &dyn SerdeValue) -> slog::Result {
        let owned = SlogSerde(Mutex::new(value.to_sendable()));
        self.push(key, FieldValue::Structured(StructuredValue::opaque(owned)))
    }
}

/// An owned nested slog value, canonicalized only when it is masked.
struct SlogSerde(Mutex<Box<dyn SerdeValue + Send>>);

impl Serialize for SlogSerde {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self
            .0
            .lock()
            .map_err(|_| S::Error::custom("nested slog value lock poisoned"))?;
        Serialize::serialize(value.as_serde(), serializer)
    }
}

struct RedactedKv(Vec<(Key, FieldValue)>);

impl KV for RedactedKv {
    fn serialize(&self, record: &Record<'_>, serializer: &mut dyn Serializer) -> slog::Result {
        for (key, value) in &self.0 {
            emit_field(*key, value, record, serializer)?;
        }
        Ok(())
    }
}

fn emit_field(
    key: Key,
    value: &FieldValue,
    record: &Record<'_>,
    serializer: &mut dyn Serializer,
) -> slog::Result {
    match value {
        FieldValue::Str(s) => serializer.emit_str(key, s),
        FieldValue::I64(n) => serializer.emit_i64(key, *n),
        FieldValue::U64(n) => serializer.emit_u64(key, *n),
        FieldValue::F64(n) => serializer.emit_f64(key, *n),
        FieldValue::Bool(b) => serializer.emit_bool(key, *b),
        FieldValue::Null => serializer.emit_none(key),
        FieldValue::Bytes(bytes) => serializer.emit_str(key, &String::from_utf8_lossy(bytes)),
        FieldValue::Structured(value) => {
            let json = value
                .to_json()
                .map_err(|err| unmaskable(key, &RedactError::Serialize(err)))?;
            emit_json(key, json, record, serializer)
        }
        FieldValue::Pending(pending) => {
            let json = pending.to_json().map_err(|err| unmaskable(key, &err))?;
            emit_json(key, json, record, serializer)
        }
    }
}

fn emit_json(
    key: Key,
    json: JsonValue,
    record: &Record<'_>,
    serializer: &mut dyn Serializer,
) -> slog::Result {
    slog::Value::serialize(&slog::Serde(json), record, key, serializer)
}

fn unmaskable(key: Key, err: &RedactError) -> slog::Error {
    tracing::warn!(key = %key, error = %err, "slog value dropped: could not be masked");
    slog::Error::Other
}
