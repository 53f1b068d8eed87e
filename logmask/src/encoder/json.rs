//! Line-delimited JSON record encoder.

use chrono::SecondsFormat;
use serde::Serialize;

use super::{Encoder, Entry, Field, FieldValue};
use crate::error::{EncodeError, RedactError};

/// Envelope key names and line terminator used by [`JsonEncoder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonKeys {
    pub time: String,
    pub level: String,
    pub logger: String,
    pub caller: String,
    pub message: String,
    pub stack: String,
    pub line_ending: String,
}

impl Default for JsonKeys {
    fn default() -> Self {
        Self {
            time: "time".to_owned(),
            level: "level".to_owned(),
            logger: "logger".to_owned(),
            caller: "caller".to_owned(),
            message: "msg".to_owned(),
            stack: "stacktrace".to_owned(),
            line_ending: "\n".to_owned(),
        }
    }
}

/// Writes each record as one JSON object followed by a line ending.
///
/// Envelope keys come first (`time`, `level`, `logger`, `caller`, `msg`,
/// `stacktrace`, absent parts omitted), then the fields in order. Duplicate
/// field keys are written as given.
#[derive(Clone, Debug, Default)]
pub struct JsonEncoder {
    keys: JsonKeys,
}

impl JsonEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: JsonKeys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &JsonKeys {
        &self.keys
    }
}

impl Encoder for JsonEncoder {
    fn encode_entry(&self, entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError> {
        let mut out = ObjectWriter::new();
        let time = entry.time.to_rfc3339_opts(SecondsFormat::Secs, true);
        out.pair(&self.keys.time, &time)?;
        out.pair(&self.keys.level, entry.level.as_str())?;
        if let Some(logger) = &entry.logger {
            out.pair(&self.keys.logger, logger)?;
        }
        if let Some(caller) = &entry.caller {
            out.pair(&self.keys.caller, caller)?;
        }
        out.pair(&self.keys.message, &entry.message)?;
        if let Some(stack) = &entry.stack {
            out.pair(&self.keys.stack, stack)?;
        }

        for field in &fields {
            out.key(&field.key)?;
            write_value(&mut out.buf, field)?;
        }

        Ok(out.finish(&self.keys.line_ending))
    }
}

fn write_value(buf: &mut Vec<u8>, field: &Field) -> Result<(), EncodeError> {
    match &field.value {
        FieldValue::Str(s) => serde_json::to_writer(&mut *buf, s)?,
        FieldValue::I64(n) => serde_json::to_writer(&mut *buf, n)?,
        FieldValue::U64(n) => serde_json::to_writer(&mut *buf, n)?,
        // Non-finite floats come out as `null`.
        FieldValue::F64(n) => serde_json::to_writer(&mut *buf, n)?,
        FieldValue::Bool(b) => serde_json::to_writer(&mut *buf, b)?,
        FieldValue::Null => buf.extend_from_slice(b"null"),
        FieldValue::Bytes(bytes) => {
            serde_json::to_writer(&mut *buf, &String::from_utf8_lossy(bytes))?;
        }
        FieldValue::Structured(value) => serde_json::to_writer(&mut *buf, value)
            .map_err(|err| EncodeError::field(&field.key, RedactError::Serialize(err)))?,
        FieldValue::Pending(pending) => pending
            .write_masked(&mut *buf)
            .map_err(|err| EncodeError::field(&field.key, err))?,
    }
    Ok(())
}

struct ObjectWriter {
    buf: Vec<u8>,
    first: bool,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.push(b'{');
        Self { buf, first: true }
    }

    fn key(&mut self, key: &str) -> Result<(), EncodeError> {
        if !self.first {
            self.buf.push(b',');
        }
        self.first = false;
        serde_json::to_writer(&mut self.buf, key)?;
        self.buf.push(b':');
        Ok(())
    }

    fn pair<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) -> Result<(), EncodeError> {
        self.key(key)?;
        serde_json::to_writer(&mut self.buf, value)?;
        Ok(())
    }

    fn finish(mut self, line_ending: &str) -> Vec<u8> {
        self.buf.push(b'}');
        self.buf.extend_from_slice(line_ending.as_bytes());
        self.buf
    }
}
