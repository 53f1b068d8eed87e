//! Complex field values whose masking waits until they are written.

use std::{fmt, io};

use serde_json::Value as JsonValue;

use crate::{error::RedactError, masker::Masker, value::StructuredValue};

/// An unmasked complex value paired with the masker that must run over it.
///
/// The walk is deferred to the moment an encoder asks for the value's
/// serialized form, so values that are never written are never walked. The
/// wrapped value is not reachable through this type: every accessor returns
/// the masked form or an error.
#[derive(Clone)]
pub struct PendingMask {
    value: StructuredValue,
    masker: Masker,
}

impl PendingMask {
    pub fn new(value: StructuredValue, masker: Masker) -> Self {
        Self { value, masker }
    }

    /// Masks the wrapped value.
    pub fn resolve(&self) -> Result<StructuredValue, RedactError> {
        self.masker.mask(&self.value)
    }

    /// Masks the wrapped value and converts it to JSON.
    pub fn to_json(&self) -> Result<JsonValue, RedactError> {
        self.resolve()?.to_json().map_err(RedactError::Serialize)
    }

    /// Masks the wrapped value and serializes it as JSON bytes.
    pub fn serialize_masked(&self) -> Result<Vec<u8>, RedactError> {
        let masked = self.resolve()?;
        serde_json::to_vec(&masked).map_err(RedactError::Serialize)
    }

    /// Masks the wrapped value and writes it as JSON.
    ///
    /// Nothing is written if masking fails. A serialization failure may leave
    /// a partial, already masked, value in `writer`.
    pub fn write_masked<W: io::Write>(&self, writer: W) -> Result<(), RedactError> {
        let masked = self.resolve()?;
        serde_json::to_writer(writer, &masked).map_err(RedactError::Serialize)
    }

    pub fn masker(&self) -> &Masker {
        &self.masker
    }
}

impl fmt::Debug for PendingMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMask")
            .field("fields", &self.masker.fields().len())
            .finish_non_exhaustive()
    }
}
