//! Error types for masking and encoding.

use thiserror::Error;

/// Failure to produce a masked form of a value.
///
/// None of these are fatal: the caller decides whether the field, the record,
/// or nothing at all is dropped. What is never done on error is writing the
/// unmasked value.
#[derive(Debug, Error)]
pub enum RedactError {
    /// An application-defined value could not be converted into the
    /// Object/Array/Scalar model.
    #[error("failed to canonicalize value: {0}")]
    Canonicalize(#[source] serde_json::Error),

    /// Containers were nested deeper than the masker is allowed to walk.
    #[error("value nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),

    /// The masked value could not be serialized.
    #[error("failed to serialize masked value: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failure to encode a record.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A single field could not be masked or serialized.
    #[error("field `{key}`: {source}")]
    Field {
        key: String,
        #[source]
        source: RedactError,
    },

    /// The record envelope could not be written.
    #[error("failed to write record: {0}")]
    Json(#[from] serde_json::Error),
}

impl RedactError {
    /// The failure's kind, without any text produced by the value itself.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Canonicalize(_) => "canonicalize",
            Self::DepthExceeded(_) => "depth_exceeded",
            Self::Serialize(_) => "serialize",
        }
    }
}

impl EncodeError {
    pub(crate) fn field(key: &str, source: RedactError) -> Self {
        Self::Field {
            key: key.to_owned(),
            source,
        }
    }

    /// A description safe to write into log output.
    ///
    /// Carries the field key and the failure kind only; messages from
    /// application `Serialize` impls may quote the value being serialized.
    pub fn marker(&self) -> String {
        match self {
            Self::Field { key, source } => format!("field `{key}`: {}", source.kind()),
            Self::Json(_) => "record: serialize".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::ser::Error as _;

    use super::*;

    #[test]
    fn marker_leaves_out_value_text() {
        let err = EncodeError::field(
            "card",
            RedactError::Canonicalize(serde_json::Error::custom("bad number 4111-1111")),
        );
        assert!(err.to_string().contains("4111-1111"));
        assert_eq!(err.marker(), "field `card`: canonicalize");
    }

    #[test]
    fn kinds() {
        assert_eq!(RedactError::DepthExceeded(3).kind(), "depth_exceeded");
        let json = serde_json::Error::custom("x");
        assert_eq!(RedactError::Serialize(json).kind(), "serialize");
        assert_eq!(
            EncodeError::Json(serde_json::Error::custom("x")).marker(),
            "record: serialize"
        );
    }
}
