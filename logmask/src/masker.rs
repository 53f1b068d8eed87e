//! Recursive masking of structured values by field name.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    error::RedactError,
    fields::SensitiveFieldSet,
    token::DEFAULT_MASK_TOKEN,
    value::{Scalar, StructuredValue},
};

/// Containers nested deeper than this are treated as unmaskable.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do with a value the masker cannot walk.
///
/// A value is unmaskable when an application type fails to canonicalize or
/// when containers nest past the depth limit. Values under a sensitive key
/// are never walked, so these policies only ever apply to values whose
/// enclosing keys did not match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMaskFailure {
    /// Return the error; the enclosing field fails to encode.
    #[default]
    Reject,
    /// Replace the unmaskable value with the mask token.
    Mask,
    /// Keep the unmaskable value as it is.
    PassThrough,
}

/// Masks the values of sensitive keys inside a [`StructuredValue`].
///
/// A masker is a cheap snapshot: the field set is shared and the token is the
/// one read when the masker was built. Clones share the failure counter.
#[derive(Clone, Debug)]
pub struct Masker {
    fields: Arc<SensitiveFieldSet>,
    token: Arc<String>,
    on_failure: OnMaskFailure,
    max_depth: usize,
    failures: Arc<AtomicU64>,
}

impl Masker {
    /// Creates a masker using [`DEFAULT_MASK_TOKEN`].
    pub fn new(fields: impl Into<Arc<SensitiveFieldSet>>) -> Self {
        Self {
            fields: fields.into(),
            token: Arc::new(DEFAULT_MASK_TOKEN.to_owned()),
            on_failure: OnMaskFailure::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            failures: Arc::default(),
        }
    }

    pub(crate) fn from_parts(
        fields: Arc<SensitiveFieldSet>,
        token: Arc<String>,
        on_failure: OnMaskFailure,
        max_depth: usize,
        failures: Arc<AtomicU64>,
    ) -> Self {
        Self {
            fields,
            token,
            on_failure,
            max_depth,
            failures,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Arc::new(token.into());
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, on_failure: OnMaskFailure) -> Self {
        self.on_failure = on_failure;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn fields(&self) -> &SensitiveFieldSet {
        &self.fields
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn failure_policy(&self) -> OnMaskFailure {
        self.on_failure
    }

    /// Number of unmaskable values met by this masker and its clones.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns a masked copy of `value`.
    ///
    /// Every value under a sensitive key, whatever its shape, becomes the
    /// mask token. Everything else keeps its key, position and contents. The
    /// output is built while walking; `value` itself is never copied whole.
    pub fn mask(&self, value: &StructuredValue) -> Result<StructuredValue, RedactError> {
        self.mask_ref(value, 0)
    }

    /// Like [`Masker::mask`] but consumes the value, reusing its allocations.
    pub fn mask_owned(&self, value: StructuredValue) -> Result<StructuredValue, RedactError> {
        self.mask_at(value, 0)
    }

    /// The scalar written over sensitive values.
    pub fn token_value(&self) -> StructuredValue {
        StructuredValue::Scalar(Scalar::String(self.token.as_str().to_owned()))
    }

    fn mask_ref(&self, value: &StructuredValue, depth: usize) -> Result<StructuredValue, RedactError> {
        match value {
            StructuredValue::Object(Some(map)) => {
                if depth >= self.max_depth {
                    return self.recover(|| value.clone(), RedactError::DepthExceeded(self.max_depth));
                }
                map.iter()
                    .map(|(key, child)| {
                        let child = if self.fields.contains(key) {
                            self.token_value()
                        } else {
                            self.mask_ref(child, depth + 1)?
                        };
                        Ok::<_, RedactError>((key.clone(), child))
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()
                    .map(|map| StructuredValue::Object(Some(map)))
            }
            StructuredValue::Array(Some(items)) => {
                if depth >= self.max_depth {
                    return self.recover(|| value.clone(), RedactError::DepthExceeded(self.max_depth));
                }
                items
                    .iter()
                    .map(|item| self.mask_ref(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|items| StructuredValue::Array(Some(items)))
            }
            // The canonical form is freshly built, so it is walked by value.
            StructuredValue::Unknown(opaque) => match opaque.canonicalize() {
                Ok(json) => self.mask_at(StructuredValue::from(json), depth),
                Err(err) => self.recover(|| value.clone(), RedactError::Canonicalize(err)),
            },
            other => Ok(other.clone()),
        }
    }

    fn mask_at(&self, value: StructuredValue, depth: usize) -> Result<StructuredValue, RedactError> {
        match value {
            StructuredValue::Object(Some(map)) => {
                if depth >= self.max_depth {
                    return self.recover(
                        || StructuredValue::Object(Some(map)),
                        RedactError::DepthExceeded(self.max_depth),
                    );
                }
                map.into_iter()
                    .map(|(key, child)| {
                        if self.fields.contains(&key) {
                            Ok((key, self.token_value()))
                        } else {
                            self.mask_at(child, depth + 1).map(|child| (key, child))
                        }
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()
                    .map(|map| StructuredValue::Object(Some(map)))
            }
            StructuredValue::Array(Some(items)) => {
                if depth >= self.max_depth {
                    return self.recover(
                        || StructuredValue::Array(Some(items)),
                        RedactError::DepthExceeded(self.max_depth),
                    );
                }
                items
                    .into_iter()
                    .map(|item| self.mask_at(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|items| StructuredValue::Array(Some(items)))
            }
            StructuredValue::Unknown(opaque) => match opaque.canonicalize() {
                Ok(json) => self.mask_at(StructuredValue::from(json), depth),
                Err(err) => self.recover(
                    || StructuredValue::Unknown(opaque),
                    RedactError::Canonicalize(err),
                ),
            },
            // Scalars and absent containers pass through untouched.
            other => Ok(other),
        }
    }

    /// Applies the failure policy; `original` is only built for `PassThrough`.
    fn recover(
        &self,
        original: impl FnOnce() -> StructuredValue,
        err: RedactError,
    ) -> Result<StructuredValue, RedactError> {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(error = %err, policy = ?self.on_failure, "value could not be masked");
        match self.on_failure {
            OnMaskFailure::Reject => Err(err),
            OnMaskFailure::Mask => Ok(self.token_value()),
            OnMaskFailure::PassThrough => Ok(original()),
        }
    }
}
