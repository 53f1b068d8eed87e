//! The masking decorator for encoders.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use super::{Encoder, Entry, Field, FieldValue};
use crate::{
    config::RedactionConfig,
    error::EncodeError,
    fields::SensitiveFieldSet,
    masker::{DEFAULT_MAX_DEPTH, Masker, OnMaskFailure},
    pending::PendingMask,
    token::MaskToken,
};

/// Per-target masking state: the field set, the token cell and the policy.
///
/// A redactor decides, field by field, what an encoder is allowed to see.
/// It is cheap to clone; clones share the field set, the token cell and the
/// failure counter.
#[derive(Clone, Debug)]
pub struct Redactor {
    fields: Arc<SensitiveFieldSet>,
    token: MaskToken,
    on_failure: OnMaskFailure,
    max_depth: usize,
    enabled: bool,
    failures: Arc<AtomicU64>,
}

impl Redactor {
    /// Creates an enabled redactor with the default failure policy.
    pub fn new(fields: SensitiveFieldSet, token: MaskToken) -> Self {
        Self {
            fields: Arc::new(fields),
            token,
            on_failure: OnMaskFailure::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            enabled: true,
            failures: Arc::default(),
        }
    }

    /// A redactor that forwards every field unchanged.
    pub fn passthrough() -> Self {
        Self {
            enabled: false,
            ..Self::new(SensitiveFieldSet::default(), MaskToken::global().clone())
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        let token = match &config.mask_token {
            Some(token) => MaskToken::new(token.clone()),
            None => MaskToken::global().clone(),
        };
        Self {
            enabled: config.enabled,
            ..Self::new(SensitiveFieldSet::new(&config.sensitive_fields), token)
                .with_failure_policy(config.on_failure)
                .with_max_depth(config.max_depth)
        }
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

    /// Whether any field can ever be masked.
    ///
    /// Disabled redactors and redactors without sensitive names forward
    /// records untouched.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.fields.is_empty()
    }

    pub fn fields(&self) -> &SensitiveFieldSet {
        &self.fields
    }

    /// The token cell; `set` on it affects records encoded afterwards.
    pub fn mask_token(&self) -> &MaskToken {
        &self.token
    }

    /// Number of unmaskable values met so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// A masker snapshot carrying the current token.
    pub fn masker(&self) -> Masker {
        Masker::from_parts(
            Arc::clone(&self.fields),
            self.token.get(),
            self.on_failure,
            self.max_depth,
            Arc::clone(&self.failures),
        )
    }

    /// Substitutes the value of one field using a masker snapshot taken with
    /// [`Redactor::masker`].
    ///
    /// - matching name: the mask token, whatever the value was
    /// - complex value: a [`PendingMask`] around it
    /// - anything else: unchanged
    pub fn redact_value(masker: &Masker, key: &str, value: FieldValue) -> FieldValue {
        if masker.fields().contains(key) {
            return FieldValue::Str(masker.token().to_owned());
        }
        match value {
            FieldValue::Structured(value) if value.is_complex() => {
                FieldValue::Pending(PendingMask::new(value, masker.clone()))
            }
            other => other,
        }
    }

    /// Substitutes the values of a record's fields, keeping order and keys.
    pub fn redact_fields(&self, fields: Vec<Field>) -> Vec<Field> {
        if fields.is_empty() || !self.is_active() {
            return fields;
        }
        let masker = self.masker();
        fields
            .into_iter()
            .map(|Field { key, value }| {
                let value = Self::redact_value(&masker, &key, value);
                Field { key, value }
            })
            .collect()
    }
}

/// An [`Encoder`] that masks sensitive fields before the wrapped encoder
/// sees them.
///
/// The wrapped encoder receives the same entry and the same field keys in
/// the same order; only values change. Complex values reach it as
/// [`FieldValue::Pending`] and are masked when it writes them.
#[derive(Clone, Debug)]
pub struct RedactingEncoder<E> {
    inner: E,
    redactor: Redactor,
}

impl<E: Encoder> RedactingEncoder<E> {
    pub fn new(inner: E, redactor: Redactor) -> Self {
        Self { inner, redactor }
    }

    pub fn from_config(inner: E, config: &RedactionConfig) -> Self {
        Self::new(inner, Redactor::from_config(config))
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Encoder> Encoder for RedactingEncoder<E> {
    fn encode_entry(&self, entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError> {
        let fields = self.redactor.redact_fields(fields);
        self.inner.encode_entry(entry, fields)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::{encoder::Level, value::StructuredValue};

    /// Records what the wrapped encoder was handed.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<Field>>,
    }

    impl Encoder for Recording {
        fn encode_entry(&self, _entry: &Entry, fields: Vec<Field>) -> Result<Vec<u8>, EncodeError> {
            self.seen.lock().unwrap().extend(fields);
            Ok(Vec::new())
        }
    }

    fn redactor() -> Redactor {
        Redactor::new(
            SensitiveFieldSet::new(["password", "token"]),
            MaskToken::new("***"),
        )
    }

    fn encode(redactor: Redactor, fields: Vec<Field>) -> Vec<Field> {
        let encoder = RedactingEncoder::new(Recording::default(), redactor);
        encoder
            .encode_entry(&Entry::new(Level::Info, "m"), fields)
            .unwrap();
        encoder.into_inner().seen.into_inner().unwrap()
    }

    #[test]
    fn masks_matching_scalar_fields() {
        let seen = encode(
            redactor(),
            vec![Field::str("user", "ada"), Field::str("Password", "pw"), Field::i64("token", 5)],
        );
        let keys: Vec<_> = seen.iter().map(Field::key).collect();
        assert_eq!(keys, ["user", "Password", "token"]);
        assert!(matches!(&seen[0].value, FieldValue::Str(s) if s == "ada"));
        assert!(matches!(&seen[1].value, FieldValue::Str(s) if s == "***"));
        assert!(matches!(&seen[2].value, FieldValue::Str(s) if s == "***"));
    }

    #[test]
    fn wraps_complex_fields() {
        let seen = encode(
            redactor(),
            vec![Field::structured("login", json!({"password": "pw"}))],
        );
        let FieldValue::Pending(pending) = &seen[0].value else {
            panic!("expected pending value, got {:?}", seen[0].value);
        };
        assert_eq!(pending.to_json().unwrap(), json!({"password": "***"}));
    }

    #[test]
    fn matching_complex_field_is_masked_whole() {
        let seen = encode(
            redactor(),
            vec![Field::structured("token", json!({"a": 1}))],
        );
        assert!(matches!(&seen[0].value, FieldValue::Str(s) if s == "***"));
    }

    #[test]
    fn scalar_structured_values_are_not_wrapped() {
        let seen = encode(redactor(), vec![Field::structured("n", json!(3))]);
        assert!(matches!(
            &seen[0].value,
            FieldValue::Structured(StructuredValue::Scalar(_))
        ));
    }

    #[test]
    fn bytes_are_never_inspected() {
        let seen = encode(
            redactor(),
            vec![Field::bytes("raw", b"{\"password\":\"pw\"}".to_vec())],
        );
        assert!(matches!(&seen[0].value, FieldValue::Bytes(b) if b.starts_with(b"{\"password\"")));
    }

    #[test]
    fn passthrough_forwards_unchanged() {
        let seen = encode(
            Redactor::passthrough(),
            vec![Field::str("password", "pw"), Field::structured("o", json!({"token": 1}))],
        );
        assert!(matches!(&seen[0].value, FieldValue::Str(s) if s == "pw"));
        assert!(matches!(&seen[1].value, FieldValue::Structured(_)));
    }

    #[test]
    fn empty_field_set_is_inactive() {
        let r = Redactor::new(SensitiveFieldSet::default(), MaskToken::default());
        assert!(!r.is_active());
        let seen = encode(r, vec![Field::structured("o", json!({"password": 1}))]);
        assert!(matches!(&seen[0].value, FieldValue::Structured(_)));
    }

    #[test]
    fn redact_value_follows_the_snapshot() {
        let r = redactor();
        let masker = r.masker();
        r.mask_token().set("[later]");

        let masked = Redactor::redact_value(&masker, "TOKEN", FieldValue::I64(1));
        assert!(matches!(masked, FieldValue::Str(ref s) if s == "***"));

        let nested = Redactor::redact_value(&masker, "o", FieldValue::Structured(json!({"token": 1}).into()));
        let FieldValue::Pending(pending) = &nested else {
            panic!("expected pending value, got {nested:?}");
        };
        assert_eq!(pending.to_json().unwrap(), json!({"token": "***"}));
        assert!(matches!(
            Redactor::redact_value(&r.masker(), "token", FieldValue::Null),
            FieldValue::Str(ref s) if s == "[later]"
        ));
    }

    #[test]
    fn token_is_read_per_record() {
        let r = redactor();
        let encoder = RedactingEncoder::new(Recording::default(), r.clone());
        let entry = Entry::new(Level::Info, "m");

        encoder.encode_entry(&entry, vec![Field::structured("o", json!({"password": 1}))]).unwrap();
        r.mask_token().set("[gone]");
        encoder.encode_entry(&entry, vec![Field::structured("o", json!({"password": 1}))]).unwrap();

        let seen = encoder.into_inner().seen.into_inner().unwrap();
        let rendered: Vec<_> = seen
            .iter()
            .map(|field| match &field.value {
                FieldValue::Pending(p) => p.to_json().unwrap(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(rendered, [json!({"password": "***"}), json!({"password": "[gone]"})]);
    }
}
