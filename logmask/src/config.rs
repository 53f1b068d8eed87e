//! Redaction configuration for one output target.

use serde::{Deserialize, Serialize};

use crate::{
    encoder::Redactor,
    masker::{DEFAULT_MAX_DEPTH, OnMaskFailure},
};

/// Settings for masking one output target.
///
/// Deserializes from any serde format; missing keys take their defaults.
///
/// ```
/// use logmask::{OnMaskFailure, RedactionConfig};
///
/// let config: RedactionConfig = serde_json::from_str(
///     r#"{"sensitive_fields": ["password", "ssn"], "on_failure": "mask"}"#,
/// )
/// .unwrap();
/// assert!(config.enabled);
/// assert_eq!(config.on_failure, OnMaskFailure::Mask);
/// assert!(config.build().fields().contains("SSN"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// When `false`, records pass through untouched.
    pub enabled: bool,
    /// Field names to mask, matched case-insensitively.
    pub sensitive_fields: Vec<String>,
    /// A token owned by this target. `None` shares [`crate::MaskToken::global`].
    pub mask_token: Option<String>,
    pub on_failure: OnMaskFailure,
    pub max_depth: usize,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitive_fields: Vec::new(),
            mask_token: None,
            on_failure: OnMaskFailure::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RedactionConfig {
    pub fn new<I, S>(sensitive_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sensitive_fields: sensitive_fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A configuration that masks nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mask_token(mut self, token: impl Into<String>) -> Self {
        self.mask_token = Some(token.into());
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

    pub fn build(&self) -> Redactor {
        Redactor::from_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MaskToken;

    #[test]
    fn empty_document_uses_defaults() {
        let config: RedactionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RedactionConfig::default());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.on_failure, OnMaskFailure::Reject);
    }

    #[test]
    fn parses_every_policy_name() {
        for (name, policy) in [
            ("reject", OnMaskFailure::Reject),
            ("mask", OnMaskFailure::Mask),
            ("pass_through", OnMaskFailure::PassThrough),
        ] {
            let doc = format!(r#"{{"on_failure": "{name}"}}"#);
            let config: RedactionConfig = serde_json::from_str(&doc).unwrap();
            assert_eq!(config.on_failure, policy);
        }
    }

    #[test]
    fn without_token_shares_global_cell() {
        let redactor = RedactionConfig::new(["password"]).build();
        assert!(redactor.mask_token().shares_cell_with(MaskToken::global()));
    }

    #[test]
    fn own_token_is_private() {
        let redactor = RedactionConfig::new(["password"]).with_mask_token("<x>").build();
        assert!(!redactor.mask_token().shares_cell_with(MaskToken::global()));
        assert_eq!(*redactor.mask_token().get(), "<x>");
    }

    #[test]
    fn disabled_builds_inactive_redactor() {
        let mut config = RedactionConfig::disabled();
        config.sensitive_fields.push("password".into());
        assert!(!config.build().is_active());
    }

    #[test]
    fn builder_carries_policy() {
        let config = RedactionConfig::new(["a"])
            .with_failure_policy(OnMaskFailure::PassThrough)
            .with_max_depth(3);
        assert_eq!(config.on_failure, OnMaskFailure::PassThrough);
        assert_eq!(config.max_depth, 3);
        assert!(config.build().is_active());
    }
}
