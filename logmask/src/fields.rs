//! Case-insensitive set of sensitive field names.

use std::{borrow::Cow, collections::HashSet};

/// The field names whose values must never reach log output.
///
/// Names are stored case-folded and matched case-insensitively, including
/// names whose case forms differ in length (`straße` matches `STRASSE`).
/// Empty names are dropped at construction since no real field can match
/// them, and duplicates collapse.
///
/// ```
/// use logmask::SensitiveFieldSet;
///
/// let fields = SensitiveFieldSet::new(["Password", "api_key"]);
/// assert!(fields.contains("PASSWORD"));
/// assert!(fields.contains("Api_Key"));
/// assert!(!fields.contains("username"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SensitiveFieldSet {
    names: HashSet<String>,
}

impl SensitiveFieldSet {
    /// Builds a set from configured field names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .filter(|name| !name.as_ref().is_empty())
            .map(|name| fold_case(name.as_ref()).into_owned())
            .collect();
        Self { names }
    }

    /// Returns `true` if `name` matches a configured field, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        if name.is_empty() || self.names.is_empty() {
            return false;
        }
        self.names.contains(fold_case(name).as_ref())
    }

    /// Number of distinct names in the set.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over the stored (case-folded) names in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SensitiveFieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// Upper-casing first expands characters such as `ß` and `ﬁ` into the same
// sequence their upper-case form lowers to. Lower-case ASCII names, the
// common case, are borrowed.
fn fold_case(name: &str) -> Cow<'_, str> {
    if name.is_ascii() {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(name.to_ascii_lowercase())
        } else {
            Cow::Borrowed(name)
        }
    } else {
        Cow::Owned(name.to_uppercase().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle_case(name: &str) -> String {
        name.chars()
            .flat_map(|ch| {
                if ch.is_uppercase() {
                    ch.to_lowercase().collect::<Vec<_>>()
                } else {
                    ch.to_uppercase().collect::<Vec<_>>()
                }
            })
            .collect()
    }

    #[test]
    fn lookup_ignores_case() {
        let fields = SensitiveFieldSet::new(["password", "Token", "ПАРОЛЬ", "x-api-key", "straße"]);
        for name in [
            "password", "PassWord", "token", "TOKEN", "пароль", "X-Api-Key", "straße", "STRASSE",
        ] {
            assert!(fields.contains(name), "{name} should match");
            assert_eq!(fields.contains(name), fields.contains(&toggle_case(name)));
        }
    }

    #[test]
    fn lookup_survives_length_changing_case() {
        let fields = SensitiveFieldSet::new(["straße", "ΣΟΦΊΑ"]);
        for name in ["straße", "STRASSE", "Strasse", "σοφία", "Σοφία"] {
            assert!(fields.contains(name), "{name} should match");
            assert!(fields.contains(&toggle_case(name)), "{name} toggled should match");
        }

        let upper = SensitiveFieldSet::new(["STRASSE"]);
        assert!(upper.contains("straße"));
        assert!(!upper.contains("strase"));
    }

    #[test]
    fn toggled_case_agrees_for_non_members() {
        let fields = SensitiveFieldSet::new(["password"]);
        for name in ["user", "Address", "pass", "passwords", "ÄÖÜ"] {
            assert!(!fields.contains(name));
            assert!(!fields.contains(&toggle_case(name)));
        }
    }

    #[test]
    fn empty_names_are_ignored() {
        let fields = SensitiveFieldSet::new(["", "secret", ""]);
        assert_eq!(fields.len(), 1);
        assert!(!fields.contains(""));
    }

    #[test]
    fn duplicates_collapse() {
        let fields: SensitiveFieldSet = ["token", "TOKEN", "Token"].into_iter().collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.iter().collect::<Vec<_>>(), vec!["token"]);
    }

    #[test]
    fn empty_set_matches_nothing() {
        let fields = SensitiveFieldSet::new(Vec::<String>::new());
        assert!(fields.is_empty());
        assert!(!fields.contains("password"));
    }

    #[test]
    fn fold_case_borrows_lower_case_ascii() {
        assert!(matches!(fold_case("api_key"), Cow::Borrowed(_)));
        assert!(matches!(fold_case("Api_Key"), Cow::Owned(ref s) if s == "api_key"));
        assert_eq!(fold_case("clé"), "clé");
        assert_eq!(fold_case("Straße"), "strasse");
    }
}
