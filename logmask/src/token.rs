//! The shared mask token.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use arc_swap::ArcSwap;

/// Token written in place of every sensitive value unless configured otherwise.
pub const DEFAULT_MASK_TOKEN: &str = "***";

/// A shared, replaceable mask token.
///
/// Clones share the same cell: a [`MaskToken::set`] on one handle is seen by
/// every other handle. Readers always observe a complete token, either the one
/// before or the one after a concurrent `set`.
#[derive(Clone)]
pub struct MaskToken {
    inner: Arc<ArcSwap<String>>,
}

impl MaskToken {
    /// Creates a new, unshared token cell.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(token.into())),
        }
    }

    /// The process-wide token, initialised to [`DEFAULT_MASK_TOKEN`].
    ///
    /// Targets configured without their own token share this cell.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<MaskToken> = OnceLock::new();
        GLOBAL.get_or_init(Self::default)
    }

    /// Returns the current token.
    pub fn get(&self) -> Arc<String> {
        self.inner.load_full()
    }

    /// Replaces the token for every handle sharing this cell.
    pub fn set(&self, token: impl Into<String>) {
        self.inner.store(Arc::new(token.into()));
    }

    /// Returns `true` if both handles share one cell.
    pub fn shares_cell_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for MaskToken {
    fn default() -> Self {
        Self::new(DEFAULT_MASK_TOKEN)
    }
}

impl fmt::Debug for MaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MaskToken").field(&*self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn defaults_to_three_stars() {
        assert_eq!(*MaskToken::default().get(), "***");
    }

    #[test]
    fn clones_share_updates() {
        let token = MaskToken::new("[hidden]");
        let other = token.clone();
        other.set("###");
        assert_eq!(*token.get(), "###");
        assert!(token.shares_cell_with(&other));
        assert!(!token.shares_cell_with(&MaskToken::default()));
    }

    #[test]
    fn snapshot_is_not_rewritten_by_later_set() {
        let token = MaskToken::default();
        let before = token.get();
        token.set("changed");
        assert_eq!(*before, "***");
        assert_eq!(*token.get(), "changed");
    }

    #[test]
    fn concurrent_readers_see_whole_tokens() {
        let token = MaskToken::new("aaaaaaaa");
        let writer = {
            let token = token.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    token.set(if i % 2 == 0 { "bbbbbbbb" } else { "aaaaaaaa" });
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let token = token.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let seen = token.get();
                        assert!(*seen == "aaaaaaaa" || *seen == "bbbbbbbb");
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
