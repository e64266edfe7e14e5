//! Locale-aware ordering for display names.
//!
//! Names compare first ignoring case and accents, then with accents, then by
//! raw code points, so `"Flabébé"` sorts next to `"flabebe"` instead of after
//! every ASCII name.
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Precomputed sort key. Derived `Ord` compares the levels in field order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: String,
    secondary: String,
    tertiary: Vec<(bool, char)>,
}

impl CollationKey {
    pub fn new(s: &str) -> Self {
        let primary = s
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect();
        let secondary = s.nfd().flat_map(char::to_lowercase).collect();
        // Lowercase sorts before uppercase at the last level
        let tertiary = s.chars().map(|c| (c.is_uppercase(), c)).collect();
        Self {
            primary,
            secondary,
            tertiary,
        }
    }
}
