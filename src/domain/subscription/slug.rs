//! URL-safe tenant slug value object.

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 30;

/// Public identifier carried in per-table ordering links.
///
/// 3 to 30 characters of `[a-z0-9_-]`, starting and ending alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validates a caller-chosen slug. Input is lowercased first.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let slug = raw.trim().to_ascii_lowercase();
        if slug.is_empty() {
            return Err(ValidationError::empty_field("slug"));
        }
        let len = slug.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(ValidationError::out_of_range(
                "slug",
                MIN_LEN as i64,
                MAX_LEN as i64,
                len as i64,
            ));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "slug",
                "only lowercase letters, digits, '-' and '_' are allowed",
            ));
        }
        let alnum = |c: Option<char>| c.map_or(false, |c| c.is_ascii_alphanumeric());
        if !alnum(slug.chars().next()) || !alnum(slug.chars().last()) {
            return Err(ValidationError::invalid_format(
                "slug",
                "must start and end with a letter or digit",
            ));
        }
        Ok(Self(slug))
    }

    /// Derives a slug from a restaurant name: runs of other characters
    /// collapse to a single `-`.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        let mut out = String::with_capacity(name.len());
        for c in name.to_lowercase().chars() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                out.push(c);
            } else if !out.ends_with('-') {
                out.push('-');
            }
        }
        let trimmed: String = out.trim_matches('-').chars().take(MAX_LEN).collect();
        Self::parse(trimmed.trim_end_matches('-'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Slug::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_slugs() {
        for s in ["abc", "spice-route", "cafe_42", "a1b"] {
            assert!(Slug::parse(s).is_ok(), "{} should be valid", s);
        }
    }

    #[test]
    fn lowercases_input() {
        assert_eq!(Slug::parse("Spice-Route").unwrap().as_str(), "spice-route");
    }

    #[test]
    fn rejects_bad_edges_and_characters() {
        for s in ["-abc", "abc_", "ab", "has space", "caf\u{e9}s"] {
            assert!(Slug::parse(s).is_err(), "{} should be rejected", s);
        }
    }

    #[test]
    fn rejects_over_thirty_chars() {
        let long = "a".repeat(31);
        assert!(matches!(
            Slug::parse(&long),
            Err(ValidationError::OutOfRange { actual: 31, .. })
        ));
    }

    #[test]
    fn generates_from_name() {
        let slug = Slug::from_name("The Spice Route!! Cafe").unwrap();
        assert_eq!(slug.as_str(), "the-spice-route-cafe");
    }

    #[test]
    fn generated_slug_never_ends_with_separator_after_truncation() {
        let slug = Slug::from_name("abcdefghijklmnopqrstuvwxyz123 restaurant").unwrap();
        assert!(slug.as_str().len() <= 30);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn name_without_usable_characters_fails() {
        assert!(Slug::from_name("!!!").is_err());
    }
}
