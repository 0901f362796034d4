use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical `@`-prefixed identifier for boundaries, components, threats and relations.
///
/// The empty identifier is a sentinel meaning "not specified".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// The "not specified" sentinel
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Wrap a string without normalizing it
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `@` followed by ASCII letters, digits or underscores
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0
            .strip_prefix('@')
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(text: &str) -> Self {
        normalize(text)
    }
}

/// Turn display text into a stable identifier.
///
/// Text starting with `@` is taken as an explicit identifier and returned as is.
/// Otherwise everything except ASCII letters, digits and spaces is dropped, runs of
/// whitespace become a single `_`, and the result is lowercased behind an `@`.
#[must_use]
pub fn normalize(text: &str) -> Id {
    if text.is_empty() {
        return Id::empty();
    }
    if text.starts_with('@') {
        return Id(text.to_string());
    }
    slugify(text)
}

/// Identifier for relation description text. An explicit `@` identifier is kept
/// only when it is well formed; anything else is slugged like display text.
#[must_use]
pub fn relation_id(text: &str) -> Id {
    let id = normalize(text);
    if id.is_empty() || id.is_well_formed() {
        id
    } else {
        slugify(text)
    }
}

fn slugify(text: &str) -> Id {
    let mut slug = String::with_capacity(text.len() + 1);
    slug.push('@');
    let mut in_space = false;
    for c in text.chars() {
        if c == ' ' {
            in_space = true;
        } else if c.is_ascii_alphanumeric() {
            if in_space {
                slug.push('_');
                in_space = false;
            }
            slug.push(c.to_ascii_lowercase());
        }
    }
    if in_space {
        slug.push('_');
    }
    Id(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_punctuation_and_lowercases() {
        assert_eq!(normalize("SQL Injection!!").as_str(), "@sql_injection");
        assert_eq!(normalize("sql injection"), normalize("SQL Injection!!"));
        assert_eq!(normalize("Web  Server").as_str(), "@web_server");
    }

    #[test]
    fn punctuation_between_spaces_collapses_to_one_underscore() {
        assert_eq!(normalize("Auth - Service").as_str(), "@auth_service");
        assert_eq!(normalize("a\tb").as_str(), "@ab");
    }

    #[test]
    fn explicit_identifier_is_kept() {
        assert_eq!(normalize("@db").as_str(), "@db");
        assert_eq!(normalize("@Mixed_Case").as_str(), "@Mixed_Case");
    }

    #[test]
    fn empty_text_is_the_sentinel() {
        assert!(normalize("").is_empty());
        assert_eq!(normalize(""), Id::empty());
    }

    #[test]
    fn surrounding_spaces_are_kept_as_underscores() {
        assert_eq!(normalize(" db ").as_str(), "@_db_");
    }

    #[test]
    fn relation_ids_are_always_well_formed() {
        assert_eq!(relation_id("@html_escape").as_str(), "@html_escape");
        assert_eq!(relation_id("@html-escape").as_str(), "@htmlescape");
        assert_eq!(relation_id("@@").as_str(), "@");
        assert_eq!(relation_id("Output Escaping"), normalize("output escaping"));
    }

    #[test]
    fn well_formed_check() {
        assert!(normalize("Database").is_well_formed());
        assert!(Id::new_unchecked("@A_1").is_well_formed());
        assert!(!Id::new_unchecked("db").is_well_formed());
        assert!(!Id::new_unchecked("@d-b").is_well_formed());
    }

    proptest! {
        #[test]
        fn proptest_normalize_is_deterministic(text in ".{0,48}") {
            prop_assert_eq!(normalize(&text), normalize(&text));
        }

        #[test]
        fn proptest_normalize_is_idempotent(text in "[A-Za-z0-9 !?.,-]{1,48}") {
            let once = normalize(&text);
            prop_assert_eq!(normalize(once.as_str()), once.clone());
            prop_assert!(once.is_well_formed());
        }

        #[test]
        fn proptest_normalize_ignores_case(text in "[A-Za-z ]{1,32}") {
            prop_assert_eq!(normalize(&text.to_uppercase()), normalize(&text.to_lowercase()));
        }
    }
}
