//! Sentence matcher for annotation lines.
//!
//! Five sentence forms are recognised, case-insensitively, in this priority order:
//!
//! ```text
//! alias <boundary|component|threat> @id to <text>
//! mitigates [<boundary>:]<component> against <threat> with <text> [(<ref>)]
//! exposes [<boundary>:]<component> to <threat> with <text> [(<ref>)]
//! transfers <threat> to [<boundary>:]<component> with <text> [(<ref>)]
//! accepts <threat> to [<boundary>:]<component> with <text> [(<ref>)]
//! ```
//!
//! Separator words are matched as whole words at their first occurrence after the
//! preceding field, so the free-text tail may itself contain `with`, `to` and so on.

use crate::id::Id;
use crate::model::RelationKind;
use serde::{Deserialize, Serialize};

/// Category an alias binds its identifier to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasClass {
    Boundary,
    Component,
    Threat,
}

impl AliasClass {
    fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("boundary") {
            Some(Self::Boundary)
        } else if word.eq_ignore_ascii_case("component") {
            Some(Self::Component)
        } else if word.eq_ignore_ascii_case("threat") {
            Some(Self::Threat)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boundary => "boundary",
            Self::Component => "component",
            Self::Threat => "threat",
        }
    }
}

/// `alias <class> <id> to <text>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasStatement {
    pub class: AliasClass,
    pub id: Id,
    pub text: String,
}

/// Fields shared by the four relation sentences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationStatement {
    /// Unset when the sentence has no `boundary:` prefix
    pub boundary: Option<String>,
    pub component: String,
    pub threat: String,
    /// The free-text control/weakness description
    pub text: String,
    pub reference: Option<String>,
}

/// A recognised annotation sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Alias(AliasStatement),
    Mitigation(RelationStatement),
    Exposure(RelationStatement),
    Transfer(RelationStatement),
    Acceptance(RelationStatement),
}

impl Statement {
    /// Relation kind and fields, `None` for aliases
    #[must_use]
    pub fn as_relation(&self) -> Option<(RelationKind, &RelationStatement)> {
        match self {
            Self::Alias(_) => None,
            Self::Mitigation(r) => Some((RelationKind::Mitigation, r)),
            Self::Exposure(r) => Some((RelationKind::Exposure, r)),
            Self::Transfer(r) => Some((RelationKind::Transfer, r)),
            Self::Acceptance(r) => Some((RelationKind::Acceptance, r)),
        }
    }
}

/// Match a line against all five grammars; the first match wins.
#[must_use]
pub fn parse_line(line: &str) -> Option<Statement> {
    if let Some(alias) = parse_alias(line) {
        return Some(Statement::Alias(alias));
    }
    parse_relation(line)
}

/// Match a line against the four relation grammars only.
#[must_use]
pub fn parse_relation(line: &str) -> Option<Statement> {
    parse_mitigation(line)
        .map(Statement::Mitigation)
        .or_else(|| parse_exposure(line).map(Statement::Exposure))
        .or_else(|| parse_transfer(line).map(Statement::Transfer))
        .or_else(|| parse_acceptance(line).map(Statement::Acceptance))
}

#[must_use]
pub fn parse_alias(line: &str) -> Option<AliasStatement> {
    let rest = strip_keyword(line, "alias")?.trim_start();
    let (class_word, rest) = next_word(rest)?;
    let class = AliasClass::from_keyword(class_word)?;

    let (id_word, rest) = next_word(rest.trim_start())?;
    let id = Id::new_unchecked(id_word);
    if id.as_str().len() < 2 || !id.is_well_formed() {
        return None;
    }

    let text = strip_keyword(rest, "to")?.trim();
    if text.is_empty() {
        return None;
    }

    Some(AliasStatement {
        class,
        id,
        text: text.to_string(),
    })
}

/// `mitigates [<boundary>:]<component> against <threat> with <text> [(<ref>)]`
#[must_use]
pub fn parse_mitigation(line: &str) -> Option<RelationStatement> {
    let rest = strip_keyword(line, "mitigates")?;
    let (target, rest) = split_word(rest, "against")?;
    let (threat, rest) = split_word(rest, "with")?;
    relation(target, threat, rest)
}

/// `exposes [<boundary>:]<component> to <threat> with <text> [(<ref>)]`
#[must_use]
pub fn parse_exposure(line: &str) -> Option<RelationStatement> {
    let rest = strip_keyword(line, "exposes")?;
    let (target, rest) = split_word(rest, "to")?;
    let (threat, rest) = split_word(rest, "with")?;
    relation(target, threat, rest)
}

/// `transfers <threat> to [<boundary>:]<component> with <text> [(<ref>)]`
#[must_use]
pub fn parse_transfer(line: &str) -> Option<RelationStatement> {
    let rest = strip_keyword(line, "transfers")?;
    let (threat, rest) = split_word(rest, "to")?;
    let (target, rest) = split_word(rest, "with")?;
    relation(target, threat, rest)
}

/// `accepts <threat> to [<boundary>:]<component> with <text> [(<ref>)]`
#[must_use]
pub fn parse_acceptance(line: &str) -> Option<RelationStatement> {
    let rest = strip_keyword(line, "accepts")?;
    let (threat, rest) = split_word(rest, "to")?;
    let (target, rest) = split_word(rest, "with")?;
    relation(target, threat, rest)
}

fn relation(target: &str, threat: &str, tail: &str) -> Option<RelationStatement> {
    let (boundary, component) = split_boundary(target);
    let (text, reference) = split_reference(tail);
    if component.is_empty() || threat.is_empty() || text.is_empty() {
        return None;
    }
    let fields = [boundary.unwrap_or(""), component, threat];
    if !fields.iter().all(|field| names_valid_id(field)) {
        return None;
    }

    Some(RelationStatement {
        boundary: boundary.map(str::to_string),
        component: component.to_string(),
        threat: threat.to_string(),
        text: text.to_string(),
        reference: reference.map(str::to_string),
    })
}

/// Display text, or an explicit `@identifier` that is well formed
fn names_valid_id(field: &str) -> bool {
    !field.starts_with('@') || Id::new_unchecked(field).is_well_formed()
}

/// Leading keyword followed by at least one whitespace character
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let line = line.trim_start();
    let head = line.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &line[keyword.len()..];
    rest.starts_with(char::is_whitespace).then_some(rest)
}

/// Word up to (not including) the next whitespace; something must follow it
fn next_word(text: &str) -> Option<(&str, &str)> {
    let end = text.find(char::is_whitespace)?;
    Some((&text[..end], &text[end..]))
}

/// Split at the first whitespace-delimited occurrence of `word` that has a
/// non-blank field in front of it. Returns the trimmed field and the remainder.
fn split_word<'a>(text: &'a str, word: &str) -> Option<(&'a str, &'a str)> {
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find(word) {
        let start = from + pos;
        let end = start + word.len();
        let before = &text[..start];
        let after = &text[end..];
        if before.ends_with(char::is_whitespace)
            && after.starts_with(char::is_whitespace)
            && !before.trim().is_empty()
        {
            return Some((before.trim(), after));
        }
        from = start + 1;
    }
    None
}

/// `boundary:component` with the boundary optional; a blank boundary counts as unset
fn split_boundary(target: &str) -> (Option<&str>, &str) {
    match target.split_once(':') {
        Some((boundary, component)) => {
            let boundary = boundary.trim();
            let component = component.trim();
            if boundary.is_empty() {
                (None, component)
            } else {
                (Some(boundary), component)
            }
        }
        None => (None, target.trim()),
    }
}

/// Peel a trailing `( … )` note off the description. The description is the
/// shortest non-empty prefix, so the note runs from the first `(` after it to the
/// final `)`.
fn split_reference(tail: &str) -> (&str, Option<&str>) {
    let tail = tail.trim();
    if !tail.ends_with(')') {
        return (tail, None);
    }

    let Some(open) = tail
        .char_indices()
        .skip(1)
        .find_map(|(idx, c)| (c == '(').then_some(idx))
    else {
        return (tail, None);
    };

    let text = tail[..open].trim_end();
    let note = tail[open + 1..tail.len() - 1].trim();
    (text, (!note.is_empty()).then_some(note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rel(boundary: Option<&str>, component: &str, threat: &str, text: &str) -> RelationStatement {
        RelationStatement {
            boundary: boundary.map(str::to_string),
            component: component.to_string(),
            threat: threat.to_string(),
            text: text.to_string(),
            reference: None,
        }
    }

    #[test]
    fn parses_alias() {
        let stmt = parse_line("alias component @db to Database Server ").unwrap();
        assert_eq!(
            stmt,
            Statement::Alias(AliasStatement {
                class: AliasClass::Component,
                id: Id::new_unchecked("@db"),
                text: "Database Server".to_string(),
            })
        );
    }

    #[test]
    fn alias_is_case_insensitive_and_rejects_bad_ids() {
        let alias = parse_alias("  ALIAS Threat @xss To Cross Site Scripting").unwrap();
        assert_eq!(alias.class, AliasClass::Threat);
        assert_eq!(alias.id.as_str(), "@xss");

        assert!(parse_alias("alias component db to Database").is_none());
        assert!(parse_alias("alias component @d-b to Database").is_none());
        assert!(parse_alias("alias widget @db to Database").is_none());
        assert!(parse_alias("alias component @db to   ").is_none());
    }

    #[test]
    fn parses_mitigation_with_boundary_and_reference() {
        let stmt = parse_mitigation(
            "Mitigates Internet:Web Server against XSS with output escaping (OWASP A7)",
        )
        .unwrap();
        assert_eq!(stmt.boundary.as_deref(), Some("Internet"));
        assert_eq!(stmt.component, "Web Server");
        assert_eq!(stmt.threat, "XSS");
        assert_eq!(stmt.text, "output escaping");
        assert_eq!(stmt.reference.as_deref(), Some("OWASP A7"));
    }

    #[test]
    fn boundary_is_unset_without_prefix() {
        let stmt = parse_mitigation("mitigates Database against SQL Injection with parameterized queries")
            .unwrap();
        assert_eq!(stmt, rel(None, "Database", "SQL Injection", "parameterized queries"));
    }

    #[test]
    fn blank_boundary_counts_as_unset() {
        let stmt = parse_exposure("exposes :Database to Leak with verbose errors").unwrap();
        assert_eq!(stmt.boundary, None);
        assert_eq!(stmt.component, "Database");
    }

    #[test]
    fn parses_exposure_with_free_text_containing_separators() {
        let stmt = parse_exposure("exposes Database to SQL Injection with input passed to a query with concat")
            .unwrap();
        assert_eq!(stmt.threat, "SQL Injection");
        assert_eq!(stmt.text, "input passed to a query with concat");
    }

    #[test]
    fn parses_transfer_and_acceptance() {
        let transfer = parse_transfer("transfers DoS to Edge:CDN with rate limiting by provider").unwrap();
        assert_eq!(transfer, rel(Some("Edge"), "CDN", "DoS", "rate limiting by provider"));

        let acceptance = parse_acceptance("Accepts Information Disclosure to Logs with debug output").unwrap();
        assert_eq!(acceptance, rel(None, "Logs", "Information Disclosure", "debug output"));
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let stmt = parse_mitigation("   mitigates   Database    against  SQLi   with   escaping   ").unwrap();
        assert_eq!(stmt, rel(None, "Database", "SQLi", "escaping"));
    }

    #[test]
    fn reference_keeps_nested_parentheses() {
        let stmt = parse_mitigation("mitigates A against B with C (see f(x) notes)").unwrap();
        assert_eq!(stmt.text, "C");
        assert_eq!(stmt.reference.as_deref(), Some("see f(x) notes"));
    }

    #[test]
    fn reference_starts_at_first_parenthesis() {
        let stmt = parse_exposure("exposes A to B with C (a) (b)").unwrap();
        assert_eq!(stmt.text, "C");
        assert_eq!(stmt.reference.as_deref(), Some("a) (b"));

        let stmt = parse_exposure("exposes A to B with C ()").unwrap();
        assert_eq!(stmt.text, "C");
        assert_eq!(stmt.reference, None);
    }

    #[test]
    fn malformed_explicit_ids_do_not_match() {
        assert!(parse_exposure("exposes @web-server to XSS with raw templates").is_none());
        assert!(parse_exposure("exposes Web to @x-s-s with raw templates").is_none());
        assert!(parse_mitigation("mitigates @dmz!:Web against XSS with escaping").is_none());
        assert!(parse_transfer("transfers XSS to @ to with a CDN").is_none());

        let stmt = parse_exposure("exposes @dmz:@web_server to XSS with @html-escape").unwrap();
        assert_eq!(stmt.boundary.as_deref(), Some("@dmz"));
        assert_eq!(stmt.component, "@web_server");
        assert_eq!(stmt.text, "@html-escape");
    }

    #[test]
    fn parenthesised_text_alone_is_the_description() {
        let stmt = parse_mitigation("mitigates A against B with (nothing else)").unwrap();
        assert_eq!(stmt.text, "(nothing else)");
        assert_eq!(stmt.reference, None);
    }

    #[test]
    fn separator_words_must_be_whole_words() {
        // "tokens" contains "to" but is not the separator
        let stmt = parse_exposure("exposes Session tokens to Theft with cookies").unwrap();
        assert_eq!(stmt.component, "Session tokens");
        assert_eq!(stmt.threat, "Theft");
    }

    #[test]
    fn ordinary_prose_is_not_a_statement() {
        assert!(parse_line("This function mitigates nothing in particular").is_none());
        assert!(parse_line("mitigates Database against SQLi").is_none());
        assert!(parse_line("exposes").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("mitigatesDatabase against X with Y").is_none());
    }

    #[test]
    fn priority_order_picks_the_first_grammar() {
        assert!(matches!(
            parse_line("alias boundary @net to Internet"),
            Some(Statement::Alias(_))
        ));
        assert!(matches!(
            parse_line("transfers X to Y with Z"),
            Some(Statement::Transfer(_))
        ));
        assert!(matches!(
            parse_line("accepts X to Y with Z"),
            Some(Statement::Acceptance(_))
        ));
        assert!(parse_relation("alias boundary @net to Internet").is_none());
    }

    #[test]
    fn as_relation_reports_kind() {
        let stmt = parse_line("exposes A to B with C").unwrap();
        let (kind, fields) = stmt.as_relation().unwrap();
        assert_eq!(kind, RelationKind::Exposure);
        assert_eq!(fields.component, "A");
    }
}
