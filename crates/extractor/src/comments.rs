//! Comment text cleanup and association.

use crate::language::Language;

const PREFIXES: &[&str] = &["///", "//!", "//", "/**", "/*", "#", "\"\"\"", "'''"];
const SUFFIXES: &[&str] = &["*/", "\"\"\"", "'''"];

/// Remove comment markers from one line of comment text
pub fn strip_markers(line: &str) -> &str {
    let mut text = line.trim();
    if let Some(rest) = PREFIXES.iter().find_map(|p| text.strip_prefix(*p)) {
        text = rest;
    }
    if let Some(rest) = SUFFIXES.iter().find_map(|s| text.strip_suffix(*s)) {
        text = rest;
    }
    let text = text.trim();
    // block comment continuation
    text.strip_prefix('*').map_or(text, str::trim_start)
}

/// Strip every line of a raw comment and append it to `out`
pub fn push_stripped(out: &mut String, raw: &str) {
    for line in raw.lines() {
        let text = strip_markers(line);
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(text);
    }
}

/// The contiguous comment block directly above `row` (0-indexed), stripped.
///
/// Attribute and decorator lines between the comments and the declaration are
/// skipped; a blank line or code ends the block.
pub fn comment_above(lines: &[&str], row: usize, language: Language) -> String {
    let mut collected = Vec::new();
    let mut in_block = false;
    let mut idx = row.min(lines.len());

    while idx > 0 {
        idx -= 1;
        let line = lines[idx].trim();

        if in_block {
            collected.push(line);
            if line.starts_with("/*") {
                in_block = false;
            }
            continue;
        }

        if line.is_empty() {
            break;
        }

        if language.has_block_comments() && line.ends_with("*/") {
            collected.push(line);
            in_block = !line.starts_with("/*");
        } else if language.is_comment_line(line) {
            collected.push(line);
        } else if !language.is_attribute_line(line) {
            break;
        }
    }

    collected.reverse();
    let mut out = String::new();
    for line in collected {
        push_stripped(&mut out, line);
    }
    out
}
