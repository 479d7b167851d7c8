// Free-text name parsing.
//
// Sheet cells hold human-typed names in two conventions: "Last, First" and
// "First [Middle ...] Last". The parser never fails -- the source data is
// decades of hand-maintained sheets, and a malformed cell must degrade to a
// partial name rather than abort the batch.

use serde::Serialize;

/// A name split into first/last parts, with the verbatim source text kept
/// for diagnostics. `original` is never mutated after construction;
/// `first_name`/`last_name` derive deterministically from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    pub first_name: String,
    pub last_name: String,
    pub original: String,
}

impl ParsedName {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_empty() && self.last_name.is_empty()
    }
}

impl std::fmt::Display for ParsedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.original.trim())
    }
}

/// Parse a free-text name cell.
///
/// - A comma means "Last, First": the left side (trimmed) is the last name,
///   the right side the first name. Only the first comma is significant.
/// - Otherwise tokens are "First [Middle ...] Last": the final token is the
///   last name, everything before it (joined by single spaces) the first.
/// - A single token is a bare first name; empty input yields an all-empty
///   name. No input is an error.
pub fn parse_name(text: &str) -> ParsedName {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedName {
            first_name: String::new(),
            last_name: String::new(),
            original: trimmed.to_string(),
        };
    }

    if let Some((last, first)) = trimmed.split_once(',') {
        return ParsedName {
            first_name: first.trim().to_string(),
            last_name: last.trim().to_string(),
            original: trimmed.to_string(),
        };
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    match tokens.as_slice() {
        [only] => ParsedName {
            first_name: (*only).to_string(),
            last_name: String::new(),
            original: trimmed.to_string(),
        },
        [firsts @ .., last] => ParsedName {
            first_name: firsts.join(" "),
            last_name: (*last).to_string(),
            original: trimmed.to_string(),
        },
        [] => unreachable!("non-empty trimmed text always has at least one token"),
    }
}
