// Roster matching: pairing parsed sheet names with known league members.

pub mod corrections;

use serde::Serialize;

use crate::sheet::name::ParsedName;

use self::corrections::CorrectionTable;

/// A league member as returned by the roster query. The importer never
/// creates or mutates these; they come entirely from the users table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub preferred_name: Option<String>,
}

impl Candidate {
    /// One-line description for operator prompts, e.g.
    /// `Robert Jones (goes by Bob) [#42]`.
    pub fn describe(&self) -> String {
        match &self.preferred_name {
            Some(pref) if !pref.trim().is_empty() => format!(
                "{} {} (goes by {}) [#{}]",
                self.first_name, self.last_name, pref, self.id
            ),
            _ => format!("{} {} [#{}]", self.first_name, self.last_name, self.id),
        }
    }
}

/// Trim + lowercase, the normalization applied to every compared value.
fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Symmetric prefix match: either value may be a truncation of the other.
/// Tolerates "Rob" on the sheet for "Robert" in the roster and vice versa.
fn first_name_matches(query: &str, roster_value: &str) -> bool {
    if query.is_empty() || roster_value.is_empty() {
        return false;
    }
    query == roster_value || roster_value.starts_with(query) || query.starts_with(roster_value)
}

/// Find roster entries matching a parsed name.
///
/// The last name must match exactly (after normalization) -- no fuzziness,
/// since captains are identified by last name alone and collisions there are
/// rare. Given a last-name match, the first name matches on exact equality,
/// symmetric prefix, or the same tests against the preferred name.
///
/// Returns all matches. Zero or many is not an error here; ambiguity is the
/// resolver's job.
pub fn find_candidates(first_name: &str, last_name: &str, roster: &[Candidate]) -> Vec<Candidate> {
    let first = norm(first_name);
    let last = norm(last_name);
    if last.is_empty() {
        return Vec::new();
    }

    roster
        .iter()
        .filter(|c| norm(&c.last_name) == last)
        .filter(|c| {
            first_name_matches(&first, &norm(&c.first_name))
                || c.preferred_name
                    .as_deref()
                    .is_some_and(|p| first_name_matches(&first, &norm(p)))
        })
        .cloned()
        .collect()
}

/// Last-name-only lookup, used as a fallback when the anchored search finds
/// nothing at all, to surface near-miss suggestions to the operator.
pub fn find_by_last_name(last_name: &str, roster: &[Candidate]) -> Vec<Candidate> {
    let last = norm(last_name);
    if last.is_empty() {
        return Vec::new();
    }
    roster
        .iter()
        .filter(|c| norm(&c.last_name) == last)
        .cloned()
        .collect()
}

/// `find_candidates` with the correction-table retry: when the direct
/// search comes up empty and the table knows this exact misspelling, retry
/// once with the corrected name before escalating to a human.
pub fn find_candidates_corrected(
    name: &ParsedName,
    roster: &[Candidate],
    corrections: &CorrectionTable,
) -> Vec<Candidate> {
    let direct = find_candidates(&name.first_name, &name.last_name, roster);
    if !direct.is_empty() {
        return direct;
    }
    match corrections.lookup(&name.first_name, &name.last_name) {
        Some(fixed) => {
            tracing::debug!(
                original = %name.original,
                corrected = %format!("{}, {}", fixed.last_name, fixed.first_name),
                "retrying match with corrected name"
            );
            find_candidates(&fixed.first_name, &fixed.last_name, roster)
        }
        None => direct,
    }
}
