// Draft sheet models: seasons, team columns, and the parsed sheet itself.

pub mod name;
pub mod parser;

use serde::Serialize;

use self::name::ParsedName;

/// League season. Sheet filenames encode the season as a single leading
/// character (F/S/U).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Fall,
    Spring,
    Summer,
}

impl Season {
    /// Parse the single-character season code used in batch sheet filenames.
    pub fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'F' => Some(Season::Fall),
            'S' => Some(Season::Spring),
            'U' => Some(Season::Summer),
            _ => None,
        }
    }

    /// Parse a spelled-out season token from a free-form header
    /// (case-insensitive; single-letter codes also accepted).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "fall" | "f" => Some(Season::Fall),
            "spring" | "s" => Some(Season::Spring),
            "summer" | "u" => Some(Season::Summer),
            _ => None,
        }
    }

    /// The season name as stored in the seasons table.
    pub fn name(&self) -> &'static str {
        match self {
            Season::Fall => "fall",
            Season::Spring => "spring",
            Season::Summer => "summer",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Expand a 2-digit year token with a 50-year pivot: 00-49 are 2000s,
/// 50-99 are 1900s. 4-digit years pass through unchanged.
pub fn expand_year(two_or_four: u32) -> u32 {
    match two_or_four {
        0..=49 => 2000 + two_or_four,
        50..=99 => 1900 + two_or_four,
        other => other,
    }
}

/// Which input grammar a sheet uses. Selected explicitly by the caller
/// rather than sniffed from the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// Batch files: comma-delimited, metadata encoded in the filename,
    /// marker row anchors the team columns.
    FixedCsv,
    /// Pasted/free-form input: tab-delimited, metadata on the first line.
    FreeForm,
}

/// One team column from a sheet: the captain's last name plus the player
/// names in draft-round order. Row order is semantically meaningful --
/// the player at index `i` was taken in round `i + 1`.
#[derive(Debug, Clone)]
pub struct TeamColumn {
    pub captain_last_name: String,
    pub players: Vec<ParsedName>,
}

/// A fully parsed draft sheet, before any roster matching has happened.
/// Team order is the column order, which is draft position 1..N.
#[derive(Debug, Clone)]
pub struct DraftSheet {
    pub season: Season,
    pub year: u32,
    pub division_name: String,
    pub teams: Vec<TeamColumn>,
    /// Where the sheet came from (filename or "<stdin>"), for diagnostics.
    pub source: String,
}

impl DraftSheet {
    pub fn num_teams(&self) -> usize {
        self.teams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_from_code() {
        assert_eq!(Season::from_code('F'), Some(Season::Fall));
        assert_eq!(Season::from_code('f'), Some(Season::Fall));
        assert_eq!(Season::from_code('S'), Some(Season::Spring));
        assert_eq!(Season::from_code('U'), Some(Season::Summer));
        assert_eq!(Season::from_code('X'), None);
    }

    #[test]
    fn season_from_token() {
        assert_eq!(Season::from_token("Fall"), Some(Season::Fall));
        assert_eq!(Season::from_token("SPRING"), Some(Season::Spring));
        assert_eq!(Season::from_token("u"), Some(Season::Summer));
        assert_eq!(Season::from_token("winter"), None);
    }

    #[test]
    fn year_pivot() {
        assert_eq!(expand_year(0), 2000);
        assert_eq!(expand_year(12), 2012);
        assert_eq!(expand_year(49), 2049);
        assert_eq!(expand_year(50), 1950);
        assert_eq!(expand_year(98), 1998);
        assert_eq!(expand_year(2003), 2003);
    }
}
