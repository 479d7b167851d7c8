// Sheet parsing: locating the marker row and extracting team columns.
//
// Two grammars share one parser body, selected by an explicit SheetFormat:
// the batch CSV layout (metadata in the filename, marker row anchors the
// table) and the free-form tab-delimited layout (metadata on line 1,
// captains on line 2).

use thiserror::Error;
use tracing::debug;

use super::name::parse_name;
use super::{expand_year, DraftSheet, Season, SheetFormat, TeamColumn};

/// Default number of player rows beneath the captain row in batch sheets.
pub const DEFAULT_PLAYER_ROWS: usize = 8;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("sheet name `{name}` is empty or too short; expected [F|S|U]YY<Division>")]
    BadSheetName { name: String },

    #[error("sheet name `{name}` has unknown season code `{code}`; expected F, S, or U")]
    BadSeasonCode { name: String, code: char },

    #[error("sheet name `{name}` has a non-numeric year")]
    BadYear { name: String },

    #[error("sheet name `{name}` is missing the division suffix")]
    MissingDivision { name: String },

    #[error("could not find team number marker row in {source_name}")]
    MissingMarkerRow { source_name: String },

    #[error("captain row missing after marker row in {source_name}")]
    MissingCaptainRow { source_name: String },

    #[error("empty captain cell for team {team_number} in {source_name}")]
    EmptyCaptainCell {
        source_name: String,
        team_number: usize,
    },

    #[error(
        "free-form header needs at least `<season> <year> <division>`, got {got} token(s)"
    )]
    ShortHeader { got: usize },

    #[error("free-form header has unknown season token `{token}`")]
    BadSeasonToken { token: String },

    #[error("free-form header year `{token}` is not numeric")]
    NonNumericYear { token: String },

    #[error("sheet {source_name} has no content")]
    EmptySheet { source_name: String },

    #[error("CSV error in {source_name}: {source}")]
    Csv {
        source_name: String,
        source: csv::Error,
    },
}

/// Parse a batch sheet: metadata from the filename stem, body as
/// comma-delimited rows anchored by the marker row.
///
/// The filename (extension stripped) must match `[F|S|U]YY<Division>`:
/// season code, 2-digit year (50-year pivot), division name.
pub fn parse_batch_sheet(
    raw: &str,
    filename: &str,
    player_rows: usize,
) -> Result<DraftSheet, ParseError> {
    let (season, year, division_name) = parse_sheet_name(filename)?;
    let rows = read_rows(raw, b',', filename)?;
    let teams = parse_table(&rows, filename, player_rows)?;
    debug!(
        source = filename,
        season = %season,
        year,
        division = %division_name,
        teams = teams.len(),
        "parsed batch sheet"
    );
    Ok(DraftSheet {
        season,
        year,
        division_name,
        teams,
        source: filename.to_string(),
    })
}

/// Parse a free-form sheet (pasted text or stdin): line 1 holds
/// whitespace-separated `<season> <year> <division...>` tokens, line 2 the
/// captain names (tab-delimited), and the remaining lines the player rows.
pub fn parse_freeform_sheet(raw: &str, source_name: &str) -> Result<DraftSheet, ParseError> {
    let mut lines = raw.lines();
    let header = lines.next().ok_or_else(|| ParseError::EmptySheet {
        source_name: source_name.to_string(),
    })?;

    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ParseError::ShortHeader { got: tokens.len() });
    }
    let season = Season::from_token(tokens[0]).ok_or_else(|| ParseError::BadSeasonToken {
        token: tokens[0].to_string(),
    })?;
    let year_raw: u32 = tokens[1].parse().map_err(|_| ParseError::NonNumericYear {
        token: tokens[1].to_string(),
    })?;
    let year = expand_year(year_raw);
    let division_name = tokens[2..].join(" ");

    let captain_line = lines.next().ok_or_else(|| ParseError::MissingCaptainRow {
        source_name: source_name.to_string(),
    })?;
    let captain_cells: Vec<&str> = captain_line.split('\t').collect();
    let num_teams = captain_cells.len();

    let mut teams = Vec::with_capacity(num_teams);
    for (idx, cell) in captain_cells.iter().enumerate() {
        let last = cell.trim();
        if last.is_empty() {
            return Err(ParseError::EmptyCaptainCell {
                source_name: source_name.to_string(),
                team_number: idx + 1,
            });
        }
        teams.push(TeamColumn {
            captain_last_name: last.to_string(),
            players: Vec::new(),
        });
    }

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        fill_player_row(&mut teams, &cells);
    }

    debug!(
        source = source_name,
        season = %season,
        year,
        division = %division_name,
        teams = teams.len(),
        "parsed free-form sheet"
    );
    Ok(DraftSheet {
        season,
        year,
        division_name,
        teams,
        source: source_name.to_string(),
    })
}

/// Dispatch on the explicit format enum. Batch sheets need the filename for
/// their metadata; free-form sheets carry it inline.
pub fn parse_sheet(
    raw: &str,
    format: SheetFormat,
    source_name: &str,
    player_rows: usize,
) -> Result<DraftSheet, ParseError> {
    match format {
        SheetFormat::FixedCsv => parse_batch_sheet(raw, source_name, player_rows),
        SheetFormat::FreeForm => parse_freeform_sheet(raw, source_name),
    }
}

// ---------------------------------------------------------------------------
// Filename grammar
// ---------------------------------------------------------------------------

/// Split `[F|S|U]YY<Division>` into its parts. A trailing `.csv`/`.txt`
/// extension is stripped; any other dot belongs to the division name
/// (divisions like "Rec.B" exist in the historical files).
pub fn parse_sheet_name(name: &str) -> Result<(Season, u32, String), ParseError> {
    let stem = match name.rsplit_once('.') {
        Some((stem, ext))
            if ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("txt") =>
        {
            stem
        }
        _ => name,
    };
    let chars: Vec<char> = stem.chars().collect();
    if chars.len() < 3 {
        return Err(ParseError::BadSheetName {
            name: name.to_string(),
        });
    }

    let season = Season::from_code(chars[0]).ok_or(ParseError::BadSeasonCode {
        name: name.to_string(),
        code: chars[0],
    })?;

    let year_str: String = chars[1..3].iter().collect();
    let two_digit: u32 = year_str.parse().map_err(|_| ParseError::BadYear {
        name: name.to_string(),
    })?;
    let year = expand_year(two_digit);

    let division_name: String = chars[3..].iter().collect::<String>().trim().to_string();
    if division_name.is_empty() {
        return Err(ParseError::MissingDivision {
            name: name.to_string(),
        });
    }

    Ok((season, year, division_name))
}

// ---------------------------------------------------------------------------
// Table body
// ---------------------------------------------------------------------------

fn read_rows(raw: &str, delimiter: u8, source_name: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParseError::Csv {
            source_name: source_name.to_string(),
            source: e,
        })?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(rows)
}

fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// A 6-team marker row starts with the literal cells 1..6.
fn is_six_team_marker(row: &[String]) -> bool {
    (0..6).all(|i| cell(row, i) == (i + 1).to_string())
}

/// A 4-team marker row starts with 1..4 and has an empty or absent 5th
/// cell. The 6-team check runs first; a malformed 4-team row with a literal
/// "5" in the 5th cell is only read as 6 teams when the 6th cell is "6".
fn is_four_team_marker(row: &[String]) -> bool {
    (0..4).all(|i| cell(row, i) == (i + 1).to_string()) && cell(row, 4).is_empty()
}

fn parse_table(
    rows: &[Vec<String>],
    source_name: &str,
    player_rows: usize,
) -> Result<Vec<TeamColumn>, ParseError> {
    let (marker_idx, num_teams) = rows
        .iter()
        .enumerate()
        .find_map(|(idx, row)| {
            if is_six_team_marker(row) {
                Some((idx, 6))
            } else if is_four_team_marker(row) {
                Some((idx, 4))
            } else {
                None
            }
        })
        .ok_or_else(|| ParseError::MissingMarkerRow {
            source_name: source_name.to_string(),
        })?;

    let captain_row = rows
        .get(marker_idx + 1)
        .ok_or_else(|| ParseError::MissingCaptainRow {
            source_name: source_name.to_string(),
        })?;

    let mut teams = Vec::with_capacity(num_teams);
    for col in 0..num_teams {
        let last = cell(captain_row, col);
        if last.is_empty() {
            return Err(ParseError::EmptyCaptainCell {
                source_name: source_name.to_string(),
                team_number: col + 1,
            });
        }
        teams.push(TeamColumn {
            captain_last_name: last.to_string(),
            players: Vec::new(),
        });
    }

    // Player rows follow the captain row. Trailing short rows are tolerated:
    // a missing row or cell leaves the slot absent, never zero-filled.
    let first_player_row = marker_idx + 2;
    for row in rows.iter().skip(first_player_row).take(player_rows) {
        let cells: Vec<&str> = row.iter().map(|s| s.as_str()).collect();
        fill_player_row(&mut teams, &cells);
    }

    Ok(teams)
}

/// Append one sheet row's cells to their team columns, skipping blanks.
fn fill_player_row(teams: &mut [TeamColumn], cells: &[&str]) {
    for (col, team) in teams.iter_mut().enumerate() {
        let text = cells.get(col).map(|s| s.trim()).unwrap_or("");
        if !text.is_empty() {
            team.players.push(parse_name(text));
        }
    }
}
