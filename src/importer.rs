// Per-sheet import orchestration: resolve every name on the sheet against
// the roster, number the picks, and commit teams plus picks as one
// transaction. Nothing is written until the whole sheet is resolved; an
// abort anywhere discards all partial work.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::db::{CommitSummary, Database, PlannedPick, SheetAudit, TeamRecord};
use crate::draft::pick::{compute_overall_with_band, validate_band, PickError};
use crate::resolve::{ResolveError, Resolver};
use crate::roster::corrections::CorrectionTable;
use crate::roster::{find_by_last_name, find_candidates_corrected, Candidate};
use crate::sheet::name::ParsedName;
use crate::sheet::parser::ParseError;
use crate::sheet::{DraftSheet, TeamColumn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("season `{name} {year}` is not in the seasons table; create it first")]
    UnknownSeason { name: String, year: u32 },

    #[error("division `{name}` is not in the divisions table; create it first")]
    UnknownDivision { name: String },

    #[error("division `{name}` has level {level}; draft levels start at 1")]
    BadDivisionLevel { name: String, level: u32 },

    #[error("resolver returned user id {id}, which is not on the roster")]
    UnknownUser { id: i64 },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Pick(#[from] PickError),

    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Resolution results
// ---------------------------------------------------------------------------

/// A sheet name paired with the roster member it resolved to. Set exactly
/// once, by automatic matching or by the operator.
#[derive(Debug, Clone)]
pub struct ResolvedPlayer {
    pub name: ParsedName,
    pub user: Candidate,
}

/// One team with its captain and players fully resolved. `team_number` is
/// the 1-based sheet column, which is also the draft position.
#[derive(Debug, Clone)]
pub struct ResolvedTeam {
    pub captain: Candidate,
    pub team_name: String,
    pub team_number: u32,
    pub players: Vec<ResolvedPlayer>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSheet {
    pub teams: Vec<ResolvedTeam>,
}

/// What happened to one sheet.
#[derive(Debug)]
pub enum ImportOutcome {
    Committed(CommitSummary),
    /// Dry-run: everything resolved and numbered, nothing written.
    DryRun { teams: Vec<TeamRecord> },
    /// The operator declined the commit confirmation.
    Declined,
}

// ---------------------------------------------------------------------------
// Name resolution
// ---------------------------------------------------------------------------

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

fn candidate_by_id(roster: &[Candidate], id: i64) -> Result<Candidate, ImportError> {
    roster
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .ok_or(ImportError::UnknownUser { id })
}

fn dedup_by_id(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.id));
    candidates
}

/// Resolve a team's captain from their last name.
///
/// Captains are usually re-listed among their own players, so the player
/// cells sharing the captain's last name are the primary evidence: one such
/// player pins the captain directly; several mean the operator must say
/// which one leads the team before player matching proceeds. With no such
/// player, fall back to a roster-wide last-name search.
fn resolve_captain(
    team: &TeamColumn,
    team_number: u32,
    roster: &[Candidate],
    corrections: &CorrectionTable,
    resolver: &mut dyn Resolver,
) -> Result<Candidate, ImportError> {
    let captain_last = norm(&team.captain_last_name);
    let context = format!(
        "captain \"{}\" (team {})",
        team.captain_last_name, team_number
    );

    let same_last: Vec<&ParsedName> = team
        .players
        .iter()
        .filter(|p| norm(&p.last_name) == captain_last)
        .collect();

    let candidates = if same_last.is_empty() {
        find_by_last_name(&team.captain_last_name, roster)
    } else {
        // Union of the matching players' candidate sets. More than one
        // same-last-name player widens the set and forces a prompt below.
        dedup_by_id(
            same_last
                .iter()
                .flat_map(|p| find_candidates_corrected(p, roster, corrections))
                .collect(),
        )
    };

    let id = match candidates.as_slice() {
        [only] => {
            debug!(captain = %team.captain_last_name, team_number, id = only.id, "captain auto-resolved");
            only.id
        }
        _ if same_last.len() > 1 => {
            let context = format!(
                "{context}: {} players share the captain's last name; which one is the captain?",
                same_last.len()
            );
            resolver.choose(&context, &candidates, &[], roster)?
        }
        _ => resolver.choose(&context, &candidates, &[], roster)?,
    };

    candidate_by_id(roster, id)
}

/// Resolve one player cell to a roster member.
///
/// Exactly one candidate resolves silently. A player whose parsed last name
/// equals the team captain's is resolved to the captain when the captain is
/// among the candidates (captains re-listed as players are routine in the
/// source sheets). Everything else goes to the resolver, with last-name
/// near-misses as suggestions when the match came up completely empty.
fn resolve_player(
    name: &ParsedName,
    captain: &Candidate,
    team_name: &str,
    roster: &[Candidate],
    corrections: &CorrectionTable,
    resolver: &mut dyn Resolver,
) -> Result<Candidate, ImportError> {
    let candidates = find_candidates_corrected(name, roster, corrections);

    if norm(&name.last_name) == norm(&captain.last_name)
        && candidates.iter().any(|c| c.id == captain.id)
    {
        debug!(player = %name.original, captain_id = captain.id, "player is the team captain");
        return Ok(captain.clone());
    }

    if let [only] = candidates.as_slice() {
        return Ok(only.clone());
    }

    let suggestions = if candidates.is_empty() {
        find_by_last_name(&name.last_name, roster)
    } else {
        Vec::new()
    };
    let context = format!("player \"{}\" ({team_name})", name.original);
    let id = resolver.choose(&context, &candidates, &suggestions, roster)?;
    candidate_by_id(roster, id)
}

/// Resolve every captain and player on the sheet. Deterministic given the
/// same sheet, roster, corrections, and resolver choices: running it twice
/// yields identical assignments.
pub fn resolve_sheet(
    sheet: &DraftSheet,
    roster: &[Candidate],
    corrections: &CorrectionTable,
    resolver: &mut dyn Resolver,
) -> Result<ResolvedSheet, ImportError> {
    let mut teams = Vec::with_capacity(sheet.teams.len());

    for (idx, column) in sheet.teams.iter().enumerate() {
        let team_number = (idx + 1) as u32;
        let captain = resolve_captain(column, team_number, roster, corrections, resolver)?;
        let team_name = format!("Team {}", captain.last_name);

        let mut players = Vec::with_capacity(column.players.len());
        for name in &column.players {
            let user =
                resolve_player(name, &captain, &team_name, roster, corrections, resolver)?;
            players.push(ResolvedPlayer {
                name: name.clone(),
                user,
            });
        }

        teams.push(ResolvedTeam {
            captain,
            team_name,
            team_number,
            players,
        });
    }

    Ok(ResolvedSheet { teams })
}

// ---------------------------------------------------------------------------
// Pick numbering
// ---------------------------------------------------------------------------

/// Turn a resolved sheet into team records with numbered picks. Validates
/// that the division's total pick count fits its overall-number band.
pub fn plan_records(
    resolved: &ResolvedSheet,
    season_id: i64,
    division_id: i64,
    division_level: u32,
    band: u32,
) -> Result<Vec<TeamRecord>, PickError> {
    let num_teams = resolved.teams.len() as u32;
    let rounds = resolved
        .teams
        .iter()
        .map(|t| t.players.len() as u32)
        .max()
        .unwrap_or(0);
    validate_band(rounds, num_teams, band)?;

    let records = resolved
        .teams
        .iter()
        .map(|team| TeamRecord {
            season_id,
            captain_id: team.captain.id,
            division_id,
            name: team.team_name.clone(),
            team_number: team.team_number,
            picks: team
                .players
                .iter()
                .enumerate()
                .map(|(i, player)| {
                    let round = (i + 1) as u32;
                    PlannedPick {
                        user_id: player.user.id,
                        round,
                        overall: compute_overall_with_band(
                            division_level,
                            round,
                            team.team_number,
                            num_teams,
                            band,
                        ),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(records)
}

// ---------------------------------------------------------------------------
// Full sheet import
// ---------------------------------------------------------------------------

/// Import one parsed sheet end to end: reference lookups, name resolution,
/// pick numbering, confirmation, commit, audit record.
pub fn import_sheet(
    db: &Database,
    sheet: &DraftSheet,
    corrections: &CorrectionTable,
    resolver: &mut dyn Resolver,
    config: &Config,
    dry_run: bool,
) -> Result<ImportOutcome, ImportError> {
    let season_id = db
        .lookup_season(sheet.season.name(), sheet.year)?
        .ok_or_else(|| ImportError::UnknownSeason {
            name: sheet.season.name().to_string(),
            year: sheet.year,
        })?;
    let (division_id, division_level) = db
        .lookup_division(&sheet.division_name)?
        .ok_or_else(|| ImportError::UnknownDivision {
            name: sheet.division_name.clone(),
        })?;
    // Level 1 anchors the overall-number bands; a zero level would wrap the
    // band arithmetic below it.
    if division_level < 1 {
        return Err(ImportError::BadDivisionLevel {
            name: sheet.division_name.clone(),
            level: division_level,
        });
    }

    let roster = db.load_roster()?;
    let resolved = resolve_sheet(sheet, &roster, corrections, resolver)?;
    let records = plan_records(&resolved, season_id, division_id, division_level, config.division_band)?;
    let pick_count: usize = records.iter().map(|t| t.picks.len()).sum();

    if dry_run {
        info!(
            source = %sheet.source,
            teams = records.len(),
            picks = pick_count,
            "dry run, not committing"
        );
        return Ok(ImportOutcome::DryRun { teams: records });
    }

    let question = format!(
        "Commit {} team(s) and {} pick(s) from {} ({} {} {})?",
        records.len(),
        pick_count,
        sheet.source,
        sheet.season,
        sheet.year,
        sheet.division_name
    );
    if !resolver.confirm(&question)? {
        info!(source = %sheet.source, "operator declined commit");
        return Ok(ImportOutcome::Declined);
    }

    let summary = db.commit_sheet(
        &records,
        &SheetAudit {
            source: sheet.source.clone(),
            season: sheet.season.name().to_string(),
            year: sheet.year,
            division: sheet.division_name.clone(),
        },
    )?;

    info!(
        source = %sheet.source,
        teams = summary.team_ids.len(),
        picks = summary.pick_count,
        "sheet committed"
    );
    Ok(ImportOutcome::Committed(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ScriptedResolver;
    use crate::sheet::name::parse_name;
    use crate::sheet::Season;

    fn member(id: i64, first: &str, last: &str, preferred: Option<&str>) -> Candidate {
        Candidate {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            preferred_name: preferred.map(str::to_string),
        }
    }

    /// Roster with unique names plus one ambiguous pair (the Joneses).
    fn sample_roster() -> Vec<Candidate> {
        vec![
            member(1, "Alice", "Adams", None),
            member(2, "Ben", "Baker", None),
            member(3, "Cara", "Clark", None),
            member(4, "Robert", "Jones", Some("Bob")),
            member(5, "Roberta", "Jones", None),
            member(6, "Dan", "Adams", None),
        ]
    }

    fn column(captain_last: &str, players: &[&str]) -> TeamColumn {
        TeamColumn {
            captain_last_name: captain_last.to_string(),
            players: players.iter().map(|p| parse_name(p)).collect(),
        }
    }

    fn sheet_of(teams: Vec<TeamColumn>) -> DraftSheet {
        DraftSheet {
            season: Season::Fall,
            year: 2012,
            division_name: "Rec".into(),
            teams,
            source: "F12Rec".into(),
        }
    }

    // ------------------------------------------------------------------
    // resolve_sheet
    // ------------------------------------------------------------------

    #[test]
    fn unique_names_resolve_without_prompts() {
        let roster = sample_roster();
        let sheet = sheet_of(vec![column("Baker", &["Ben Baker", "Cara Clark"])]);
        let mut resolver = ScriptedResolver::default();

        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();
        assert!(resolver.asked.is_empty());
        assert_eq!(resolved.teams.len(), 1);
        assert_eq!(resolved.teams[0].captain.id, 2);
        assert_eq!(resolved.teams[0].team_name, "Team Baker");
        assert_eq!(resolved.teams[0].players[0].user.id, 2);
        assert_eq!(resolved.teams[0].players[1].user.id, 3);
    }

    #[test]
    fn captain_inferred_from_single_same_last_player() {
        let roster = sample_roster();
        // Two Adamses on the roster, but the sheet lists "Alice Adams" as a
        // player, so the captain pins to Alice without a prompt.
        let sheet = sheet_of(vec![column("Adams", &["Alice Adams", "Cara Clark"])]);
        let mut resolver = ScriptedResolver::default();

        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();
        assert!(resolver.asked.is_empty());
        assert_eq!(resolved.teams[0].captain.id, 1);
    }

    #[test]
    fn multiple_same_last_players_prompt_for_captain() {
        let roster = sample_roster();
        let sheet = sheet_of(vec![column("Adams", &["Alice Adams", "Dan Adams"])]);
        let mut resolver = ScriptedResolver::with_choices([6]);

        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();
        assert_eq!(resolved.teams[0].captain.id, 6);
        assert_eq!(resolver.asked.len(), 1);
        assert!(resolver.asked[0].contains("which one is the captain"));
    }

    #[test]
    fn captain_without_matching_player_falls_back_to_roster() {
        let roster = sample_roster();
        // No Clark among the players; roster has exactly one Clark.
        let sheet = sheet_of(vec![column("Clark", &["Ben Baker"])]);
        let mut resolver = ScriptedResolver::default();

        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();
        assert!(resolver.asked.is_empty());
        assert_eq!(resolved.teams[0].captain.id, 3);
    }

    #[test]
    fn ambiguous_player_goes_to_resolver() {
        let roster = sample_roster();
        // "Rob Jones" prefix-matches both Robert and Roberta.
        let sheet = sheet_of(vec![column("Baker", &["Ben Baker", "Rob Jones"])]);
        let mut resolver = ScriptedResolver::with_choices([5]);

        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();
        assert_eq!(resolved.teams[0].players[1].user.id, 5);
        assert_eq!(resolver.asked.len(), 1);
        assert!(resolver.asked[0].contains("Rob Jones"));
    }

    #[test]
    fn captain_preferred_over_prompting_for_same_last_player() {
        let roster = sample_roster();
        // "R Jones" matches both Joneses. Resolving the captain takes one
        // prompt; after that, the ambiguous player cell resolves to the
        // captain automatically instead of prompting again.
        let sheet = sheet_of(vec![column("Jones", &["Cara Clark", "R Jones"])]);
        let mut resolver = ScriptedResolver::with_choices([4]);

        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();
        assert_eq!(resolved.teams[0].captain.id, 4);
        assert_eq!(resolved.teams[0].players[1].user.id, 4);
        assert_eq!(resolver.asked.len(), 1);
        assert!(resolver.asked[0].contains("captain"));
    }

    #[test]
    fn correction_retry_resolves_without_prompt() {
        let roster = sample_roster();
        let mut corrections = CorrectionTable::default();
        corrections.insert(parse_name("Barker, Ben"), parse_name("Baker, Ben"));

        let sheet = sheet_of(vec![column("Clark", &["Ben Barker"])]);
        let mut resolver = ScriptedResolver::default();

        // The misspelled name resolves through the correction table without
        // ever reaching the resolver.
        let resolved = resolve_sheet(&sheet, &roster, &corrections, &mut resolver).unwrap();
        assert!(resolver.asked.is_empty());
        assert_eq!(resolved.teams[0].players[0].user.id, 2);
    }

    #[test]
    fn unknown_resolver_id_is_an_error() {
        let roster = sample_roster();
        let sheet = sheet_of(vec![column("Baker", &["Rob Jones"])]);
        let mut resolver = ScriptedResolver::with_choices([999]);

        let err = resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver)
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownUser { id: 999 }));
    }

    #[test]
    fn resolution_is_repeatable() {
        let roster = sample_roster();
        let sheet = sheet_of(vec![column("Baker", &["Ben Baker", "Rob Jones"])]);

        let run = |choice: i64| {
            let mut resolver = ScriptedResolver::with_choices([choice]);
            let resolved =
                resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver)
                    .unwrap();
            plan_records(&resolved, 1, 1, 1, 50).unwrap()
        };

        assert_eq!(run(4), run(4));
    }

    // ------------------------------------------------------------------
    // plan_records
    // ------------------------------------------------------------------

    /// Six teams, eight unique players each, on a big synthetic roster.
    fn full_six_team_fixture() -> (Vec<Candidate>, DraftSheet) {
        let mut roster = Vec::new();
        let mut teams = Vec::new();
        let mut next_id = 1;
        for t in 0..6 {
            let captain_last = format!("Cap{t}");
            roster.push(member(next_id, "Lead", &captain_last, None));
            next_id += 1;

            let mut players = vec![format!("Lead {captain_last}")];
            for r in 1..8 {
                let last = format!("Player{t}x{r}");
                roster.push(member(next_id, "Pat", &last, None));
                next_id += 1;
                players.push(format!("Pat {last}"));
            }
            let player_refs: Vec<&str> = players.iter().map(|s| s.as_str()).collect();
            teams.push(column(&captain_last, &player_refs));
        }
        (roster, sheet_of(teams))
    }

    #[test]
    fn six_team_level_three_scenario() {
        let (roster, sheet) = full_six_team_fixture();
        let mut resolver = ScriptedResolver::default();
        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();
        assert!(resolver.asked.is_empty());

        let records = plan_records(&resolved, 10, 20, 3, 50).unwrap();
        assert_eq!(records.len(), 6);
        let total_picks: usize = records.iter().map(|t| t.picks.len()).sum();
        assert_eq!(total_picks, 48);

        // Round 1 overalls ascend 101..106 across team columns.
        let round1: Vec<u32> = records.iter().map(|t| t.picks[0].overall).collect();
        assert_eq!(round1, vec![101, 102, 103, 104, 105, 106]);

        // Round 2 snakes: team 6 gets 107, team 1 gets 112.
        let round2: Vec<u32> = records.iter().map(|t| t.picks[1].overall).collect();
        assert_eq!(round2, vec![112, 111, 110, 109, 108, 107]);
    }

    #[test]
    fn band_overflow_rejected() {
        let (roster, sheet) = full_six_team_fixture();
        let mut resolver = ScriptedResolver::default();
        let resolved =
            resolve_sheet(&sheet, &roster, &CorrectionTable::default(), &mut resolver).unwrap();

        // 8 rounds x 6 teams = 48 picks; a band of 40 cannot hold them.
        let err = plan_records(&resolved, 10, 20, 3, 40).unwrap_err();
        assert!(matches!(err, PickError::BandExceeded { needed: 48, .. }));
    }

    #[test]
    fn empty_sheet_plans_nothing() {
        let resolved = ResolvedSheet { teams: vec![] };
        let records = plan_records(&resolved, 1, 1, 1, 50).unwrap();
        assert!(records.is_empty());
    }
}
