// Snake-draft overall pick numbering.
//
// Each division level owns a fixed-width numeric band of overall pick
// numbers. Within a level, odd rounds assign picks in ascending team order
// and even rounds in descending order, so the team picking last in round 1
// picks first in round 2.

use serde::Serialize;
use thiserror::Error;

/// Width of the numeric band reserved per division level. The historical
/// sheets assume no division ever drafts more than 50 picks total; the
/// importer validates that assumption per sheet (see [`validate_band`]) and
/// the width is configurable.
pub const DEFAULT_DIVISION_BAND: u32 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickError {
    #[error(
        "division needs {needed} picks ({rounds} rounds x {num_teams} teams) \
         but the per-level band is only {band}; raise draft.division_band"
    )]
    BandExceeded {
        rounds: u32,
        num_teams: u32,
        needed: u32,
        band: u32,
    },
}

/// Check that a division's total pick count fits in its numeric band.
/// Overflow would bleed overall numbers into the next level's range.
pub fn validate_band(rounds: u32, num_teams: u32, band: u32) -> Result<(), PickError> {
    let needed = rounds * num_teams;
    if needed > band {
        return Err(PickError::BandExceeded {
            rounds,
            num_teams,
            needed,
            band,
        });
    }
    Ok(())
}

/// Compute the global overall pick number for `(round, team_number)` within
/// a division, using a custom band width.
///
/// Pure and total for `division_level, round, team_number >= 1` and
/// `team_number <= num_teams`. For fixed level and team count the mapping
/// from `(round, team_number)` to overall is a bijection onto a contiguous
/// range, strictly increasing in round-then-effective-position order.
pub fn compute_overall_with_band(
    division_level: u32,
    round: u32,
    team_number: u32,
    num_teams: u32,
    band: u32,
) -> u32 {
    debug_assert!(division_level >= 1 && round >= 1);
    debug_assert!(team_number >= 1 && team_number <= num_teams);

    let base = (division_level - 1) * band + (round - 1) * num_teams;
    let position_value = if round % 2 == 1 {
        team_number
    } else {
        num_teams + 1 - team_number
    };
    base + position_value
}

/// [`compute_overall_with_band`] with the default 50-pick band.
pub fn compute_overall(division_level: u32, round: u32, team_number: u32, num_teams: u32) -> u32 {
    compute_overall_with_band(division_level, round, team_number, num_teams, DEFAULT_DIVISION_BAND)
}

/// One draft pick, ready for persistence. Created only after every player
/// and captain on the sheet has resolved to a roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftPick {
    pub team_id: i64,
    pub user_id: i64,
    /// 1-based round; equals the player's row position on the sheet.
    pub round: u32,
    /// Global pick number within the division's level band.
    pub overall: u32,
}
