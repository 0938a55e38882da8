use serde::Serialize;

use crate::error::DatasetError;
use crate::round_record::{ArenaOutcome, POSITIONS};

/// Measured positional advantage for positions 1..=4. Fixed calibration, not fitted here.
pub const POSITION_FACTORS: [f64; POSITIONS] = [-0.1856, 0.0, 0.2848, 0.5554];

/// One alternative of one match: the row shape discrete-choice estimation expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongFormatRow {
    pub match_id: u64,
    pub round: u32,
    pub arena: u8,
    pub pirate: u8,
    pub position: u8,
    pub fa: i32,
    pub pfa: i32,
    pub nfa: i32,
    pub position_factor: f64,
    pub is_pos1: u8,
    pub is_pos2: u8,
    pub is_pos3: u8,
    pub is_pos4: u8,
    pub opening_odds: f64,
    pub closing_odds: f64,
    pub log_opening_implied_winrate: f64,
    pub win: u8,
}

impl LongFormatRow {
    pub fn is_pos(&self, position: u8) -> u8 {
        u8::from(self.position == position)
    }
}

/// Four rows per wide row, positions 1..=4 in order, matches in wide-table order.
pub fn expand_long_format(wide: &[ArenaOutcome]) -> Result<Vec<LongFormatRow>, DatasetError> {
    let mut out = Vec::with_capacity(wide.len() * POSITIONS);
    for outcome in wide {
        expand_outcome(outcome, &mut out)?;
    }
    Ok(out)
}

fn expand_outcome(
    outcome: &ArenaOutcome,
    out: &mut Vec<LongFormatRow>,
) -> Result<(), DatasetError> {
    let match_id = outcome.match_id();
    for idx in 0..POSITIONS {
        let position = idx as u8 + 1;
        let opening_odds = outcome.opening_odds[idx];
        if opening_odds <= 0.0 || opening_odds.is_nan() {
            return Err(DatasetError::NonPositiveOdds {
                match_id,
                position,
                odds: opening_odds,
            });
        }
        let adjustment = outcome.adjustments[idx];
        out.push(LongFormatRow {
            match_id,
            round: outcome.round,
            arena: outcome.arena,
            pirate: outcome.pirates[idx],
            position,
            fa: adjustment.fa,
            pfa: adjustment.pfa,
            nfa: adjustment.nfa,
            position_factor: POSITION_FACTORS[idx],
            is_pos1: u8::from(position == 1),
            is_pos2: u8::from(position == 2),
            is_pos3: u8::from(position == 3),
            is_pos4: u8::from(position == 4),
            opening_odds,
            closing_odds: outcome.closing_odds[idx],
            log_opening_implied_winrate: (1.0 / opening_odds).ln(),
            win: u8::from(position == outcome.winner),
        });
    }
    Ok(())
}
