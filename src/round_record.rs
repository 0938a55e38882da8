use serde::{Deserialize, Serialize};

use crate::affinity::{AffinityTables, FoodAdjustment};
use crate::error::DatasetError;

pub const ARENA_COUNT: usize = 5;
pub const POSITIONS: usize = 4;
// Index 0 of every odds tuple is the "no side bet" placeholder.
const ODDS_TUPLE_LEN: usize = POSITIONS + 1;

/// One round as published by the food club CDN. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRound {
    pub round: u32,
    pub pirates: Vec<Vec<u8>>,
    // Older rounds were captured before foods were recorded.
    #[serde(default)]
    pub foods: Option<Vec<Vec<u8>>>,
    pub opening_odds: Vec<Vec<f64>>,
    pub current_odds: Vec<Vec<f64>>,
    #[serde(default)]
    pub winners: Option<Vec<Option<u8>>>,
}

/// A resolved arena in wide form: one row per (round, arena).
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaOutcome {
    pub round: u32,
    pub arena: u8,
    pub pirates: [u8; POSITIONS],
    pub adjustments: [FoodAdjustment; POSITIONS],
    pub opening_odds: [f64; POSITIONS],
    pub closing_odds: [f64; POSITIONS],
    /// Winning position, 1..=4.
    pub winner: u8,
}

impl ArenaOutcome {
    pub fn match_id(&self) -> u64 {
        match_id(self.round, self.arena)
    }
}

pub fn match_id(round: u32, arena: u8) -> u64 {
    u64::from(round) * ARENA_COUNT as u64 + u64::from(arena)
}

impl RawRound {
    pub fn validate(&self) -> Result<(), DatasetError> {
        self.check_arenas("pirates", self.pirates.len())?;
        self.check_arenas("openingOdds", self.opening_odds.len())?;
        self.check_arenas("currentOdds", self.current_odds.len())?;
        if let Some(foods) = &self.foods {
            self.check_arenas("foods", foods.len())?;
        }
        if let Some(winners) = &self.winners {
            self.check_arenas("winners", winners.len())?;
        }
        Ok(())
    }

    fn check_arenas(&self, field: &'static str, found: usize) -> Result<(), DatasetError> {
        if found == ARENA_COUNT {
            return Ok(());
        }
        Err(DatasetError::ArenaCount {
            round: self.round,
            field,
            expected: ARENA_COUNT,
            found,
        })
    }

    pub fn winner(&self, arena: usize) -> Option<u8> {
        self.winners
            .as_ref()
            .and_then(|w| w.get(arena).copied().flatten())
            .filter(|w| (1..=POSITIONS as u8).contains(w))
    }

    /// Every resolved arena of the round, in arena order. Unresolved arenas are skipped.
    pub fn arena_outcomes(
        &self,
        tables: &AffinityTables,
    ) -> Result<Vec<ArenaOutcome>, DatasetError> {
        self.validate()?;
        let mut out = Vec::with_capacity(ARENA_COUNT);
        for arena in 0..ARENA_COUNT {
            if let Some(outcome) = build_arena_outcome(self, arena, tables)? {
                out.push(outcome);
            }
        }
        Ok(out)
    }
}

/// Builds the wide record for one arena of an already validated round. Structural
/// problems are errors even when the arena is unresolved; an unresolved arena otherwise
/// yields `None`.
pub(crate) fn build_arena_outcome(
    raw: &RawRound,
    arena: usize,
    tables: &AffinityTables,
) -> Result<Option<ArenaOutcome>, DatasetError> {
    let out_of_range = || DatasetError::ArenaIndex {
        round: raw.round,
        arena,
    };
    let arena_idx = u8::try_from(arena).map_err(|_| out_of_range())?;
    let seats = raw.pirates.get(arena).ok_or_else(out_of_range)?;
    let opening = raw.opening_odds.get(arena).ok_or_else(out_of_range)?;
    let closing = raw.current_odds.get(arena).ok_or_else(out_of_range)?;

    let pirates: [u8; POSITIONS] = seats.as_slice().try_into().map_err(|_| {
        DatasetError::PirateCount {
            round: raw.round,
            arena: arena_idx,
            found: seats.len(),
        }
    })?;
    let opening_odds = position_odds(raw, arena_idx, "openingOdds", opening)?;
    let closing_odds = position_odds(raw, arena_idx, "currentOdds", closing)?;

    let foods = raw
        .foods
        .as_ref()
        .and_then(|foods| foods.get(arena))
        .map(|foods| foods.as_slice());
    let mut adjustments = [FoodAdjustment::default(); POSITIONS];
    for (slot, pirate) in adjustments.iter_mut().zip(pirates) {
        *slot = tables.food_adjustment(pirate, foods)?;
    }

    let Some(winner) = raw.winner(arena) else {
        return Ok(None);
    };

    Ok(Some(ArenaOutcome {
        round: raw.round,
        arena: arena_idx,
        pirates,
        adjustments,
        opening_odds,
        closing_odds,
        winner,
    }))
}

/// Strips the sentinel and checks every position's price is a positive number.
fn position_odds(
    raw: &RawRound,
    arena: u8,
    field: &'static str,
    odds: &[f64],
) -> Result<[f64; POSITIONS], DatasetError> {
    if odds.len() != ODDS_TUPLE_LEN {
        return Err(DatasetError::OddsArity {
            round: raw.round,
            arena,
            field,
            found: odds.len(),
        });
    }
    let mut out = [0.0; POSITIONS];
    out.copy_from_slice(&odds[1..]);
    if let Some((idx, bad)) = out
        .iter()
        .enumerate()
        .find(|(_, o)| **o <= 0.0 || o.is_nan())
    {
        return Err(DatasetError::NonPositiveOdds {
            match_id: match_id(raw.round, arena),
            position: idx as u8 + 1,
            odds: *bad,
        });
    }
    Ok(out)
}
