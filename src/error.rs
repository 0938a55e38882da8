use thiserror::Error;

/// Structural problems in upstream data. Any of these aborts the run: they mean the
/// round schema changed and continuing would produce a corrupt dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("round {round}: expected {expected} arenas in `{field}`, found {found}")]
    ArenaCount {
        round: u32,
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("round {round} arena {arena}: expected 4 pirates, found {found}")]
    PirateCount { round: u32, arena: u8, found: usize },
    #[error("round {round}: arena index {arena} is outside 0..5")]
    ArenaIndex { round: u32, arena: usize },
    #[error("round {round} arena {arena}: `{field}` must have 5 entries, found {found}")]
    OddsArity {
        round: u32,
        arena: u8,
        field: &'static str,
        found: usize,
    },
    #[error("pirate id {0} is outside 1..=20")]
    InvalidPirate(u32),
    #[error("food id {0} is outside 1..=40")]
    InvalidFood(u32),
    #[error("match {match_id} position {position}: odds {odds} must be positive")]
    NonPositiveOdds {
        match_id: u64,
        position: u8,
        odds: f64,
    },
    #[error("coefficient vector has {found} entries, expected {expected}")]
    CoefficientCount { expected: usize, found: usize },
}
