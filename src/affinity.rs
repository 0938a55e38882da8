use once_cell::sync::Lazy;

use crate::error::DatasetError;

pub const PIRATE_COUNT: usize = 20;
pub const STIMULUS_COUNT: usize = 40;

pub const PIRATE_NAMES: [&str; PIRATE_COUNT] = [
    "Dan",
    "Sproggie",
    "Orvinn",
    "Lucky",
    "Edmund",
    "Peg Leg",
    "Bonnie",
    "Puffo",
    "Stuff",
    "Squire",
    "Crossblades",
    "Stripey",
    "Ned",
    "Fairfax",
    "Gooblah",
    "Franchisco",
    "Federismo",
    "Blackbeard",
    "Buck",
    "Tailhook",
];

// Row = pirate id - 1, column = food id - 1.
pub const POSITIVE_AFFINITY: [[u8; STIMULUS_COUNT]; PIRATE_COUNT] = [
    [2, 0, 0, 1, 0, 1, 1, 1, 0, 1, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1],
    [0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 1, 1, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 1],
    [1, 0, 0, 1, 0, 1, 1, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0],
    [1, 0, 0, 1, 0, 1, 1, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
    [1, 0, 0, 1, 0, 1, 1, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
    [1, 0, 0, 1, 0, 1, 1, 1, 0, 2, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 2, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 2],
    [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
];

pub const NEGATIVE_AFFINITY: [[u8; STIMULUS_COUNT]; PIRATE_COUNT] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
    [1, 0, 0, 1, 0, 1, 1, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 1, 1, 0],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 1, 1, 0],
    [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0],
];

static STANDARD: Lazy<AffinityTables> =
    Lazy::new(|| AffinityTables::new(POSITIVE_AFFINITY, NEGATIVE_AFFINITY));

/// Per-pirate food affinity scores. Immutable once built; share by reference.
#[derive(Debug, Clone)]
pub struct AffinityTables {
    positive: [[u8; STIMULUS_COUNT]; PIRATE_COUNT],
    negative: [[u8; STIMULUS_COUNT]; PIRATE_COUNT],
}

/// Food adjustment for one pirate in one arena. `nfa` is stored as a non-positive value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoodAdjustment {
    pub pfa: i32,
    pub nfa: i32,
    pub fa: i32,
}

impl AffinityTables {
    pub fn new(
        positive: [[u8; STIMULUS_COUNT]; PIRATE_COUNT],
        negative: [[u8; STIMULUS_COUNT]; PIRATE_COUNT],
    ) -> Self {
        Self { positive, negative }
    }

    pub fn standard() -> &'static AffinityTables {
        &STANDARD
    }

    pub fn positive(&self, pirate: u8, food: u8) -> Result<u8, DatasetError> {
        Ok(self.positive[pirate_index(pirate)?][food_index(food)?])
    }

    pub fn negative(&self, pirate: u8, food: u8) -> Result<u8, DatasetError> {
        Ok(self.negative[pirate_index(pirate)?][food_index(food)?])
    }

    /// Sums the pirate's affinities over the arena's foods. Legacy arenas carry no food
    /// data (`None` or empty) and score zero across the board.
    pub fn food_adjustment(
        &self,
        pirate: u8,
        foods: Option<&[u8]>,
    ) -> Result<FoodAdjustment, DatasetError> {
        let p = pirate_index(pirate)?;
        let Some(foods) = foods.filter(|f| !f.is_empty()) else {
            return Ok(FoodAdjustment::default());
        };

        let mut pfa = 0i32;
        let mut negative_sum = 0i32;
        for food in foods {
            let f = food_index(*food)?;
            pfa += i32::from(self.positive[p][f]);
            negative_sum += i32::from(self.negative[p][f]);
        }
        let nfa = -negative_sum;
        Ok(FoodAdjustment {
            pfa,
            nfa,
            fa: pfa + nfa,
        })
    }
}

pub fn pirate_name(pirate: u8) -> Result<&'static str, DatasetError> {
    Ok(PIRATE_NAMES[pirate_index(pirate)?])
}

pub fn pirate_ids() -> impl Iterator<Item = u8> {
    1..=PIRATE_COUNT as u8
}

pub fn pirate_index(pirate: u8) -> Result<usize, DatasetError> {
    if (1..=PIRATE_COUNT as u8).contains(&pirate) {
        Ok(usize::from(pirate) - 1)
    } else {
        Err(DatasetError::InvalidPirate(u32::from(pirate)))
    }
}

fn food_index(food: u8) -> Result<usize, DatasetError> {
    if (1..=STIMULUS_COUNT as u8).contains(&food) {
        Ok(usize::from(food) - 1)
    } else {
        Err(DatasetError::InvalidFood(u32::from(food)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_foods_score_zero() {
        let tables = AffinityTables::standard();
        for pirate in pirate_ids() {
            assert_eq!(
                tables.food_adjustment(pirate, None).unwrap(),
                FoodAdjustment::default()
            );
            assert_eq!(
                tables.food_adjustment(pirate, Some(&[][..])).unwrap(),
                FoodAdjustment::default()
            );
        }
    }

    #[test]
    fn dan_likes_first_food() {
        let adj = AffinityTables::standard()
            .food_adjustment(1, Some(&[1, 2][..]))
            .unwrap();
        assert_eq!(adj, FoodAdjustment { pfa: 2, nfa: 0, fa: 2 });
    }

    #[test]
    fn negative_component_is_stored_non_positive() {
        // Orvinn: +1 for food 14 and 19, -1 for food 19.
        let adj = AffinityTables::standard()
            .food_adjustment(3, Some(&[14, 19, 2][..]))
            .unwrap();
        assert_eq!(adj, FoodAdjustment { pfa: 2, nfa: -1, fa: 1 });
    }

    #[test]
    fn out_of_range_ids_are_errors() {
        let tables = AffinityTables::standard();
        assert_eq!(
            tables.food_adjustment(0, Some(&[1][..])),
            Err(DatasetError::InvalidPirate(0))
        );
        assert_eq!(
            tables.food_adjustment(21, None),
            Err(DatasetError::InvalidPirate(21))
        );
        assert_eq!(
            tables.food_adjustment(4, Some(&[41][..])),
            Err(DatasetError::InvalidFood(41))
        );
        assert_eq!(tables.positive(1, 0), Err(DatasetError::InvalidFood(0)));
    }

    #[test]
    fn labels_follow_ids() {
        assert_eq!(pirate_name(1).unwrap(), "Dan");
        assert_eq!(pirate_name(15).unwrap(), "Gooblah");
        assert_eq!(pirate_name(20).unwrap(), "Tailhook");
        assert_eq!(pirate_ids().count(), PIRATE_COUNT);
    }
}
