use serde::{Deserialize, Serialize};

use super::VoteMatrix;

/// Multipliers for 0, 1, 2 and 3 prior wins.
pub const DEFAULT_WIN_MULTIPLIERS: [f64; 4] = [1.00, 0.60, 0.35, 0.20];
/// Multiplier once a participant has won more units than the table covers.
pub const DEFAULT_WIN_MULTIPLIER_FLOOR: f64 = 0.10;

/// Step table that makes repeat winners less likely to win again.
///
/// `multipliers[n]` applies to a participant with `n` wins so far; anything
/// past the end of the table uses `floor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinPenalty {
    multipliers: Vec<f64>,
    floor: f64,
}

impl Default for WinPenalty {
    fn default() -> Self {
        Self::new(DEFAULT_WIN_MULTIPLIERS.to_vec(), DEFAULT_WIN_MULTIPLIER_FLOOR)
    }
}

impl WinPenalty {
    pub fn new(multipliers: Vec<f64>, floor: f64) -> Self {
        Self { multipliers, floor }
    }

    pub fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// The table must be finite, non-negative and non-increasing, ending at or above the floor.
    pub fn validate(&self) -> Result<(), String> {
        let all = self.multipliers.iter().chain(std::iter::once(&self.floor));
        if all.clone().any(|m| !m.is_finite() || *m < 0.0) {
            return Err("win multipliers must be finite and non-negative".to_string());
        }
        let increasing = all
            .clone()
            .zip(all.skip(1))
            .any(|(prev, next)| next > prev);
        if increasing {
            return Err(
                "win multipliers must be non-increasing and the floor must not exceed the last entry"
                    .to_string(),
            );
        }
        Ok(())
    }

    pub fn multiplier(&self, win_count: u32) -> f64 {
        self.multipliers
            .get(win_count as usize)
            .copied()
            .unwrap_or(self.floor)
    }

    /// Phase B sampling weight for `points` cast by someone with `win_count` wins.
    pub fn weight(&self, points: i32, win_count: u32) -> f64 {
        f64::from(points) * self.multiplier(win_count)
    }
}

/// Total points every participant cast on `item_id`.
pub fn item_competition_score(item_id: i64, votes: &VoteMatrix) -> i64 {
    votes
        .values()
        .filter_map(|by_item| by_item.get(&item_id))
        .map(|&points| i64::from(points))
        .sum()
}
