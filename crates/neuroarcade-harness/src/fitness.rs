//! Merging per-game scores into one fitness per agent.

use serde::{Deserialize, Serialize};

/// How scores from several games become a single fitness.
///
/// `Min` rewards agents that play every game; `Sum` lets a strong game
/// compensate for a weak one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessCombination {
    #[default]
    Min,
    Sum,
}

impl FitnessCombination {
    /// Combines `per_game[g][i]`, the score of agent `i` in game `g`.
    ///
    /// # Panics
    ///
    /// Panics if `per_game` is empty or its vectors differ in length.
    #[must_use]
    pub fn combine(self, per_game: &[Vec<f32>]) -> Vec<f32> {
        let (first, rest) = per_game
            .split_first()
            .unwrap_or_else(|| panic!("at least one game score vector is required"));
        assert!(
            rest.iter().all(|scores| scores.len() == first.len()),
            "every game must score the same number of agents"
        );
        let mut combined = first.clone();
        for scores in rest {
            for (total, &score) in combined.iter_mut().zip(scores) {
                *total = match self {
                    Self::Min => total.min(score),
                    Self::Sum => *total + score,
                };
            }
        }
        combined
    }
}
