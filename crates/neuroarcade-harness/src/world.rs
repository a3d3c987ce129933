//! The seam between the harness and a game implementation.
//!
//! Physics, collision and scoring belong to the game. The harness only needs
//! to observe agents, hand them actions and advance time.

use std::{fmt, str::FromStr};

use neuroarcade_network::architecture::{DINO_HEAD, FLAPPY_HEAD};
use serde::{Deserialize, Serialize};

use crate::features::{FeatureScale, Observation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Flappy,
    Dino,
}

impl GameKind {
    pub const ALL: [Self; 2] = [Self::Flappy, Self::Dino];

    /// Name of the network head that plays this game.
    #[must_use]
    pub fn head_name(self) -> &'static str {
        match self {
            Self::Flappy => FLAPPY_HEAD,
            Self::Dino => DINO_HEAD,
        }
    }

    #[must_use]
    pub fn default_scale(self) -> FeatureScale {
        match self {
            Self::Flappy => FeatureScale::FLAPPY,
            Self::Dino => FeatureScale::DINO,
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.head_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown game `{input}`, expected `flappy` or `dino`")]
pub struct ParseGameKindError {
    #[error(not(source))]
    pub input: String,
}

impl FromStr for GameKind {
    type Err = ParseGameKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|game| game.head_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseGameKindError {
                input: s.to_owned(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlappyAction {
    /// Apply the upward impulse.
    Flap,
    /// Let gravity act.
    Glide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DinoAction {
    /// Jump and leave the crouch.
    Jump,
    Duck,
    /// Stand up and keep running.
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    Flappy(FlappyAction),
    Dino(DinoAction),
}

/// A running game shared by a whole population, one avatar per agent.
///
/// Agent indices are population indices. The harness calls [`apply`](Self::apply)
/// only for live agents, then [`step`](Self::step) once per tick.
pub trait GameWorld {
    fn game(&self) -> GameKind;

    /// Restarts the game with every avatar alive.
    fn reset(&mut self);

    fn agent_count(&self) -> usize;

    fn is_alive(&self, agent: usize) -> bool;

    /// State of `agent` at the start of the current tick.
    fn observe(&self, agent: usize) -> Observation;

    fn apply(&mut self, agent: usize, action: GameAction);

    /// Advances the game by one tick.
    fn step(&mut self);

    /// Score of `agent` so far. Must be finite and non-negative.
    fn fitness(&self, agent: usize) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_kind() {
        assert_eq!("flappy".parse(), Ok(GameKind::Flappy));
        assert_eq!("Dino".parse(), Ok(GameKind::Dino));
        assert_eq!(
            "pong".parse::<GameKind>(),
            Err(ParseGameKindError {
                input: "pong".to_owned()
            })
        );
    }

    #[test]
    fn test_display_matches_head_name() {
        for game in GameKind::ALL {
            assert_eq!(game.to_string(), game.head_name());
            assert_eq!(game.to_string().parse(), Ok(game));
        }
    }
}
