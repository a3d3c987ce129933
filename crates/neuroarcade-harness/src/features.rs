//! Normalized feature vectors for each game.
//!
//! Every game produces [`FEATURE_COUNT`] values per agent per tick. The
//! discriminator suffix is not part of these; the harness appends it.
//!
//! | index | Flappy                           | Dino                             |
//! |-------|----------------------------------|----------------------------------|
//! | 0     | bird y / height                  | obstacle dx / width              |
//! | 1     | bird vy / velocity scale         | obstacle y / height              |
//! | 2     | pipe dx / width                  | obstacle height / height         |
//! | 3     | gap centre dy / height           | dino vy / velocity scale         |
//! | 4     | time until the pipe arrives      | time to collision                |
//!
//! Time features are `dx / max(speed, SPEED_EPSILON)` divided by the horizon
//! and clamped to `[0, 1]`, so a stalled world never yields infinities.

use serde::{Deserialize, Serialize};

/// Game features per tick, excluding the discriminator.
pub const FEATURE_COUNT: usize = 5;

/// Smallest speed used when converting distances into times.
pub const SPEED_EPSILON: f32 = 1e-3;

/// Screen extent used to normalize positions and distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub width: f32,
    pub height: f32,
}

impl Screen {
    pub const FLAPPY: Self = Self {
        width: 400.0,
        height: 600.0,
    };
    pub const DINO: Self = Self {
        width: 800.0,
        height: 300.0,
    };
}

/// Divisors that bring one game's raw measurements into roughly `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScale {
    pub screen: Screen,
    /// Vertical velocity that maps to `1.0`
    pub velocity_scale: f32,
    /// Ticks that map to a time feature of `1.0`
    pub horizon_ticks: f32,
}

impl FeatureScale {
    pub const FLAPPY: Self = Self {
        screen: Screen::FLAPPY,
        velocity_scale: 10.0,
        horizon_ticks: 120.0,
    };
    pub const DINO: Self = Self {
        screen: Screen::DINO,
        velocity_scale: 10.0,
        horizon_ticks: 120.0,
    };

    /// Normalized time until something `dx` away arrives at `speed` per tick.
    #[must_use]
    pub fn time_to_reach(&self, dx: f32, speed: f32) -> f32 {
        (dx / speed.max(SPEED_EPSILON) / self.horizon_ticks).clamp(0.0, 1.0)
    }
}

/// Next pipe relative to the bird.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeObservation {
    /// Horizontal distance from the bird to the pipe
    pub dx: f32,
    /// Gap centre minus bird y
    pub gap_dy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlappyObservation {
    pub bird_y: f32,
    pub bird_vy: f32,
    pub pipe: Option<PipeObservation>,
    /// Horizontal pipe speed per tick
    pub scroll_speed: f32,
}

/// Next obstacle relative to the dino.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleObservation {
    pub dx: f32,
    pub y: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DinoObservation {
    pub dino_vy: f32,
    pub obstacle: Option<ObstacleObservation>,
    /// Current game speed per tick
    pub speed: f32,
}

/// Raw per-agent game state handed to the harness by a world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    Flappy(FlappyObservation),
    Dino(DinoObservation),
}

impl FlappyObservation {
    #[must_use]
    pub fn encode(&self, scale: &FeatureScale) -> [f32; FEATURE_COUNT] {
        let screen = scale.screen;
        let y = self.bird_y / screen.height;
        let vy = self.bird_vy / scale.velocity_scale;
        match self.pipe {
            Some(pipe) => [
                y,
                vy,
                pipe.dx / screen.width,
                pipe.gap_dy / screen.height,
                scale.time_to_reach(pipe.dx, self.scroll_speed),
            ],
            None => [y, vy, 1.0, 0.0, 1.0],
        }
    }
}

impl DinoObservation {
    #[must_use]
    pub fn encode(&self, scale: &FeatureScale) -> [f32; FEATURE_COUNT] {
        let screen = scale.screen;
        let vy = self.dino_vy / scale.velocity_scale;
        match self.obstacle {
            Some(obstacle) => [
                obstacle.dx / screen.width,
                obstacle.y / screen.height,
                obstacle.height / screen.height,
                vy,
                scale.time_to_reach(obstacle.dx, self.speed),
            ],
            None => [1.0, 0.0, 0.0, vy, 1.0],
        }
    }
}
