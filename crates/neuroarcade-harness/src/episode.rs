//! Driving a population through one game episode.
//!
//! # Tick Loop
//!
//! 1. **Stop checks** - The episode ends when no agent is alive, or when an
//!    [`EpisodeLimits`] cap is reached
//! 2. **Observe** - Every live agent's observation is encoded into a feature
//!    vector, followed by the one-hot discriminator if the network uses one
//! 3. **Decide** - Live agents decide in parallel across worker threads;
//!    no agent sees another's decision
//! 4. **Act** - Actions are applied sequentially in agent order, then the
//!    world advances one tick
//!
//! After the loop the world's per-agent fitness is collected.

use std::{num::NonZeroUsize, sync::Arc, thread};

use neuroarcade_network::{
    Architecture, Decision, OutputSlot,
    architecture::{DUCK_OUTPUT, JUMP_OUTPUT},
};
use neuroarcade_training::{agent::Agent, genetic::Population};
use serde::{Deserialize, Serialize};

use crate::{
    features::{FEATURE_COUNT, FeatureScale, Observation},
    world::{DinoAction, FlappyAction, GameAction, GameKind, GameWorld},
};

/// Score at which an episode is cut short when none is configured.
pub const DEFAULT_MAX_FITNESS: f32 = 200.0;
/// Tick budget of an episode when none is configured.
pub const DEFAULT_MAX_TICKS: u64 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum HarnessError {
    #[display("architecture takes {actual} game features but games provide {expected}")]
    FeatureCountMismatch { expected: usize, actual: usize },
    #[display("architecture has no `{game}` head")]
    MissingHead { game: GameKind },
    #[display("head `{head}` has no `{output}` output")]
    MissingOutput { head: String, output: String },
}

/// Caps that bound runaway episodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeLimits {
    pub max_ticks: Option<u64>,
    /// The episode stops once any agent reaches this fitness.
    pub max_fitness: Option<f32>,
}

impl Default for EpisodeLimits {
    fn default() -> Self {
        Self {
            max_ticks: Some(DEFAULT_MAX_TICKS),
            max_fitness: Some(DEFAULT_MAX_FITNESS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    AllTerminated,
    TickLimit,
    FitnessLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    pub game: GameKind,
    /// Fitness per agent, index-aligned with the population.
    pub fitness: Vec<f32>,
    pub ticks: u64,
    pub stop: StopReason,
}

/// Output slots a game reads from a decision.
#[derive(Debug, Clone, Copy)]
struct HeadBinding {
    head: usize,
    jump: OutputSlot,
    duck: Option<OutputSlot>,
}

impl HeadBinding {
    fn resolve(architecture: &Architecture, game: GameKind) -> Result<Option<Self>, HarnessError> {
        let name = game.head_name();
        let Some(head) = architecture.head_index(name) else {
            return Ok(None);
        };
        let slot = |output: &str| {
            architecture
                .output_slot(name, output)
                .ok_or_else(|| HarnessError::MissingOutput {
                    head: name.to_owned(),
                    output: output.to_owned(),
                })
        };
        let jump = slot(JUMP_OUTPUT)?;
        let duck = match game {
            GameKind::Flappy => None,
            GameKind::Dino => Some(slot(DUCK_OUTPUT)?),
        };
        Ok(Some(Self { head, jump, duck }))
    }

    fn action(&self, game: GameKind, decision: &Decision) -> GameAction {
        match game {
            GameKind::Flappy => GameAction::Flappy(if decision.fired(self.jump) {
                FlappyAction::Flap
            } else {
                FlappyAction::Glide
            }),
            GameKind::Dino => GameAction::Dino(if decision.fired(self.jump) {
                DinoAction::Jump
            } else if self.duck.is_some_and(|duck| decision.fired(duck)) {
                DinoAction::Duck
            } else {
                DinoAction::Run
            }),
        }
    }
}

/// Plays populations through game worlds using one network architecture.
#[derive(Debug, Clone)]
pub struct Harness {
    architecture: Arc<Architecture>,
    flappy: Option<HeadBinding>,
    dino: Option<HeadBinding>,
    flappy_scale: FeatureScale,
    dino_scale: FeatureScale,
    workers: NonZeroUsize,
}

impl Harness {
    /// Binds game heads of `architecture`.
    ///
    /// Games whose head is absent are rejected later, when an episode for
    /// them is requested. A head that exists but lacks an output its game
    /// needs is rejected here.
    pub fn new(architecture: Arc<Architecture>) -> Result<Self, HarnessError> {
        if architecture.feature_count() != FEATURE_COUNT {
            return Err(HarnessError::FeatureCountMismatch {
                expected: FEATURE_COUNT,
                actual: architecture.feature_count(),
            });
        }
        let flappy = HeadBinding::resolve(&architecture, GameKind::Flappy)?;
        let dino = HeadBinding::resolve(&architecture, GameKind::Dino)?;
        Ok(Self {
            architecture,
            flappy,
            dino,
            flappy_scale: FeatureScale::FLAPPY,
            dino_scale: FeatureScale::DINO,
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        })
    }

    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, game: GameKind, scale: FeatureScale) -> Self {
        match game {
            GameKind::Flappy => self.flappy_scale = scale,
            GameKind::Dino => self.dino_scale = scale,
        }
        self
    }

    #[must_use]
    pub fn architecture(&self) -> &Arc<Architecture> {
        &self.architecture
    }

    #[must_use]
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    #[must_use]
    pub fn supports(&self, game: GameKind) -> bool {
        self.binding(game).is_ok()
    }

    fn binding(&self, game: GameKind) -> Result<HeadBinding, HarnessError> {
        match game {
            GameKind::Flappy => self.flappy,
            GameKind::Dino => self.dino,
        }
        .ok_or(HarnessError::MissingHead { game })
    }

    fn scale(&self, game: GameKind) -> &FeatureScale {
        match game {
            GameKind::Flappy => &self.flappy_scale,
            GameKind::Dino => &self.dino_scale,
        }
    }

    /// Appends the full network input for `features` of `game` to `out`.
    fn push_input(&self, binding: HeadBinding, features: &[f32; FEATURE_COUNT], out: &mut Vec<f32>) {
        out.extend_from_slice(features);
        if self.architecture.discriminator_range().is_some() {
            out.extend((0..self.architecture.head_count()).map(|head| {
                if head == binding.head { 1.0 } else { 0.0 }
            }));
        }
    }

    /// Builds the network input for already normalized game features.
    pub fn input_for(
        &self,
        game: GameKind,
        features: &[f32; FEATURE_COUNT],
    ) -> Result<Vec<f32>, HarnessError> {
        let binding = self.binding(game)?;
        let mut input = Vec::with_capacity(self.architecture.input_size());
        self.push_input(binding, features, &mut input);
        Ok(input)
    }

    /// Normalizes an observation into the network input for its game.
    pub fn encode(&self, observation: &Observation) -> Result<Vec<f32>, HarnessError> {
        let (game, features) = match observation {
            Observation::Flappy(o) => (GameKind::Flappy, o.encode(&self.flappy_scale)),
            Observation::Dino(o) => (GameKind::Dino, o.encode(&self.dino_scale)),
        };
        self.input_for(game, &features)
    }

    /// Maps a decision onto `game`'s action.
    pub fn action_for(&self, game: GameKind, decision: &Decision) -> Result<GameAction, HarnessError> {
        Ok(self.binding(game)?.action(game, decision))
    }

    /// Plays one episode of `world` with every agent of `population`.
    ///
    /// The world is reset first.
    ///
    /// # Panics
    ///
    /// Panics if the world hosts a different number of agents than the
    /// population, if the population uses another architecture, or if the
    /// world returns an observation for the wrong game.
    pub fn run_episode<W>(
        &self,
        world: &mut W,
        population: &Population,
        limits: &EpisodeLimits,
    ) -> Result<EpisodeOutcome, HarnessError>
    where
        W: GameWorld + ?Sized,
    {
        let game = world.game();
        let binding = self.binding(game)?;
        assert_eq!(
            world.agent_count(),
            population.len(),
            "world must host exactly one avatar per agent"
        );
        assert!(
            population.architecture().config() == self.architecture.config(),
            "population must use the harness architecture"
        );

        world.reset();
        let agent_count = population.len();
        let scale = *self.scale(game);
        let mut alive = Vec::with_capacity(agent_count);
        let mut inputs = Vec::new();
        let mut ticks = 0;

        let stop = loop {
            alive.clear();
            alive.extend((0..agent_count).filter(|&agent| world.is_alive(agent)));
            if alive.is_empty() {
                break StopReason::AllTerminated;
            }
            if limits.max_ticks.is_some_and(|max| ticks >= max) {
                break StopReason::TickLimit;
            }
            if let Some(max) = limits.max_fitness
                && (0..agent_count).any(|agent| world.fitness(agent) >= max)
            {
                break StopReason::FitnessLimit;
            }

            inputs.clear();
            for &agent in &alive {
                let features = match (game, world.observe(agent)) {
                    (GameKind::Flappy, Observation::Flappy(o)) => o.encode(&scale),
                    (GameKind::Dino, Observation::Dino(o)) => o.encode(&scale),
                    (game, observation) => {
                        panic!("{game} world returned a foreign observation: {observation:?}")
                    }
                };
                self.push_input(binding, &features, &mut inputs);
            }

            let decisions = self.decide_all(population.agents(), &alive, &inputs);
            for (&agent, decision) in alive.iter().zip(&decisions) {
                world.apply(agent, binding.action(game, decision));
            }
            world.step();
            ticks += 1;
        };

        Ok(EpisodeOutcome {
            game,
            fitness: (0..agent_count).map(|agent| world.fitness(agent)).collect(),
            ticks,
            stop,
        })
    }

    /// Decisions of `agents[alive[k]]` for the `k`-th input row.
    fn decide_all(&self, agents: &[Agent], alive: &[usize], inputs: &[f32]) -> Vec<Decision> {
        let width = self.architecture.input_size();
        let chunk_len = alive.len().div_ceil(self.workers.get());
        let decide_chunk = |indices: &[usize], rows: &[f32]| {
            indices
                .iter()
                .zip(rows.chunks_exact(width))
                .map(|(&agent, row)| agents[agent].decide(row))
                .collect::<Vec<_>>()
        };

        if self.workers.get() == 1 || alive.len() <= chunk_len {
            return decide_chunk(alive, inputs);
        }

        thread::scope(|s| {
            let handles = alive
                .chunks(chunk_len)
                .zip(inputs.chunks(chunk_len * width))
                .map(|(indices, rows)| s.spawn(move || decide_chunk(indices, rows)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use neuroarcade_network::{ArchitectureConfig, Genome, HeadSpec};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::features::{DinoObservation, FlappyObservation, ObstacleObservation};

    /// A world whose avatars die at scripted ticks and score one point per
    /// tick alive. Every applied action is recorded.
    #[derive(Debug)]
    pub(crate) struct ScriptedWorld {
        pub(crate) game: GameKind,
        pub(crate) lifetimes: Vec<u64>,
        pub(crate) tick: u64,
        pub(crate) actions: Vec<Vec<GameAction>>,
        pub(crate) resets: usize,
    }

    impl ScriptedWorld {
        pub(crate) fn new(game: GameKind, lifetimes: Vec<u64>) -> Self {
            Self {
                game,
                actions: vec![Vec::new(); lifetimes.len()],
                lifetimes,
                tick: 0,
                resets: 0,
            }
        }
    }

    impl GameWorld for ScriptedWorld {
        fn game(&self) -> GameKind {
            self.game
        }

        fn reset(&mut self) {
            self.tick = 0;
            self.resets += 1;
            for actions in &mut self.actions {
                actions.clear();
            }
        }

        fn agent_count(&self) -> usize {
            self.lifetimes.len()
        }

        fn is_alive(&self, agent: usize) -> bool {
            self.tick < self.lifetimes[agent]
        }

        #[expect(clippy::cast_precision_loss)]
        fn observe(&self, agent: usize) -> Observation {
            let progress = self.tick as f32;
            match self.game {
                GameKind::Flappy => Observation::Flappy(FlappyObservation {
                    bird_y: 300.0 + agent as f32,
                    bird_vy: 0.0,
                    pipe: None,
                    scroll_speed: 3.0,
                }),
                GameKind::Dino => Observation::Dino(DinoObservation {
                    dino_vy: 0.0,
                    obstacle: Some(ObstacleObservation {
                        dx: 400.0 - progress,
                        y: 220.0,
                        height: 40.0,
                    }),
                    speed: 6.0,
                }),
            }
        }

        fn apply(&mut self, agent: usize, action: GameAction) {
            assert!(self.is_alive(agent), "action applied to a dead agent");
            self.actions[agent].push(action);
        }

        fn step(&mut self) {
            self.tick += 1;
        }

        #[expect(clippy::cast_precision_loss)]
        fn fitness(&self, agent: usize) -> f32 {
            self.tick.min(self.lifetimes[agent]) as f32
        }
    }

    pub(crate) fn dual_architecture() -> Arc<Architecture> {
        Arc::new(ArchitectureConfig::dual_game(FEATURE_COUNT, 4).build().unwrap())
    }

    /// Agents whose head biases are fixed, so every output fires or not
    /// regardless of the features.
    pub(crate) fn biased_agent(architecture: &Arc<Architecture>, head_biases: &[f32]) -> Agent {
        let mut genome = Genome::zeros(architecture);
        let mut biases = head_biases.iter();
        for layer in architecture.head_layers() {
            for gene in &mut genome.genes_mut()[layer.bias_range()] {
                *gene = *biases.next().unwrap();
            }
        }
        Agent::with_genome(Arc::clone(architecture), genome)
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let architecture = Arc::new(ArchitectureConfig::dual_game(4, 4).build().unwrap());
        assert_eq!(
            Harness::new(architecture).unwrap_err(),
            HarnessError::FeatureCountMismatch {
                expected: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn test_rejects_head_without_required_output() {
        let architecture = Arc::new(
            ArchitectureConfig::single_head(5, 4, HeadSpec::new("dino", ["jump"]))
                .build()
                .unwrap(),
        );
        assert!(matches!(
            Harness::new(architecture),
            Err(HarnessError::MissingOutput { .. })
        ));
    }

    #[test]
    fn test_single_head_harness_reports_missing_game() {
        let architecture = Arc::new(
            ArchitectureConfig::single_head(5, 4, HeadSpec::new("flappy", ["jump"]))
                .build()
                .unwrap(),
        );
        let harness = Harness::new(Arc::clone(&architecture)).unwrap();
        assert!(harness.supports(GameKind::Flappy));
        assert!(!harness.supports(GameKind::Dino));

        let mut rng = Pcg32::seed_from_u64(41);
        let population = Population::random(&architecture, 2, &mut rng);
        let mut world = ScriptedWorld::new(GameKind::Dino, vec![1, 1]);
        assert_eq!(
            harness
                .run_episode(&mut world, &population, &EpisodeLimits::default())
                .unwrap_err(),
            HarnessError::MissingHead {
                game: GameKind::Dino
            }
        );
    }

    mod input {
        use super::*;

        #[test]
        fn test_discriminator_marks_game_head() {
            let harness = Harness::new(dual_architecture()).unwrap();
            let features = [0.1, 0.2, 0.3, 0.4, 0.5];
            assert_eq!(
                harness.input_for(GameKind::Flappy, &features).unwrap(),
                vec![0.1, 0.2, 0.3, 0.4, 0.5, 1.0, 0.0]
            );
            assert_eq!(
                harness.input_for(GameKind::Dino, &features).unwrap(),
                vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.0, 1.0]
            );
        }

        #[test]
        fn test_no_discriminator_for_single_head() {
            let architecture = Arc::new(
                ArchitectureConfig::single_head(5, 4, HeadSpec::new("dino", ["jump", "duck"]))
                    .build()
                    .unwrap(),
            );
            let harness = Harness::new(architecture).unwrap();
            let observation = Observation::Dino(DinoObservation {
                dino_vy: 0.0,
                obstacle: None,
                speed: 6.0,
            });
            assert_eq!(
                harness.encode(&observation).unwrap(),
                vec![1.0, 0.0, 0.0, 0.0, 1.0]
            );
        }
    }

    mod actions {
        use super::*;

        fn dino_action(head_biases: &[f32]) -> GameAction {
            let architecture = dual_architecture();
            let harness = Harness::new(Arc::clone(&architecture)).unwrap();
            let agent = biased_agent(&architecture, head_biases);
            let input = harness.input_for(GameKind::Dino, &[0.0; 5]).unwrap();
            harness
                .action_for(GameKind::Dino, &agent.decide(&input))
                .unwrap()
        }

        #[test]
        fn test_dino_jump_wins_over_duck() {
            assert_eq!(dino_action(&[0.0, 3.0, 3.0]), GameAction::Dino(DinoAction::Jump));
            assert_eq!(dino_action(&[0.0, -3.0, 3.0]), GameAction::Dino(DinoAction::Duck));
            assert_eq!(dino_action(&[0.0, -3.0, -3.0]), GameAction::Dino(DinoAction::Run));
        }

        #[test]
        fn test_flappy_reads_only_its_head() {
            let architecture = dual_architecture();
            let harness = Harness::new(Arc::clone(&architecture)).unwrap();
            let input = harness.input_for(GameKind::Flappy, &[0.0; 5]).unwrap();

            let flapper = biased_agent(&architecture, &[3.0, -3.0, -3.0]);
            assert_eq!(
                harness.action_for(GameKind::Flappy, &flapper.decide(&input)).unwrap(),
                GameAction::Flappy(FlappyAction::Flap)
            );
            let glider = biased_agent(&architecture, &[-3.0, 3.0, 3.0]);
            assert_eq!(
                harness.action_for(GameKind::Flappy, &glider.decide(&input)).unwrap(),
                GameAction::Flappy(FlappyAction::Glide)
            );
        }
    }

    mod run_episode {
        use super::*;

        fn harness(workers: usize) -> Harness {
            Harness::new(dual_architecture())
                .unwrap()
                .with_workers(NonZeroUsize::new(workers).unwrap())
        }

        #[test]
        fn test_runs_until_all_terminated() {
            let harness = harness(1);
            let mut rng = Pcg32::seed_from_u64(42);
            let population = Population::random(harness.architecture(), 3, &mut rng);
            let mut world = ScriptedWorld::new(GameKind::Flappy, vec![4, 9, 2]);

            let outcome = harness
                .run_episode(&mut world, &population, &EpisodeLimits::default())
                .unwrap();

            assert_eq!(outcome.stop, StopReason::AllTerminated);
            assert_eq!(outcome.ticks, 9);
            assert_eq!(outcome.fitness, vec![4.0, 9.0, 2.0]);
            let applied = world.actions.iter().map(Vec::len).collect::<Vec<_>>();
            assert_eq!(applied, vec![4, 9, 2]);
            assert_eq!(world.resets, 1);
        }

        #[test]
        fn test_fitness_cap_stops_episode() {
            let harness = harness(2);
            let mut rng = Pcg32::seed_from_u64(43);
            let population = Population::random(harness.architecture(), 2, &mut rng);
            let mut world = ScriptedWorld::new(GameKind::Dino, vec![1000, 3]);
            let limits = EpisodeLimits {
                max_ticks: None,
                max_fitness: Some(25.0),
            };

            let outcome = harness.run_episode(&mut world, &population, &limits).unwrap();

            assert_eq!(outcome.stop, StopReason::FitnessLimit);
            assert_eq!(outcome.ticks, 25);
            assert_eq!(outcome.fitness, vec![25.0, 3.0]);
        }

        #[test]
        fn test_tick_cap_stops_episode() {
            let harness = harness(1);
            let mut rng = Pcg32::seed_from_u64(44);
            let population = Population::random(harness.architecture(), 1, &mut rng);
            let mut world = ScriptedWorld::new(GameKind::Dino, vec![1000]);
            let limits = EpisodeLimits {
                max_ticks: Some(7),
                max_fitness: None,
            };

            let outcome = harness.run_episode(&mut world, &population, &limits).unwrap();

            assert_eq!(outcome.stop, StopReason::TickLimit);
            assert_eq!(outcome.ticks, 7);
        }

        #[test]
        fn test_parallel_decisions_match_sequential() {
            let mut rng = Pcg32::seed_from_u64(45);
            let architecture = dual_architecture();
            let population = Population::random(&architecture, 37, &mut rng);
            let lifetimes = (0..37).map(|i| 5 + i % 11).collect::<Vec<u64>>();

            let run = |workers: usize| {
                let mut world = ScriptedWorld::new(GameKind::Dino, lifetimes.clone());
                let outcome = harness(workers)
                    .run_episode(&mut world, &population, &EpisodeLimits::default())
                    .unwrap();
                (outcome, world.actions)
            };

            let sequential = run(1);
            for workers in [2, 4, 64] {
                assert_eq!(run(workers), sequential);
            }
        }

        #[test]
        #[should_panic(expected = "one avatar per agent")]
        fn test_agent_count_mismatch_panics() {
            let harness = harness(1);
            let mut rng = Pcg32::seed_from_u64(46);
            let population = Population::random(harness.architecture(), 2, &mut rng);
            let mut world = ScriptedWorld::new(GameKind::Flappy, vec![1, 1, 1]);
            let _ = harness.run_episode(&mut world, &population, &EpisodeLimits::default());
        }
    }
}
