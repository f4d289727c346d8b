//! The simulation engine: owns the roster and the sector grid together and
//! drives the per-step update.

use crate::agent::{Agent, Temperament};
use crate::config::{SimConfig, SimConfigError};
use crate::render::Surface;
use crate::sector::{AgentHandle, SectorGrid, SectorGridError};
use crate::sequence::SequenceContainer;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use std::time::Duration;
use std::{error::Error, fmt};

#[derive(Clone, Debug, PartialEq)]
pub enum LandscapeError {
    Config(SimConfigError),
    Grid(SectorGridError),
}

impl fmt::Display for LandscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandscapeError::Config(e) => write!(f, "{e}"),
            LandscapeError::Grid(e) => write!(f, "{e}"),
        }
    }
}

impl Error for LandscapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LandscapeError::Config(e) => Some(e),
            LandscapeError::Grid(e) => Some(e),
        }
    }
}

impl From<SimConfigError> for LandscapeError {
    fn from(err: SimConfigError) -> Self {
        LandscapeError::Config(err)
    }
}

impl From<SectorGridError> for LandscapeError {
    fn from(err: SectorGridError) -> Self {
        LandscapeError::Grid(err)
    }
}

/// Outcome of one `advance` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub step: usize,
    /// Agents whose position actually changed this step.
    pub moved: usize,
    /// Set when the step left every agent in place.
    pub paused: bool,
}

/// Single-threaded simulation engine.
///
/// Exactly one step executes at a time; the roster, buckets and agent
/// positions are one shared mutable resource with no internal locking.
/// Cancellation is cooperative through the `paused` flag, checked between
/// steps — an in-flight `advance` always completes.
pub struct Landscape {
    config: SimConfig,
    roster: SequenceContainer<Agent>,
    grid: SectorGrid,
    rng: ChaCha12Rng,
    paused: bool,
    step_index: usize,
}

impl Landscape {
    /// Build and populate a landscape, panicking on invalid configuration.
    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(config: SimConfig) -> Result<Self, LandscapeError> {
        config.validate()?;
        let grid = SectorGrid::new(
            config.width,
            config.height,
            config.cell_size,
            config.candidate_policy,
        )?;
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        let mut landscape = Self {
            config,
            roster: SequenceContainer::new(),
            grid,
            rng,
            paused: false,
            step_index: 0,
        };
        landscape.populate();
        Ok(landscape)
    }

    fn populate(&mut self) {
        for _ in 0..self.config.social_count {
            let pos = self.random_position();
            self.spawn(Temperament::Social, pos, self.config.social_radius);
        }
        for _ in 0..self.config.antisocial_count {
            let pos = self.random_position();
            self.spawn(Temperament::AntiSocial, pos, self.config.antisocial_radius);
        }
    }

    fn random_position(&mut self) -> [f64; 2] {
        [
            self.rng.random::<f64>() * self.config.width,
            self.rng.random::<f64>() * self.config.height,
        ]
    }

    /// Append an agent to the roster and track it in the grid.
    ///
    /// # Panics
    /// Panics when `position` lies outside `[0, width) x [0, height)`.
    pub fn spawn(
        &mut self,
        temperament: Temperament,
        position: [f64; 2],
        radius: f64,
    ) -> AgentHandle {
        let handle = self
            .roster
            .push_back(Agent::new(temperament, position, radius));
        self.grid.insert(handle, position);
        handle
    }

    /// Run one simulation step: a single consistent pass over the roster.
    ///
    /// Each agent queries its neighborhood, applies its temperament's
    /// decision, and on a move has its bucket membership re-established
    /// atomically. When no agent moved, the engine pauses itself. This is
    /// per-step stillness detection only: an oscillating population runs
    /// until paused externally.
    pub fn advance(&mut self) -> StepReport {
        self.step_index += 1;
        let handles: Vec<AgentHandle> = self.roster.handles().collect();
        let mut moved = 0;
        for handle in handles {
            let (pos, radius, temperament) = {
                let agent = self
                    .roster
                    .node_mut(handle)
                    .expect("roster handle vanished during the pass");
                agent.clear_moved();
                (agent.position(), agent.radius(), agent.temperament())
            };
            let neighbor_count = self
                .grid
                .neighbors(pos[0], pos[1], radius, &self.roster)
                .iter()
                .filter(|&&other| other != handle)
                .count();
            if !temperament.wants_to_move(neighbor_count) {
                continue;
            }
            let bounds = [self.config.width, self.config.height];
            let target = {
                let agent = self
                    .roster
                    .node(handle)
                    .expect("roster handle vanished during the pass");
                agent.relocation_target(bounds, &mut self.rng)
            };
            let agent = self
                .roster
                .node_mut(handle)
                .expect("roster handle vanished during the pass");
            agent.set_position(target);
            if agent.moved() {
                moved += 1;
            }
            self.grid.relocate(handle, target);
        }
        if moved == 0 {
            self.paused = true;
        }
        StepReport {
            step: self.step_index,
            moved,
            paused: self.paused,
        }
    }

    /// Cancellable run loop: advance, notify, sleep, repeat while not
    /// paused. An explicit loop, never recursion, so long runs cannot grow
    /// the call stack. The tick callback may pause the engine (or a user
    /// action may have done so); the check happens between steps.
    pub fn play<F>(&mut self, mut on_tick: F)
    where
        F: FnMut(&mut Landscape),
    {
        while !self.paused {
            self.advance();
            on_tick(self);
            if self.paused {
                break;
            }
            std::thread::sleep(Duration::from_millis(self.config.step_interval_ms));
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Discard all agents and buckets, then repopulate from the current
    /// configuration.
    pub fn reset(&mut self) {
        self.roster.clear();
        self.grid.clear();
        self.paused = false;
        self.step_index = 0;
        self.populate();
    }

    pub fn width(&self) -> f64 {
        self.config.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    pub fn agent_count(&self) -> usize {
        self.roster.len()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.config.step_interval_ms)
    }

    pub fn set_step_interval(&mut self, interval: Duration) {
        self.config.step_interval_ms = interval.as_millis() as u64;
    }

    /// Resize the plane. Rebuilds the grid and repopulates from scratch;
    /// the old population cannot be carried over because positions are only
    /// valid relative to the dimensions they were drawn in.
    pub fn set_dimensions(&mut self, width: f64, height: f64) -> Result<(), LandscapeError> {
        let config = SimConfig {
            width,
            height,
            ..self.config.clone()
        };
        config.validate()?;
        self.grid = SectorGrid::new(width, height, config.cell_size, config.candidate_policy)?;
        self.config = config;
        self.reset();
        Ok(())
    }

    /// Update the configured population sizes; takes effect on the next
    /// `reset`.
    pub fn set_agent_counts(&mut self, social: usize, antisocial: usize) {
        self.config.social_count = social;
        self.config.antisocial_count = antisocial;
    }

    /// Update the configured radius for one temperament and apply it to the
    /// live agents of that temperament.
    pub fn set_radius(&mut self, temperament: Temperament, radius: f64) {
        match temperament {
            Temperament::Social => self.config.social_radius = radius,
            Temperament::AntiSocial => self.config.antisocial_radius = radius,
        }
        let handles: Vec<AgentHandle> = self.roster.handles().collect();
        for handle in handles {
            if let Some(agent) = self.roster.node_mut(handle) {
                if agent.temperament() == temperament {
                    agent.set_radius(radius);
                }
            }
        }
    }

    pub fn roster(&self) -> &SequenceContainer<Agent> {
        &self.roster
    }

    pub fn grid(&self) -> &SectorGrid {
        &self.grid
    }

    pub fn agent(&self, handle: AgentHandle) -> Option<&Agent> {
        self.roster.node(handle)
    }

    /// Neighbors of a roster member within its own radius, self excluded.
    pub fn neighbors_of(&self, handle: AgentHandle) -> Vec<AgentHandle> {
        let Some(agent) = self.roster.node(handle) else {
            return Vec::new();
        };
        let [x, y] = agent.position();
        let mut found = self.grid.neighbors(x, y, agent.radius(), &self.roster);
        found.retain(|&other| other != handle);
        found
    }

    /// Walk the roster read-only and delegate each agent to the surface.
    pub fn draw(&self, surface: &mut dyn Surface, scale: f64) {
        for agent in self.roster.iter() {
            agent.draw(surface, scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CandidatePolicy;

    fn empty_config() -> SimConfig {
        SimConfig {
            social_count: 0,
            antisocial_count: 0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn try_new_rejects_invalid_config() {
        let config = SimConfig {
            width: 105.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            Landscape::try_new(config),
            Err(LandscapeError::Config(
                SimConfigError::ExtentNotDivisible { .. }
            ))
        ));
    }

    #[test]
    fn construction_populates_the_configured_counts() {
        let config = SimConfig {
            social_count: 7,
            antisocial_count: 4,
            ..SimConfig::default()
        };
        let landscape = Landscape::new(config);
        assert_eq!(landscape.agent_count(), 11);
        assert_eq!(landscape.grid().len(), 11);
        let socials = landscape
            .roster()
            .iter()
            .filter(|a| a.temperament() == Temperament::Social)
            .count();
        assert_eq!(socials, 7);
    }

    #[test]
    fn populated_agents_start_in_bounds_and_in_their_cells() {
        let landscape = Landscape::new(SimConfig::default());
        for handle in landscape.roster().handles() {
            let agent = landscape.agent(handle).unwrap();
            let [x, y] = agent.position();
            assert!((0.0..landscape.width()).contains(&x));
            assert!((0.0..landscape.height()).contains(&y));
            assert_eq!(
                landscape.grid().placement_of(handle),
                landscape.grid().cell_of(x, y)
            );
        }
    }

    #[test]
    fn lone_social_agent_relocates_within_the_clamped_box() {
        // 100x100 grid, cell size 10, one social agent at (5,5) with radius
        // 3 and three antisocial agents well out of range
        let mut landscape = Landscape::new(empty_config());
        let social = landscape.spawn(Temperament::Social, [5.0, 5.0], 3.0);
        landscape.spawn(Temperament::AntiSocial, [95.0, 95.0], 10.0);
        landscape.spawn(Temperament::AntiSocial, [0.0, 0.0], 10.0);
        landscape.spawn(Temperament::AntiSocial, [50.0, 50.0], 10.0);

        // radius 3 around (5,5) reaches nobody but the agent itself
        let found = landscape.grid().neighbors(5.0, 5.0, 3.0, landscape.roster());
        assert_eq!(found, vec![social]);
        assert!(landscape.neighbors_of(social).is_empty());

        landscape.advance();

        let agent = landscape.agent(social).unwrap();
        assert!(agent.moved());
        let [x, y] = agent.position();
        assert!((0.0..15.0).contains(&x), "x within the clamped +-10 box");
        assert!((0.0..15.0).contains(&y), "y within the clamped +-10 box");
        // bucket invariant: membership matches the cell of the new position
        assert_eq!(
            landscape.grid().placement_of(social),
            landscape.grid().cell_of(x, y)
        );
    }

    #[test]
    fn antisocial_agent_with_one_neighbor_stays_put() {
        let mut landscape = Landscape::new(empty_config());
        let loner = landscape.spawn(Temperament::AntiSocial, [50.0, 50.0], 10.0);
        landscape.spawn(Temperament::Social, [52.0, 50.0], 10.0);

        assert_eq!(landscape.neighbors_of(loner).len(), 1);
        landscape.advance();

        let agent = landscape.agent(loner).unwrap();
        assert!(!agent.moved());
        assert_eq!(agent.position(), [50.0, 50.0]);
    }

    #[test]
    fn antisocial_agent_with_two_neighbors_relocates() {
        let mut landscape = Landscape::new(empty_config());
        let crowded = landscape.spawn(Temperament::AntiSocial, [50.0, 50.0], 10.0);
        landscape.spawn(Temperament::Social, [52.0, 50.0], 10.0);
        landscape.spawn(Temperament::Social, [50.0, 52.0], 10.0);

        assert_eq!(landscape.neighbors_of(crowded).len(), 2);
        landscape.advance();

        let agent = landscape.agent(crowded).unwrap();
        assert!(agent.moved());
        assert_ne!(agent.position(), [50.0, 50.0]);
        let [x, y] = agent.position();
        assert_eq!(
            landscape.grid().placement_of(crowded),
            landscape.grid().cell_of(x, y)
        );
    }

    #[test]
    fn step_with_no_movement_pauses_the_engine() {
        let mut landscape = Landscape::new(empty_config());
        // five socials in a tight cluster: each sees four neighbors, so
        // nobody is lonely; nothing else is in range
        for pos in [
            [50.0, 50.0],
            [51.0, 50.0],
            [49.0, 50.0],
            [50.0, 51.0],
            [50.0, 49.0],
        ] {
            landscape.spawn(Temperament::Social, pos, 10.0);
        }
        assert!(!landscape.is_paused());
        let report = landscape.advance();
        assert_eq!(report.moved, 0);
        assert!(report.paused);
        assert!(landscape.is_paused());
    }

    #[test]
    fn bucket_invariant_holds_over_many_steps() {
        let mut landscape = Landscape::new(SimConfig {
            seed: 9,
            ..SimConfig::default()
        });
        for _ in 0..50 {
            if landscape.advance().paused {
                break;
            }
        }
        for handle in landscape.roster().handles() {
            let [x, y] = landscape.agent(handle).unwrap().position();
            assert!((0.0..landscape.width()).contains(&x));
            assert!((0.0..landscape.height()).contains(&y));
            assert_eq!(
                landscape.grid().placement_of(handle),
                landscape.grid().cell_of(x, y)
            );
        }
    }

    #[test]
    fn runs_are_reproducible_for_a_seed() {
        let config = SimConfig {
            seed: 1234,
            ..SimConfig::default()
        };
        let mut a = Landscape::new(config.clone());
        let mut b = Landscape::new(config);
        for _ in 0..10 {
            a.advance();
            b.advance();
        }
        let positions_a: Vec<[f64; 2]> = a.roster().iter().map(|x| x.position()).collect();
        let positions_b: Vec<[f64; 2]> = b.roster().iter().map(|x| x.position()).collect();
        assert_eq!(positions_a, positions_b);
    }

    #[test]
    fn reset_discards_and_repopulates() {
        let mut landscape = Landscape::new(SimConfig::default());
        let stale = landscape.roster().handles().next().unwrap();
        for _ in 0..3 {
            landscape.advance();
        }
        landscape.pause();
        landscape.reset();
        assert!(!landscape.is_paused());
        assert_eq!(landscape.agent_count(), 50);
        assert_eq!(landscape.grid().len(), 50);
        assert!(landscape.agent(stale).is_none(), "old handles die on reset");
    }

    #[test]
    fn set_radius_updates_config_and_live_agents() {
        let mut landscape = Landscape::new(SimConfig::default());
        landscape.set_radius(Temperament::Social, 25.0);
        assert_eq!(landscape.config().social_radius, 25.0);
        for agent in landscape.roster().iter() {
            match agent.temperament() {
                Temperament::Social => assert_eq!(agent.radius(), 25.0),
                Temperament::AntiSocial => assert_eq!(agent.radius(), 10.0),
            }
        }
    }

    #[test]
    fn set_dimensions_rebuilds_grid_and_population() {
        let mut landscape = Landscape::new(SimConfig::default());
        landscape.set_dimensions(200.0, 50.0).unwrap();
        assert_eq!(landscape.width(), 200.0);
        assert_eq!(landscape.grid().rows(), 5);
        assert_eq!(landscape.grid().cols(), 20);
        assert_eq!(landscape.agent_count(), 50);
        for agent in landscape.roster().iter() {
            let [x, y] = agent.position();
            assert!((0.0..200.0).contains(&x));
            assert!((0.0..50.0).contains(&y));
        }
    }

    #[test]
    fn set_dimensions_rejects_indivisible_extent() {
        let mut landscape = Landscape::new(SimConfig::default());
        assert!(matches!(
            landscape.set_dimensions(105.0, 100.0),
            Err(LandscapeError::Config(
                SimConfigError::ExtentNotDivisible { .. }
            ))
        ));
        // old state untouched on failure
        assert_eq!(landscape.width(), 100.0);
        assert_eq!(landscape.agent_count(), 50);
    }

    #[test]
    fn set_agent_counts_applies_on_reset() {
        let mut landscape = Landscape::new(SimConfig::default());
        landscape.set_agent_counts(3, 2);
        assert_eq!(landscape.agent_count(), 50);
        landscape.reset();
        assert_eq!(landscape.agent_count(), 5);
    }

    #[test]
    fn play_stops_once_the_population_settles() {
        let mut landscape = Landscape::new(SimConfig {
            step_interval_ms: 0,
            ..empty_config()
        });
        for pos in [
            [50.0, 50.0],
            [51.0, 50.0],
            [49.0, 50.0],
            [50.0, 51.0],
            [50.0, 49.0],
        ] {
            landscape.spawn(Temperament::Social, pos, 10.0);
        }
        let mut ticks = 0;
        landscape.play(|_| ticks += 1);
        assert_eq!(ticks, 1);
        assert!(landscape.is_paused());
    }

    #[test]
    fn tick_callback_can_pause_the_run_loop() {
        let mut landscape = Landscape::new(SimConfig {
            step_interval_ms: 0,
            ..SimConfig::default()
        });
        let mut ticks = 0;
        landscape.play(|engine| {
            ticks += 1;
            if ticks == 3 {
                engine.pause();
            }
        });
        assert_eq!(ticks, 3);
        assert!(landscape.is_paused());
    }

    #[test]
    fn draw_visits_every_agent_once() {
        struct Recorder {
            drawn: usize,
            repaints: usize,
        }
        impl Surface for Recorder {
            fn draw_agent(&mut self, _agent: &Agent, scale: f64) {
                assert_eq!(scale, 2.0);
                self.drawn += 1;
            }
            fn repaint(&mut self) {
                self.repaints += 1;
            }
        }
        let landscape = Landscape::new(SimConfig::default());
        let mut surface = Recorder {
            drawn: 0,
            repaints: 0,
        };
        landscape.draw(&mut surface, 2.0);
        surface.repaint();
        assert_eq!(surface.drawn, 50);
        assert_eq!(surface.repaints, 1);
    }

    #[test]
    fn narrow_policy_engine_still_maintains_buckets() {
        let mut landscape = Landscape::new(SimConfig {
            candidate_policy: CandidatePolicy::NearestEdges,
            seed: 5,
            ..SimConfig::default()
        });
        for _ in 0..20 {
            if landscape.advance().paused {
                break;
            }
        }
        for handle in landscape.roster().handles() {
            let [x, y] = landscape.agent(handle).unwrap().position();
            assert_eq!(
                landscape.grid().placement_of(handle),
                landscape.grid().cell_of(x, y)
            );
        }
    }
}
