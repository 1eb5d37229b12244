//! Simulation step: every agent is evaluated against the previous snapshot
//! and written into a separate buffer, which becomes current only after
//! the whole flock has been processed.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{FlockConfig, FlockSetup, SpawnVolume};
use crate::error::{FlockError, Result};
use crate::integrate;
use crate::math::{self, Vec3, ZERO};
use crate::neighbor_grid::NeighborGrid;
use crate::neighbors::{self, NeighborSums};
use crate::orientation::{self, AgentPose, Orientation};
use crate::snapshot::{Agent, AgentSnapshot};
use crate::spawn;
use crate::speed::{self, Regulation};
use crate::steering;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Sum over agents of neighbors found inside the visual range.
    pub neighbor_pairs: usize,
    pub raised_to_min: usize,
    pub clamped_to_max: usize,
    pub fallback_headings: usize,
}

impl StepStats {
    fn record(&mut self, update: &AgentUpdate) {
        self.neighbor_pairs += update.neighbor_count;
        match update.regulation {
            Regulation::Unchanged => {}
            Regulation::ClampedToMax => self.clamped_to_max += 1,
            Regulation::RaisedToMin => self.raised_to_min += 1,
            Regulation::FallbackHeading => self.fallback_headings += 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StepOutput {
    pub snapshot: AgentSnapshot,
    pub orientations: Vec<Orientation>,
    pub stats: StepStats,
}

struct AgentUpdate {
    agent: Agent,
    orientation: Orientation,
    neighbor_count: usize,
    regulation: Regulation,
}

/// Computes the tick after `prev` without touching it.
pub fn advance(prev: &AgentSnapshot, config: &FlockConfig, dt: f32) -> StepOutput {
    let grid = config.neighbor_search.uses_grid(prev.len()).then(|| {
        let mut grid = NeighborGrid::new(grid_half_extent(config), config.visual_range);
        grid.rebuild(prev.xs(), prev.zs());
        grid
    });

    let mut snapshot = AgentSnapshot::with_capacity(prev.len());
    let mut orientations = Vec::with_capacity(prev.len());
    let stats = advance_into(prev, config, dt, grid.as_ref(), &mut snapshot, &mut orientations);
    StepOutput {
        snapshot,
        orientations,
        stats,
    }
}

fn grid_half_extent(config: &FlockConfig) -> f32 {
    config.bounds_xz + config.visual_range
}

fn advance_into(
    prev: &AgentSnapshot,
    config: &FlockConfig,
    dt: f32,
    grid: Option<&NeighborGrid>,
    next: &mut AgentSnapshot,
    orientations: &mut Vec<Orientation>,
) -> StepStats {
    let count = prev.len();
    let scale = integrate::displacement_scale(dt, config);
    next.resize(count);
    orientations.resize(count, Orientation::default());

    let mut stats = StepStats::default();

    #[cfg(feature = "parallel")]
    {
        let updates: Vec<AgentUpdate> = (0..count)
            .into_par_iter()
            .map_init(Vec::new, |candidates, i| {
                let sums = gather(prev, i, config, grid, candidates);
                update_agent(prev, i, &sums, config, scale)
            })
            .collect();
        for (i, update) in updates.iter().enumerate() {
            stats.record(update);
            next.set(i, update.agent);
            orientations[i] = update.orientation;
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut candidates = Vec::new();
        for i in 0..count {
            let sums = gather(prev, i, config, grid, &mut candidates);
            let update = update_agent(prev, i, &sums, config, scale);
            stats.record(&update);
            next.set(i, update.agent);
            orientations[i] = update.orientation;
        }
    }

    stats
}

fn gather(
    prev: &AgentSnapshot,
    i: usize,
    config: &FlockConfig,
    grid: Option<&NeighborGrid>,
    candidates: &mut Vec<usize>,
) -> NeighborSums {
    match grid {
        Some(grid) => {
            grid.collect_candidates(i, config.visual_range, candidates);
            neighbors::scan_candidates(prev, i, config, candidates)
        }
        None => neighbors::scan(prev, i, config),
    }
}

fn update_agent(
    prev: &AgentSnapshot,
    i: usize,
    sums: &NeighborSums,
    config: &FlockConfig,
    scale: f32,
) -> AgentUpdate {
    let position = prev.position(i);
    let velocity = prev.velocity(i);

    let candidate = steering::steer(velocity, position, sums, config);
    let (next_velocity, regulation) = speed::regulate(candidate, velocity, config);
    let next_position = integrate::integrate(position, next_velocity, scale);

    AgentUpdate {
        agent: Agent::new(next_position, next_velocity),
        orientation: orientation::solve(velocity, next_velocity, config.bank_gain),
        neighbor_count: sums.neighbor_count,
        regulation,
    }
}

/// Owns the flock state and double-buffers it across ticks.
pub struct Flock {
    config: FlockConfig,
    current: AgentSnapshot,
    next: AgentSnapshot,
    orientations: Vec<Orientation>,
    grid: Option<NeighborGrid>,
    tick: u64,
    last_stats: StepStats,
}

impl Flock {
    /// Spawns `count` agents in `volume`. A zero seed draws one from the OS.
    pub fn new(count: usize, config: FlockConfig, volume: &SpawnVolume, seed: u64) -> Result<Self> {
        if count == 0 {
            return Err(FlockError::EmptyFlock);
        }
        config.validate()?;
        volume.validate()?;

        let seed = spawn::resolve_seed(seed)?;
        let snapshot = spawn::spawn(count, volume, &config, seed);
        tracing::info!(count, seed, "flock initialized");
        Ok(Self::assemble(snapshot, config))
    }

    pub fn from_setup(setup: &FlockSetup) -> Result<Self> {
        Self::new(setup.count, setup.flock, &setup.spawn, setup.seed)
    }

    /// Wraps an existing state, e.g. a hand-placed scenario.
    pub fn from_snapshot(snapshot: AgentSnapshot, config: FlockConfig) -> Result<Self> {
        if snapshot.is_empty() {
            return Err(FlockError::EmptyFlock);
        }
        config.validate()?;
        if let Some(index) = (0..snapshot.len())
            .find(|&i| !math::is_finite(snapshot.position(i)) || !math::is_finite(snapshot.velocity(i)))
        {
            return Err(FlockError::NonFiniteAgent { index });
        }
        Ok(Self::assemble(snapshot, config))
    }

    fn assemble(current: AgentSnapshot, config: FlockConfig) -> Self {
        let count = current.len();
        let orientations = current
            .agents()
            .map(|agent| Orientation::at_rest(agent.velocity))
            .collect();
        let grid = config
            .neighbor_search
            .uses_grid(count)
            .then(|| NeighborGrid::new(grid_half_extent(&config), config.visual_range));

        Self {
            config,
            next: AgentSnapshot::with_capacity(count),
            current,
            orientations,
            grid,
            tick: 0,
            last_stats: StepStats::default(),
        }
    }

    /// Advances the flock by one tick of `dt` seconds.
    pub fn step(&mut self, dt: f32) -> StepStats {
        if let Some(grid) = self.grid.as_mut() {
            grid.rebuild(self.current.xs(), self.current.zs());
        }

        let stats = advance_into(
            &self.current,
            &self.config,
            dt,
            self.grid.as_ref(),
            &mut self.next,
            &mut self.orientations,
        );
        std::mem::swap(&mut self.current, &mut self.next);
        self.tick = self.tick.wrapping_add(1);
        self.last_stats = stats;

        if stats.fallback_headings > 0 {
            tracing::debug!(
                tick = self.tick,
                count = stats.fallback_headings,
                "agents stalled; kept previous heading"
            );
        }
        tracing::trace!(
            tick = self.tick,
            neighbor_pairs = stats.neighbor_pairs,
            raised_to_min = stats.raised_to_min,
            clamped_to_max = stats.clamped_to_max,
            "flock step"
        );

        self.debug_validate_state();
        stats
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &AgentSnapshot {
        &self.current
    }

    pub fn orientations(&self) -> &[Orientation] {
        &self.orientations
    }

    pub fn last_stats(&self) -> StepStats {
        self.last_stats
    }

    pub fn poses(&self) -> impl Iterator<Item = AgentPose> + '_ {
        self.orientations
            .iter()
            .enumerate()
            .map(|(i, orientation)| AgentPose {
                position: self.current.position(i),
                orientation: *orientation,
            })
    }

    pub fn centroid(&self) -> Vec3 {
        let sum = (0..self.len()).fold(ZERO, |acc, i| math::add(acc, self.current.position(i)));
        math::scale(sum, 1.0 / self.len() as f32)
    }

    pub fn mean_speed(&self) -> f32 {
        let total: f32 = (0..self.len()).map(|i| self.current.speed(i)).sum();
        total / self.len() as f32
    }

    /// Length of the mean unit heading: 1 when every agent flies the same
    /// way, near 0 when headings cancel out.
    pub fn polarization(&self) -> f32 {
        let sum = (0..self.len())
            .filter_map(|i| math::normalize_to_magnitude(self.current.velocity(i), 1.0))
            .fold(ZERO, math::add);
        math::length_sq(sum).sqrt() / self.len() as f32
    }

    #[cfg(debug_assertions)]
    fn debug_validate_state(&self) {
        // Relative slack for f32 rescaling.
        const SPEED_BAND_TOLERANCE: f32 = 1.0e-5;
        let low = self.config.min_speed * (1.0 - SPEED_BAND_TOLERANCE);
        let high = self.config.max_speed * (1.0 + SPEED_BAND_TOLERANCE);
        for i in 0..self.current.len() {
            let agent = self.current.agent(i);
            debug_assert!(
                math::is_finite(agent.position) && math::is_finite(agent.velocity),
                "agent {i} is not finite: {agent:?}"
            );
            let speed = self.current.speed(i);
            debug_assert!(
                (low..=high).contains(&speed),
                "agent {i} left the speed band: {speed}"
            );
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_validate_state(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NeighborSearch, TimeScale};

    fn per_tick() -> FlockConfig {
        FlockConfig {
            time_scale: TimeScale::PerTick,
            neighbor_search: NeighborSearch::BruteForce,
            ..FlockConfig::default()
        }
    }

    #[test]
    fn approaching_pair_diverges_faster_than_straight_lines() {
        let config = per_tick();
        let prev = AgentSnapshot::from_agents(&[
            Agent::new((0.0, 20.0, 0.0), (0.2, 0.0, 0.0)),
            Agent::new((1.0, 20.0, 0.0), (-0.2, 0.0, 0.0)),
        ]);

        let out = advance(&prev, &config, 1.0 / 60.0);
        let separation = out.snapshot.position(1).0 - out.snapshot.position(0).0;
        let naive = (1.0 - 0.2) - (0.0 + 0.2);
        assert!(separation > naive, "{separation} <= {naive}");
    }

    #[test]
    fn lone_agent_past_the_bound_turns_back() {
        let config = per_tick();
        let prev = AgentSnapshot::from_agents(&[Agent::new(
            (config.bounds_xz + 1.0, 20.0, 0.0),
            (0.0, 0.0, 0.2),
        )]);

        let out = advance(&prev, &config, 1.0 / 60.0);
        let v = out.snapshot.velocity(0);
        assert!((v.0 + config.turn_factor).abs() < 1e-6);
        assert!((v.2 - 0.2).abs() < 1e-6);
        assert_eq!(out.stats.neighbor_pairs, 0);
    }

    #[test]
    fn colocated_flock_keeps_its_velocity() {
        let config = per_tick();
        let agent = Agent::new((0.0, 20.0, 0.0), (0.125, 0.0, 0.25));
        let prev = AgentSnapshot::from_agents(&[agent; 5]);

        let out = advance(&prev, &config, 1.0 / 60.0);
        for i in 0..5 {
            assert_eq!(out.snapshot.velocity(i), agent.velocity);
            assert_eq!(out.snapshot.position(i), math::add(agent.position, agent.velocity));
        }
        assert_eq!(out.stats.neighbor_pairs, 20);
    }

    #[test]
    fn stalled_agent_gets_a_fallback_heading() {
        let config = per_tick();
        // Turn-back exactly cancels the velocity.
        let prev = AgentSnapshot::from_agents(&[Agent::new(
            (config.bounds_xz + 1.0, 20.0, 0.0),
            (config.turn_factor, 0.0, 0.0),
        )]);

        let out = advance(&prev, &config, 0.0);
        assert_eq!(out.stats.fallback_headings, 1);
        let v = out.snapshot.velocity(0);
        assert!((v.0 - config.min_speed).abs() < 1e-6);
    }

    #[test]
    fn step_swaps_buffers_and_matches_pure_advance() {
        let config = per_tick();
        let start = spawn::spawn(40, &SpawnVolume::default(), &config, 11);
        let mut flock = Flock::from_snapshot(start.clone(), config).unwrap();

        let mut expected = start;
        for _ in 0..25 {
            expected = advance(&expected, &config, 1.0 / 60.0).snapshot;
            flock.step(1.0 / 60.0);
        }
        assert_eq!(flock.tick(), 25);
        assert!(flock.snapshot().bit_identical(&expected));
    }

    #[test]
    fn grid_search_matches_brute_force_bitwise() {
        let brute = FlockConfig {
            neighbor_search: NeighborSearch::BruteForce,
            ..FlockConfig::default()
        };
        let grid = FlockConfig {
            neighbor_search: NeighborSearch::Grid,
            ..brute
        };
        let start = spawn::spawn(300, &SpawnVolume::default(), &brute, 5);

        let mut a = Flock::from_snapshot(start.clone(), brute).unwrap();
        let mut b = Flock::from_snapshot(start, grid).unwrap();
        for _ in 0..60 {
            let sa = a.step(1.0 / 60.0);
            let sb = b.step(1.0 / 60.0);
            assert_eq!(sa, sb);
        }
        assert!(a.snapshot().bit_identical(b.snapshot()));
        assert_eq!(a.orientations(), b.orientations());
    }

    #[test]
    fn orientation_follows_new_velocity() {
        let config = per_tick();
        let prev = AgentSnapshot::from_agents(&[Agent::new((0.0, 20.0, 0.0), (0.0, 0.0, 0.2))]);
        let mut flock = Flock::from_snapshot(prev, config).unwrap();
        assert_eq!(flock.orientations()[0].bank, 0.0);

        flock.step(1.0 / 60.0);
        let pose = flock.poses().next().unwrap();
        let v = flock.snapshot().velocity(0);
        assert_eq!(pose.position, flock.snapshot().position(0));
        assert!((pose.orientation.yaw - orientation::yaw(v)).abs() < 1e-7);
    }

    #[test]
    fn rejects_empty_and_non_finite_states() {
        let config = per_tick();
        assert!(matches!(
            Flock::from_snapshot(AgentSnapshot::default(), config),
            Err(FlockError::EmptyFlock)
        ));
        let bad = AgentSnapshot::from_agents(&[
            Agent::new((0.0, 20.0, 0.0), (0.0, 0.0, 0.2)),
            Agent::new((f32::NAN, 20.0, 0.0), (0.0, 0.0, 0.2)),
        ]);
        assert!(matches!(
            Flock::from_snapshot(bad, config),
            Err(FlockError::NonFiniteAgent { index: 1 })
        ));
        assert!(matches!(
            Flock::new(0, config, &SpawnVolume::default(), 1),
            Err(FlockError::EmptyFlock)
        ));
    }

    #[test]
    fn aggregate_metrics_describe_the_flock() {
        let config = per_tick();
        let prev = AgentSnapshot::from_agents(&[
            Agent::new((-2.0, 20.0, 0.0), (0.0, 0.0, 0.2)),
            Agent::new((2.0, 30.0, 0.0), (0.0, 0.0, 0.2)),
        ]);
        let flock = Flock::from_snapshot(prev, config).unwrap();
        assert_eq!(flock.centroid(), (0.0, 25.0, 0.0));
        assert!((flock.mean_speed() - 0.2).abs() < 1e-6);
        assert!((flock.polarization() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposed_headings_have_low_polarization() {
        let prev = AgentSnapshot::from_agents(&[
            Agent::new((-30.0, 20.0, 0.0), (0.0, 0.0, 0.2)),
            Agent::new((30.0, 20.0, 0.0), (0.0, 0.0, -0.2)),
        ]);
        let flock = Flock::from_snapshot(prev, per_tick()).unwrap();
        assert!(flock.polarization() < 1e-6);
    }

    #[test]
    fn tiny_speed_band_survives_a_step() {
        let config = FlockConfig {
            max_speed: 1.0e-7,
            min_speed: 0.0,
            ..per_tick()
        };
        let prev = AgentSnapshot::from_agents(&[Agent::new((0.0, 20.0, 0.0), (5.0e-7, 0.0, 0.0))]);
        let mut flock = Flock::from_snapshot(prev, config).unwrap();

        let stats = flock.step(1.0 / 60.0);
        assert_eq!(stats.clamped_to_max, 1);
        assert!(flock.snapshot().speed(0) <= config.max_speed * (1.0 + 1e-5));
    }

    /// Sequential reference for one tick, built from the per-stage functions.
    /// Matches `advance` bitwise whether or not the `parallel` feature is on.
    fn reference_tick(prev: &AgentSnapshot, config: &FlockConfig, dt: f32) -> AgentSnapshot {
        let scale = integrate::displacement_scale(dt, config);
        let agents: Vec<Agent> = (0..prev.len())
            .map(|i| {
                let sums = neighbors::scan(prev, i, config);
                let v = prev.velocity(i);
                let candidate = steering::steer(v, prev.position(i), &sums, config);
                let (v, _) = speed::regulate(candidate, v, config);
                Agent::new(integrate::integrate(prev.position(i), v, scale), v)
            })
            .collect();
        AgentSnapshot::from_agents(&agents)
    }

    #[test]
    fn advance_matches_sequential_reference() {
        for search in [NeighborSearch::BruteForce, NeighborSearch::Grid] {
            let config = FlockConfig {
                neighbor_search: search,
                ..FlockConfig::default()
            };
            let mut state = spawn::spawn(200, &SpawnVolume::default(), &config, 17);
            for _ in 0..20 {
                let out = advance(&state, &config, 1.0 / 60.0);
                let expected = reference_tick(&state, &config, 1.0 / 60.0);
                assert!(out.snapshot.bit_identical(&expected), "{search:?} diverged");
                state = out.snapshot;
            }
        }
    }
}
