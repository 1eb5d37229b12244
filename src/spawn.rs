//! Flock initialization. All randomness in the crate lives here; stepping
//! is fully deterministic.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{FlockConfig, SpawnVolume};
use crate::error::{FlockError, Result};
use crate::snapshot::{Agent, AgentSnapshot};

/// Resolves a user seed, drawing one from the OS when it is zero.
pub fn resolve_seed(seed: u64) -> Result<u64> {
    if seed != 0 {
        return Ok(seed);
    }
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes).map_err(|err| FlockError::Entropy(err.to_string()))?;
    Ok(u64::from_le_bytes(bytes).max(1))
}

/// Places `count` agents uniformly in `volume` with a random heading whose
/// horizontal components span `±max_speed / 2`.
pub fn spawn(count: usize, volume: &SpawnVolume, config: &FlockConfig, seed: u64) -> AgentSnapshot {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let half_speed = config.max_speed * 0.5;
    let half_vertical = half_speed * volume.vertical_speed_ratio;

    let mut snapshot = AgentSnapshot::with_capacity(count);
    for _ in 0..count {
        let position = (
            sample(&mut rng, volume.min[0], volume.max[0]),
            sample(&mut rng, volume.min[1], volume.max[1]),
            sample(&mut rng, volume.min[2], volume.max[2]),
        );
        let velocity = (
            sample(&mut rng, -half_speed, half_speed),
            sample(&mut rng, -half_vertical, half_vertical),
            sample(&mut rng, -half_speed, half_speed),
        );
        snapshot.push(Agent::new(position, velocity));
    }
    snapshot
}

fn sample(rng: &mut ChaCha8Rng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
