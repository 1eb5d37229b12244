use crate::config::FlockConfig;
use crate::math::{self, Vec3, ZERO};
use crate::snapshot::AgentSnapshot;

/// Raw neighbor terms for one agent, accumulated from the previous tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborSums {
    /// Sum of `position[i] - position[j]` over agents inside the protected range.
    pub separation: Vec3,
    pub sum_velocity: Vec3,
    pub sum_position: Vec3,
    /// Agents inside the visual range.
    pub neighbor_count: usize,
}

impl Default for NeighborSums {
    fn default() -> Self {
        Self {
            separation: ZERO,
            sum_velocity: ZERO,
            sum_position: ZERO,
            neighbor_count: 0,
        }
    }
}

impl NeighborSums {
    pub fn average_velocity(&self) -> Option<Vec3> {
        self.average(self.sum_velocity)
    }

    pub fn average_position(&self) -> Option<Vec3> {
        self.average(self.sum_position)
    }

    fn average(&self, sum: Vec3) -> Option<Vec3> {
        if self.neighbor_count == 0 {
            return None;
        }
        let n = self.neighbor_count as f32;
        Some((sum.0 / n, sum.1 / n, sum.2 / n))
    }
}

struct Ranges {
    visual_sq: f32,
    protected_sq: f32,
}

impl Ranges {
    fn from_config(config: &FlockConfig) -> Self {
        Self {
            visual_sq: config.visual_range * config.visual_range,
            protected_sq: config.protected_range * config.protected_range,
        }
    }
}

/// Scans every other agent in index order.
pub fn scan(snapshot: &AgentSnapshot, i: usize, config: &FlockConfig) -> NeighborSums {
    let ranges = Ranges::from_config(config);
    let origin = snapshot.position(i);
    let mut sums = NeighborSums::default();

    for j in (0..snapshot.len()).filter(|&j| j != i) {
        absorb(&mut sums, snapshot, origin, j, &ranges);
    }
    sums
}

/// Same rule as [`scan`], restricted to `candidates`. The list must be in
/// ascending index order and exclude `i` for the sums to match [`scan`]
/// bit for bit.
pub fn scan_candidates(
    snapshot: &AgentSnapshot,
    i: usize,
    config: &FlockConfig,
    candidates: &[usize],
) -> NeighborSums {
    debug_assert!(candidates.windows(2).all(|w| w[0] < w[1]));
    let ranges = Ranges::from_config(config);
    let origin = snapshot.position(i);
    let mut sums = NeighborSums::default();

    for &j in candidates.iter().filter(|&&j| j != i) {
        absorb(&mut sums, snapshot, origin, j, &ranges);
    }
    sums
}

#[inline]
fn absorb(sums: &mut NeighborSums, snapshot: &AgentSnapshot, origin: Vec3, j: usize, ranges: &Ranges) {
    let other = snapshot.position(j);
    let dist_sq = math::distance_sq_3d(other.0 - origin.0, other.1 - origin.1, other.2 - origin.2);
    if dist_sq >= ranges.visual_sq {
        return;
    }

    if dist_sq < ranges.protected_sq {
        sums.separation = math::add(sums.separation, math::sub(origin, other));
    }
    sums.sum_position = math::add(sums.sum_position, other);
    sums.sum_velocity = math::add(sums.sum_velocity, snapshot.velocity(j));
    sums.neighbor_count += 1;
}
