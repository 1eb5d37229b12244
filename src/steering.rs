use crate::config::FlockConfig;
use crate::math::{self, Vec3};
use crate::neighbors::NeighborSums;

/// Combines neighbor terms and containment into a candidate velocity.
pub fn steer(velocity: Vec3, position: Vec3, sums: &NeighborSums, config: &FlockConfig) -> Vec3 {
    let mut v = math::add(velocity, math::scale(sums.separation, config.avoid_factor));

    if let (Some(avg_v), Some(avg_p)) = (sums.average_velocity(), sums.average_position()) {
        v = math::add(v, math::scale(math::sub(avg_v, v), config.matching_factor));
        v = math::add(v, math::scale(math::sub(avg_p, position), config.centering_factor));
    }

    math::add(v, containment(position, config))
}

/// Soft turn-back nudges for the horizontal bounds and the altitude band.
/// Planes are inclusive: an agent sitting exactly on one is turned back.
pub fn containment(position: Vec3, config: &FlockConfig) -> Vec3 {
    let (x, y, z) = position;
    (
        turn_back(x, -config.bounds_xz, config.bounds_xz, config.turn_factor),
        turn_back(y, config.altitude_min, config.altitude_max, config.turn_factor),
        turn_back(z, -config.bounds_xz, config.bounds_xz, config.turn_factor),
    )
}

fn turn_back(value: f32, low: f32, high: f32, turn_factor: f32) -> f32 {
    let mut nudge = 0.0;
    if value <= low {
        nudge += turn_factor;
    }
    if value >= high {
        nudge -= turn_factor;
    }
    nudge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ZERO;

    fn config() -> FlockConfig {
        FlockConfig::default()
    }

    #[test]
    fn inside_the_volume_gets_no_nudge() {
        assert_eq!(containment((0.0, 25.0, 0.0), &config()), ZERO);
        assert_eq!(containment((79.99, 39.99, -79.99), &config()), ZERO);
    }

    #[test]
    fn exactly_on_a_plane_turns_back_by_turn_factor() {
        let c = config();
        assert_eq!(containment((c.bounds_xz, 25.0, 0.0), &c), (-c.turn_factor, 0.0, 0.0));
        assert_eq!(containment((0.0, 25.0, -c.bounds_xz), &c), (0.0, 0.0, c.turn_factor));
        assert_eq!(containment((0.0, c.altitude_min, 0.0), &c), (0.0, c.turn_factor, 0.0));
        assert_eq!(containment((0.0, c.altitude_max, 0.0), &c), (0.0, -c.turn_factor, 0.0));
    }

    #[test]
    fn agent_past_the_bound_steers_back() {
        let c = config();
        let position = (c.bounds_xz + 1.0, 25.0, 0.0);
        let v = steer((0.2, 0.0, 0.0), position, &NeighborSums::default(), &c);
        assert!((v.0 - (0.2 - c.turn_factor)).abs() < 1e-7);
        assert_eq!(v.1, 0.0);
        assert_eq!(v.2, 0.0);
    }

    #[test]
    fn separation_applies_without_visual_neighbors() {
        let c = config();
        let sums = NeighborSums {
            separation: (2.0, 0.0, 0.0),
            ..NeighborSums::default()
        };
        let v = steer((0.0, 0.0, 0.2), (0.0, 25.0, 0.0), &sums, &c);
        assert!((v.0 - 2.0 * c.avoid_factor).abs() < 1e-7);
        assert!((v.2 - 0.2).abs() < 1e-7);
    }

    #[test]
    fn alignment_and_cohesion_pull_toward_the_group() {
        let c = config();
        let sums = NeighborSums {
            sum_velocity: (0.0, 0.0, 0.6),
            sum_position: (20.0, 50.0, 0.0),
            neighbor_count: 2,
            ..NeighborSums::default()
        };
        let v = steer((0.2, 0.0, 0.0), (0.0, 25.0, 0.0), &sums, &c);

        let after_match = (0.2 - 0.2 * c.matching_factor, 0.0, 0.3 * c.matching_factor);
        let expected_x = after_match.0 + 10.0 * c.centering_factor;
        assert!((v.0 - expected_x).abs() < 1e-6);
        assert!((v.1 - 0.0).abs() < 1e-6);
        assert!((v.2 - after_match.2).abs() < 1e-6);
    }

    #[test]
    fn finite_inputs_stay_finite() {
        let c = config();
        let sums = NeighborSums {
            separation: (1.0e3, -1.0e3, 0.0),
            sum_velocity: (1.0, 1.0, 1.0),
            sum_position: (1.0e4, 1.0e4, 1.0e4),
            neighbor_count: 3,
        };
        let v = steer((0.1, 0.1, 0.1), (-1.0e3, -5.0, 1.0e3), &sums, &c);
        assert!(math::is_finite(v));
    }
}
