use crate::config::FlockConfig;
use crate::math::{self, Vec3};

/// Heading used when neither the candidate nor the previous velocity has
/// a direction.
pub const DEFAULT_HEADING: Vec3 = (0.0, 0.0, 1.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regulation {
    Unchanged,
    ClampedToMax,
    RaisedToMin,
    /// The candidate had zero length and was replaced by a fallback heading
    /// at `min_speed`.
    FallbackHeading,
}

/// Clamps the magnitude of `candidate` into `[min_speed, max_speed]`.
pub fn regulate(candidate: Vec3, previous: Vec3, config: &FlockConfig) -> (Vec3, Regulation) {
    let speed_sq = math::length_sq(candidate);
    let max_sq = config.max_speed * config.max_speed;
    let min_sq = config.min_speed * config.min_speed;

    // Any vector faster than max_speed is non-zero, so it always rescales.
    if speed_sq > max_sq {
        if let Some(v) = math::normalize_to_magnitude(candidate, config.max_speed) {
            return (v, Regulation::ClampedToMax);
        }
    }

    if speed_sq >= min_sq {
        return (candidate, Regulation::Unchanged);
    }

    match math::normalize_to_magnitude(candidate, config.min_speed) {
        Some(v) => (v, Regulation::RaisedToMin),
        None => {
            let v = math::normalize_to_magnitude(previous, config.min_speed)
                .unwrap_or_else(|| math::scale(DEFAULT_HEADING, config.min_speed));
            (v, Regulation::FallbackHeading)
        }
    }
}
