use crate::config::{FlockConfig, TimeScale};
use crate::math::{self, Vec3};

/// Clamps a host-supplied frame time into `[0, max_dt]`; non-finite or
/// negative values become zero.
pub fn sanitize_dt(dt: f32, max_dt: f32) -> f32 {
    if !dt.is_finite() || dt < 0.0 {
        tracing::debug!(dt, "discarding unusable frame time");
        return 0.0;
    }
    dt.min(max_dt)
}

/// Multiplier applied to velocity to get this tick's displacement.
pub fn displacement_scale(dt: f32, config: &FlockConfig) -> f32 {
    match config.time_scale {
        TimeScale::PerTick => 1.0,
        TimeScale::FrameRate(hz) => sanitize_dt(dt, config.max_dt) * hz,
    }
}

/// One explicit Euler step, no sub-stepping.
#[inline]
pub fn integrate(position: Vec3, velocity: Vec3, scale: f32) -> Vec3 {
    math::add(position, math::scale(velocity, scale))
}
