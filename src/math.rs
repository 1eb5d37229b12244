use std::f32::consts::{PI, TAU};

pub type Vec3 = (f32, f32, f32);

pub const ZERO: Vec3 = (0.0, 0.0, 0.0);

pub fn distance_sq_3d(dx: f32, dy: f32, dz: f32) -> f32 {
    dx * dx + dy * dy + dz * dz
}

pub fn length_sq(v: Vec3) -> f32 {
    distance_sq_3d(v.0, v.1, v.2)
}

pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    (a.0 - b.0, a.1 - b.1, a.2 - b.2)
}

pub fn scale(v: Vec3, s: f32) -> Vec3 {
    (v.0 * s, v.1 * s, v.2 * s)
}

pub fn is_finite(v: Vec3) -> bool {
    v.0.is_finite() && v.1.is_finite() && v.2.is_finite()
}

/// Rescales `v` to `magnitude`. Returns `None` only for an exactly zero (or
/// non-finite) input, which has no direction to preserve.
pub fn normalize_to_magnitude(v: Vec3, magnitude: f32) -> Option<Vec3> {
    let mag_sq = length_sq(v);
    if mag_sq.is_normal() {
        let s = magnitude / mag_sq.sqrt();
        return Some(scale(v, s));
    }

    // Tiny vectors underflow when squared; divide by the largest component
    // first so the direction survives.
    let largest = v.0.abs().max(v.1.abs()).max(v.2.abs());
    if largest == 0.0 || !largest.is_finite() {
        return None;
    }
    let unit = (v.0 / largest, v.1 / largest, v.2 / largest);
    let s = magnitude / length_sq(unit).sqrt();
    Some(scale(unit, s))
}

/// Folds an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}
