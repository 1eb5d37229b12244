use serde::{Deserialize, Serialize};

use crate::math::{wrap_angle, Vec3};

/// Render-only attitude derived from velocity. Never fed back into physics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
    pub bank: f32,
}

impl Orientation {
    /// Pose for an agent that has not turned yet.
    pub fn at_rest(velocity: Vec3) -> Self {
        Self {
            yaw: yaw(velocity),
            pitch: pitch(velocity),
            bank: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentPose {
    pub position: Vec3,
    pub orientation: Orientation,
}

pub fn yaw(velocity: Vec3) -> f32 {
    velocity.0.atan2(velocity.2)
}

pub fn pitch(velocity: Vec3) -> f32 {
    let horizontal = (velocity.0 * velocity.0 + velocity.2 * velocity.2).sqrt();
    velocity.1.atan2(horizontal)
}

/// Banks into the turn proportionally to this tick's yaw change.
pub fn solve(previous_velocity: Vec3, velocity: Vec3, bank_gain: f32) -> Orientation {
    let current_yaw = yaw(velocity);
    let turn = wrap_angle(current_yaw - yaw(previous_velocity));
    Orientation {
        yaw: current_yaw,
        pitch: pitch(velocity),
        bank: bank_gain * turn,
    }
}
