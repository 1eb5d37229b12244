use serde::{Deserialize, Serialize};

use crate::math::{length_sq, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl Agent {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self { position, velocity }
    }
}

/// Full flock state for one tick, stored structure-of-arrays.
///
/// A snapshot is only ever read while the next one is being computed;
/// the simulation writes into a separate buffer and swaps afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentSnapshot {
    pos_x: Vec<f32>,
    pos_y: Vec<f32>,
    pos_z: Vec<f32>,
    vel_x: Vec<f32>,
    vel_y: Vec<f32>,
    vel_z: Vec<f32>,
}

impl AgentSnapshot {
    pub fn with_capacity(count: usize) -> Self {
        Self {
            pos_x: Vec::with_capacity(count),
            pos_y: Vec::with_capacity(count),
            pos_z: Vec::with_capacity(count),
            vel_x: Vec::with_capacity(count),
            vel_y: Vec::with_capacity(count),
            vel_z: Vec::with_capacity(count),
        }
    }

    pub fn from_agents(agents: &[Agent]) -> Self {
        let mut snapshot = Self::with_capacity(agents.len());
        for agent in agents {
            snapshot.push(*agent);
        }
        snapshot
    }

    pub fn push(&mut self, agent: Agent) {
        self.pos_x.push(agent.position.0);
        self.pos_y.push(agent.position.1);
        self.pos_z.push(agent.position.2);
        self.vel_x.push(agent.velocity.0);
        self.vel_y.push(agent.velocity.1);
        self.vel_z.push(agent.velocity.2);
    }

    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        (self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    #[inline]
    pub fn velocity(&self, i: usize) -> Vec3 {
        (self.vel_x[i], self.vel_y[i], self.vel_z[i])
    }

    pub fn agent(&self, i: usize) -> Agent {
        Agent::new(self.position(i), self.velocity(i))
    }

    pub fn speed(&self, i: usize) -> f32 {
        length_sq(self.velocity(i)).sqrt()
    }

    pub fn agents(&self) -> impl Iterator<Item = Agent> + '_ {
        (0..self.len()).map(move |i| self.agent(i))
    }

    pub fn xs(&self) -> &[f32] {
        &self.pos_x
    }

    pub fn zs(&self) -> &[f32] {
        &self.pos_z
    }

    /// Resizes to `count` agents, keeping existing entries. Used to shape a
    /// back buffer before it is overwritten.
    pub(crate) fn resize(&mut self, count: usize) {
        self.pos_x.resize(count, 0.0);
        self.pos_y.resize(count, 0.0);
        self.pos_z.resize(count, 0.0);
        self.vel_x.resize(count, 0.0);
        self.vel_y.resize(count, 0.0);
        self.vel_z.resize(count, 0.0);
    }

    pub(crate) fn set(&mut self, i: usize, agent: Agent) {
        self.pos_x[i] = agent.position.0;
        self.pos_y[i] = agent.position.1;
        self.pos_z[i] = agent.position.2;
        self.vel_x[i] = agent.velocity.0;
        self.vel_y[i] = agent.velocity.1;
        self.vel_z[i] = agent.velocity.2;
    }

    /// Bitwise equality, distinguishing `-0.0` from `0.0`.
    pub fn bit_identical(&self, other: &AgentSnapshot) -> bool {
        fn same(a: &[f32], b: &[f32]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        }
        same(&self.pos_x, &other.pos_x)
            && same(&self.pos_y, &other.pos_y)
            && same(&self.pos_z, &other.pos_z)
            && same(&self.vel_x, &other.vel_x)
            && same(&self.vel_y, &other.vel_y)
            && same(&self.vel_z, &other.vel_z)
    }
}

#[cfg(test)]
mod tests {
    use super::{Agent, AgentSnapshot};

    #[test]
    fn round_trips_agents_through_columns() {
        let agents = [
            Agent::new((1.0, 2.0, 3.0), (0.1, 0.0, -0.1)),
            Agent::new((-4.0, 5.0, 6.0), (0.0, 0.2, 0.0)),
        ];
        let snapshot = AgentSnapshot::from_agents(&agents);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.agent(1), agents[1]);
        assert_eq!(snapshot.xs(), &[1.0, -4.0]);
        assert_eq!(snapshot.zs(), &[3.0, 6.0]);
        assert!((snapshot.speed(1) - 0.2).abs() < 1e-6);
        assert_eq!(snapshot.agents().collect::<Vec<_>>(), agents.to_vec());
    }

    #[test]
    fn bit_identity_sees_signed_zero() {
        let a = AgentSnapshot::from_agents(&[Agent::new((0.0, 0.0, 0.0), (0.0, 0.0, 0.0))]);
        let b = AgentSnapshot::from_agents(&[Agent::new((-0.0, 0.0, 0.0), (0.0, 0.0, 0.0))]);
        assert!(a.bit_identical(&a.clone()));
        assert!(!a.bit_identical(&b));
    }
}
