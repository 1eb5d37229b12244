use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod flock;
pub mod integrate;
pub mod math;
pub mod neighbor_grid;
pub mod neighbors;
pub mod orientation;
pub mod snapshot;
pub mod spawn;
pub mod speed;
pub mod steering;

pub use config::{FlockConfig, FlockSetup, NeighborSearch, SpawnVolume, TimeScale};
pub use error::{FlockError, Result};
pub use flock::{advance, Flock, StepOutput, StepStats};
pub use orientation::{AgentPose, Orientation};
pub use snapshot::{Agent, AgentSnapshot};

/// Floats per agent in the render buffer: `x, y, z, yaw, pitch, bank`.
pub const INSTANCE_STRIDE: usize = 6;

/// Browser-facing handle. The renderer reads the instance buffer after each
/// `step` and never writes to it.
#[wasm_bindgen]
pub struct Sim {
    flock: Flock,
    instances: Vec<f32>,
}

#[wasm_bindgen]
impl Sim {
    #[wasm_bindgen(constructor)]
    pub fn new(count: usize, seed: u32) -> std::result::Result<Sim, JsError> {
        let flock = Flock::new(
            count,
            FlockConfig::default(),
            &SpawnVolume::default(),
            u64::from(seed),
        )?;
        Ok(Sim::wrap(flock))
    }

    /// Builds a flock from a TOML `FlockSetup` document.
    pub fn from_toml(text: &str) -> std::result::Result<Sim, JsError> {
        let setup = FlockSetup::from_toml_str(text)?;
        Ok(Sim::wrap(Flock::from_setup(&setup)?))
    }

    pub fn step(&mut self, dt: f32) {
        self.flock.step(dt);
        self.sync_render_buffers();
    }

    pub fn count(&self) -> usize {
        self.flock.len()
    }

    pub fn tick_count(&self) -> f64 {
        self.flock.tick() as f64
    }

    pub fn instance_stride(&self) -> usize {
        INSTANCE_STRIDE
    }

    pub fn instance_data(&self) -> Vec<f32> {
        self.instances.clone()
    }

    /// Start of the instance buffer in wasm memory, for a zero-copy
    /// `Float32Array` view of `count() * instance_stride()` floats. The view
    /// is valid until the next call into the module.
    pub fn instance_data_ptr(&self) -> *const f32 {
        self.instances.as_ptr()
    }

    pub fn mean_speed(&self) -> f32 {
        self.flock.mean_speed()
    }

    pub fn polarization(&self) -> f32 {
        self.flock.polarization()
    }
}

impl Sim {
    fn wrap(flock: Flock) -> Sim {
        let mut sim = Sim {
            instances: vec![0.0; flock.len() * INSTANCE_STRIDE],
            flock,
        };
        sim.sync_render_buffers();
        sim
    }

    pub fn flock(&self) -> &Flock {
        &self.flock
    }

    fn sync_render_buffers(&mut self) {
        for (slot, pose) in self
            .instances
            .chunks_exact_mut(INSTANCE_STRIDE)
            .zip(self.flock.poses())
        {
            let (x, y, z) = pose.position;
            let o = pose.orientation;
            slot.copy_from_slice(&[x, y, z, o.yaw, o.pitch, o.bank]);
        }
    }
}
