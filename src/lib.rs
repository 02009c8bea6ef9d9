pub mod config;
pub mod core;
pub mod error;
pub mod geometry;
pub mod math;
pub mod physics;
pub mod plugin;
pub mod solver;

// Public re-exports for clean API
pub use crate::config::{BodyParams, IntegratorParams};
pub use crate::core::{
    Body, BodyId, BodyKind, BodyRegistry, ContactTopology, EmitterInflow, EmitterParams,
    InflowCondition, ParticleGenerator,
};
pub use error::{SimError, SimResult};
pub use plugin::{Simulation, SphPlugin};
pub use solver::{BodySchedule, StateWriter, TimeIntegrator};
