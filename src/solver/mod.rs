pub mod integrator;
pub mod operator;
pub mod output;
pub mod time_step;

pub use integrator::{BodySchedule, RunSummary, TimeIntegrator};
pub use operator::{OperatorRole, PhysicsOperator, StepContext};
pub use output::{
    BodySnapshot, MemoryWriter, NullWriter, RestartSnapshot, SimulationClock, StateWriter,
};
pub use time_step::{
    AcousticCfl, AdvectionCfl, DiffusionLimit, FixedStep, ReactionLimit, StepSizeCriterion,
    max_speed,
};
