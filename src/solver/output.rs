//! State output hooks and restart snapshots
//!
//! Writing files is up to the [`StateWriter`] implementation; the integrator
//! only calls it at the right points of the loop.

use crate::core::{BodyRegistry, EmitterOccupancy, ParticleStatus};
use crate::error::SimError;
use crate::math::{Point, Real, Vector};

/// Explicit time state threaded through the integrator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationClock {
    pub physical_time: Real,
    /// Completed super-steps.
    pub iteration: usize,
    /// Completed sub-steps.
    pub sub_iteration: usize,
    /// Last super-step size (`Dt`).
    pub super_step: Real,
    /// Last sub-step size (`dt`).
    pub sub_step: Real,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BodySnapshot {
    pub name: String,
    pub active_count: usize,
    pub positions: Vec<Point>,
    pub velocities: Vec<Vector>,
    pub statuses: Vec<ParticleStatus>,
    /// Every registered scalar field, in registration order.
    pub fields: Vec<(String, Vec<Real>)>,
}

/// Everything needed to resume the outer loop without regenerating bodies.
#[derive(Clone, Debug, PartialEq)]
pub struct RestartSnapshot {
    pub physical_time: Real,
    pub iteration: usize,
    pub bodies: Vec<BodySnapshot>,
    /// One entry per emitter, in registration order.
    pub emitters: Vec<EmitterOccupancy>,
}

impl RestartSnapshot {
    pub fn capture(
        clock: &SimulationClock,
        registry: &BodyRegistry,
        emitters: Vec<EmitterOccupancy>,
    ) -> Self {
        let bodies = registry
            .iter()
            .map(|body| BodySnapshot {
                name: body.name().to_string(),
                active_count: body.simulated_count(),
                positions: body.particles().iter().map(|p| p.position).collect(),
                velocities: body.particles().iter().map(|p| p.velocity).collect(),
                statuses: body.particles().iter().map(|p| p.status).collect(),
                fields: body
                    .fields()
                    .names()
                    .filter_map(|name| {
                        let values = body.fields().get(name)?;
                        Some((name.to_string(), values.to_vec()))
                    })
                    .collect(),
            })
            .collect();

        Self {
            physical_time: clock.physical_time,
            iteration: clock.iteration,
            bodies,
            emitters,
        }
    }

    pub fn body(&self, name: &str) -> Option<&BodySnapshot> {
        self.bodies.iter().find(|b| b.name == name)
    }
}

impl BodySnapshot {
    pub fn field(&self, name: &str) -> Option<&[Real]> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, values)| values.as_slice())
    }
}

pub trait StateWriter: Send + Sync {
    /// Called at every output-interval boundary (and once before stepping).
    fn write_states(&mut self, _clock: &SimulationClock, _registry: &BodyRegistry) {}

    /// Called every `restart_output_interval` super-steps, iteration 0
    /// included, with the state the super-step starts from.
    fn write_restart(&mut self, _snapshot: &RestartSnapshot) {}

    /// Called once when a fatal error stops the run, with the last valid state.
    fn write_failure(&mut self, _snapshot: &RestartSnapshot, _error: &SimError) {}
}

impl<W: StateWriter + ?Sized> StateWriter for Box<W> {
    fn write_states(&mut self, clock: &SimulationClock, registry: &BodyRegistry) {
        (**self).write_states(clock, registry);
    }

    fn write_restart(&mut self, snapshot: &RestartSnapshot) {
        (**self).write_restart(snapshot);
    }

    fn write_failure(&mut self, snapshot: &RestartSnapshot, error: &SimError) {
        (**self).write_failure(snapshot, error);
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullWriter;

impl StateWriter for NullWriter {}

/// Keeps output times, restart snapshots and the failure dump in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryWriter {
    pub output_times: Vec<Real>,
    pub restarts: Vec<RestartSnapshot>,
    pub failure: Option<(RestartSnapshot, SimError)>,
}

impl StateWriter for MemoryWriter {
    fn write_states(&mut self, clock: &SimulationClock, _registry: &BodyRegistry) {
        self.output_times.push(clock.physical_time);
    }

    fn write_restart(&mut self, snapshot: &RestartSnapshot) {
        self.restarts.push(snapshot.clone());
    }

    fn write_failure(&mut self, snapshot: &RestartSnapshot, error: &SimError) {
        self.failure = Some((snapshot.clone(), error.clone()));
    }
}
