//! Bevy integration
//!
//! The host app owns a [`Simulation`] resource; [`SphPlugin`] advances it by
//! one output interval per update and asks the app to exit once the end time
//! is reached or the run fails.

use bevy::log::{error, info};
use bevy::prelude::*;

use crate::core::BodyRegistry;
use crate::error::SimError;
use crate::solver::{RunSummary, StateWriter, TimeIntegrator};

#[derive(Resource)]
pub struct Simulation {
    pub registry: BodyRegistry,
    pub integrator: TimeIntegrator<Box<dyn StateWriter>>,
    failure: Option<SimError>,
}

impl Simulation {
    pub fn new(registry: BodyRegistry, integrator: TimeIntegrator<Box<dyn StateWriter>>) -> Self {
        Self {
            registry,
            integrator,
            failure: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.integrator.is_finished() || self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&SimError> {
        self.failure.as_ref()
    }

    pub fn summary(&self) -> RunSummary {
        self.integrator.summary()
    }

    /// One outer iteration; errors are kept and end the run.
    pub fn step(&mut self) -> Result<(), SimError> {
        if self.is_finished() {
            return Ok(());
        }
        let Self {
            registry,
            integrator,
            failure,
        } = self;
        integrator.advance_output_interval(registry).inspect_err(|err| {
            *failure = Some(err.clone());
        })
    }
}

/// Runs the simulation in `Update` and exits when it is done.
pub struct SphPlugin;

impl Plugin for SphPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (advance_simulation, exit_when_finished).chain());
    }
}

fn advance_simulation(simulation: Option<ResMut<Simulation>>) {
    let Some(mut simulation) = simulation else {
        return;
    };
    if let Err(err) = simulation.step() {
        error!("Simulation stopped: {}", err);
    }
}

fn exit_when_finished(simulation: Option<Res<Simulation>>, mut exit: MessageWriter<AppExit>) {
    let Some(simulation) = simulation else {
        return;
    };
    if !simulation.is_finished() {
        return;
    }
    let summary = simulation.summary();
    if simulation.failure().is_some() {
        exit.write(AppExit::error());
    } else {
        info!(
            "Simulation done: {} iterations, time {:.6}, compute {:.3}s",
            summary.iterations,
            summary.physical_time,
            summary.compute_time.as_secs_f64()
        );
        exit.write(AppExit::Success);
    }
}
