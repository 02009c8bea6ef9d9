//! Position-Verlet kinematics
//!
//! The sub-step is split around the boundary condition:
//! [`DriftKick`] moves half a step and updates velocity over the full step,
//! [`Drift`] moves the remaining half with the new velocity. For a constant
//! acceleration the pair reproduces `x + v dt + a dt^2 / 2` exactly.

use std::sync::Arc;

use rayon::prelude::*;

use crate::core::{Body, ContactBodies};
use crate::error::SimResult;
use crate::math::{Point, Real, Vector};
use crate::solver::{PhysicsOperator, StepContext};

/// Acceleration field as a function of position and time.
pub type BodyForce = Arc<dyn Fn(Point, Real) -> Vector + Send + Sync>;

pub struct DriftKick {
    force: BodyForce,
}

impl DriftKick {
    pub fn new(force: impl Fn(Point, Real) -> Vector + Send + Sync + 'static) -> Self {
        Self {
            force: Arc::new(force),
        }
    }

    pub fn gravity(gravity: Vector) -> Self {
        Self::new(move |_, _| gravity)
    }

    pub fn from_shared(force: BodyForce) -> Self {
        Self { force }
    }
}

impl PhysicsOperator for DriftKick {
    fn name(&self) -> &str {
        "drift-kick"
    }

    fn apply(&mut self, body: &mut Body, _contacts: &ContactBodies<'_>, step: &StepContext) -> SimResult<()> {
        let dt = step.dt;
        let mid_time = step.time + 0.5 * dt;
        let force = &self.force;
        body.particles_mut()
            .par_iter_mut()
            .filter(|p| p.is_simulated())
            .for_each(|p| {
                p.position += 0.5 * dt * p.velocity;
                p.acceleration = force(p.position, mid_time);
                p.velocity += dt * p.acceleration;
            });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Drift;

impl PhysicsOperator for Drift {
    fn name(&self) -> &str {
        "drift"
    }

    fn apply(&mut self, body: &mut Body, _contacts: &ContactBodies<'_>, step: &StepContext) -> SimResult<()> {
        let dt = step.dt;
        body.particles_mut()
            .par_iter_mut()
            .filter(|p| p.is_simulated())
            .for_each(|p| p.position += 0.5 * dt * p.velocity);
        Ok(())
    }
}
