//! Inflow condition applied between the two halves of a fluid sub-step

use std::sync::Arc;

use crate::core::{Body, ContactBodies, EmitterInflow, InflowCondition, ParticleStatus};
use crate::error::SimResult;
use crate::geometry::Aabb;
use crate::solver::{PhysicsOperator, StepContext};

/// Re-imposes the inflow velocity and pressure on buffer particles still
/// inside the emission region.
pub struct InflowStamp {
    condition: Arc<InflowCondition>,
    region: Aabb,
    pressure_field: String,
}

impl InflowStamp {
    pub fn new(condition: Arc<InflowCondition>, region: Aabb, pressure_field: impl Into<String>) -> Self {
        Self {
            condition,
            region,
            pressure_field: pressure_field.into(),
        }
    }

    pub fn for_emitter(emitter: &EmitterInflow) -> Self {
        Self::new(
            emitter.condition(),
            emitter.params().region,
            emitter.params().pressure_field.clone(),
        )
    }
}

impl PhysicsOperator for InflowStamp {
    fn name(&self) -> &str {
        "inflow stamp"
    }

    fn apply(&mut self, body: &mut Body, _contacts: &ContactBodies<'_>, _step: &StepContext) -> SimResult<()> {
        let mut stamped = Vec::new();
        let (particles, fields) = body.particles_and_fields_mut();
        for (index, particle) in particles.iter_mut().enumerate() {
            if particle.status == ParticleStatus::Buffer && self.region.contains_point(particle.position) {
                particle.velocity = self.condition.velocity_at(particle.position);
                stamped.push(index);
            }
        }
        if let Some(pressure) = fields.get_mut(&self.pressure_field) {
            for index in stamped {
                pressure[index] = self.condition.pressure();
            }
        }
        Ok(())
    }
}
