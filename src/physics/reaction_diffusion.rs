//! Reaction and diffusion of a scalar species
//!
//! Both operators work on one named particle field. Reaction runs in the
//! Strang halves, diffusion in the middle of the split.

use rayon::prelude::*;

use crate::core::{Body, ContactBodies};
use crate::error::{SimError, SimResult};
use crate::math::Real;
use crate::physics::kernel::Kernel;
use crate::solver::{PhysicsOperator, StepContext};

/// `dc/dt = source - rate * c`, integrated exactly over the step.
#[derive(Clone, Debug)]
pub struct LinearReaction {
    pub species: String,
    pub rate: Real,
    pub source: Real,
}

impl LinearReaction {
    pub fn new(species: impl Into<String>, rate: Real) -> Self {
        Self {
            species: species.into(),
            rate,
            source: 0.0,
        }
    }

    pub fn with_source(mut self, source: Real) -> Self {
        self.source = source;
        self
    }

    #[inline]
    fn advance(&self, c: Real, dt: Real) -> Real {
        if self.rate == 0.0 {
            return c + self.source * dt;
        }
        let equilibrium = self.source / self.rate;
        equilibrium + (c - equilibrium) * (-self.rate * dt).exp()
    }
}

impl PhysicsOperator for LinearReaction {
    fn name(&self) -> &str {
        "linear reaction"
    }

    fn apply(&mut self, body: &mut Body, _contacts: &ContactBodies<'_>, step: &StepContext) -> SimResult<()> {
        let simulated: Vec<bool> = body.particles().iter().map(|p| p.is_simulated()).collect();
        let values = body.fields_mut().require_mut(&self.species)?;
        values
            .par_iter_mut()
            .zip(simulated.par_iter())
            .filter(|(_, simulated)| **simulated)
            .for_each(|(c, _)| *c = self.advance(*c, step.dt));
        Ok(())
    }
}

/// Explicit isotropic diffusion over the body's self-contact neighbors.
///
/// `dc_i/dt = 2 D sum_j V_j (c_i - c_j) W'(r_ij) / r_ij`, which conserves
/// `sum_i V_i c_i` whenever the neighbor lists are symmetric.
#[derive(Clone, Debug)]
pub struct IsotropicDiffusion<K: Kernel> {
    pub species: String,
    pub diffusivity: Real,
    pub kernel: K,
}

impl<K: Kernel> IsotropicDiffusion<K> {
    pub fn new(species: impl Into<String>, diffusivity: Real, kernel: K) -> Self {
        Self {
            species: species.into(),
            diffusivity,
            kernel,
        }
    }
}

impl<K: Kernel> PhysicsOperator for IsotropicDiffusion<K> {
    fn name(&self) -> &str {
        "isotropic diffusion"
    }

    fn apply(&mut self, body: &mut Body, _contacts: &ContactBodies<'_>, step: &StepContext) -> SimResult<()> {
        let configuration = body.configuration(body.id()).ok_or_else(|| {
            SimError::configuration(format!(
                "diffusion on '{}' needs a self-contact edge",
                body.name()
            ))
        })?;
        let particles = body.particles();
        let values = body.fields().require(&self.species)?;

        let rates: Vec<Real> = (0..particles.len())
            .into_par_iter()
            .map(|i| {
                if !particles[i].is_simulated() {
                    return 0.0;
                }
                configuration
                    .neighbors(i)
                    .iter()
                    .filter(|n| n.distance > 0.0)
                    .map(|n| {
                        let slope = self.kernel.gradient_factor(n.distance) / n.distance;
                        particles[n.index].volume * (values[i] - values[n.index]) * slope
                    })
                    .sum::<Real>()
                    * 2.0
                    * self.diffusivity
            })
            .collect();

        let values = body.fields_mut().require_mut(&self.species)?;
        values
            .par_iter_mut()
            .zip(rates.par_iter())
            .for_each(|(c, rate)| *c += rate * step.dt);
        Ok(())
    }
}
