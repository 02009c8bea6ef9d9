//! Kernel sums over neighbor configurations
//!
//! [`FieldObserver`] samples a partner's field at an observer's particles;
//! [`DensitySummation`] recomputes a fluid's density from its particle number
//! density. Both read configurations only, so they run in the `Initialize`
//! role right after a refresh.

use rayon::prelude::*;

use crate::core::{Body, BodyId, ContactBodies};
use crate::error::{SimError, SimResult};
use crate::math::{Real, is_positive_finite};
use crate::physics::kernel::Kernel;
use crate::solver::{PhysicsOperator, StepContext};

/// Shepard interpolation of a partner field:
/// `f_i = sum_j V_j f_j W_ij / sum_j V_j W_ij`.
///
/// Particles with no partner neighbor get zero.
#[derive(Clone, Debug)]
pub struct FieldObserver<K: Kernel> {
    pub partner: BodyId,
    /// Field read from the partner.
    pub field: String,
    /// Field written on the observer.
    pub target: String,
    pub kernel: K,
}

impl<K: Kernel> FieldObserver<K> {
    pub fn new(partner: BodyId, field: impl Into<String>, kernel: K) -> Self {
        let field = field.into();
        Self {
            partner,
            target: field.clone(),
            field,
            kernel,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

impl<K: Kernel> PhysicsOperator for FieldObserver<K> {
    fn name(&self) -> &str {
        "field observer"
    }

    fn apply(&mut self, body: &mut Body, contacts: &ContactBodies<'_>, _step: &StepContext) -> SimResult<()> {
        let partner = contacts
            .get(self.partner)
            .ok_or_else(|| SimError::UnknownBody(format!("#{}", self.partner.index())))?;
        let configuration = body.configuration(self.partner).ok_or_else(|| {
            SimError::configuration(format!(
                "'{}' observes '{}' without a contact edge",
                body.name(),
                partner.name()
            ))
        })?;
        let source = partner.fields().require(&self.field)?;
        let partner_particles = partner.particles();

        let sampled: Vec<Real> = (0..body.len())
            .into_par_iter()
            .map(|i| {
                let (weighted, total) = configuration.neighbors(i).iter().fold((0.0, 0.0), |(sum, norm), n| {
                    let weight = partner_particles[n.index].volume * self.kernel.weight(n.distance);
                    (sum + weight * source[n.index], norm + weight)
                });
                if total > 0.0 { weighted / total } else { 0.0 }
            })
            .collect();

        body.fields_mut()
            .require_mut(&self.target)?
            .copy_from_slice(&sampled);
        Ok(())
    }
}

/// `rho_i = rho_0 * sigma_i / sigma_0`, with `sigma_i = W(0) + sum_j W_ij`
/// over every configuration of the body and `sigma_0` the same sum on a full
/// square lattice.
///
/// With `free_surface`, densities below `rho_0` are lifted back to it, so
/// particles near the surface do not pull the fluid together.
#[derive(Clone, Debug)]
pub struct DensitySummation<K: Kernel> {
    pub field: String,
    pub rest_density: Real,
    pub free_surface: bool,
    reference_number_density: Real,
    kernel: K,
}

impl<K: Kernel> DensitySummation<K> {
    pub fn new(field: impl Into<String>, rest_density: Real, spacing: Real, kernel: K) -> SimResult<Self> {
        if !is_positive_finite(spacing) || !is_positive_finite(rest_density) {
            return Err(SimError::configuration(format!(
                "density summation needs positive spacing and rest density, got {} and {}",
                spacing, rest_density
            )));
        }
        let reference_number_density = lattice_number_density(&kernel, spacing);
        if !is_positive_finite(reference_number_density) {
            return Err(SimError::configuration(format!(
                "kernel gives no number density at spacing {}",
                spacing
            )));
        }
        Ok(Self {
            field: field.into(),
            rest_density,
            free_surface: false,
            reference_number_density,
            kernel,
        })
    }

    pub fn with_free_surface(mut self) -> Self {
        self.free_surface = true;
        self
    }

    pub fn reference_number_density(&self) -> Real {
        self.reference_number_density
    }
}

/// Kernel sum of a particle over a square lattice, itself included.
pub fn lattice_number_density(kernel: &impl Kernel, spacing: Real) -> Real {
    let reach = (kernel.cutoff_radius() / spacing).ceil() as i64;
    let mut sigma = 0.0;
    for i in -reach..=reach {
        for j in -reach..=reach {
            let distance = spacing * ((i * i + j * j) as Real).sqrt();
            sigma += kernel.weight(distance);
        }
    }
    sigma
}

impl<K: Kernel> PhysicsOperator for DensitySummation<K> {
    fn name(&self) -> &str {
        "density summation"
    }

    fn apply(&mut self, body: &mut Body, _contacts: &ContactBodies<'_>, _step: &StepContext) -> SimResult<()> {
        let self_weight = self.kernel.weight(0.0);
        let configurations = body.configurations();
        let particles = body.particles();

        let densities: Vec<Option<Real>> = (0..particles.len())
            .into_par_iter()
            .map(|i| {
                if !particles[i].is_simulated() {
                    return None;
                }
                let sigma = configurations
                    .iter()
                    .flat_map(|c| c.neighbors(i))
                    .map(|n| self.kernel.weight(n.distance))
                    .sum::<Real>()
                    + self_weight;
                let density = self.rest_density * sigma / self.reference_number_density;
                Some(if self.free_surface {
                    density.max(self.rest_density)
                } else {
                    density
                })
            })
            .collect();

        let values = body.fields_mut().require_mut(&self.field)?;
        for (value, density) in values.iter_mut().zip(densities) {
            if let Some(density) = density {
                *value = density;
            }
        }
        Ok(())
    }
}
