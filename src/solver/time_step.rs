//! Step-size criteria
//!
//! Each criterion bounds the step of one body from its current state. The
//! integrator takes the minimum across bodies; `Real::INFINITY` means the
//! criterion puts no bound on the step.

use rayon::prelude::*;

use crate::config::constants;
use crate::core::Body;
use crate::math::Real;

pub trait StepSizeCriterion: Send + Sync {
    fn step_size(&self, body: &Body) -> Real;
}

/// Fastest particle speed in the body, reserve slots excluded.
pub fn max_speed(body: &Body) -> Real {
    body.particles()
        .par_iter()
        .filter(|p| p.is_simulated())
        .map(|p| p.velocity.length())
        .reduce(|| 0.0, Real::max)
}

/// Advective CFL: `factor * h / max(v_max, U_ref)`.
#[derive(Clone, Copy, Debug)]
pub struct AdvectionCfl {
    pub reference_speed: Real,
    pub factor: Real,
}

impl AdvectionCfl {
    pub fn new(reference_speed: Real) -> Self {
        Self {
            reference_speed,
            factor: constants::ADVECTION_CFL,
        }
    }
}

impl StepSizeCriterion for AdvectionCfl {
    fn step_size(&self, body: &Body) -> Real {
        let speed = max_speed(body).max(self.reference_speed);
        if speed > 0.0 {
            self.factor * body.smoothing_length() / speed
        } else {
            Real::INFINITY
        }
    }
}

/// Acoustic CFL: `factor * h / (c0 + v_max)`.
#[derive(Clone, Copy, Debug)]
pub struct AcousticCfl {
    pub sound_speed: Real,
    pub factor: Real,
}

impl AcousticCfl {
    pub fn new(sound_speed: Real) -> Self {
        Self {
            sound_speed,
            factor: constants::ACOUSTIC_CFL,
        }
    }
}

impl StepSizeCriterion for AcousticCfl {
    fn step_size(&self, body: &Body) -> Real {
        let signal = self.sound_speed + max_speed(body);
        if signal > 0.0 {
            self.factor * body.smoothing_length() / signal
        } else {
            Real::INFINITY
        }
    }
}

/// Explicit diffusion limit: `factor * h^2 / D_max`.
#[derive(Clone, Copy, Debug)]
pub struct DiffusionLimit {
    pub diffusivity: Real,
    pub factor: Real,
}

impl DiffusionLimit {
    pub fn new(diffusivity: Real) -> Self {
        Self {
            diffusivity,
            factor: constants::DIFFUSION_CFL,
        }
    }
}

impl StepSizeCriterion for DiffusionLimit {
    fn step_size(&self, body: &Body) -> Real {
        if self.diffusivity > 0.0 {
            let h = body.smoothing_length();
            self.factor * h * h / self.diffusivity
        } else {
            Real::INFINITY
        }
    }
}

/// Reaction stiffness bound: `factor / k_max`.
#[derive(Clone, Copy, Debug)]
pub struct ReactionLimit {
    pub stiffness: Real,
    pub factor: Real,
}

impl ReactionLimit {
    pub fn new(stiffness: Real) -> Self {
        Self {
            stiffness,
            factor: constants::REACTION_CFL,
        }
    }
}

impl StepSizeCriterion for ReactionLimit {
    fn step_size(&self, _body: &Body) -> Real {
        if self.stiffness > 0.0 {
            self.factor / self.stiffness
        } else {
            Real::INFINITY
        }
    }
}

/// Constant step, e.g. a fixed observation period.
#[derive(Clone, Copy, Debug)]
pub struct FixedStep(pub Real);

impl StepSizeCriterion for FixedStep {
    fn step_size(&self, _body: &Body) -> Real {
        self.0
    }
}
