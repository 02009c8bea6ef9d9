//! Particle records for SPH bodies
//!
//! A particle is an index into its body's dense arrays. The core only keeps
//! kinematic state; material fields live in [`super::ParticleFields`].

use crate::math::{Point, Real, Vector, zero_vector};

/// Lifecycle tag of a particle slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleStatus {
    /// Regular simulated particle.
    Active,
    /// Injected by an emitter and still inside the emission region.
    Buffer,
    /// Preallocated slot waiting to be injected; invisible to neighbor search.
    Reserve,
}

impl ParticleStatus {
    #[inline(always)]
    pub fn is_simulated(self) -> bool {
        !matches!(self, ParticleStatus::Reserve)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub velocity: Vector,
    pub acceleration: Vector,
    pub volume: Real,
    pub status: ParticleStatus,
}

impl Particle {
    pub fn zeroed() -> Self {
        Self {
            position: zero_vector(),
            velocity: zero_vector(),
            acceleration: zero_vector(),
            volume: 0.0,
            status: ParticleStatus::Active,
        }
    }

    pub fn new(position: Point, volume: Real) -> Self {
        Self {
            position,
            volume,
            ..Self::zeroed()
        }
    }

    /// A slot held back for later injection.
    pub fn reserve(volume: Real) -> Self {
        Self {
            volume,
            status: ParticleStatus::Reserve,
            ..Self::zeroed()
        }
    }

    pub fn with_velocity(mut self, velocity: Vector) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_status(mut self, status: ParticleStatus) -> Self {
        self.status = status;
        self
    }

    #[inline(always)]
    pub fn is_simulated(&self) -> bool {
        self.status.is_simulated()
    }

    /// Clear motion state, keeping volume.
    #[inline(always)]
    pub fn reset_dynamics(&mut self) {
        self.velocity = zero_vector();
        self.acceleration = zero_vector();
    }

    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }
}
