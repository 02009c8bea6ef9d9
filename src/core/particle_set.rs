use indexmap::IndexMap;

use crate::core::particle::{Particle, ParticleStatus};
use crate::error::{SimError, SimResult};
use crate::math::{Point, Real};

/// Named per-particle scalar arrays (density, pressure, species...).
///
/// Every array has one entry per particle slot. Registration order is kept
/// so snapshots and diagnostics list fields deterministically.
#[derive(Clone, Debug, Default)]
pub struct ParticleFields {
    arrays: IndexMap<String, Vec<Real>>,
    len: usize,
}

impl ParticleFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zero-filled array; registering an existing name is a no-op.
    pub fn register(&mut self, name: impl Into<String>) {
        let len = self.len;
        self.arrays
            .entry(name.into())
            .or_insert_with(|| vec![0.0; len]);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[Real]> {
        self.arrays.get(name).map(|values| values.as_slice())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut [Real]> {
        self.arrays.get_mut(name).map(|values| values.as_mut_slice())
    }

    pub fn require(&self, name: &str) -> SimResult<&[Real]> {
        self.get(name)
            .ok_or_else(|| SimError::configuration(format!("particle field '{}' is not registered", name)))
    }

    pub fn require_mut(&mut self, name: &str) -> SimResult<&mut [Real]> {
        self.arrays
            .get_mut(name)
            .map(|values| values.as_mut_slice())
            .ok_or_else(|| SimError::configuration(format!("particle field '{}' is not registered", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(|name| name.as_str())
    }

    fn push_slot(&mut self) {
        self.len += 1;
        for values in self.arrays.values_mut() {
            values.push(0.0);
        }
    }

    /// Zero every field of one slot.
    pub fn clear_slot(&mut self, index: usize) {
        for values in self.arrays.values_mut() {
            if let Some(value) = values.get_mut(index) {
                *value = 0.0;
            }
        }
    }
}

/// Dense particle storage for one body.
///
/// The slot count is fixed once setup is over: emitters recycle slots instead
/// of growing or shrinking the arrays.
#[derive(Clone, Debug, Default)]
pub struct ParticleSet {
    particles: Vec<Particle>,
    fields: ParticleFields,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn push(&mut self, particle: Particle) -> usize {
        let index = self.particles.len();
        self.particles.push(particle);
        self.fields.push_slot();
        index
    }

    pub fn extend(&mut self, batch: impl IntoIterator<Item = Particle>) {
        for particle in batch {
            self.push(particle);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.particles.iter().map(|particle| particle.position)
    }

    pub fn fields(&self) -> &ParticleFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut ParticleFields {
        &mut self.fields
    }

    /// Particles and fields borrowed together, for operators that read
    /// kinematics while writing fields.
    pub fn split_mut(&mut self) -> (&mut [Particle], &mut ParticleFields) {
        (&mut self.particles, &mut self.fields)
    }

    /// Number of particles taking part in the simulation (not reserve).
    pub fn simulated_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_simulated()).count()
    }

    pub fn count_with(&self, status: ParticleStatus) -> usize {
        self.particles.iter().filter(|p| p.status == status).count()
    }

    /// Reset motion and every field of a slot before it is reused.
    pub fn reset_slot(&mut self, index: usize) {
        if let Some(particle) = self.particles.get_mut(index) {
            particle.reset_dynamics();
        }
        self.fields.clear_slot(index);
    }
}
