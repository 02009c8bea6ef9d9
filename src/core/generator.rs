//! Initial particle placement
//!
//! Lattice generation fills a region at the body's reference spacing; direct
//! generation places observer/fictitious particles at given points.

use std::sync::Arc;

use crate::core::particle::Particle;
use crate::error::{SimError, SimResult};
use crate::geometry::{Aabb, Region};
use crate::math::{DIM, Point, Real, component, is_positive_finite, lattice_volume};

/// How a body seeds its particles. Chosen once at body construction.
#[derive(Clone)]
pub enum ParticleGenerator {
    /// Lattice nodes (cell centres) inside the region.
    Lattice { region: Arc<dyn Region> },
    /// Explicit `(position, volume)` pairs, kept in the given order.
    Direct { points: Vec<(Point, Real)> },
}

impl std::fmt::Debug for ParticleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticleGenerator::Lattice { region } => f
                .debug_struct("Lattice")
                .field("bounds", &region.bounds())
                .finish(),
            ParticleGenerator::Direct { points } => f
                .debug_struct("Direct")
                .field("points", &points.len())
                .finish(),
        }
    }
}

/// Lattice cells per axis: `ceil((upper - lower) / spacing)`.
pub fn lattice_counts(bounds: &Aabb, spacing: Real) -> SimResult<[usize; DIM]> {
    if !is_positive_finite(spacing) {
        return Err(SimError::configuration(format!(
            "lattice spacing must be positive and finite, got {}",
            spacing
        )));
    }
    let bounds = Aabb::checked(bounds.lower, bounds.upper)?;

    let mut counts = [0usize; DIM];
    for (axis, count) in counts.iter_mut().enumerate() {
        *count = (bounds.extent_along(axis) / spacing).ceil() as usize;
    }
    Ok(counts)
}

impl ParticleGenerator {
    pub fn lattice(region: impl Region + 'static) -> Self {
        Self::Lattice {
            region: Arc::new(region),
        }
    }

    pub fn direct(points: Vec<(Point, Real)>) -> Self {
        Self::Direct { points }
    }

    /// Box enclosing everything this generator can produce.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            ParticleGenerator::Lattice { region } => Some(region.bounds()),
            ParticleGenerator::Direct { points } => {
                Aabb::from_points(points.iter().map(|(position, _)| position))
            }
        }
    }

    pub fn generate(&self, spacing: Real) -> SimResult<Vec<Particle>> {
        match self {
            ParticleGenerator::Lattice { region } => generate_lattice(region.as_ref(), spacing),
            ParticleGenerator::Direct { points } => Ok(points
                .iter()
                .map(|&(position, volume)| Particle::new(position, volume))
                .collect()),
        }
    }
}

/// Axis-major traversal (x outer, y inner), keeping nodes inside `region`.
fn generate_lattice(region: &dyn Region, spacing: Real) -> SimResult<Vec<Particle>> {
    let bounds = region.bounds();
    let [nx, ny] = lattice_counts(&bounds, spacing)?;
    let volume = lattice_volume(spacing);

    let mut particles = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            let node = Point::new(
                component(bounds.lower, 0) + (i as Real + 0.5) * spacing,
                component(bounds.lower, 1) + (j as Real + 0.5) * spacing,
            );
            if region.contains(node) {
                particles.push(Particle::new(node, volume));
            }
        }
    }
    Ok(particles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Polygon, Rectangle};

    #[test]
    fn unit_square_at_tenth_spacing_gives_ten_by_ten() {
        let square = Rectangle::new(Point::ZERO, Point::ONE);
        assert_eq!(lattice_counts(&square.bounds(), 0.1).unwrap(), [10, 10]);

        let particles = ParticleGenerator::lattice(square).generate(0.1).unwrap();
        assert_eq!(particles.len(), 100);
        assert!((particles[0].position - Point::new(0.05, 0.05)).length() < 1e-12);
        // x outer, y inner
        assert!((particles[1].position - Point::new(0.05, 0.15)).length() < 1e-12);
    }

    #[test]
    fn zero_thickness_region_generates_nothing() {
        let sliver = Rectangle::new(Point::new(0.0, 0.5), Point::new(1.0, 0.5));
        assert_eq!(lattice_counts(&sliver.bounds(), 0.1).unwrap(), [10, 0]);
        assert!(ParticleGenerator::lattice(sliver).generate(0.1).unwrap().is_empty());
    }

    #[test]
    fn invalid_spacing_is_a_configuration_error() {
        let square = Rectangle::new(Point::ZERO, Point::ONE);
        for spacing in [0.0, -0.1, Real::NAN, Real::INFINITY] {
            assert!(matches!(
                lattice_counts(&square.bounds(), spacing),
                Err(SimError::Configuration(_))
            ));
        }
    }

    #[test]
    fn triangle_prunes_nodes_outside() {
        let triangle = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ])
        .unwrap();
        let particles = ParticleGenerator::lattice(triangle.clone())
            .generate(0.1)
            .unwrap();

        assert!(particles.len() < 100);
        assert!(!particles.is_empty());
        assert!(particles.iter().all(|p| triangle.contains(p.position)));
    }

    #[test]
    fn direct_keeps_points_and_volumes() {
        let generator = ParticleGenerator::direct(vec![
            (Point::new(5.366, 0.2), 0.0),
            (Point::new(1.0, 1.0), 0.5),
        ]);
        let particles = generator.generate(0.025).unwrap();
        assert_eq!(particles.len(), 2);
        assert_eq!(particles[1].volume, 0.5);
        assert_eq!(generator.bounds().unwrap().upper, Point::new(5.366, 1.0));
    }
}
