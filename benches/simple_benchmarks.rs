/// Simple custom benchmarking without criterion
use std::time::Instant;

use sph2d::core::{Body, BodyKind, BodyRegistry, ContactTopology, ParticleGenerator};
use sph2d::geometry::Rectangle;
use sph2d::math::{Point, Real};
use sph2d::BodyParams;

fn time_it<F: FnMut()>(name: &str, iterations: usize, mut f: F) {
    // Warmup
    for _ in 0..5 {
        f();
    }

    let start = Instant::now();
    for _ in 0..iterations {
        f();
    }
    let elapsed = start.elapsed();

    let avg_ms = elapsed.as_secs_f64() * 1000.0 / iterations as f64;
    println!("{}: {:.3}ms avg ({} iterations)", name, avg_ms, iterations);
}

/// Square block of roughly `count` lattice particles with self-contact.
fn create_block(count: usize) -> BodyRegistry {
    let side = (count as Real).sqrt();
    let spacing = 1.0 / side;
    let block = Body::new(
        BodyParams::new("block", BodyKind::Fluid, spacing),
        ParticleGenerator::lattice(Rectangle::new(Point::ZERO, Point::ONE)),
    )
    .expect("valid block");

    let mut registry = BodyRegistry::new();
    registry.add(block).expect("fresh registry");
    let topology = ContactTopology::from_names(&[("block", &["block"][..])], &registry)
        .expect("valid topology");
    registry.set_topology(topology).expect("topology set once");
    registry.initialize().expect("initial build");
    registry
}

fn main() {
    println!("\n=== SPH2D Benchmarks ===\n");

    println!("--- Cell List Rebuild ---");
    for &count in &[1000, 5000, 10000, 20000] {
        let mut registry = create_block(count);
        let id = registry.id_of("block").expect("registered");

        time_it(&format!("rebuild_cells (n={})", count), 20, || {
            // mutable access marks the cell list dirty
            let body = registry.body_mut(id);
            body.particles_mut();
            body.rebuild_cells();
        });
    }

    println!("\n--- Neighbor Configuration ---");
    for &count in &[1000, 5000, 10000, 20000] {
        let mut registry = create_block(count);
        let pairs = registry
            .iter()
            .map(|body| body.configurations()[0].total_pairs())
            .sum::<usize>();
        println!("n={} -> {} pairs", count, pairs);

        time_it(&format!("build_all (n={})", count), 10, || {
            registry.initialize().expect("rebuild");
        });
    }

    println!("\n--- Refresh After Motion ---");
    for &count in &[1000, 5000, 10000] {
        let mut registry = create_block(count);
        let id = registry.id_of("block").expect("registered");

        time_it(&format!("move+refresh (n={})", count), 10, || {
            for particle in registry.body_mut(id).particles_mut() {
                particle.position.x += 1.0e-4;
            }
            registry.refresh().expect("refresh");
        });
    }

    println!("\n=== Benchmark Complete ===\n");
}
