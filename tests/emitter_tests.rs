//! Emitter inflow: capacity limits and slot recycling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sph2d::core::{
    Body, BodyKind, EmitterInflow, EmitterParams, InflowCondition, ParticleGenerator,
    ParticleStatus,
};
use sph2d::geometry::Aabb;
use sph2d::math::{Point, Vector};
use sph2d::BodyParams;

fn domain() -> Aabb {
    Aabb::new(Point::ZERO, Point::new(4.0, 2.0))
}

fn inlet() -> Aabb {
    Aabb::new(Point::new(0.0, 0.5), Point::new(0.4, 1.0))
}

fn empty_water() -> Body {
    Body::new(
        BodyParams::new("water", BodyKind::Fluid, 0.1)
            .with_domain(domain())
            .with_field("pressure"),
        ParticleGenerator::direct(Vec::new()),
    )
    .unwrap()
}

fn inflow(body: &mut Body, per_call: usize, capacity: usize) -> EmitterInflow {
    EmitterInflow::new(
        body,
        EmitterParams::new(inlet(), domain(), per_call, capacity),
        InflowCondition::uniform(Vector::new(2.0, 0.0), 0.0),
    )
    .unwrap()
}

/// Move every buffer particle downstream by `dx`.
fn advance_buffer(body: &mut Body, dx: f64) {
    for particle in body.particles_mut() {
        if particle.status == ParticleStatus::Buffer {
            particle.position.x += dx;
        }
    }
}

fn min_pair_distance(body: &Body) -> f64 {
    let simulated: Vec<Point> = body
        .particles()
        .iter()
        .filter(|p| p.is_simulated())
        .map(|p| p.position)
        .collect();
    let mut min = f64::INFINITY;
    for (i, a) in simulated.iter().enumerate() {
        for b in &simulated[i + 1..] {
            min = min.min(a.distance(*b));
        }
    }
    min
}

#[test]
fn test_capacity_caps_injection() {
    let mut water = empty_water();
    let mut emitter = inflow(&mut water, 3, 10);

    let injected: Vec<usize> = (0..4)
        .map(|_| {
            let report = emitter.apply(&mut water);
            advance_buffer(&mut water, 0.1);
            report.injected
        })
        .collect();
    assert_eq!(injected, vec![3, 3, 3, 1]);
    assert_eq!(water.simulated_count(), 10);
    assert_eq!(emitter.reserve_len(), 0);

    let stats = emitter.stats();
    assert_eq!(stats.calls, 4);
    assert_eq!(stats.injected, 10);
    assert_eq!(stats.capacity_limited_calls, 1);

    let report = emitter.apply(&mut water);
    assert_eq!(report.injected, 0);
    assert!(report.capacity_limited);
}

#[test]
fn test_injection_keeps_one_spacing_clearance() {
    let mut water = empty_water();
    let mut emitter = inflow(&mut water, 5, 50);
    assert_eq!(emitter.apply(&mut water).injected, 5);

    // barely moved: every face slot is still covered
    advance_buffer(&mut water, 0.01);
    let report = emitter.apply(&mut water);
    assert_eq!(report.injected, 0);
    assert_eq!(report.blocked, 5);
    assert!(report.capacity_limited);
    assert_eq!(water.simulated_count(), 5);
    assert!(min_pair_distance(&water) >= 0.1 - 1e-9);

    // a full spacing downstream frees the face again
    advance_buffer(&mut water, 0.1);
    let report = emitter.apply(&mut water);
    assert_eq!(report.injected, 5);
    assert_eq!(report.blocked, 0);
    assert!(min_pair_distance(&water) >= 0.1 - 1e-9);
    assert_eq!(emitter.stats().blocked, 5);
}

#[test]
fn test_standing_buffer_limits_injection() {
    let mut water = empty_water();
    let params = EmitterParams::new(inlet(), domain(), 4, 20).with_max_buffered(5);
    let condition = InflowCondition::uniform(Vector::new(1.0, 0.0), 0.0);
    let mut emitter = EmitterInflow::new(&mut water, params, condition).unwrap();

    assert_eq!(emitter.apply(&mut water).injected, 4);
    let report = emitter.apply(&mut water);
    assert_eq!(report.injected, 1);
    assert!(report.capacity_limited);

    // buffer leaves the region downstream and is promoted, making room
    for particle in water.particles_mut() {
        if particle.status == ParticleStatus::Buffer {
            particle.position.x += 1.0;
        }
    }
    let report = emitter.apply(&mut water);
    assert_eq!(report.promoted, 5);
    assert_eq!(report.injected, 4);
}

#[test]
fn test_active_count_never_exceeds_capacity() {
    let mut rng = StdRng::seed_from_u64(2024);
    let capacity = 25;
    let mut water = empty_water();
    let mut emitter = inflow(&mut water, 4, capacity);

    for _ in 0..200 {
        // random motion, some of it out of the domain
        for particle in water.particles_mut() {
            if particle.is_simulated() {
                particle.position += Vector::new(rng.random_range(-0.5..1.5), rng.random_range(-0.5..0.5));
            }
        }
        let report = emitter.apply(&mut water);
        assert!(report.injected <= report.requested);

        let simulated = water.simulated_count();
        assert!(simulated <= capacity);
        assert_eq!(simulated + emitter.reserve_len(), capacity);
        assert_eq!(water.len(), capacity);
        for particle in water.particles() {
            if particle.is_simulated() {
                assert!(domain().contains_point(particle.position) || particle.status == ParticleStatus::Buffer);
            }
        }
    }
    assert!(emitter.stats().recycled > 0);
}

#[test]
fn test_recycled_slots_come_back_clean() {
    let mut water = empty_water();
    let mut emitter = inflow(&mut water, 1, 1);
    emitter.apply(&mut water);
    water.fields_mut().get_mut("pressure").unwrap()[0] = 42.0;

    water.particles_mut()[0].position = Point::new(-1.0, 0.75);
    water.particles_mut()[0].acceleration = Vector::new(0.0, -9.8);
    let report = emitter.apply(&mut water);
    assert_eq!(report.recycled, 1);
    assert_eq!(report.injected, 1);

    let particle = &water.particles()[0];
    assert_eq!(particle.status, ParticleStatus::Buffer);
    assert_eq!(particle.acceleration, Vector::ZERO);
    assert_eq!(particle.velocity, Vector::new(2.0, 0.0));
    assert_eq!(water.fields().get("pressure").unwrap()[0], 0.0);
}

#[test]
fn test_occupancy_restores_reserve_queue() {
    let mut water = empty_water();
    let mut emitter = inflow(&mut water, 2, 6);
    emitter.apply(&mut water);
    let occupancy = emitter.occupancy(&water);
    assert_eq!(occupancy.buffered, 2);
    assert_eq!(occupancy.reserve.len(), 4);
    assert!(emitter.restore_occupancy(&water, &occupancy).is_ok());
    assert_eq!(emitter.reserve_len(), 4);

    let mut other = empty_water();
    let mut restored = inflow(&mut other, 2, 6);
    // tags do not match yet
    assert!(restored.restore_occupancy(&other, &occupancy).is_err());
    emitter.apply(&mut water);
    assert!(emitter.restore_occupancy(&water, &occupancy).is_err());
}
