//! Filling tank: an emitter pours water into a closed tank under gravity.
//!
//! Headless; progress goes to the log.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sph2d::core::{
    BodyKind, BodyRegistry, ContactBodies, ContactTopology, EmitterInflow, EmitterParams,
    InflowCondition, ParticleGenerator, ParticleStatus,
};
use sph2d::geometry::{Aabb, Region};
use sph2d::math::{Point, Real, Vector};
use sph2d::physics::{DensitySummation, Drift, DriftKick, FieldObserver, InflowStamp, WendlandC2};
use sph2d::solver::{
    AcousticCfl, AdvectionCfl, BodySchedule, OperatorRole, PhysicsOperator, SimulationClock,
    StateWriter, StepContext, TimeIntegrator,
};
use sph2d::{Body, BodyParams, IntegratorParams, SimResult, Simulation, SphPlugin};

const TANK_LENGTH: Real = 1.0;
const TANK_HEIGHT: Real = 1.0;
const SPACING: Real = 0.025;
const WALL_WIDTH: Real = SPACING * 4.0;
const INLET_LENGTH: Real = 2.0 * WALL_WIDTH;
const INLET_HEIGHT: Real = 0.125;
const INLET_LEVEL: Real = 0.4;
const GRAVITY: Real = 1.0;
const RESERVE: usize = 2000;
const REST_DENSITY: Real = 1.0;
const OBSERVER_SEED: u64 = 7;

fn inlet_region() -> Aabb {
    Aabb::new(
        Point::new(-WALL_WIDTH, INLET_LEVEL),
        Point::new(-WALL_WIDTH + INLET_LENGTH, INLET_LEVEL + INLET_HEIGHT),
    )
}

fn reference_speed() -> Real {
    2.0 * (GRAVITY * (INLET_LEVEL + INLET_HEIGHT)).sqrt()
}

/// Tank walls with an opening for the inlet.
struct TankWall {
    outer: Aabb,
    inner: Aabb,
    inlet: Aabb,
}

impl Region for TankWall {
    fn contains(&self, position: Point) -> bool {
        self.outer.contains_point(position)
            && !self.inner.contains_point(position)
            && !self.inlet.contains_point(position)
    }

    fn bounds(&self) -> Aabb {
        self.outer
    }
}

/// Weakly compressible water: `p = c^2 (rho - rho_0)`.
struct LinearEos {
    sound_speed: Real,
}

impl PhysicsOperator for LinearEos {
    fn name(&self) -> &str {
        "linear equation of state"
    }

    fn apply(&mut self, body: &mut Body, _contacts: &ContactBodies<'_>, _step: &StepContext) -> SimResult<()> {
        let simulated: Vec<bool> = body.particles().iter().map(|p| p.is_simulated()).collect();
        let density = body.fields().require("density")?.to_vec();
        let pressure = body.fields_mut().require_mut("pressure")?;
        for ((p, rho), simulated) in pressure.iter_mut().zip(density).zip(simulated) {
            if simulated {
                *p = self.sound_speed * self.sound_speed * (rho - REST_DENSITY);
            }
        }
        Ok(())
    }
}

/// Logs particle counts and the observed bottom pressure at every output time.
struct CountLogger;

impl StateWriter for CountLogger {
    fn write_states(&mut self, clock: &SimulationClock, registry: &BodyRegistry) {
        for body in registry.iter() {
            info!(
                "t = {:.3}: '{}' has {} simulated particles",
                clock.physical_time,
                body.name(),
                body.simulated_count()
            );
        }
        let observed = registry
            .id_of("observer")
            .ok()
            .and_then(|id| registry.body(id).fields().get("pressure"));
        if let Some(pressure) = observed.filter(|p| !p.is_empty()) {
            let mean = pressure.iter().sum::<Real>() / pressure.len() as Real;
            info!("t = {:.3}: mean observed pressure {:.6}", clock.physical_time, mean);
        }
    }
}

fn build_simulation() -> SimResult<Simulation> {
    let tank = Aabb::new(Point::ZERO, Point::new(TANK_LENGTH, TANK_HEIGHT));
    let domain = tank.expanded(WALL_WIDTH);
    let mut registry = BodyRegistry::new();

    let water = Body::new(
        BodyParams::new("water", BodyKind::Fluid, SPACING)
            .with_domain(domain)
            .with_field("pressure")
            .with_field("density"),
        ParticleGenerator::direct(Vec::new()),
    )?;

    let wall = Body::new(
        BodyParams::new("wall", BodyKind::Solid, SPACING),
        ParticleGenerator::lattice(TankWall {
            outer: domain,
            inner: tank,
            inlet: inlet_region(),
        }),
    )?;

    let mut rng = StdRng::seed_from_u64(OBSERVER_SEED);
    let sample_points: Vec<(Point, Real)> = (0..8)
        .map(|_| {
            let x = rng.random_range(0.1..=TANK_LENGTH - 0.1);
            (Point::new(x, 0.05), SPACING * SPACING)
        })
        .collect();
    let observer = Body::new(
        BodyParams::new("observer", BodyKind::Observer, SPACING)
            .with_domain(domain)
            .with_field("pressure"),
        ParticleGenerator::direct(sample_points),
    )?;

    let water = registry.add(water)?;
    registry.add(wall)?;
    let observer = registry.add(observer)?;

    let condition = InflowCondition::uniform(Vector::new(reference_speed(), 0.0), 0.0);
    let emitter = EmitterInflow::new(
        registry.body_mut(water),
        EmitterParams::new(inlet_region(), domain, 5, RESERVE),
        condition,
    )?;
    let topology = ContactTopology::from_names(
        &[
            ("water", &["water", "wall"][..]),
            ("wall", &[][..]),
            ("observer", &["water"][..]),
        ],
        &registry,
    )?;
    registry.set_topology(topology)?;

    let params = IntegratorParams::new(2.0, 0.1);
    let mut integrator =
        TimeIntegrator::<Box<dyn StateWriter>>::with_writer(params, Box::new(CountLogger))?;
    let kernel = WendlandC2::for_spacing(SPACING)?;
    let schedule = BodySchedule::new(water)
        .with_operator(
            OperatorRole::Initialize,
            DensitySummation::new("density", REST_DENSITY, SPACING, kernel)?.with_free_surface(),
        )
        .with_operator(
            OperatorRole::Initialize,
            LinearEos {
                sound_speed: 10.0 * reference_speed(),
            },
        )
        .with_operator(
            OperatorRole::PressureFirstHalf,
            DriftKick::gravity(Vector::new(0.0, -GRAVITY)),
        )
        .with_operator(OperatorRole::BoundaryCondition, InflowStamp::for_emitter(&emitter))
        .with_operator(OperatorRole::PressureSecondHalf, Drift)
        .with_super_step(AdvectionCfl::new(reference_speed()))
        .with_sub_step(AcousticCfl::new(10.0 * reference_speed()));
    integrator.add_schedule(&registry, schedule)?;
    let sampling = BodySchedule::new(observer)
        .with_operator(OperatorRole::Initialize, FieldObserver::new(water, "pressure", kernel));
    integrator.add_schedule(&registry, sampling)?;
    integrator.add_emitter(&registry, emitter)?;

    Ok(Simulation::new(registry, integrator))
}

fn report_inflow(simulation: Res<Simulation>) {
    if let Some(emitter) = simulation.integrator.emitters().first() {
        let water = simulation.registry.body(emitter.body());
        debug!(
            "emitter: {} calls, {} buffered, {} in reserve",
            emitter.stats().calls,
            water.particle_set().count_with(ParticleStatus::Buffer),
            emitter.reserve_len()
        );
    }
}

fn main() {
    let simulation = match build_simulation() {
        Ok(simulation) => simulation,
        Err(err) => {
            eprintln!("setup failed: {}", err);
            std::process::exit(1);
        }
    };

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(SphPlugin)
        .insert_resource(simulation)
        .add_systems(PostUpdate, report_inflow)
        .run();
}
