//! Open inflow boundary
//!
//! An emitter owns a fixed pool of reserve slots on its body. Each call
//! promotes buffer particles that left the emission region, recycles
//! particles that left the domain, and injects fresh particles at the inflow
//! face from the reserve. Slots are recycled, never allocated or freed while
//! stepping.

use std::collections::VecDeque;
use std::sync::Arc;

use bevy::log::{debug, warn};

use crate::core::body::{Body, BodyId};
use crate::core::particle::{Particle, ParticleStatus};
use crate::error::{SimError, SimResult};
use crate::geometry::Aabb;
use crate::math::{DIM, Point, Real, Vector, component, lattice_volume, set_component};

/// Relative slack on the one-spacing clearance around face slots.
const SLOT_TOLERANCE: Real = 1.0e-9;

/// Velocity profile and pressure stamped on injected particles.
pub struct InflowCondition {
    velocity: Box<dyn Fn(Point) -> Vector + Send + Sync>,
    pressure: Real,
}

impl InflowCondition {
    pub fn new(velocity: impl Fn(Point) -> Vector + Send + Sync + 'static, pressure: Real) -> Self {
        Self {
            velocity: Box::new(velocity),
            pressure,
        }
    }

    pub fn uniform(velocity: Vector, pressure: Real) -> Self {
        Self::new(move |_| velocity, pressure)
    }

    #[inline]
    pub fn velocity_at(&self, position: Point) -> Vector {
        (self.velocity)(position)
    }

    #[inline]
    pub fn pressure(&self) -> Real {
        self.pressure
    }
}

#[derive(Clone, Debug)]
pub struct EmitterParams {
    /// Emission region; particles are seeded at its upstream face.
    pub region: Aabb,
    /// Axis the inflow runs along.
    pub flow_axis: usize,
    /// Whether the flow runs towards +axis.
    pub flow_positive: bool,
    /// Target injections per call.
    pub particles_per_call: usize,
    /// Reserve slots preallocated on the body.
    pub capacity: usize,
    /// Most particles allowed to sit in the region as buffer at once.
    pub max_buffered: usize,
    /// Particles outside this box are recycled.
    pub domain: Aabb,
    /// Field receiving the inflow pressure, when registered on the body.
    pub pressure_field: String,
}

impl EmitterParams {
    pub fn new(region: Aabb, domain: Aabb, particles_per_call: usize, capacity: usize) -> Self {
        Self {
            region,
            flow_axis: 0,
            flow_positive: true,
            particles_per_call,
            capacity,
            max_buffered: capacity,
            domain,
            pressure_field: "pressure".to_string(),
        }
    }

    pub fn with_flow(mut self, axis: usize, positive: bool) -> Self {
        self.flow_axis = axis;
        self.flow_positive = positive;
        self
    }

    pub fn with_max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = max_buffered;
        self
    }

    pub fn with_pressure_field(mut self, field: impl Into<String>) -> Self {
        self.pressure_field = field.into();
        self
    }

    fn validate(&self) -> SimResult<()> {
        if self.flow_axis >= DIM {
            return Err(SimError::configuration(format!(
                "emitter flow axis {} out of range",
                self.flow_axis
            )));
        }
        Aabb::checked(self.region.lower, self.region.upper)?;
        Aabb::checked(self.domain.lower, self.domain.upper)?;
        Ok(())
    }
}

/// Outcome of one emitter call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub promoted: usize,
    pub recycled: usize,
    pub injected: usize,
    pub requested: usize,
    /// Face slots skipped because earlier buffer particles had not moved
    /// clear of them yet.
    pub blocked: usize,
    /// Fewer particles were injected than requested.
    pub capacity_limited: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub calls: usize,
    pub promoted: usize,
    pub recycled: usize,
    pub injected: usize,
    pub blocked: usize,
    pub capacity_limited_calls: usize,
}

/// Reserve queue state, enough to resume an emitter from a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitterOccupancy {
    pub reserve: Vec<usize>,
    pub buffered: usize,
    pub slot_cursor: usize,
}

pub struct EmitterInflow {
    body: BodyId,
    params: EmitterParams,
    condition: Arc<InflowCondition>,
    spacing: Real,
    reserve: VecDeque<usize>,
    slots: Vec<Point>,
    slot_cursor: usize,
    stats: EmitterStats,
}

impl EmitterInflow {
    /// Validate `params` and append `capacity` reserve slots to `body`.
    /// The body should already be registered so the emitter can find it
    /// again while stepping.
    pub fn new(body: &mut Body, params: EmitterParams, condition: InflowCondition) -> SimResult<Self> {
        params.validate()?;
        let spacing = body.spacing();
        let slots = face_slots(&params, spacing);
        if slots.is_empty() && params.particles_per_call > 0 {
            return Err(SimError::configuration(format!(
                "emitter on '{}': inflow face narrower than one spacing",
                body.name()
            )));
        }

        let volume = lattice_volume(spacing);
        let set = body.particle_set_mut();
        let reserve: VecDeque<usize> = (0..params.capacity)
            .map(|_| set.push(Particle::reserve(volume)))
            .collect();

        debug!(
            "Emitter on '{}': {} reserve slots, {} face slots",
            body.name(),
            reserve.len(),
            slots.len()
        );

        Ok(Self {
            body: body.id(),
            params,
            condition: Arc::new(condition),
            spacing,
            reserve,
            slots,
            slot_cursor: 0,
            stats: EmitterStats::default(),
        })
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn params(&self) -> &EmitterParams {
        &self.params
    }

    pub fn stats(&self) -> EmitterStats {
        self.stats
    }

    pub fn reserve_len(&self) -> usize {
        self.reserve.len()
    }

    pub fn spacing(&self) -> Real {
        self.spacing
    }

    /// Shared handle on the inflow condition, for operators that keep
    /// stamping it on buffer particles between emitter calls.
    pub fn condition(&self) -> Arc<InflowCondition> {
        Arc::clone(&self.condition)
    }

    /// Promote, recycle, then inject. Never fails: running out of reserve
    /// caps the injection and is reported in the returned value.
    pub fn apply(&mut self, body: &mut Body) -> InjectionReport {
        let mut report = InjectionReport {
            requested: self.params.particles_per_call,
            ..InjectionReport::default()
        };

        report.promoted = self.promote(body);
        report.recycled = self.recycle(body);
        (report.injected, report.blocked) = self.inject(body);
        report.capacity_limited = report.injected < report.requested;

        self.stats.calls += 1;
        self.stats.promoted += report.promoted;
        self.stats.recycled += report.recycled;
        self.stats.injected += report.injected;
        self.stats.blocked += report.blocked;
        if report.capacity_limited {
            self.stats.capacity_limited_calls += 1;
            if report.blocked > 0 {
                // the inlet is still full; routine at low inflow speeds
                debug!(
                    "Emitter on '{}': {} face slots blocked, injected {} of {}",
                    body.name(),
                    report.blocked,
                    report.injected,
                    report.requested
                );
            } else {
                warn!(
                    "Emitter on '{}' capped: injected {} of {} (reserve {}, buffered {})",
                    body.name(),
                    report.injected,
                    report.requested,
                    self.reserve.len(),
                    body.particle_set().count_with(ParticleStatus::Buffer)
                );
            }
        }
        report
    }

    fn downstream_face(&self) -> Real {
        if self.params.flow_positive {
            component(self.params.region.upper, self.params.flow_axis)
        } else {
            component(self.params.region.lower, self.params.flow_axis)
        }
    }

    fn promote(&self, body: &mut Body) -> usize {
        let axis = self.params.flow_axis;
        let face = self.downstream_face();
        let positive = self.params.flow_positive;

        let mut promoted = 0;
        for particle in body.particles_mut() {
            if particle.status != ParticleStatus::Buffer {
                continue;
            }
            let x = component(particle.position, axis);
            let crossed = if positive { x > face } else { x < face };
            if crossed {
                particle.status = ParticleStatus::Active;
                promoted += 1;
            }
        }
        promoted
    }

    fn recycle(&mut self, body: &mut Body) -> usize {
        let domain = self.params.domain;
        let outside: Vec<usize> = body
            .particles()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_simulated() && !(p.position.is_finite() && domain.contains_point(p.position)))
            .map(|(index, _)| index)
            .collect();

        for &index in &outside {
            let set = body.particle_set_mut();
            set.reset_slot(index);
            if let Some(particle) = set.get_mut(index) {
                particle.status = ParticleStatus::Reserve;
            }
            body.clear_neighbor_rows(index);
            self.reserve.push_back(index);
        }
        outside.len()
    }

    /// Returns `(injected, blocked)`: a face slot is blocked while a buffer
    /// particle still sits less than one spacing away from it.
    fn inject(&mut self, body: &mut Body) -> (usize, usize) {
        let mut occupied: Vec<Point> = body
            .particles()
            .iter()
            .filter(|p| p.status == ParticleStatus::Buffer)
            .map(|p| p.position)
            .collect();
        let room = self.params.max_buffered.saturating_sub(occupied.len());
        let count = self
            .params
            .particles_per_call
            .min(room)
            .min(self.reserve.len());
        let clearance = self.spacing * (1.0 - SLOT_TOLERANCE);

        let mut injected = 0;
        let mut blocked = 0;
        // each slot is visited at most once per call
        for _ in 0..self.slots.len() {
            if injected == count {
                break;
            }
            let position = self.slots[self.slot_cursor];
            self.slot_cursor = (self.slot_cursor + 1) % self.slots.len();
            if occupied.iter().any(|&p| p.distance(position) < clearance) {
                blocked += 1;
                continue;
            }
            let Some(index) = self.reserve.pop_front() else {
                break;
            };

            let velocity = self.condition.velocity_at(position);
            let pressure = self.condition.pressure();
            let set = body.particle_set_mut();
            set.reset_slot(index);
            if let Some(particle) = set.get_mut(index) {
                particle.position = position;
                particle.velocity = velocity;
                particle.status = ParticleStatus::Buffer;
            }
            if let Some(field) = set.fields_mut().get_mut(&self.params.pressure_field) {
                field[index] = pressure;
            }
            occupied.push(position);
            injected += 1;
        }
        (injected, blocked)
    }

    pub fn occupancy(&self, body: &Body) -> EmitterOccupancy {
        EmitterOccupancy {
            reserve: self.reserve.iter().copied().collect(),
            buffered: body.particle_set().count_with(ParticleStatus::Buffer),
            slot_cursor: self.slot_cursor,
        }
    }

    /// Reinstate the reserve queue from a snapshot. Every listed slot must
    /// carry the reserve tag on the body.
    pub fn restore_occupancy(&mut self, body: &Body, occupancy: &EmitterOccupancy) -> SimResult<()> {
        let reserve_tags = body.particle_set().count_with(ParticleStatus::Reserve);
        let consistent = occupancy.reserve.len() == reserve_tags
            && occupancy.reserve.iter().all(|&index| {
                body.particles()
                    .get(index)
                    .is_some_and(|p| p.status == ParticleStatus::Reserve)
            });
        if !consistent {
            return Err(SimError::SnapshotMismatch(format!(
                "emitter reserve of '{}' does not match particle tags",
                body.name()
            )));
        }
        self.reserve = occupancy.reserve.iter().copied().collect();
        self.slot_cursor = if self.slots.is_empty() {
            0
        } else {
            occupancy.slot_cursor % self.slots.len()
        };
        Ok(())
    }
}

/// Injection points: one per spacing across the upstream face, half a
/// spacing inside the region.
fn face_slots(params: &EmitterParams, spacing: Real) -> Vec<Point> {
    let axis = params.flow_axis;
    let across = 1 - axis;
    let width = params.region.extent_along(across);
    // tolerate round-off when the width is a whole number of spacings
    let count = (width / spacing + 1.0e-9).floor() as usize;

    let upstream = if params.flow_positive {
        component(params.region.lower, axis) + 0.5 * spacing
    } else {
        component(params.region.upper, axis) - 0.5 * spacing
    };
    let start = component(params.region.lower, across);

    (0..count)
        .map(|k| {
            let mut slot = Point::ZERO;
            set_component(&mut slot, axis, upstream);
            set_component(&mut slot, across, start + (k as Real + 0.5) * spacing);
            slot
        })
        .collect()
}
