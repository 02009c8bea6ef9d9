//! Multi-rate time integration
//!
//! Three nested loops:
//!
//! * output interval: runs until `end_time`, writes states at each boundary;
//! * super-step (`Dt`): advective/diffusive bound, recomputed every pass,
//!   followed by one emitter call;
//! * sub-step (`dt`): acoustic/reactive bound, operator-split physics, then a
//!   full cell-list rebuild and neighbor refresh before the next sub-step.
//!
//! Within a sub-step the split runs phase by phase: each phase of the kind's
//! sequence is applied to every scheduled body, in schedule order, before the
//! next phase starts. An operator therefore sees its partners as the previous
//! phase left them, plus whatever earlier bodies did in the current phase.
//!
//! Every loop stops once its accumulated time reaches or passes its target.
//! A step size that collapses to zero or goes non-finite aborts the run.

use std::time::{Duration, Instant};

use bevy::log::{error, info};

use crate::config::IntegratorParams;
use crate::core::{BodyId, BodyRegistry, EmitterInflow};
use crate::error::{SimError, SimResult, StepScope};
use crate::math::Real;
use crate::solver::operator::{OperatorRole, PhysicsOperator, StepContext};
use crate::solver::output::{NullWriter, RestartSnapshot, SimulationClock, StateWriter};
use crate::solver::time_step::StepSizeCriterion;

/// Operators and step-size criteria of one body.
pub struct BodySchedule {
    body: BodyId,
    operators: Vec<(OperatorRole, Box<dyn PhysicsOperator>)>,
    super_step: Vec<Box<dyn StepSizeCriterion>>,
    sub_step: Vec<Box<dyn StepSizeCriterion>>,
}

impl BodySchedule {
    pub fn new(body: BodyId) -> Self {
        Self {
            body,
            operators: Vec::new(),
            super_step: Vec::new(),
            sub_step: Vec::new(),
        }
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    /// Operators sharing a role run in the order they were added.
    pub fn with_operator(mut self, role: OperatorRole, operator: impl PhysicsOperator + 'static) -> Self {
        self.operators.push((role, Box::new(operator)));
        self
    }

    pub fn with_super_step(mut self, criterion: impl StepSizeCriterion + 'static) -> Self {
        self.super_step.push(Box::new(criterion));
        self
    }

    pub fn with_sub_step(mut self, criterion: impl StepSizeCriterion + 'static) -> Self {
        self.sub_step.push(Box::new(criterion));
        self
    }

    fn run_role(
        &mut self,
        registry: &mut BodyRegistry,
        role: OperatorRole,
        dt: Real,
        time: Real,
    ) -> SimResult<()> {
        let (body, contacts) = registry.split_mut(self.body);
        let step = StepContext {
            role,
            dt: dt * role.step_fraction(),
            time,
        };
        for (_, operator) in self.operators.iter_mut().filter(|(r, _)| *r == role) {
            operator.apply(body, &contacts, &step)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub iterations: usize,
    pub sub_iterations: usize,
    pub physical_time: Real,
    /// Wall time spent stepping, output excluded.
    pub compute_time: Duration,
}

pub struct TimeIntegrator<W: StateWriter = NullWriter> {
    params: IntegratorParams,
    clock: SimulationClock,
    schedules: Vec<BodySchedule>,
    emitters: Vec<EmitterInflow>,
    writer: W,
    output_time: Duration,
    started: Option<Instant>,
    /// Iteration of the last restart written or restored from.
    last_restart: Option<usize>,
}

impl TimeIntegrator<NullWriter> {
    pub fn new(params: IntegratorParams) -> SimResult<Self> {
        Self::with_writer(params, NullWriter)
    }
}

impl<W: StateWriter> TimeIntegrator<W> {
    pub fn with_writer(params: IntegratorParams, writer: W) -> SimResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            clock: SimulationClock::default(),
            schedules: Vec::new(),
            emitters: Vec::new(),
            writer,
            output_time: Duration::ZERO,
            started: None,
            last_restart: None,
        })
    }

    pub fn params(&self) -> &IntegratorParams {
        &self.params
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn emitters(&self) -> &[EmitterInflow] {
        &self.emitters
    }

    pub fn is_finished(&self) -> bool {
        self.clock.physical_time >= self.params.end_time
    }

    /// Register a body's operators; every role must fit the body's kind.
    pub fn add_schedule(&mut self, registry: &BodyRegistry, schedule: BodySchedule) -> SimResult<()> {
        if !registry.contains(schedule.body) {
            return Err(SimError::configuration(format!(
                "schedule for unregistered body #{}",
                schedule.body.index()
            )));
        }
        let body = registry.body(schedule.body);
        if let Some((role, _)) = schedule
            .operators
            .iter()
            .find(|(role, _)| !role.allowed_for(body.kind()))
        {
            return Err(SimError::configuration(format!(
                "role {:?} does not apply to {} body '{}'",
                role,
                body.kind().name(),
                body.name()
            )));
        }
        if self.schedules.iter().any(|s| s.body == schedule.body) {
            return Err(SimError::configuration(format!(
                "body '{}' is already scheduled",
                body.name()
            )));
        }
        self.schedules.push(schedule);
        Ok(())
    }

    /// The emitter's body must already be registered.
    pub fn add_emitter(&mut self, registry: &BodyRegistry, emitter: EmitterInflow) -> SimResult<()> {
        if !registry.contains(emitter.body()) {
            return Err(SimError::configuration(
                "emitter attached to a body outside the registry",
            ));
        }
        self.emitters.push(emitter);
        Ok(())
    }

    pub fn snapshot(&self, registry: &BodyRegistry) -> RestartSnapshot {
        let emitters = self
            .emitters
            .iter()
            .map(|e| e.occupancy(registry.body(e.body())))
            .collect();
        RestartSnapshot::capture(&self.clock, registry, emitters)
    }

    /// Resume from a snapshot taken on an identically set-up registry.
    pub fn restore(&mut self, registry: &mut BodyRegistry, snapshot: &RestartSnapshot) -> SimResult<()> {
        if snapshot.bodies.len() != registry.len() || snapshot.emitters.len() != self.emitters.len() {
            return Err(SimError::SnapshotMismatch(
                "body or emitter count differs".to_string(),
            ));
        }
        for saved in &snapshot.bodies {
            let id = registry.id_of(&saved.name)?;
            let body = registry.body_mut(id);
            let n = body.len();
            if saved.positions.len() != n || saved.velocities.len() != n || saved.statuses.len() != n {
                return Err(SimError::SnapshotMismatch(format!(
                    "body '{}' has {} slots, snapshot has {}",
                    saved.name,
                    n,
                    saved.positions.len()
                )));
            }
            for (name, values) in &saved.fields {
                let target = body.fields_mut().require_mut(name).map_err(|_| {
                    SimError::SnapshotMismatch(format!(
                        "body '{}' has no field '{}'",
                        saved.name, name
                    ))
                })?;
                if values.len() != n {
                    return Err(SimError::SnapshotMismatch(format!(
                        "field '{}' of body '{}' has {} values, expected {}",
                        name,
                        saved.name,
                        values.len(),
                        n
                    )));
                }
                target.copy_from_slice(values);
            }
            for (k, particle) in body.particles_mut().iter_mut().enumerate() {
                particle.position = saved.positions[k];
                particle.velocity = saved.velocities[k];
                particle.status = saved.statuses[k];
            }
        }
        for (emitter, occupancy) in self.emitters.iter_mut().zip(&snapshot.emitters) {
            emitter.restore_occupancy(registry.body(emitter.body()), occupancy)?;
        }

        self.clock = SimulationClock {
            physical_time: snapshot.physical_time,
            iteration: snapshot.iteration,
            ..SimulationClock::default()
        };
        self.last_restart = Some(snapshot.iteration);
        registry.initialize()
    }

    /// Run from the current clock to `end_time`.
    pub fn run(&mut self, registry: &mut BodyRegistry) -> SimResult<RunSummary> {
        self.prepare(registry)?;
        while !self.is_finished() {
            self.advance_output_interval(registry)?;
        }
        let summary = self.summary();
        info!(
            "Finished at time {:.9} after {} iterations; compute time {:.3}s",
            summary.physical_time,
            summary.iterations,
            summary.compute_time.as_secs_f64()
        );
        Ok(summary)
    }

    /// Build cell lists and configurations and write the initial states.
    /// Later calls are no-ops.
    pub fn prepare(&mut self, registry: &mut BodyRegistry) -> SimResult<()> {
        if self.started.is_some() {
            return Ok(());
        }
        if registry.topology().is_none() {
            return Err(SimError::configuration(
                "contact topology must be set before stepping",
            ));
        }
        registry.initialize()?;
        self.started = Some(Instant::now());
        self.write_states(registry);
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        RunSummary {
            iterations: self.clock.iteration,
            sub_iterations: self.clock.sub_iteration,
            physical_time: self.clock.physical_time,
            compute_time: elapsed.saturating_sub(self.output_time),
        }
    }

    /// One pass of the outer loop: super-steps until the output interval is
    /// covered, then a state output.
    pub fn advance_output_interval(&mut self, registry: &mut BodyRegistry) -> SimResult<()> {
        self.prepare(registry)?;
        let mut integrated = 0.0;
        while integrated < self.params.output_interval {
            integrated += self.advance_super_step(registry, self.params.output_interval - integrated)?;
        }
        self.write_states(registry);
        Ok(())
    }

    /// One super-step. `remaining` bounds `Dt` when no criterion does.
    /// Returns the time actually integrated.
    pub fn advance_super_step(&mut self, registry: &mut BodyRegistry, remaining: Real) -> SimResult<Real> {
        self.write_restart(registry);
        let super_step = self.checked_step(registry, StepScope::Super, remaining)?;
        self.clock.super_step = super_step;

        let time = self.clock.physical_time;
        let initialized = self
            .schedules
            .iter_mut()
            .try_for_each(|schedule| schedule.run_role(registry, OperatorRole::Initialize, super_step, time))
            .and_then(|()| registry.refresh().map(|_| ()));
        if let Err(err) = initialized {
            return Err(self.fail(registry, err));
        }

        let mut relaxation = 0.0;
        while relaxation < super_step {
            let sub_step = self.checked_step(registry, StepScope::Sub, super_step)?;
            self.clock.sub_step = sub_step;
            self.advance_sub_step(registry, sub_step)?;
            relaxation += sub_step;
        }

        self.report_progress();
        self.clock.iteration += 1;

        for emitter in &mut self.emitters {
            let id = emitter.body();
            emitter.apply(registry.body_mut(id));
        }
        if let Err(err) = registry.refresh() {
            return Err(self.fail(registry, err));
        }
        Ok(relaxation)
    }

    fn advance_sub_step(&mut self, registry: &mut BodyRegistry, dt: Real) -> SimResult<()> {
        let time = self.clock.physical_time;
        // phase-major: every body finishes a phase before any body starts the next
        let moved = (0..OperatorRole::MAX_SUB_STEP_PHASES)
            .try_for_each(|phase| {
                self.schedules.iter_mut().try_for_each(|schedule| {
                    let kind = registry.body(schedule.body).kind();
                    match OperatorRole::sub_step_sequence(kind).get(phase) {
                        Some(&role) => schedule.run_role(registry, role, dt, time),
                        None => Ok(()),
                    }
                })
            })
            // every body has moved; rebuild before anyone reads neighbors again
            .and_then(|()| registry.refresh().map(|_| ()));
        if let Err(err) = moved {
            return Err(self.fail(registry, err));
        }

        self.clock.physical_time += dt;
        self.clock.sub_iteration += 1;
        Ok(())
    }

    /// Minimum over every scheduled criterion of the scope, falling back to
    /// `fallback` when nothing bounds the step.
    fn checked_step(&mut self, registry: &BodyRegistry, scope: StepScope, fallback: Real) -> SimResult<Real> {
        let bound = self
            .schedules
            .iter()
            .flat_map(|schedule| {
                let body = registry.body(schedule.body);
                let criteria = match scope {
                    StepScope::Super => &schedule.super_step,
                    StepScope::Sub => &schedule.sub_step,
                };
                criteria.iter().map(move |c| c.step_size(body))
            })
            .fold(Real::INFINITY, |min, step| {
                if min.is_nan() || step.is_nan() { Real::NAN } else { min.min(step) }
            });
        let step = if bound == Real::INFINITY { fallback } else { bound };

        if !step.is_finite() || step <= self.params.min_step_size {
            let err = SimError::StepSizeCollapse {
                time: self.clock.physical_time,
                iteration: self.clock.iteration,
                step_size: step,
                scope,
            };
            return Err(self.fail(registry, err));
        }
        Ok(step)
    }

    fn report_progress(&self) {
        let screen = self.params.screen_output_interval;
        if screen != 0 && self.clock.iteration % screen == 0 {
            info!(
                "N={} Time = {:.9} Dt = {:.9} dt = {:.9}",
                self.clock.iteration, self.clock.physical_time, self.clock.super_step, self.clock.sub_step
            );
        }
    }

    /// Restarts hold the state a super-step starts from, so iteration 0 is
    /// included and a resumed run picks up exactly there.
    fn write_restart(&mut self, registry: &BodyRegistry) {
        let restart = self.params.restart_output_interval;
        let iteration = self.clock.iteration;
        if restart == 0 || iteration % restart != 0 || self.last_restart == Some(iteration) {
            return;
        }
        let start = Instant::now();
        let snapshot = self.snapshot(registry);
        self.writer.write_restart(&snapshot);
        self.last_restart = Some(iteration);
        self.output_time += start.elapsed();
    }

    fn write_states(&mut self, registry: &BodyRegistry) {
        let start = Instant::now();
        self.writer.write_states(&self.clock, registry);
        self.output_time += start.elapsed();
    }

    fn fail(&mut self, registry: &BodyRegistry, err: SimError) -> SimError {
        if err.is_fatal() {
            error!(
                "Run aborted at time {:.9} (iteration {}): {}",
                self.clock.physical_time, self.clock.iteration, err
            );
            let snapshot = self.snapshot(registry);
            self.writer.write_failure(&snapshot, &err);
        }
        err
    }
}
