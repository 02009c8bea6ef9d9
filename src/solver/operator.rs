//! Physics operators and the roles the integrator runs them in

use crate::core::{Body, BodyKind, ContactBodies};
use crate::error::SimResult;
use crate::math::Real;

/// Where in the step an operator runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorRole {
    /// Once per super-step, before the sub-steps (accelerations, densities).
    Initialize,
    /// First half of the Strang split, over `dt / 2`.
    ReactionForward,
    /// Middle of the Strang split, over `dt`.
    Diffusion,
    /// Last half of the Strang split, over `dt / 2`.
    ReactionBackward,
    /// First half of the symplectic pressure relaxation.
    PressureFirstHalf,
    /// Boundary and inflow conditions between the two halves.
    BoundaryCondition,
    /// Second half of the symplectic pressure relaxation.
    PressureSecondHalf,
}

const STRANG_SEQUENCE: [OperatorRole; 3] = [
    OperatorRole::ReactionForward,
    OperatorRole::Diffusion,
    OperatorRole::ReactionBackward,
];

const SYMPLECTIC_SEQUENCE: [OperatorRole; 3] = [
    OperatorRole::PressureFirstHalf,
    OperatorRole::BoundaryCondition,
    OperatorRole::PressureSecondHalf,
];

impl OperatorRole {
    /// Length of the longest sub-step sequence.
    pub const MAX_SUB_STEP_PHASES: usize = 3;

    /// Roles applied each sub-step for a body kind, in order.
    pub fn sub_step_sequence(kind: BodyKind) -> &'static [OperatorRole] {
        match kind {
            BodyKind::ReactionDiffusion => &STRANG_SEQUENCE,
            BodyKind::Fluid | BodyKind::Solid => &SYMPLECTIC_SEQUENCE,
            BodyKind::Observer => &[],
        }
    }

    /// Share of the sub-step size the role integrates over.
    pub fn step_fraction(self) -> Real {
        match self {
            OperatorRole::ReactionForward | OperatorRole::ReactionBackward => 0.5,
            _ => 1.0,
        }
    }

    pub fn allowed_for(self, kind: BodyKind) -> bool {
        self == OperatorRole::Initialize || Self::sub_step_sequence(kind).contains(&self)
    }
}

/// What an operator gets to know about the step it is applied over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepContext {
    pub role: OperatorRole,
    /// Step size for this application (already scaled by the role's fraction).
    pub dt: Real,
    /// Physical time at the start of the sub-step.
    pub time: Real,
}

/// A physics update over one (fraction of a) step.
///
/// Operators read the body's neighbor configurations, which are exact for the
/// body's current positions, and may read other bodies through `contacts`.
pub trait PhysicsOperator: Send + Sync {
    fn name(&self) -> &str {
        "operator"
    }

    fn apply(
        &mut self,
        body: &mut Body,
        contacts: &ContactBodies<'_>,
        step: &StepContext,
    ) -> SimResult<()>;
}
