use crate::math::Real;

/// Which loop of the integrator computed a step size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepScope {
    Super,
    Sub,
}

impl std::fmt::Display for StepScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepScope::Super => write!(f, "super-step"),
            StepScope::Sub => write!(f, "sub-step"),
        }
    }
}

/// Error type for setup and stepping
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid setup: topology references, spacing, cutoff, bounds.
    Configuration(String),
    /// A body name that is not in the registry.
    UnknownBody(String),
    /// A step size fell to zero or became non-finite.
    StepSizeCollapse {
        time: Real,
        iteration: usize,
        step_size: Real,
        scope: StepScope,
    },
    /// A spatial index was queried after positions changed without a rebuild.
    IndexStale { body: String },
    /// A restart snapshot does not fit the registered bodies.
    SnapshotMismatch(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SimError::UnknownBody(name) => write!(f, "Unknown body: {}", name),
            SimError::StepSizeCollapse {
                time,
                iteration,
                step_size,
                scope,
            } => write!(
                f,
                "Step size collapse: {} size {:e} at time {:.9} (iteration {})",
                scope, step_size, time, iteration
            ),
            SimError::IndexStale { body } => {
                write!(f, "Spatial index of body '{}' queried while stale", body)
            }
            SimError::SnapshotMismatch(msg) => write!(f, "Snapshot mismatch: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

impl SimError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }

    /// Fatal errors abort the run; everything else is a setup problem.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimError::StepSizeCollapse { .. } | SimError::IndexStale { .. }
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
