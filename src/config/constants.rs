// Numerical constants for the SPH core
use crate::math::Real;

// Smoothing length as a multiple of the reference particle spacing
pub const SMOOTHING_LENGTH_RATIO: Real = 1.3;

// Cutoff radius as a multiple of the smoothing length (compact kernel support)
pub const CUTOFF_FACTOR: Real = 2.0;

// Spatial index cell edge as a multiple of the cutoff radius
pub const CELL_SIZE_FACTOR: Real = 1.0;

// Largest cell grid a body may allocate
pub const MAX_CELL_COUNT: usize = 1 << 28;

// CFL factors for the step-size criteria
pub const ADVECTION_CFL: Real = 0.25;
pub const ACOUSTIC_CFL: Real = 0.6;
pub const DIFFUSION_CFL: Real = 0.5;
pub const REACTION_CFL: Real = 0.5;

// Step sizes at or below this are treated as a collapse
pub const MIN_STEP_SIZE: Real = 1.0e-12;

// Reporting cadence, in super-steps
pub const SCREEN_OUTPUT_INTERVAL: usize = 100;
pub const RESTART_OUTPUT_INTERVAL: usize = SCREEN_OUTPUT_INTERVAL * 10;
