//! Reference physics operators
//!
//! Small, self-contained operators that exercise the integrator's roles. Case
//! physics (equations of state, kinetics models) lives outside the crate.

pub mod inflow;
pub mod interpolation;
pub mod kernel;
pub mod kinematics;
pub mod reaction_diffusion;

pub use inflow::InflowStamp;
pub use interpolation::{DensitySummation, FieldObserver, lattice_number_density};
pub use kernel::{Kernel, WendlandC2};
pub use kinematics::{BodyForce, Drift, DriftKick};
pub use reaction_diffusion::{IsotropicDiffusion, LinearReaction};
