//! Configuration and parameters
//!
//! Constants, body settings and integrator settings.

pub mod body_params;
pub mod constants;
pub mod integrator_params;

pub use body_params::*;
pub use constants::*;
pub use integrator_params::*;
