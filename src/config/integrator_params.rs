use bevy::prelude::*;

use crate::config::constants;
use crate::error::{SimError, SimResult};
use crate::math::{Real, is_positive_finite};

/// Parameters controlling the nested time loops
#[derive(Resource, Clone, Debug)]
pub struct IntegratorParams {
    /// Physical time at which the outer loop stops
    pub end_time: Real,

    /// Physical time between state outputs (the outer loop body)
    pub output_interval: Real,

    /// Report progress every this many super-steps (0 disables)
    pub screen_output_interval: usize,

    /// Write a restart snapshot every this many super-steps (0 disables)
    pub restart_output_interval: usize,

    /// Step sizes at or below this abort the run
    pub min_step_size: Real,
}

impl Default for IntegratorParams {
    fn default() -> Self {
        Self {
            end_time: 1.0,
            output_interval: 0.1,
            screen_output_interval: constants::SCREEN_OUTPUT_INTERVAL,
            restart_output_interval: constants::RESTART_OUTPUT_INTERVAL,
            min_step_size: constants::MIN_STEP_SIZE,
        }
    }
}

impl IntegratorParams {
    pub fn new(end_time: Real, output_interval: Real) -> Self {
        Self {
            end_time,
            output_interval,
            ..Self::default()
        }
    }

    pub fn with_screen_output_interval(mut self, interval: usize) -> Self {
        self.screen_output_interval = interval;
        self
    }

    pub fn with_restart_output_interval(mut self, interval: usize) -> Self {
        self.restart_output_interval = interval;
        self
    }

    pub fn with_min_step_size(mut self, min_step_size: Real) -> Self {
        self.min_step_size = min_step_size;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.end_time.is_finite() || self.end_time < 0.0 {
            return Err(SimError::configuration(format!(
                "end time must be finite and non-negative, got {}",
                self.end_time
            )));
        }
        if !is_positive_finite(self.output_interval) {
            return Err(SimError::configuration(format!(
                "output interval must be positive, got {}",
                self.output_interval
            )));
        }
        if !self.min_step_size.is_finite() || self.min_step_size < 0.0 {
            return Err(SimError::configuration(format!(
                "minimum step size must be finite and non-negative, got {}",
                self.min_step_size
            )));
        }
        Ok(())
    }
}
