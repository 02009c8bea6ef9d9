//! Smoothing kernels
//!
//! A kernel sees a pair through the `(distance, direction)` stored in the
//! neighbor configuration; the gradient of `W` for a pair is
//! `gradient_factor(d) * direction`.

use std::f64::consts::PI;

use crate::config::constants;
use crate::error::{SimError, SimResult};
use crate::math::{Real, Vector, is_positive_finite};

pub trait Kernel: Send + Sync {
    /// Support radius; weights vanish at and beyond it.
    fn cutoff_radius(&self) -> Real;

    fn weight(&self, distance: Real) -> Real;

    /// `dW/dr`, non-positive inside the support.
    fn gradient_factor(&self, distance: Real) -> Real;

    #[inline]
    fn gradient(&self, distance: Real, direction: Vector) -> Vector {
        self.gradient_factor(distance) * direction
    }
}

/// 2D Wendland C2 kernel with support `2h`.
#[derive(Clone, Copy, Debug)]
pub struct WendlandC2 {
    smoothing_length: Real,
    /// `7 / (4 pi h^2)`
    normalization: Real,
}

impl WendlandC2 {
    pub fn new(smoothing_length: Real) -> SimResult<Self> {
        if !is_positive_finite(smoothing_length) {
            return Err(SimError::configuration(format!(
                "kernel smoothing length must be positive, got {}",
                smoothing_length
            )));
        }
        Ok(Self {
            smoothing_length,
            normalization: 7.0 / (4.0 * PI * smoothing_length * smoothing_length),
        })
    }

    /// Kernel matching a body spacing with the default smoothing ratio.
    pub fn for_spacing(spacing: Real) -> SimResult<Self> {
        Self::new(spacing * constants::SMOOTHING_LENGTH_RATIO)
    }

    pub fn smoothing_length(&self) -> Real {
        self.smoothing_length
    }
}

impl Kernel for WendlandC2 {
    fn cutoff_radius(&self) -> Real {
        constants::CUTOFF_FACTOR * self.smoothing_length
    }

    fn weight(&self, distance: Real) -> Real {
        let q = distance / self.smoothing_length;
        if q >= 2.0 {
            return 0.0;
        }
        let t = 1.0 - 0.5 * q;
        self.normalization * t.powi(4) * (1.0 + 2.0 * q)
    }

    fn gradient_factor(&self, distance: Real) -> Real {
        let q = distance / self.smoothing_length;
        if q >= 2.0 {
            return 0.0;
        }
        let t = 1.0 - 0.5 * q;
        -5.0 * self.normalization * q * t.powi(3) / self.smoothing_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_vanishes_at_support() {
        let kernel = WendlandC2::new(0.13).unwrap();
        assert_eq!(kernel.weight(kernel.cutoff_radius()), 0.0);
        assert_eq!(kernel.gradient_factor(kernel.cutoff_radius()), 0.0);
        assert!(kernel.weight(0.0) > kernel.weight(0.1));
    }

    #[test]
    fn weight_integrates_to_one() {
        // midpoint rule on a fine lattice around the origin
        let kernel = WendlandC2::new(1.0).unwrap();
        let dx = 0.01;
        let n = (2.0 * kernel.cutoff_radius() / dx) as i32;
        let mut sum = 0.0;
        for i in 0..n {
            for j in 0..n {
                let x = -kernel.cutoff_radius() + (i as Real + 0.5) * dx;
                let y = -kernel.cutoff_radius() + (j as Real + 0.5) * dx;
                sum += kernel.weight((x * x + y * y).sqrt()) * dx * dx;
            }
        }
        assert!((sum - 1.0).abs() < 1e-3, "integral {}", sum);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let kernel = WendlandC2::new(0.5).unwrap();
        let r = 0.4;
        let eps = 1e-6;
        let numeric = (kernel.weight(r + eps) - kernel.weight(r - eps)) / (2.0 * eps);
        assert!((kernel.gradient_factor(r) - numeric).abs() < 1e-6);
    }

    #[test]
    fn rejects_zero_smoothing_length() {
        assert!(WendlandC2::new(0.0).is_err());
    }
}
