use bevy::math::{DVec2, IVec2};

pub type Real = f64;
pub const DIM: usize = 2;

pub type Vector = DVec2;
pub type Point = DVec2;
pub type CellCoord = IVec2;

#[inline(always)]
pub fn zero_vector() -> Vector {
    DVec2::ZERO
}

#[inline(always)]
pub fn component(v: Vector, axis: usize) -> Real {
    match axis {
        0 => v.x,
        _ => v.y,
    }
}

#[inline(always)]
pub fn set_component(v: &mut Vector, axis: usize, value: Real) {
    match axis {
        0 => v.x = value,
        _ => v.y = value,
    }
}

/// Volume of a square lattice cell with edge `spacing`.
#[inline(always)]
pub fn lattice_volume(spacing: Real) -> Real {
    spacing.powi(DIM as i32)
}

#[inline(always)]
pub fn is_positive_finite(value: Real) -> bool {
    value.is_finite() && value > 0.0
}
