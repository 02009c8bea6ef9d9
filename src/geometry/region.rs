//! Closed regions used to clip lattices and delimit emission zones.
//!
//! Case geometry is supplied by the caller through [`Region`]; the shapes here
//! cover the simple boxes and polygons that tests and demos need.

use crate::error::{SimError, SimResult};
use crate::math::{Point, Real, Vector, component};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub lower: Point,
    pub upper: Point,
}

impl Aabb {
    pub fn new(lower: Point, upper: Point) -> Self {
        Self { lower, upper }
    }

    /// Same as [`Aabb::new`], rejecting non-finite or inverted bounds.
    pub fn checked(lower: Point, upper: Point) -> SimResult<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(SimError::configuration(format!(
                "bounds must be finite, got {:?}..{:?}",
                lower, upper
            )));
        }
        if lower.x > upper.x || lower.y > upper.y {
            return Err(SimError::configuration(format!(
                "lower bound {:?} exceeds upper bound {:?}",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, &p| match bounds {
            None => Some(Self::new(p, p)),
            Some(b) => Some(Self::new(b.lower.min(p), b.upper.max(p))),
        })
    }

    pub fn extent(&self) -> Vector {
        self.upper - self.lower
    }

    pub fn extent_along(&self, axis: usize) -> Real {
        component(self.upper, axis) - component(self.lower, axis)
    }

    pub fn expanded(&self, margin: Real) -> Self {
        Self::new(self.lower - margin, self.upper + margin)
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self::new(self.lower.min(other.lower), self.upper.max(other.upper))
    }

    #[inline]
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.lower.x && p.x <= self.upper.x && p.y >= self.lower.y && p.y <= self.upper.y
    }
}

/// A closed shape that can answer point containment.
pub trait Region: Send + Sync {
    fn contains(&self, position: Point) -> bool;

    /// Box enclosing every point for which `contains` is true.
    fn bounds(&self) -> Aabb;
}

/// Filled axis-aligned rectangle.
#[derive(Clone, Copy, Debug)]
pub struct Rectangle {
    pub bounds: Aabb,
}

impl Rectangle {
    pub fn new(lower: Point, upper: Point) -> Self {
        Self {
            bounds: Aabb::new(lower, upper),
        }
    }
}

impl Region for Rectangle {
    fn contains(&self, position: Point) -> bool {
        self.bounds.contains_point(position)
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

/// Simple polygon given by its vertices; closing the loop is implicit.
#[derive(Clone, Debug)]
pub struct Polygon {
    vertices: Vec<Point>,
    bounds: Aabb,
}

impl Polygon {
    pub fn new(mut vertices: Vec<Point>) -> SimResult<Self> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(SimError::configuration(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        let bounds = Aabb::from_points(vertices.iter())
            .ok_or_else(|| SimError::configuration("polygon has no vertices"))?;
        Ok(Self { vertices, bounds })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }
}

impl Region for Polygon {
    /// Even-odd ray casting along +x.
    fn contains(&self, position: Point) -> bool {
        if !self.bounds.contains_point(position) {
            return false;
        }
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.y > position.y) != (b.y > position.y) {
                let x_cross = (b.x - a.x) * (position.y - a.y) / (b.y - a.y) + a.x;
                if position.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}
