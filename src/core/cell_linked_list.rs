//! Uniform cell grid over a body's particles
//!
//! Particles are binned by a counting sort into `order`, with `cell_start`
//! marking where each cell's run begins. Inside a cell, indices stay in
//! ascending order. Positions outside the domain box clamp to the nearest
//! boundary cell, so the grid never has to grow.

use bevy::math::IVec2;

use crate::config::constants;
use crate::core::particle::Particle;
use crate::error::{SimError, SimResult};
use crate::geometry::Aabb;
use crate::math::{CellCoord, Point, Real, is_positive_finite};

#[derive(Clone, Debug)]
pub struct CellLinkedList {
    domain: Aabb,
    cell_size: Real,
    dims: IVec2,
    /// Flat cell of each particle slot as of the last rebuild; `None` for reserve slots.
    particle_cells: Vec<Option<usize>>,
    /// Particle indices grouped by cell.
    order: Vec<usize>,
    /// `order[cell_start[c]..cell_start[c + 1]]` are the particles of cell `c`.
    cell_start: Vec<usize>,
    cell_count: usize,
    dirty: bool,
}

impl CellLinkedList {
    pub fn new(domain: Aabb, cell_size: Real) -> SimResult<Self> {
        if !is_positive_finite(cell_size) {
            return Err(SimError::configuration(format!(
                "cell size must be positive and finite, got {}",
                cell_size
            )));
        }
        let domain = Aabb::checked(domain.lower, domain.upper)?;
        let dims = IVec2::new(
            cells_along(domain.extent().x, cell_size)?,
            cells_along(domain.extent().y, cell_size)?,
        );
        let cell_count = (dims.x as usize)
            .checked_mul(dims.y as usize)
            .filter(|&count| count <= constants::MAX_CELL_COUNT)
            .ok_or_else(|| {
                SimError::configuration(format!(
                    "a {} x {} cell grid is too large; increase the cell size or shrink the domain",
                    dims.x, dims.y
                ))
            })?;

        Ok(Self {
            domain,
            cell_size,
            dims,
            particle_cells: Vec::new(),
            order: Vec::new(),
            cell_start: vec![0; cell_count + 1],
            cell_count,
            dirty: true,
        })
    }

    pub fn domain(&self) -> &Aabb {
        &self.domain
    }

    pub fn cell_size(&self) -> Real {
        self.cell_size
    }

    pub fn dims(&self) -> IVec2 {
        self.dims
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn occupied_cell_count(&self) -> usize {
        self.cell_start.windows(2).filter(|w| w[1] > w[0]).count()
    }

    /// Number of particles binned at the last rebuild.
    pub fn indexed_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that positions or statuses changed since the last rebuild.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Cell containing `position`, clamped into the grid.
    #[inline]
    pub fn cell_coord(&self, position: Point) -> CellCoord {
        let relative = (position - self.domain.lower) / self.cell_size;
        IVec2::new(
            (relative.x.floor() as i32).clamp(0, self.dims.x - 1),
            (relative.y.floor() as i32).clamp(0, self.dims.y - 1),
        )
    }

    #[inline]
    fn flat_index(&self, coord: CellCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.dims.x || coord.y >= self.dims.y {
            return None;
        }
        Some(coord.y as usize * self.dims.x as usize + coord.x as usize)
    }

    /// Cell a particle was binned into at the last rebuild.
    pub fn cell_of(&self, index: usize) -> Option<CellCoord> {
        let flat = (*self.particle_cells.get(index)?)?;
        let columns = self.dims.x as usize;
        Some(IVec2::new((flat % columns) as i32, (flat / columns) as i32))
    }

    pub fn particles_in_cell(&self, coord: CellCoord) -> &[usize] {
        match self.flat_index(coord) {
            Some(cell) => &self.order[self.cell_start[cell]..self.cell_start[cell + 1]],
            None => &[],
        }
    }

    /// Re-bin every simulated particle. Reserve slots are left out.
    pub fn rebuild(&mut self, particles: &[Particle]) {
        let cell_count = self.cell_count();

        self.particle_cells.clear();
        self.particle_cells.reserve(particles.len());
        for particle in particles {
            let cell = particle
                .is_simulated()
                .then(|| self.flat_index(self.cell_coord(particle.position)))
                .flatten();
            self.particle_cells.push(cell);
        }

        // Count, prefix-sum, scatter.
        self.cell_start.clear();
        self.cell_start.resize(cell_count + 1, 0);
        for cell in self.particle_cells.iter().flatten() {
            self.cell_start[cell + 1] += 1;
        }
        for c in 0..cell_count {
            self.cell_start[c + 1] += self.cell_start[c];
        }

        let indexed = self.cell_start[cell_count];
        self.order.clear();
        self.order.resize(indexed, usize::MAX);
        let mut write_heads = self.cell_start[..cell_count].to_vec();
        for (index, cell) in self.particle_cells.iter().enumerate() {
            if let Some(cell) = *cell {
                self.order[write_heads[cell]] = index;
                write_heads[cell] += 1;
            }
        }

        self.dirty = false;
    }

    /// Candidate indices in the cells around `position` that can hold
    /// particles within `radius`: the 3x3 block when `radius <= cell_size`,
    /// wider rings otherwise. A superset of the true neighbors; callers prune
    /// by exact distance.
    pub fn candidates_near(
        &self,
        position: Point,
        radius: Real,
    ) -> SimResult<impl Iterator<Item = usize> + '_> {
        if self.dirty {
            return Err(SimError::IndexStale {
                body: String::new(),
            });
        }
        let reach = if radius > self.cell_size {
            (radius / self.cell_size).ceil() as i32
        } else {
            1
        };
        let center = self.cell_coord(position);

        Ok((-reach..=reach)
            .flat_map(move |dy| (-reach..=reach).map(move |dx| center + IVec2::new(dx, dy)))
            .filter_map(move |coord| self.flat_index(coord))
            .flat_map(move |cell| {
                self.order[self.cell_start[cell]..self.cell_start[cell + 1]]
                    .iter()
                    .copied()
            }))
    }
}

/// Cells needed to cover `extent`, at least one.
fn cells_along(extent: Real, cell_size: Real) -> SimResult<i32> {
    let cells = (extent / cell_size).ceil().max(1.0);
    if cells.is_nan() || cells > i32::MAX as Real {
        return Err(SimError::configuration(format!(
            "extent {} needs more than {} cells of size {}",
            extent,
            i32::MAX,
            cell_size
        )));
    }
    Ok(cells as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::particle::ParticleStatus;

    fn grid() -> CellLinkedList {
        CellLinkedList::new(Aabb::new(Point::ZERO, Point::new(1.0, 1.0)), 0.25).unwrap()
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let huge = Aabb::new(Point::ZERO, Point::splat(1.0e6));
        assert!(matches!(
            CellLinkedList::new(huge, 1.0e-3),
            Err(SimError::Configuration(_))
        ));
        let long = Aabb::new(Point::ZERO, Point::new(1.0e12, 1.0));
        assert!(matches!(
            CellLinkedList::new(long, 1.0),
            Err(SimError::Configuration(_))
        ));
        // each axis fits an i32 but their product does not
        let wide = Aabb::new(Point::ZERO, Point::splat(60_000.0));
        assert!(CellLinkedList::new(wide, 1.0).is_err());
    }

    #[test]
    fn cell_count_matches_dims() {
        let cells = CellLinkedList::new(Aabb::new(Point::ZERO, Point::new(1.0, 0.5)), 0.1).unwrap();
        assert_eq!(cells.dims(), IVec2::new(10, 5));
        assert_eq!(cells.cell_count(), 50);
    }

    #[test]
    fn empty_rebuild_is_valid() {
        let mut cells = grid();
        cells.rebuild(&[]);
        assert_eq!(cells.indexed_count(), 0);
        assert_eq!(cells.candidates_near(Point::splat(0.5), 0.25).unwrap().count(), 0);
    }

    #[test]
    fn query_before_rebuild_is_stale() {
        let cells = grid();
        assert!(matches!(
            cells.candidates_near(Point::ZERO, 0.1).err(),
            Some(SimError::IndexStale { .. })
        ));
    }

    #[test]
    fn outside_positions_clamp_to_boundary_cells() {
        let mut cells = grid();
        let particles = vec![
            Particle::new(Point::new(-3.0, 0.1), 1.0),
            Particle::new(Point::new(0.1, 0.1), 1.0),
            Particle::new(Point::new(0.9, 0.9), 1.0),
        ];
        cells.rebuild(&particles);

        assert_eq!(cells.cell_of(0), Some(IVec2::new(0, 0)));
        let found: Vec<usize> = cells
            .candidates_near(Point::new(-10.0, -10.0), 0.25)
            .unwrap()
            .collect();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn reserve_slots_are_not_indexed() {
        let mut cells = grid();
        let particles = vec![
            Particle::new(Point::splat(0.5), 1.0),
            Particle::new(Point::splat(0.5), 1.0).with_status(ParticleStatus::Reserve),
        ];
        cells.rebuild(&particles);

        assert_eq!(cells.indexed_count(), 1);
        assert_eq!(cells.cell_of(1), None);
        assert_eq!(cells.occupied_cell_count(), 1);
    }

    #[test]
    fn wide_radius_reaches_beyond_the_stencil() {
        let mut cells = grid();
        let particles = vec![
            Particle::new(Point::new(0.05, 0.05), 1.0),
            Particle::new(Point::new(0.6, 0.05), 1.0),
        ];
        cells.rebuild(&particles);

        let near: Vec<usize> = cells.candidates_near(Point::new(0.05, 0.05), 0.2).unwrap().collect();
        assert_eq!(near, vec![0]);
        let wide: Vec<usize> = cells.candidates_near(Point::new(0.05, 0.05), 0.6).unwrap().collect();
        assert_eq!(wide, vec![0, 1]);
    }
}
