//! Neighbor configurations
//!
//! For every particle of a body and every contact edge of that body, the
//! partner particles within the edge cutoff, sorted by distance (ties by
//! index) so that downstream sums always run in the same order.
//! `(distance, direction)` is exactly what a kernel needs for its weight and
//! gradient.

use bevy::log::trace;
use rayon::prelude::*;

use crate::core::body::{Body, BodyId, BodyRegistry};
use crate::core::topology::ContactEdge;
use crate::error::{SimError, SimResult};
use crate::math::{Real, Vector, zero_vector};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Index into the partner body's particles.
    pub index: usize,
    /// Exact distance `|r_i - r_j|`.
    pub distance: Real,
    /// Unit vector from the neighbor towards the particle, `(r_i - r_j) / d`.
    /// Zero when the two particles coincide.
    pub direction: Vector,
}

/// Neighbor lists of one body against one partner.
#[derive(Clone, Debug)]
pub struct NeighborConfiguration {
    partner: BodyId,
    cutoff: Real,
    lists: Vec<Vec<Neighbor>>,
}

impl NeighborConfiguration {
    pub fn empty(partner: BodyId, particle_count: usize) -> Self {
        Self {
            partner,
            cutoff: 0.0,
            lists: vec![Vec::new(); particle_count],
        }
    }

    pub fn partner(&self) -> BodyId {
        self.partner
    }

    pub fn cutoff(&self) -> Real {
        self.cutoff
    }

    pub fn neighbors(&self, index: usize) -> &[Neighbor] {
        self.lists.get(index).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub fn lists(&self) -> &[Vec<Neighbor>] {
        &self.lists
    }

    pub fn total_pairs(&self) -> usize {
        self.lists.iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(|l| l.is_empty())
    }

    pub fn contains_pair(&self, index: usize, neighbor: usize) -> bool {
        self.neighbors(index).iter().any(|n| n.index == neighbor)
    }

    pub fn clear_row(&mut self, index: usize) {
        if let Some(list) = self.lists.get_mut(index) {
            list.clear();
        }
    }
}

/// Neighbor lists of every particle of `body` against `partner`.
///
/// Reserve particles get empty lists and are never listed. On self-contact a
/// particle never lists itself, even at distance zero.
pub fn build_lists(body: &Body, partner: &Body, cutoff: Real) -> SimResult<Vec<Vec<Neighbor>>> {
    if partner.cells().is_dirty() {
        return Err(SimError::IndexStale {
            body: partner.name().to_string(),
        });
    }
    let self_contact = body.id() == partner.id();
    let particles = body.particles();
    let partner_particles = partner.particles();

    particles
        .par_iter()
        .enumerate()
        .map(|(i, particle)| -> SimResult<Vec<Neighbor>> {
            if !particle.is_simulated() {
                return Ok(Vec::new());
            }
            let candidates = partner
                .cells()
                .candidates_near(particle.position, cutoff)
                .map_err(|_| SimError::IndexStale {
                    body: partner.name().to_string(),
                })?;

            let mut list: Vec<Neighbor> = candidates
                .filter(|&j| !(self_contact && j == i))
                .filter_map(|j| {
                    let other = &partner_particles[j];
                    if !other.is_simulated() {
                        return None;
                    }
                    let displacement = particle.position - other.position;
                    let distance = displacement.length();
                    (distance < cutoff).then(|| Neighbor {
                        index: j,
                        distance,
                        direction: if distance > 0.0 {
                            displacement / distance
                        } else {
                            zero_vector()
                        },
                    })
                })
                .collect();

            list.sort_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then_with(|| a.index.cmp(&b.index))
            });
            Ok(list)
        })
        .collect()
}

fn edge_cutoff(body: &Body, partner: &Body, edge: &ContactEdge) -> Real {
    edge.policy
        .cutoff(body.cutoff_radius(), partner.cutoff_radius())
}

/// Rebuild every configuration of one body from the registry's topology.
/// Overwrites previous lists; positions and physics state are untouched.
pub fn build_configuration(registry: &mut BodyRegistry, id: BodyId) -> SimResult<()> {
    let Some(topology) = registry.topology() else {
        return Err(SimError::configuration(
            "neighbor configurations need a contact topology",
        ));
    };

    let body = registry.body(id);
    let configurations = topology
        .edges(id)
        .iter()
        .map(|edge| {
            let partner = registry.body(edge.partner);
            let cutoff = edge_cutoff(body, partner, edge);
            let lists = build_lists(body, partner, cutoff)?;
            trace!(
                "Configuration '{}' -> '{}': {} pairs",
                body.name(),
                partner.name(),
                lists.iter().map(|l| l.len()).sum::<usize>()
            );
            Ok(NeighborConfiguration {
                partner: edge.partner,
                cutoff,
                lists,
            })
        })
        .collect::<SimResult<Vec<_>>>()?;

    let body = registry.body_mut(id);
    for (edge, configuration) in configurations.into_iter().enumerate() {
        body.set_configuration(edge, configuration);
    }
    Ok(())
}

pub fn build_all(registry: &mut BodyRegistry) -> SimResult<()> {
    for id in registry.ids() {
        build_configuration(registry, id)?;
    }
    Ok(())
}

/// Rebuild configurations of the bodies in `rebuilt` and of every body that
/// has one of them as a partner.
pub fn refresh(registry: &mut BodyRegistry, rebuilt: &[BodyId]) -> SimResult<()> {
    let Some(topology) = registry.topology() else {
        return Ok(());
    };
    let affected: Vec<BodyId> = registry
        .ids()
        .filter(|&id| {
            rebuilt.contains(&id) || topology.partners(id).any(|p| rebuilt.contains(&p))
        })
        .collect();

    for id in affected {
        build_configuration(registry, id)?;
    }
    Ok(())
}
