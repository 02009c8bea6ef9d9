//! Bodies and the registry that owns them
//!
//! A body owns its particles, its cell linked list and one neighbor
//! configuration per outgoing contact edge. The registry is an arena: bodies
//! are added during setup, addressed by [`BodyId`] and never removed.

use std::ops::{Index, IndexMut};

use bevy::log::debug;
use indexmap::IndexMap;

use crate::config::BodyParams;
use crate::core::cell_linked_list::CellLinkedList;
use crate::core::generator::ParticleGenerator;
use crate::core::neighbor::{self, NeighborConfiguration};
use crate::core::particle::Particle;
use crate::core::particle_set::{ParticleFields, ParticleSet};
use crate::core::topology::ContactTopology;
use crate::error::{SimError, SimResult};
use crate::math::Real;

/// Physical role of a body; selects the sub-step splitting and whether the
/// body's particles take part in the simulation or only sample it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Fluid,
    Solid,
    ReactionDiffusion,
    /// Fictitious body that samples other bodies (observers, sampling points).
    Observer,
}

impl BodyKind {
    pub fn name(&self) -> &'static str {
        match self {
            BodyKind::Fluid => "fluid",
            BodyKind::Solid => "solid",
            BodyKind::ReactionDiffusion => "reaction-diffusion",
            BodyKind::Observer => "observer",
        }
    }
}

/// Handle of a body inside a [`BodyRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct Body {
    id: BodyId,
    params: BodyParams,
    generator: ParticleGenerator,
    particles: ParticleSet,
    cells: CellLinkedList,
    configurations: Vec<NeighborConfiguration>,
}

impl Body {
    /// Validate the parameters, generate particles and size the cell grid.
    pub fn new(params: BodyParams, generator: ParticleGenerator) -> SimResult<Self> {
        params.validate()?;

        let mut particles = ParticleSet::new();
        for field in &params.fields {
            particles.fields_mut().register(field.clone());
        }
        particles.extend(generator.generate(params.spacing)?);

        let cutoff = params.cutoff_radius();
        let domain = match (params.domain, generator.bounds()) {
            (Some(domain), _) => domain,
            (None, Some(bounds)) => bounds.expanded(cutoff),
            (None, None) => {
                return Err(SimError::configuration(format!(
                    "body '{}' starts without particles and needs an explicit domain",
                    params.name
                )));
            }
        };
        let cells = CellLinkedList::new(domain, cutoff * params.cell_size_factor)?;

        debug!(
            "Body '{}' ({}): {} particles, {} cells",
            params.name,
            params.kind.name(),
            particles.len(),
            cells.cell_count()
        );

        Ok(Self {
            id: BodyId(usize::MAX),
            params,
            generator,
            particles,
            cells,
            configurations: Vec::new(),
        })
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub fn kind(&self) -> BodyKind {
        self.params.kind
    }

    pub fn params(&self) -> &BodyParams {
        &self.params
    }

    pub fn generator(&self) -> &ParticleGenerator {
        &self.generator
    }

    pub fn spacing(&self) -> Real {
        self.params.spacing
    }

    pub fn smoothing_length(&self) -> Real {
        self.params.smoothing_length()
    }

    pub fn cutoff_radius(&self) -> Real {
        self.params.cutoff_radius()
    }

    pub fn particle_set(&self) -> &ParticleSet {
        &self.particles
    }

    /// Mutable access to the whole set; the cell list is marked dirty.
    pub fn particle_set_mut(&mut self) -> &mut ParticleSet {
        self.cells.mark_dirty();
        &mut self.particles
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.particles()
    }

    /// Mutable particle records; the cell list is marked dirty.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        self.cells.mark_dirty();
        self.particles.particles_mut()
    }

    pub fn fields(&self) -> &ParticleFields {
        self.particles.fields()
    }

    /// Field arrays only; positions are untouched so the cell list stays valid.
    pub fn fields_mut(&mut self) -> &mut ParticleFields {
        self.particles.fields_mut()
    }

    /// Particles and fields together, for operators that move particles and
    /// write fields in one pass. Marks the cell list dirty.
    pub fn particles_and_fields_mut(&mut self) -> (&mut [Particle], &mut ParticleFields) {
        self.cells.mark_dirty();
        self.particles.split_mut()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn simulated_count(&self) -> usize {
        self.particles.simulated_count()
    }

    pub fn cells(&self) -> &CellLinkedList {
        &self.cells
    }

    /// Rebuild the cell list if anything moved. Returns whether it rebuilt.
    pub fn rebuild_cells(&mut self) -> bool {
        if !self.cells.is_dirty() {
            return false;
        }
        self.cells.rebuild(self.particles.particles());
        true
    }

    pub(crate) fn force_rebuild_cells(&mut self) {
        self.cells.rebuild(self.particles.particles());
    }

    /// One configuration per outgoing contact edge, in topology order.
    pub fn configurations(&self) -> &[NeighborConfiguration] {
        &self.configurations
    }

    /// Configuration against `partner`, if the topology has that edge.
    pub fn configuration(&self, partner: BodyId) -> Option<&NeighborConfiguration> {
        self.configurations.iter().find(|c| c.partner() == partner)
    }

    pub(crate) fn set_configuration(&mut self, edge: usize, configuration: NeighborConfiguration) {
        self.configurations[edge] = configuration;
    }

    pub(crate) fn reset_configurations(&mut self, configurations: Vec<NeighborConfiguration>) {
        self.configurations = configurations;
    }

    /// Drop the neighbor rows of one particle in every configuration.
    pub fn clear_neighbor_rows(&mut self, index: usize) {
        for configuration in &mut self.configurations {
            configuration.clear_row(index);
        }
    }
}

/// Read-only view of every body except the one being updated.
pub struct ContactBodies<'a> {
    before: &'a [Body],
    after: &'a [Body],
    excluded: usize,
}

impl<'a> ContactBodies<'a> {
    pub fn get(&self, id: BodyId) -> Option<&'a Body> {
        match id.0.cmp(&self.excluded) {
            std::cmp::Ordering::Less => self.before.get(id.0),
            std::cmp::Ordering::Greater => self.after.get(id.0 - self.excluded - 1),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Body> {
        self.before.iter().chain(self.after.iter())
    }
}

/// Arena owning every body of a simulation run.
#[derive(Default)]
pub struct BodyRegistry {
    bodies: Vec<Body>,
    names: IndexMap<String, BodyId>,
    topology: Option<ContactTopology>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut body: Body) -> SimResult<BodyId> {
        if self.topology.is_some() {
            return Err(SimError::configuration(format!(
                "body '{}' added after the contact topology was set",
                body.name()
            )));
        }
        if self.names.contains_key(body.name()) {
            return Err(SimError::configuration(format!(
                "body '{}' is already registered",
                body.name()
            )));
        }
        let id = BodyId(self.bodies.len());
        body.id = id;
        self.names.insert(body.name().to_string(), id);
        self.bodies.push(body);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, id: BodyId) -> bool {
        id.0 < self.bodies.len()
    }

    pub fn id_of(&self, name: &str) -> SimResult<BodyId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownBody(name.to_string()))
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0]
    }

    pub fn body_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = BodyId> + use<> {
        (0..self.bodies.len()).map(BodyId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies.iter_mut()
    }

    /// The body being updated plus read-only access to all the others.
    pub fn split_mut(&mut self, id: BodyId) -> (&mut Body, ContactBodies<'_>) {
        let (before, rest) = self.bodies.split_at_mut(id.0);
        let (body, after) = rest
            .split_first_mut()
            .unwrap_or_else(|| panic!("body id {} out of range", id.0));
        (
            body,
            ContactBodies {
                before,
                after,
                excluded: id.0,
            },
        )
    }

    pub fn topology(&self) -> Option<&ContactTopology> {
        self.topology.as_ref()
    }

    /// Install the contact topology and give every body one empty
    /// configuration per outgoing edge. The topology is fixed afterwards.
    pub fn set_topology(&mut self, topology: ContactTopology) -> SimResult<()> {
        if self.topology.is_some() {
            return Err(SimError::configuration("contact topology is already set"));
        }
        topology.validate(self)?;

        for id in self.ids() {
            let len = self.bodies[id.0].len();
            let configurations = topology
                .edges(id)
                .iter()
                .map(|edge| NeighborConfiguration::empty(edge.partner, len))
                .collect();
            self.bodies[id.0].reset_configurations(configurations);
        }
        self.topology = Some(topology);
        Ok(())
    }

    /// Rebuild every cell list, then every configuration.
    pub fn initialize(&mut self) -> SimResult<()> {
        for body in &mut self.bodies {
            body.force_rebuild_cells();
        }
        neighbor::build_all(self)
    }

    /// Rebuild the cell lists that went dirty, then every configuration that
    /// reads from one of them. Returns the bodies whose cells were rebuilt.
    pub fn refresh(&mut self) -> SimResult<Vec<BodyId>> {
        let rebuilt: Vec<BodyId> = self
            .bodies
            .iter_mut()
            .filter_map(|body| body.rebuild_cells().then_some(body.id))
            .collect();
        if !rebuilt.is_empty() {
            neighbor::refresh(self, &rebuilt)?;
        }
        Ok(rebuilt)
    }
}

impl Index<BodyId> for BodyRegistry {
    type Output = Body;

    fn index(&self, id: BodyId) -> &Body {
        self.body(id)
    }
}

impl IndexMut<BodyId> for BodyRegistry {
    fn index_mut(&mut self, id: BodyId) -> &mut Body {
        self.body_mut(id)
    }
}
