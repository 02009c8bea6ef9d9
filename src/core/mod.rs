pub mod body;
pub mod cell_linked_list;
pub mod emitter;
pub mod generator;
pub mod neighbor;
pub mod particle;
pub mod particle_set;
pub mod topology;

pub use body::{Body, BodyId, BodyKind, BodyRegistry, ContactBodies};
pub use cell_linked_list::CellLinkedList;
pub use emitter::{
    EmitterInflow, EmitterOccupancy, EmitterParams, EmitterStats, InflowCondition,
    InjectionReport,
};
pub use generator::{ParticleGenerator, lattice_counts};
pub use neighbor::{Neighbor, NeighborConfiguration};
pub use particle::{Particle, ParticleStatus};
pub use particle_set::{ParticleFields, ParticleSet};
pub use topology::{ContactEdge, ContactTopology, CutoffPolicy};
