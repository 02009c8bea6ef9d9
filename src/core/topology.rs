//! Which bodies search which for neighbors
//!
//! The topology is declared once during setup and validated against the
//! registry. Self-contact and mutual contact are both legal.

use indexmap::IndexMap;

use crate::core::body::{BodyId, BodyRegistry};
use crate::error::{SimError, SimResult};
use crate::math::Real;

/// Cutoff radius used by one contact edge when the two bodies have
/// different smoothing lengths.
///
/// `Querier` and `Partner` make a pair of mutual edges one-sided whenever the
/// radii differ: `i` may see `j` while `j` does not see `i`. `Larger` and
/// `Smaller` pick the same radius from both sides and keep mutual edges
/// symmetric. For equal radii all policies agree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CutoffPolicy {
    #[default]
    Querier,
    Partner,
    Larger,
    Smaller,
}

impl CutoffPolicy {
    #[inline]
    pub fn cutoff(self, querier: Real, partner: Real) -> Real {
        match self {
            CutoffPolicy::Querier => querier,
            CutoffPolicy::Partner => partner,
            CutoffPolicy::Larger => querier.max(partner),
            CutoffPolicy::Smaller => querier.min(partner),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactEdge {
    pub partner: BodyId,
    pub policy: CutoffPolicy,
}

impl ContactEdge {
    pub fn new(partner: BodyId) -> Self {
        Self {
            partner,
            policy: CutoffPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CutoffPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ContactTopology {
    edges: IndexMap<BodyId, Vec<ContactEdge>>,
}

impl ContactTopology {
    pub fn new(
        edges: IndexMap<BodyId, Vec<ContactEdge>>,
        registry: &BodyRegistry,
    ) -> SimResult<Self> {
        let topology = Self { edges };
        topology.validate(registry)?;
        Ok(topology)
    }

    /// Build from body names, every edge using the default cutoff policy.
    pub fn from_names(entries: &[(&str, &[&str])], registry: &BodyRegistry) -> SimResult<Self> {
        let mut edges = IndexMap::with_capacity(entries.len());
        for (body, partners) in entries {
            let id = registry.id_of(body).map_err(unregistered)?;
            let partners = partners
                .iter()
                .map(|name| registry.id_of(name).map(ContactEdge::new).map_err(unregistered))
                .collect::<SimResult<Vec<_>>>()?;
            if edges.insert(id, partners).is_some() {
                return Err(SimError::configuration(format!(
                    "body '{}' appears twice in the contact topology",
                    body
                )));
            }
        }
        Self::new(edges, registry)
    }

    /// Every key and partner must be registered, and every registered body
    /// must have an entry (possibly empty).
    pub fn validate(&self, registry: &BodyRegistry) -> SimResult<()> {
        for (&body, edges) in &self.edges {
            if !registry.contains(body) {
                return Err(SimError::configuration(format!(
                    "contact topology references unregistered body #{}",
                    body.index()
                )));
            }
            for (k, edge) in edges.iter().enumerate() {
                if !registry.contains(edge.partner) {
                    return Err(SimError::configuration(format!(
                        "body '{}' lists unregistered partner #{}",
                        registry.body(body).name(),
                        edge.partner.index()
                    )));
                }
                if edges[..k].iter().any(|e| e.partner == edge.partner) {
                    return Err(SimError::configuration(format!(
                        "body '{}' lists partner '{}' twice",
                        registry.body(body).name(),
                        registry.body(edge.partner).name()
                    )));
                }
            }
        }
        if let Some(missing) = registry.iter().find(|b| !self.edges.contains_key(&b.id())) {
            return Err(SimError::configuration(format!(
                "body '{}' has no entry in the contact topology",
                missing.name()
            )));
        }
        Ok(())
    }

    pub fn edges(&self, body: BodyId) -> &[ContactEdge] {
        self.edges.get(&body).map(|e| e.as_slice()).unwrap_or(&[])
    }

    pub fn partners(&self, body: BodyId) -> impl Iterator<Item = BodyId> + '_ {
        self.edges(body).iter().map(|edge| edge.partner)
    }

    pub fn has_edge(&self, from: BodyId, to: BodyId) -> bool {
        self.partners(from).any(|partner| partner == to)
    }

    /// Bodies with an edge pointing at `partner`.
    pub fn dependents_of(&self, partner: BodyId) -> impl Iterator<Item = BodyId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, edges)| edges.iter().any(|e| e.partner == partner))
            .map(|(&body, _)| body)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &[ContactEdge])> {
        self.edges.iter().map(|(&body, edges)| (body, edges.as_slice()))
    }
}

fn unregistered(error: SimError) -> SimError {
    match error {
        SimError::UnknownBody(name) => SimError::configuration(format!(
            "contact topology references unregistered body '{}'",
            name
        )),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BodyParams;
    use crate::core::BodyKind;
    use crate::core::body::Body;
    use crate::core::generator::ParticleGenerator;
    use crate::math::Point;

    fn registry_of(names: &[&str]) -> BodyRegistry {
        let mut registry = BodyRegistry::new();
        for name in names {
            let generator = ParticleGenerator::direct(vec![(Point::ZERO, 1.0)]);
            let body = Body::new(BodyParams::new(*name, BodyKind::Observer, 1.0), generator).unwrap();
            registry.add(body).unwrap();
        }
        registry
    }

    #[test]
    fn unknown_partner_is_rejected() {
        let registry = registry_of(&["water", "wall"]);
        let result = ContactTopology::from_names(
            &[("water", &["wall", "tank"][..]), ("wall", &[][..])],
            &registry,
        );
        assert!(matches!(result, Err(SimError::Configuration(msg)) if msg.contains("tank")));
    }

    #[test]
    fn every_body_needs_an_entry() {
        let registry = registry_of(&["water", "wall"]);
        let result = ContactTopology::from_names(&[("water", &["wall"][..])], &registry);
        assert!(matches!(result, Err(SimError::Configuration(msg)) if msg.contains("wall")));
    }

    #[test]
    fn dependents_follow_edges() {
        let registry = registry_of(&["water", "wall", "observer"]);
        let topology = ContactTopology::from_names(
            &[
                ("water", &["water", "wall"][..]),
                ("wall", &[][..]),
                ("observer", &["water"][..]),
            ],
            &registry,
        )
        .unwrap();
        let water = registry.id_of("water").unwrap();
        let wall = registry.id_of("wall").unwrap();
        let observer = registry.id_of("observer").unwrap();

        let dependents: Vec<BodyId> = topology.dependents_of(water).collect();
        assert_eq!(dependents, vec![water, observer]);
        assert!(topology.has_edge(water, wall));
        assert!(!topology.has_edge(wall, water));
        assert!(topology.edges(wall).is_empty());
    }

    #[test]
    fn cutoff_policies_pick_a_radius() {
        assert_eq!(CutoffPolicy::Querier.cutoff(1.0, 2.0), 1.0);
        assert_eq!(CutoffPolicy::Partner.cutoff(1.0, 2.0), 2.0);
        assert_eq!(CutoffPolicy::Larger.cutoff(1.0, 2.0), 2.0);
        assert_eq!(CutoffPolicy::Smaller.cutoff(1.0, 2.0), 1.0);
    }
}
