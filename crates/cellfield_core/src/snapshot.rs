//! Read-only views of the field and the population for external writers.

use crate::agent_container::AgentContainer;
use crate::microenvironment::Microenvironment;
use crate::phenotype::PhenotypeModels;
use cellfield_data::{AgentId, PhaseCode, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldSnapshot {
    pub time: f64,
    pub dims: [usize; 3],
    pub spacing: Vec3,
    pub origin: Vec3,
    pub substrates: Vec<String>,
    /// Voxel-major, one row of `substrates.len()` values per voxel.
    pub densities: Vec<f64>,
}

impl FieldSnapshot {
    #[must_use]
    pub fn capture(env: &Microenvironment, time: f64) -> Self {
        let mesh = env.mesh();
        Self {
            time,
            dims: mesh.dims,
            spacing: mesh.spacing,
            origin: mesh.bounds.min,
            substrates: env.substrates().iter().map(|s| s.name.clone()).collect(),
            densities: env.densities().to_vec(),
        }
    }

    /// Total of one substrate over the domain, by name.
    #[must_use]
    pub fn total(&self, name: &str) -> Option<f64> {
        let n = self.substrates.len();
        let s = self.substrates.iter().position(|x| x == name)?;
        let volume = self.spacing[0] * self.spacing[1] * self.spacing[2];
        Some(self.densities.chunks(n).map(|row| row[s]).sum::<f64>() * volume)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Vec3,
    pub radius: f64,
    pub volume: f64,
    pub phase: Option<PhaseCode>,
    pub dead: bool,
    pub lineage: u64,
    pub generation: u32,
    pub parent: Option<AgentId>,
}

impl AgentSnapshot {
    /// One entry per live agent, in slot order.
    #[must_use]
    pub fn capture_all(container: &AgentContainer, models: &PhenotypeModels) -> Vec<Self> {
        container
            .agents()
            .iter()
            .map(|(id, a)| {
                let phase = match a.death.model {
                    Some(kind) => models.death(kind).phases.get(a.death.phase),
                    None => models
                        .cycle(a.cycle.kind)
                        .ok()
                        .and_then(|m| m.phases.get(a.cycle.phase)),
                }
                .map(|p| p.code);
                Self {
                    id,
                    position: a.position,
                    radius: a.geometry.radius,
                    volume: a.volume.total,
                    phase,
                    dead: a.death.is_dead(),
                    lineage: a.lineage,
                    generation: a.generation,
                    parent: a.parent,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_container::BoundaryPolicy;
    use crate::lifecycle::default_agent;
    use crate::mesh::{Bounds, Mesh};
    use crate::microenvironment::SubstrateSpec;

    #[test]
    fn test_field_snapshot_total() {
        let bounds = Bounds::new(0.0, 40.0, 0.0, 20.0, 0.0, 20.0);
        let mut env = Microenvironment::new(Mesh::new(bounds, 20.0, 20.0, 20.0).unwrap());
        env.add_substrate(SubstrateSpec::new("oxygen", "mmHg")).unwrap();
        env.fill_substrate(0, 2.0).unwrap();
        let snap = FieldSnapshot::capture(&env, 1.5);
        assert_eq!(snap.dims, [2, 1, 1]);
        assert_eq!(snap.total("oxygen"), Some(2.0 * 2.0 * 8000.0));
        assert_eq!(snap.total("glucose"), None);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("oxygen"));
    }

    #[test]
    fn test_agent_snapshot_phase() {
        let bounds = Bounds::new(-50.0, 50.0, -50.0, 50.0, -50.0, 50.0);
        let mut c = AgentContainer::new(bounds, 30.0, BoundaryPolicy::Clamp).unwrap();
        c.register(default_agent([0.0; 3], 0));
        let snaps = AgentSnapshot::capture_all(&c, &PhenotypeModels::new());
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].phase, Some(PhaseCode::Live));
        assert!(!snaps[0].dead);
    }
}
