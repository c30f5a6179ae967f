use super::phenotype::{CycleState, DeathState, OxygenResponse};
use super::volume::{Geometry, Volume};
use serde::{Deserialize, Serialize};

pub type Vec3 = [f64; 3];

/// Stable handle to an agent slot. The generation changes every time the slot
/// is vacated, so a handle to a removed agent never resolves to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId {
    pub index: u32,
    pub generation: u32,
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Pairwise interaction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MechanicsParams {
    pub cell_cell_adhesion_strength: f64,
    pub cell_cell_repulsion_strength: f64,
    /// Adhesion reaches out to this multiple of the radius.
    pub relative_maximum_adhesion_distance: f64,
}

impl Default for MechanicsParams {
    fn default() -> Self {
        Self {
            cell_cell_adhesion_strength: 0.4,
            cell_cell_repulsion_strength: 10.0,
            relative_maximum_adhesion_distance: 1.25,
        }
    }
}

/// Per-substrate exchange rates with the surrounding voxel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SecretionParams {
    pub secretion_rates: Vec<f64>,
    pub saturation_densities: Vec<f64>,
    pub uptake_rates: Vec<f64>,
    /// Amount exported per minute regardless of the local density.
    pub net_export_rates: Vec<f64>,
}

impl SecretionParams {
    #[must_use]
    pub fn zeroed(substrates: usize) -> Self {
        Self {
            secretion_rates: vec![0.0; substrates],
            saturation_densities: vec![0.0; substrates],
            uptake_rates: vec![0.0; substrates],
            net_export_rates: vec![0.0; substrates],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.secretion_rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secretion_rates.is_empty()
    }
}

/// Cached implicit exchange coefficients; rebuilt whenever the time step or
/// the agent's volume changes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExchangeCache {
    pub dt: f64,
    pub volume: f64,
    pub numerators: Vec<f64>,
    pub denominators: Vec<f64>,
    pub exports: Vec<f64>,
}

/// A discrete biological agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub position: Vec3,
    pub velocity: Vec3,
    pub previous_velocity: Vec3,
    pub volume: Volume,
    pub geometry: Geometry,
    pub mechanics: MechanicsParams,
    pub secretion: SecretionParams,
    /// Substrate amounts taken up (positive) or released (negative) so far.
    pub internalized: Vec<f64>,
    pub cycle: CycleState,
    pub death: DeathState,
    #[serde(default)]
    pub oxygen_response: Option<OxygenResponse>,
    pub is_movable: bool,
    pub parent: Option<AgentId>,
    /// Shared by every descendant of the same seeded ancestor.
    pub lineage: u64,
    pub generation: u32,
    /// Mechanics bucket currently holding this agent.
    pub bucket: usize,
    #[serde(skip)]
    pub exchange: ExchangeCache,
}
