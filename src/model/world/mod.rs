use crate::model::agents::AgentContainer;
use crate::model::bulk::BulkSourceSink;
use crate::model::config::AppConfig;
use crate::model::mechanics::MechanicsSettings;
use crate::model::metrics::Metrics;
use crate::model::microenvironment::Microenvironment;
use crate::model::phenotype::PhenotypeModels;
use crate::model::snapshot::{AgentSnapshot, FieldSnapshot};
use cellfield_data::{Agent, AgentId, ExchangeCache};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod finalize;
pub mod init;
pub mod update;

/// Mixing constant for per-agent seeds.
const SEED_MIX: u64 = 0x517C_C1B7_2722_0A95;

/// Tags separating the RNG streams an agent draws from in one step.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Stream {
    Phenotype = 1,
    Division = 2,
}

/// Seed for `id`'s RNG in `step`. Independent of worker count and of the
/// order in which agents are visited.
pub(crate) fn agent_seed(world_seed: u64, step: u64, id: AgentId, stream: Stream) -> u64 {
    let mut seed = step.wrapping_add(world_seed).wrapping_mul(SEED_MIX);
    seed ^= u64::from(id.index);
    seed = seed.wrapping_mul(SEED_MIX);
    seed ^= (u64::from(id.generation) << 8) | stream as u64;
    seed.wrapping_mul(SEED_MIX)
}

/// Sub-cycling clock for one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubCycle {
    /// Time accumulated since the process last ran; `None` before its first run.
    pub since_last: Option<f64>,
}

impl SubCycle {
    /// Adds `dt` and returns the step length to run with when the process is
    /// due. The first call is always due and runs with `step`.
    pub fn tick(&mut self, dt: f64, step: f64, tolerance: f64) -> Option<f64> {
        match self.since_last {
            None => {
                self.since_last = Some(0.0);
                Some(step)
            }
            Some(elapsed) => {
                let elapsed = elapsed + dt;
                if elapsed >= step - tolerance {
                    self.since_last = Some(0.0);
                    Some(elapsed)
                } else {
                    self.since_last = Some(elapsed);
                    None
                }
            }
        }
    }
}

/// Everything a writer needs to record one instant of a run.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WorldSnapshot {
    pub time: f64,
    pub step: u64,
    pub config_fingerprint: String,
    pub births: u64,
    pub removals: u64,
    pub field: FieldSnapshot,
    pub agents: Vec<AgentSnapshot>,
}

pub struct World {
    pub config: AppConfig,
    pub env: Microenvironment,
    pub container: AgentContainer,
    pub models: PhenotypeModels,
    pub metrics: Metrics,
    pub time: f64,
    pub step: u64,
    pub seed: u64,
    pub(crate) bulk: Box<dyn BulkSourceSink>,
    pub(crate) mechanics: MechanicsSettings,
    pub(crate) mechanics_clock: SubCycle,
    pub(crate) phenotype_clock: SubCycle,
    pub(crate) oxygen: Option<usize>,
    pub(crate) rng: ChaCha8Rng,
    next_lineage: u64,
}

impl World {
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.container.len()
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.container.get(id)
    }

    /// Mutable access to one agent. Its cached exchange coefficients are
    /// dropped, so edited secretion or uptake rates take effect next step.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let agent = self.container.get_mut(id)?;
        agent.exchange = ExchangeCache::default();
        Some(agent)
    }

    /// Places an agent with a lineage of its own. Exchange vectors shorter
    /// than the substrate count are padded with zeros.
    pub fn spawn_agent(&mut self, mut agent: Agent) -> AgentId {
        let ns = self.env.number_of_densities();
        let secretion = &mut agent.secretion;
        for rates in [
            &mut secretion.secretion_rates,
            &mut secretion.saturation_densities,
            &mut secretion.uptake_rates,
            &mut secretion.net_export_rates,
        ] {
            if rates.len() < ns {
                rates.resize(ns, 0.0);
            }
        }
        if agent.internalized.len() < ns {
            agent.internalized.resize(ns, 0.0);
        }
        self.next_lineage += 1;
        agent.lineage = self.next_lineage;
        agent.parent = None;
        agent.exchange = ExchangeCache::default();
        let id = self.container.register(agent);
        tracing::debug!(%id, lineage = self.next_lineage, "spawned agent");
        id
    }

    #[must_use]
    pub fn field_snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::capture(&self.env, self.time)
    }

    #[must_use]
    pub fn agent_snapshots(&self) -> Vec<AgentSnapshot> {
        AgentSnapshot::capture_all(&self.container, &self.models)
    }

    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            time: self.time,
            step: self.step,
            config_fingerprint: self.config.fingerprint(),
            births: self.metrics.births(),
            removals: self.metrics.removals(),
            field: self.field_snapshot(),
            agents: self.agent_snapshots(),
        }
    }
}
