pub mod macros;

use cellfield_data::{Agent, AgentId, Vec3};
use cellfield_lib::model::bulk::{BulkSourceSink, NoBulk};
use cellfield_lib::model::config::{AppConfig, DomainConfig, SubstrateConfig};
use cellfield_lib::model::lifecycle;
use cellfield_lib::model::world::World;

type AgentMod = Box<dyn FnOnce(&mut Agent)>;

#[allow(dead_code)]
pub struct WorldBuilder {
    config: AppConfig,
    agents: Vec<(Vec3, AgentMod)>,
    bulk: Option<Box<dyn BulkSourceSink>>,
}

#[allow(dead_code)]
impl WorldBuilder {
    /// A 5x5x5 voxel cube holding one oxygen-like substrate and no agents.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.domain = DomainConfig {
            x_min: 0.0,
            x_max: 100.0,
            y_min: 0.0,
            y_max: 100.0,
            z_min: 0.0,
            z_max: 100.0,
            dx: 20.0,
            dy: 20.0,
            dz: 20.0,
        };
        config.substrates = vec![SubstrateConfig {
            diffusion_coefficient: 1000.0,
            ..SubstrateConfig::default()
        }];
        config.agents.count = 0;
        config.run.seed = Some(42);
        config.run.deterministic = true;
        Self {
            config,
            agents: Vec::new(),
            bulk: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.run.seed = Some(seed);
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    /// Single-layer mesh: the z extent is one voxel thick.
    pub fn planar(self) -> Self {
        self.with_config(|c| {
            c.domain.z_min = -10.0;
            c.domain.z_max = 10.0;
        })
    }

    pub fn with_bulk(mut self, bulk: impl BulkSourceSink + 'static) -> Self {
        self.bulk = Some(Box::new(bulk));
        self
    }

    /// Adds a default agent at `position`, edited by `modifier`.
    pub fn with_agent<F>(mut self, position: Vec3, modifier: F) -> Self
    where
        F: FnOnce(&mut Agent) + 'static,
    {
        self.agents.push((position, Box::new(modifier)));
        self
    }

    pub fn build(self) -> (World, Vec<AgentId>) {
        let bulk = self.bulk.unwrap_or_else(|| Box::new(NoBulk));
        let substrates = self.config.substrates.len();
        let mut world =
            World::with_bulk(self.config, bulk).expect("Failed to create world in test builder");
        let ids = self
            .agents
            .into_iter()
            .map(|(position, modifier)| {
                let mut agent = lifecycle::default_agent(position, substrates);
                agent.cycle.rates = vec![0.0];
                modifier(&mut agent);
                world.spawn_agent(agent)
            })
            .collect();
        (world, ids)
    }
}
