use crate::model::agents::AgentContainer;
use crate::model::bulk::{BulkSourceSink, NoBulk};
use crate::model::config::AppConfig;
use crate::model::lifecycle;
use crate::model::mechanics::MechanicsSettings;
use crate::model::mesh::Mesh;
use crate::model::metrics::Metrics;
use crate::model::microenvironment::{Microenvironment, SubstrateSpec};
use crate::model::phenotype::PhenotypeModels;
use crate::model::world::{SubCycle, World};
use anyhow::Context;
use cellfield_data::{DeathModelKind, OxygenResponse, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

impl World {
    /// Builds a world with no tissue-level sources or sinks.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        Self::with_bulk(config, Box::new(NoBulk))
    }

    pub fn with_bulk(config: AppConfig, bulk: Box<dyn BulkSourceSink>) -> anyhow::Result<Self> {
        config.validate()?;

        let d = &config.domain;
        let mesh = Mesh::new(d.bounds(), d.dx, d.dy, d.dz).context("Failed to build mesh")?;
        let planar = mesh.is_2d();
        let mut env = Microenvironment::new(mesh);

        for s in &config.substrates {
            let spec = SubstrateSpec::new(&s.name, &s.units)
                .with_coefficients(s.diffusion_coefficient, s.decay_rate);
            let index = env.add_substrate(spec)?;
            env.fill_substrate(index, s.initial_condition)?;
            for (face, value) in s.dirichlet.iter() {
                env.set_dirichlet_face(face, index, value)?;
            }
            if !s.dirichlet.is_empty() {
                env.set_dirichlet_activation(index, s.dirichlet_enabled)?;
            }
        }
        env.apply_dirichlet_conditions();

        // Agents live on the voxel lattice, which rounds each extent up to
        // whole voxels and gives a degenerate axis one voxel of thickness.
        let container = AgentContainer::new(
            env.mesh().bounds,
            config.container.bucket_edge,
            config.container.boundary_policy,
        )
        .context("Failed to build agent container")?;

        let seed = match config.run.seed {
            Some(seed) => seed,
            None if config.run.deterministic => 0,
            None => rand::random(),
        };

        let oxygen = match &config.agents.oxygen_substrate {
            Some(name) => Some(env.substrate_index(name)?),
            None => None,
        };

        let mechanics = MechanicsSettings {
            motion: config.mechanics.motion,
            max_displacement: config.mechanics.max_displacement,
            planar,
        };

        tracing::info!(
            seed,
            voxels = env.number_of_voxels(),
            substrates = env.number_of_densities(),
            planar,
            "World initialized"
        );

        let mut world = Self {
            metrics: Metrics::with_interval(config.run.log_interval),
            config,
            env,
            container,
            models: PhenotypeModels::new(),
            time: 0.0,
            step: 0,
            seed,
            bulk,
            mechanics,
            mechanics_clock: SubCycle::default(),
            phenotype_clock: SubCycle::default(),
            oxygen,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_lineage: 0,
        };
        world.seed_agents()?;
        Ok(world)
    }

    /// Scatters the configured initial population uniformly in a ball around
    /// the domain centre.
    fn seed_agents(&mut self) -> anyhow::Result<()> {
        let cfg = self.config.agents.clone();
        if cfg.count == 0 {
            return Ok(());
        }
        let ns = self.env.number_of_densities();
        let rates = self.models.default_rates(cfg.cycle_model)?;

        let mut exchange = Vec::with_capacity(cfg.exchange.len());
        for e in &cfg.exchange {
            let index = self
                .env
                .substrate_index(&e.substrate)
                .with_context(|| format!("Exchange refers to unknown substrate '{}'", e.substrate))?;
            exchange.push((index, e.clone()));
        }

        let bounds = self.env.mesh().bounds;
        let centre: Vec3 = std::array::from_fn(|a| 0.5 * (bounds.min[a] + bounds.max[a]));
        let planar = self.mechanics.planar;

        for _ in 0..cfg.count {
            let direction = lifecycle::random_unit_vector(planar, &mut self.rng);
            let r = if planar {
                cfg.cluster_radius * self.rng.gen::<f64>().sqrt()
            } else {
                cfg.cluster_radius * self.rng.gen::<f64>().cbrt()
            };
            let position = std::array::from_fn(|a| centre[a] + r * direction[a]);

            let mut agent = lifecycle::default_agent(position, ns);
            agent.cycle.kind = cfg.cycle_model;
            agent.cycle.rates = rates.clone();
            agent.death.rates[DeathModelKind::Apoptosis.index()] = cfg.apoptosis_rate;
            agent.mechanics.cell_cell_repulsion_strength =
                self.config.mechanics.cell_cell_repulsion_strength;
            agent.mechanics.cell_cell_adhesion_strength =
                self.config.mechanics.cell_cell_adhesion_strength;
            agent.mechanics.relative_maximum_adhesion_distance =
                self.config.mechanics.relative_maximum_adhesion_distance;
            for (index, e) in &exchange {
                agent.secretion.secretion_rates[*index] = e.secretion_rate;
                agent.secretion.saturation_densities[*index] = e.saturation_density;
                agent.secretion.uptake_rates[*index] = e.uptake_rate;
                agent.secretion.net_export_rates[*index] = e.net_export_rate;
            }
            if let Some(substrate) = self.oxygen {
                agent.oxygen_response = Some(OxygenResponse {
                    substrate,
                    ..OxygenResponse::default()
                });
            }
            self.spawn_agent(agent);
        }
        tracing::info!(count = cfg.count, radius = cfg.cluster_radius, "Seeded initial agents");
        Ok(())
    }
}
