//! Configuration for a simulation run.
//!
//! Every section has defaults, so a `cellfield.toml` only needs to list what
//! it changes.
//!
//! ## Example `cellfield.toml`
//!
//! ```toml
//! [domain]
//! x_min = -500.0
//! x_max = 500.0
//! dx = 20.0
//!
//! [[substrates]]
//! name = "oxygen"
//! units = "mmHg"
//! diffusion_coefficient = 100000.0
//! decay_rate = 0.1
//! initial_condition = 38.0
//! dirichlet = { x_min = 38.0, x_max = 38.0 }
//!
//! [time]
//! max_time = 1440.0
//!
//! [agents]
//! count = 50
//! cycle_model = "advanced_ki67"
//! ```

use crate::agent_container::BoundaryPolicy;
use crate::bulk::SourceSinkScheme;
use crate::mechanics::MotionModel;
use crate::mesh::{Bounds, Face};
use cellfield_data::CycleModelKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Domain bounds and voxel spacing, in microns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DomainConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            x_min: -500.0,
            x_max: 500.0,
            y_min: -500.0,
            y_max: 500.0,
            z_min: -10.0,
            z_max: 10.0,
            dx: 20.0,
            dy: 20.0,
            dz: 20.0,
        }
    }
}

impl DomainConfig {
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            self.x_min, self.x_max, self.y_min, self.y_max, self.z_min, self.z_max,
        )
    }
}

/// Fixed boundary values per face. An absent face is zero-flux.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DirichletFaces {
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub z_min: Option<f64>,
    pub z_max: Option<f64>,
}

impl DirichletFaces {
    /// Faces that carry a value, in [`Face::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Face, f64)> + '_ {
        let values = [
            self.x_min, self.x_max, self.y_min, self.y_max, self.z_min, self.z_max,
        ];
        Face::ALL
            .into_iter()
            .zip(values)
            .filter_map(|(face, v)| v.map(|v| (face, v)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SubstrateConfig {
    pub name: String,
    pub units: String,
    /// Square microns per minute.
    pub diffusion_coefficient: f64,
    /// Per minute.
    pub decay_rate: f64,
    pub initial_condition: f64,
    pub dirichlet: DirichletFaces,
    /// Turns the boundary values above on or off without removing them.
    pub dirichlet_enabled: bool,
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            name: "oxygen".to_string(),
            units: "mmHg".to_string(),
            diffusion_coefficient: 100_000.0,
            decay_rate: 0.1,
            initial_condition: 38.0,
            dirichlet: DirichletFaces::default(),
            dirichlet_enabled: true,
        }
    }
}

/// Step sizes for the three sub-cycled processes, in minutes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimeConfig {
    pub diffusion_dt: f64,
    pub mechanics_dt: f64,
    pub phenotype_dt: f64,
    pub max_time: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            diffusion_dt: 0.01,
            mechanics_dt: 0.1,
            phenotype_dt: 6.0,
            max_time: 60.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContainerConfig {
    /// Edge of a mechanics bucket, in microns.
    pub bucket_edge: f64,
    pub boundary_policy: BoundaryPolicy,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            bucket_edge: 30.0,
            boundary_policy: BoundaryPolicy::Clamp,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MechanicsConfig {
    pub cell_cell_repulsion_strength: f64,
    pub cell_cell_adhesion_strength: f64,
    pub relative_maximum_adhesion_distance: f64,
    pub motion: MotionModel,
    pub max_displacement: Option<f64>,
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        Self {
            cell_cell_repulsion_strength: 10.0,
            cell_cell_adhesion_strength: 0.4,
            relative_maximum_adhesion_distance: 1.25,
            motion: MotionModel::Overdamped,
            max_displacement: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub bulk_scheme: SourceSinkScheme,
    /// Slack allowed when deciding whether a sub-cycled process is due.
    pub tolerance: f64,
    pub track_internalized: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            bulk_scheme: SourceSinkScheme::Explicit,
            tolerance: 1e-4,
            track_internalized: false,
        }
    }
}

/// Exchange rates for one substrate, by name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ExchangeConfig {
    pub substrate: String,
    pub secretion_rate: f64,
    pub saturation_density: f64,
    pub uptake_rate: f64,
    pub net_export_rate: f64,
}

/// Initial population.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    pub count: usize,
    pub cycle_model: CycleModelKind,
    /// Agents are scattered uniformly in a ball of this radius around the
    /// domain centre.
    pub cluster_radius: f64,
    pub apoptosis_rate: f64,
    /// Name of the substrate driving oxygen-dependent proliferation and
    /// necrosis. `None` disables the response.
    pub oxygen_substrate: Option<String>,
    pub exchange: Vec<ExchangeConfig>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            count: 0,
            cycle_model: CycleModelKind::Live,
            cluster_radius: 100.0,
            apoptosis_rate: 0.0,
            oxygen_substrate: None,
            exchange: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub seed: Option<u64>,
    pub deterministic: bool,
    /// Log a population summary every this many steps.
    pub log_interval: u64,
    /// Worker threads; 0 leaves the choice to rayon.
    pub threads: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            deterministic: false,
            log_interval: 1000,
            threads: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub domain: DomainConfig,
    pub substrates: Vec<SubstrateConfig>,
    pub time: TimeConfig,
    pub container: ContainerConfig,
    pub mechanics: MechanicsConfig,
    pub solver: SolverConfig,
    pub agents: AgentsConfig,
    pub run: RunConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            domain: DomainConfig::default(),
            substrates: vec![SubstrateConfig::default()],
            time: TimeConfig::default(),
            container: ContainerConfig::default(),
            mechanics: MechanicsConfig::default(),
            solver: SolverConfig::default(),
            agents: AgentsConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validates all configuration parameters, reporting the first failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        let d = &self.domain;
        for (axis, spacing) in [("dx", d.dx), ("dy", d.dy), ("dz", d.dz)] {
            anyhow::ensure!(spacing > 0.0, "Voxel spacing {axis} must be positive, got {spacing}");
        }
        for (axis, min, max) in [
            ("x", d.x_min, d.x_max),
            ("y", d.y_min, d.y_max),
            ("z", d.z_min, d.z_max),
        ] {
            anyhow::ensure!(min <= max, "Domain {axis} bounds inverted: {min} > {max}");
        }

        let mut names = HashSet::new();
        for s in &self.substrates {
            anyhow::ensure!(!s.name.trim().is_empty(), "Substrate name must not be empty");
            anyhow::ensure!(names.insert(s.name.as_str()), "Duplicate substrate '{}'", s.name);
            anyhow::ensure!(
                s.diffusion_coefficient >= 0.0,
                "Substrate '{}' has negative diffusion coefficient",
                s.name
            );
            anyhow::ensure!(s.decay_rate >= 0.0, "Substrate '{}' has negative decay rate", s.name);
        }

        let t = &self.time;
        anyhow::ensure!(t.diffusion_dt > 0.0, "diffusion_dt must be positive");
        anyhow::ensure!(t.mechanics_dt > 0.0, "mechanics_dt must be positive");
        anyhow::ensure!(t.phenotype_dt > 0.0, "phenotype_dt must be positive");
        anyhow::ensure!(t.max_time >= 0.0, "max_time must not be negative");

        anyhow::ensure!(self.container.bucket_edge > 0.0, "Bucket edge must be positive");

        let m = &self.mechanics;
        anyhow::ensure!(
            m.cell_cell_repulsion_strength >= 0.0 && m.cell_cell_adhesion_strength >= 0.0,
            "Mechanics strengths must be non-negative"
        );
        anyhow::ensure!(
            m.relative_maximum_adhesion_distance >= 0.0,
            "Relative adhesion distance must be non-negative"
        );
        if let MotionModel::Inertial { drag } = m.motion {
            anyhow::ensure!(drag >= 0.0, "Drag must be non-negative");
        }
        if let Some(limit) = m.max_displacement {
            anyhow::ensure!(limit > 0.0, "max_displacement must be positive");
        }

        anyhow::ensure!(self.solver.tolerance >= 0.0, "Solver tolerance must be non-negative");

        let a = &self.agents;
        anyhow::ensure!(a.cluster_radius >= 0.0, "Cluster radius must be non-negative");
        anyhow::ensure!(a.apoptosis_rate >= 0.0, "Apoptosis rate must be non-negative");
        if let Some(o2) = &a.oxygen_substrate {
            anyhow::ensure!(names.contains(o2.as_str()), "Unknown oxygen substrate '{o2}'");
        }
        for e in &a.exchange {
            anyhow::ensure!(
                names.contains(e.substrate.as_str()),
                "Exchange rates given for unknown substrate '{}'",
                e.substrate
            );
            anyhow::ensure!(
                e.secretion_rate >= 0.0 && e.uptake_rate >= 0.0 && e.saturation_density >= 0.0,
                "Exchange rates for '{}' must be non-negative",
                e.substrate
            );
        }

        anyhow::ensure!(self.run.log_interval > 0, "log_interval must be positive");
        Ok(())
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Hash of the sections that change the physics.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.domain).as_bytes());
        hasher.update(format!("{:?}", self.substrates).as_bytes());
        hasher.update(format!("{:?}", self.time).as_bytes());
        hasher.update(format!("{:?}", self.container).as_bytes());
        hasher.update(format!("{:?}", self.mechanics).as_bytes());
        hasher.update(format!("{:?}", self.solver).as_bytes());
        hasher.update(format!("{:?}", self.agents).as_bytes());
        hex::encode(hasher.finalize())
    }
}
