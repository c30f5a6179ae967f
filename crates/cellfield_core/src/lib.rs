//! # Cellfield Core
//!
//! Numerical kernels for agent-based tissue simulation: a multi-substrate
//! diffusion-decay field on a structured mesh, coupled to a population of
//! discrete agents that move, secrete, take up, divide and die.
//!
//! ## Architecture
//!
//! - **Field**: [`mesh::Mesh`] and [`microenvironment::Microenvironment`]
//!   hold the lattice and the voxel-major density table. The
//!   [`diffusion::LodSolver`] advances it with one implicit Thomas sweep per
//!   axis; [`bulk`] applies tissue-level sources and sinks.
//! - **Agents**: [`agents::AgentArena`] owns agents behind generational
//!   handles and [`agent_container::AgentContainer`] buckets them for
//!   neighbour search. [`mechanics`], [`secretion`] and [`phenotype`] each
//!   run as a parallel pass over the arena.
//! - **Determinism**: stochastic phenotype decisions draw from per-agent
//!   seeded RNGs, so results do not depend on the worker count.
//!
//! ## Example
//!
//! ```
//! use cellfield_core::mesh::{Bounds, Mesh};
//! use cellfield_core::microenvironment::{Microenvironment, SubstrateSpec};
//!
//! let mesh = Mesh::new(Bounds::new(0.0, 100.0, 0.0, 100.0, 0.0, 20.0), 20.0, 20.0, 20.0).unwrap();
//! let mut env = Microenvironment::new(mesh);
//! let o2 = env
//!     .add_substrate(SubstrateSpec::new("oxygen", "mmHg").with_coefficients(1000.0, 0.1))
//!     .unwrap();
//! env.fill_substrate(o2, 38.0).unwrap();
//! env.simulate_diffusion_decay(0.01);
//! assert!(env.density_vector(0).unwrap()[o2] < 38.0);
//! ```

/// Bucketed spatial index over live agents
pub mod agent_container;
/// Generational arena of agent records
pub mod agents;
/// Tissue-level sources and sinks
pub mod bulk;
/// Configuration management for simulation parameters
pub mod config;
/// LOD diffusion-decay solver
pub mod diffusion;
pub mod error;
/// Default agents and division
pub mod lifecycle;
/// Structured Cartesian mesh
pub mod mesh;
/// Pairwise forces and motion
pub mod mechanics;
/// Run statistics and logging setup
pub mod metrics;
/// Substrate table with boundary conditions
pub mod microenvironment;
/// Cycle, death and volume models
pub mod phenotype;
/// Agent exchange with the field
pub mod secretion;
/// Serializable views for writers
pub mod snapshot;
pub mod vector;

pub use agent_container::{AgentContainer, BoundaryPolicy};
pub use bulk::{BulkFunctions, BulkSourceSink, NoBulk, SourceSinkScheme};
pub use error::{FieldError, Result};
pub use mechanics::{MechanicsSettings, MotionModel};
pub use metrics::{init_logging, Metrics};
pub use phenotype::{PhenotypeModels, PhenotypeOutcome, VolumeLogic};
