//! Plain data records shared by the cellfield engine.
//!
//! Nothing in this crate knows how to advance a simulation; the logic lives in
//! `cellfield_core` as extension traits over these types.

pub mod data;

pub use data::agent::{Agent, AgentId, ExchangeCache, MechanicsParams, SecretionParams, Vec3};
pub use data::phenotype::{
    ArrestCondition, CycleModel, CycleModelKind, CycleState, DeathModelKind, DeathState,
    OxygenResponse, Phase, PhaseCode, PhaseEntry, PhaseLink,
};
pub use data::volume::{Geometry, Volume};
