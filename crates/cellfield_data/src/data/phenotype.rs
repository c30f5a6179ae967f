use serde::{Deserialize, Serialize};

/// The closed set of cycle models an agent can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleModelKind {
    AdvancedKi67,
    BasicKi67,
    FlowCytometry,
    FlowCytometrySeparated,
    Live,
    CyclingQuiescent,
    /// A user-assembled model registered under this slot.
    Custom(u16),
}

/// The closed set of death models. The discriminant doubles as the index into
/// an agent's death-rate vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathModelKind {
    Apoptosis = 0,
    Necrosis = 1,
}

impl DeathModelKind {
    pub const ALL: [DeathModelKind; 2] = [DeathModelKind::Apoptosis, DeathModelKind::Necrosis];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseCode {
    Ki67Positive,
    Ki67PositivePremitotic,
    Ki67PositivePostmitotic,
    Ki67Negative,
    G0G1,
    S,
    G2M,
    G2,
    M,
    Live,
    Quiescent,
    Cycling,
    Apoptotic,
    NecroticSwelling,
    NecroticLysed,
    Debris,
    Custom(u16),
}

/// Action taken on the volume targets when an agent enters a phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEntry {
    #[default]
    None,
    /// Double the solid targets ahead of division.
    DoubleVolumeTargets,
    /// Shrink toward zero and stop secreting.
    Apoptotic,
    /// Take up water until rupture.
    NecroticSwelling,
    /// Release fluid and slowly lose biomass.
    NecroticLysed,
}

/// A condition that holds an agent in its current phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrestCondition {
    /// Hold while total volume is below the rupture volume.
    BelowRuptureVolume,
    /// Hold while total volume is above the given volume.
    AboveVolume(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub code: PhaseCode,
    pub name: String,
    pub division_at_exit: bool,
    pub removal_at_exit: bool,
    #[serde(default)]
    pub entry: PhaseEntry,
}

impl Phase {
    #[must_use]
    pub fn new(code: PhaseCode, name: &str) -> Self {
        Self {
            code,
            name: name.to_string(),
            division_at_exit: false,
            removal_at_exit: false,
            entry: PhaseEntry::None,
        }
    }
}

/// Directed edge between two phases. `rate` is per minute; with
/// `fixed_duration` the link fires deterministically after `1/rate` minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLink {
    pub from: usize,
    pub to: usize,
    pub rate: f64,
    pub fixed_duration: bool,
    #[serde(default)]
    pub arrest: Option<ArrestCondition>,
}

/// Ordered phases plus the transition graph between them. Death models use
/// the same representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleModel {
    pub name: String,
    pub phases: Vec<Phase>,
    pub links: Vec<PhaseLink>,
}

/// Oxygen-dependent proliferation and necrosis. Partial pressures in mmHg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OxygenResponse {
    /// Index of the oxygen substrate.
    pub substrate: usize,
    pub no_proliferation: f64,
    pub saturation: f64,
    pub reference: f64,
    pub critical: f64,
    pub necrotic: f64,
    /// Necrosis rate at or below `critical`, per minute.
    pub max_necrosis_rate: f64,
}

impl Default for OxygenResponse {
    fn default() -> Self {
        Self {
            substrate: 0,
            no_proliferation: 5.0,
            saturation: 38.0,
            reference: 6.06,
            critical: 2.5,
            necrotic: 5.0,
            max_necrosis_rate: 1.0 / (24.0 * 60.0),
        }
    }
}

/// Where an agent currently is in its cycle model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleState {
    pub kind: CycleModelKind,
    pub phase: usize,
    pub elapsed_time_in_phase: f64,
    /// Per-link transition rates, copied from the model so they can be tuned per agent.
    pub rates: Vec<f64>,
}

/// Death rates per [`DeathModelKind`], plus the active death program once triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeathState {
    pub rates: Vec<f64>,
    pub model: Option<DeathModelKind>,
    pub phase: usize,
    pub elapsed_time_in_phase: f64,
}

impl DeathState {
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.model.is_some()
    }
}
