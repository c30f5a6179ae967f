//! Cycle progression, death and volume change for individual agents.
//!
//! Models are held once in a [`PhenotypeModels`] registry and shared by every
//! agent; agents only carry their position in a model plus per-agent rates.
//! [`update_phenotype`] is the per-agent entry point and only touches the
//! agent it is given, so the caller can run it in parallel and act on the
//! returned [`PhenotypeOutcome`] afterwards.

pub mod cycle;
pub mod death;
pub mod volume;

use crate::error::{FieldError, Result};
use cellfield_data::{
    Agent, CycleModel, CycleModelKind, DeathModelKind, ExchangeCache, OxygenResponse,
};
use rand::Rng;
use std::collections::HashMap;

pub use cycle::{advance, standard_cycle_model, Transition};
pub use death::{check_for_death, start_death};
pub use volume::{adjust_secretion, VolumeLogic};

/// Requests an agent makes of the world at the end of a phenotype step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhenotypeOutcome {
    pub divide: bool,
    pub remove: bool,
}

#[derive(Debug, Clone)]
pub struct PhenotypeModels {
    cycles: HashMap<CycleModelKind, CycleModel>,
    deaths: [CycleModel; 2],
}

impl Default for PhenotypeModels {
    fn default() -> Self {
        let cycles = [
            CycleModelKind::AdvancedKi67,
            CycleModelKind::BasicKi67,
            CycleModelKind::FlowCytometry,
            CycleModelKind::FlowCytometrySeparated,
            CycleModelKind::Live,
            CycleModelKind::CyclingQuiescent,
        ]
        .into_iter()
        .filter_map(|kind| standard_cycle_model(kind).map(|m| (kind, m)))
        .collect();
        Self {
            cycles,
            deaths: [cycle::apoptosis_model(), cycle::necrosis_model()],
        }
    }
}

impl PhenotypeModels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user-built model under a custom slot, replacing any
    /// previous model there.
    pub fn register_custom(&mut self, slot: u16, model: CycleModel) -> Result<CycleModelKind> {
        cycle::validate_model(&model)?;
        let kind = CycleModelKind::Custom(slot);
        tracing::debug!(slot, name = %model.name, "registered custom cycle model");
        self.cycles.insert(kind, model);
        Ok(kind)
    }

    pub fn cycle(&self, kind: CycleModelKind) -> Result<&CycleModel> {
        self.cycles
            .get(&kind)
            .ok_or_else(|| FieldError::InvalidConfig(format!("no cycle model for {kind:?}")))
    }

    #[must_use]
    pub fn death(&self, kind: DeathModelKind) -> &CycleModel {
        &self.deaths[kind.index()]
    }

    /// Default per-link rates for an agent following `kind`.
    pub fn default_rates(&self, kind: CycleModelKind) -> Result<Vec<f64>> {
        Ok(self.cycle(kind)?.links.iter().map(|l| l.rate).collect())
    }
}

/// Proliferation and necrosis rates as functions of local oxygen.
///
/// Returns `(rate of the first cycle link, necrosis rate)`.
#[must_use]
pub fn oxygen_rates(response: &OxygenResponse, base_rate: f64, oxygen: f64) -> (f64, f64) {
    let proliferation = if oxygen > response.no_proliferation {
        let span = response.reference - response.no_proliferation;
        let capped = oxygen.min(response.saturation);
        if span > 0.0 {
            base_rate * (capped - response.no_proliferation) / span
        } else {
            base_rate
        }
    } else {
        0.0
    };

    let necrosis = if oxygen <= response.critical {
        response.max_necrosis_rate
    } else if oxygen < response.necrotic {
        response.max_necrosis_rate * (response.necrotic - oxygen)
            / (response.necrotic - response.critical)
    } else {
        0.0
    };
    (proliferation, necrosis)
}

/// Advances one agent's phenotype by `dt` minutes.
///
/// `oxygen` is the density sampled at the agent's voxel, used only when the
/// agent carries an [`OxygenResponse`].
pub fn update_phenotype<R: Rng>(
    agent: &mut Agent,
    models: &PhenotypeModels,
    oxygen: Option<f64>,
    dt: f64,
    rng: &mut R,
) -> Result<PhenotypeOutcome> {
    let mut outcome = PhenotypeOutcome::default();

    if let (Some(response), Some(o2), false) =
        (agent.oxygen_response, oxygen, agent.death.is_dead())
    {
        let base = models
            .cycle(agent.cycle.kind)?
            .links
            .first()
            .map_or(0.0, |l| l.rate);
        let (proliferation, necrosis) = oxygen_rates(&response, base, o2);
        if let Some(rate) = agent.cycle.rates.first_mut() {
            *rate = proliferation;
        }
        let slot = DeathModelKind::Necrosis.index();
        if agent.death.rates.len() <= slot {
            agent.death.rates.resize(slot + 1, 0.0);
        }
        agent.death.rates[slot] = necrosis;
    }

    if let Some(kind) = check_for_death(agent, dt, rng) {
        start_death(agent, kind, models.death(kind));
    }

    let transition = if let Some(kind) = agent.death.model {
        let model = models.death(kind);
        let death = &mut agent.death;
        advance(
            model,
            &mut death.phase,
            &mut death.elapsed_time_in_phase,
            &[],
            &agent.volume,
            dt,
            rng,
        )
    } else {
        let model = models.cycle(agent.cycle.kind)?;
        let state = &mut agent.cycle;
        advance(
            model,
            &mut state.phase,
            &mut state.elapsed_time_in_phase,
            &state.rates,
            &agent.volume,
            dt,
            rng,
        )
    };

    if let Some(entry) = transition.entry {
        agent.volume.enter_phase(entry);
        adjust_secretion(&mut agent.secretion, entry);
        agent.exchange = ExchangeCache::default();
    }
    outcome.divide = transition.divide && !agent.death.is_dead();
    outcome.remove = transition.remove;

    agent.volume.relax(dt);
    agent.geometry = agent.volume.geometry();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::default_agent;
    use cellfield_data::{Geometry, Volume};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_registry_has_standard_models() {
        let models = PhenotypeModels::new();
        assert_eq!(models.cycle(CycleModelKind::Live).unwrap().phases.len(), 1);
        assert!(models.cycle(CycleModelKind::Custom(0)).is_err());
        assert_eq!(models.death(DeathModelKind::Necrosis).phases.len(), 3);
    }

    #[test]
    fn test_register_custom_model() {
        let mut models = PhenotypeModels::new();
        let mut model = standard_cycle_model(CycleModelKind::BasicKi67).unwrap();
        model.name = "slow".into();
        model.links[0].rate *= 0.5;
        let kind = models.register_custom(4, model).unwrap();
        assert_eq!(kind, CycleModelKind::Custom(4));
        assert_eq!(models.default_rates(kind).unwrap().len(), 2);
    }

    #[test]
    fn test_oxygen_rates_piecewise() {
        let r = OxygenResponse::default();
        let base = 1.0;
        assert_eq!(oxygen_rates(&r, base, 4.0).0, 0.0);
        assert!((oxygen_rates(&r, base, r.reference).0 - base).abs() < 1e-12);
        let (high, _) = oxygen_rates(&r, base, 100.0);
        let (sat, _) = oxygen_rates(&r, base, r.saturation);
        assert_eq!(high, sat);

        assert_eq!(oxygen_rates(&r, base, 1.0).1, r.max_necrosis_rate);
        let mid = 0.5 * (r.critical + r.necrotic);
        assert!((oxygen_rates(&r, base, mid).1 - 0.5 * r.max_necrosis_rate).abs() < 1e-15);
        assert_eq!(oxygen_rates(&r, base, 10.0).1, 0.0);
    }

    #[test]
    fn test_hypoxic_agent_stops_cycling() {
        let models = PhenotypeModels::new();
        let mut agent = default_agent([0.0; 3], 1);
        agent.oxygen_response = Some(OxygenResponse::default());
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        update_phenotype(&mut agent, &models, Some(3.0), 0.1, &mut rng).unwrap();
        assert_eq!(agent.cycle.rates[0], 0.0);
        assert!(agent.death.rates[DeathModelKind::Necrosis.index()] > 0.0);
    }

    #[test]
    fn test_apoptotic_agent_is_removed() {
        let models = PhenotypeModels::new();
        let mut agent = default_agent([0.0; 3], 1);
        agent.death.rates = vec![1e6, 0.0];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let dt = 6.0;
        let mut removed_at = None;
        for step in 0..200 {
            let outcome = update_phenotype(&mut agent, &models, None, dt, &mut rng).unwrap();
            assert!(!outcome.divide);
            if outcome.remove {
                removed_at = Some(step);
                break;
            }
        }
        let step = removed_at.expect("apoptotic agent must be removed");
        assert!(((step + 1) as f64 * dt - 8.6 * 60.0).abs() <= dt);
        assert!(agent.geometry.radius < Geometry::default().radius);
    }

    #[test]
    fn test_volume_tracks_geometry() {
        let models = PhenotypeModels::new();
        let mut agent = default_agent([0.0; 3], 1);
        agent.cycle.rates = vec![0.0];
        agent.volume.target_solid_nuclear *= 1.5;
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..100 {
            update_phenotype(&mut agent, &models, None, 6.0, &mut rng).unwrap();
        }
        assert_eq!(agent.geometry, agent.volume.geometry());
        assert!(agent.volume.total > Volume::default().total);
    }
}
