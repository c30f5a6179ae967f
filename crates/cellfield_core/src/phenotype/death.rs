//! Stochastic death checks and the switch from cycle to death program.

use super::volume::{adjust_secretion, VolumeLogic};
use cellfield_data::{Agent, CycleModel, DeathModelKind, ExchangeCache};
use rand::Rng;

/// Rolls each death rate in [`DeathModelKind::ALL`] order and returns the
/// first program that fires. Dead agents never roll again.
pub fn check_for_death<R: Rng>(agent: &Agent, dt: f64, rng: &mut R) -> Option<DeathModelKind> {
    if agent.death.is_dead() {
        return None;
    }
    DeathModelKind::ALL.into_iter().find(|kind| {
        let rate = agent.death.rates.get(kind.index()).copied().unwrap_or(0.0);
        rate > 0.0 && rng.gen::<f64>() < rate * dt
    })
}

/// Moves `agent` into the first phase of `model` and applies its entry.
pub fn start_death(agent: &mut Agent, kind: DeathModelKind, model: &CycleModel) {
    agent.death.model = Some(kind);
    agent.death.phase = 0;
    agent.death.elapsed_time_in_phase = 0.0;
    if let Some(first) = model.phases.first() {
        agent.volume.enter_phase(first.entry);
        adjust_secretion(&mut agent.secretion, first.entry);
        agent.exchange = ExchangeCache::default();
    }
    tracing::trace!(?kind, lineage = agent.lineage, "agent entered death program");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::default_agent;
    use crate::phenotype::cycle::{apoptosis_model, necrosis_model};
    use cellfield_data::Volume;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_rates_never_die() {
        let agent = default_agent([0.0; 3], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..10_000 {
            assert!(check_for_death(&agent, 6.0, &mut rng).is_none());
        }
    }

    #[test]
    fn test_certain_death_picks_first_kind() {
        let mut agent = default_agent([0.0; 3], 1);
        agent.death.rates = vec![1.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            check_for_death(&agent, 1.0, &mut rng),
            Some(DeathModelKind::Apoptosis)
        );
        agent.death.rates = vec![0.0, 1.0];
        assert_eq!(
            check_for_death(&agent, 1.0, &mut rng),
            Some(DeathModelKind::Necrosis)
        );
    }

    #[test]
    fn test_start_apoptosis_zeroes_exchange() {
        let mut agent = default_agent([0.0; 3], 1);
        agent.secretion.uptake_rates = vec![10.0];
        start_death(&mut agent, DeathModelKind::Apoptosis, &apoptosis_model());
        assert!(agent.death.is_dead());
        assert_eq!(agent.secretion.uptake_rates, vec![0.0]);
        assert_eq!(agent.volume.target_solid_nuclear, 0.0);
        assert!(check_for_death(&agent, 1.0, &mut ChaCha8Rng::seed_from_u64(0)).is_none());
    }

    #[test]
    fn test_start_necrosis_sets_rupture_volume() {
        let mut agent = default_agent([0.0; 3], 1);
        start_death(&mut agent, DeathModelKind::Necrosis, &necrosis_model());
        assert_eq!(agent.volume.rupture_volume, 2.0 * Volume::default().total);
        assert_eq!(agent.volume.target_fluid_fraction, 1.0);
    }
}
